//! Shared fixtures for unit tests.
//!
//! [`ImageBuilder`] and [`ObjectBuilder`] assemble synthetic PE32+ images and COFF object files
//! byte by byte, so tests can construct exactly the layout (or the corruption) they need.

mod builder;

pub(crate) use builder::{ImageBuilder, ObjectBuilder};
