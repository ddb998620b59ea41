// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # pescope
//!
//! A decode-only parser for 64-bit Windows Portable Executable (PE32+) images and COFF object
//! files, written in safe Rust.
//!
//! `pescope` turns the raw bytes of an `.exe`, `.dll` or `.obj` into structured headers, a
//! section table, the import table and the export name list. Every field is decoded
//! explicitly in little-endian order with a length check before each read, so truncated or
//! hostile input surfaces as an [`Error`] rather than a panic or a partially filled result.
//!
//! ## Features
//!
//! - **Headers** - DOS header, COFF file header, PE32+ optional header, data directories
//! - **Sections** - Section headers with duplicate names preserved, raw section bytes
//! - **RVA resolution** - First-match lookup of the section hosting an address
//! - **Imports** - DLL name to function list, with ordinal imports and IAT fallback
//! - **Exports** - Exported names in name pointer table order
//! - **Object files** - COFF header and section table of `.obj` files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//!
//! let exe = Executable::from_file("C:/Windows/System32/kernel32.dll")?;
//! println!("{} ({})", exe.coff_header().machine_name(), exe.optional_header().magic_name());
//!
//! for section in exe.sections() {
//!     println!("{:<8} 0x{:08X} {:>8}", section.name(), section.virtual_address, section.virtual_size);
//! }
//!
//! for entry in exe.imports() {
//!     println!("{}: {:?}", entry.dll, entry.functions);
//! }
//!
//! println!("{} exported names", exe.exports().len());
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Object Files
//!
//! ```rust,no_run
//! use pescope::ObjectFile;
//!
//! let object = ObjectFile::from_file("main.obj")?;
//! for section in object.sections_named(".text$mn") {
//!     println!("section #{} has {} bytes", section.index, section.size_of_raw_data);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Memory-based Decoding
//!
//! ```rust
//! use pescope::{Error, Executable};
//!
//! let result = Executable::from_mem(vec![0u8; 16]);
//! assert!(matches!(result, Err(Error::TruncatedBuffer { .. })));
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use pescope::{Error, Executable};
//!
//! match Executable::from_file("program.exe") {
//!     Ok(exe) => println!("{} sections", exe.sections().len()),
//!     Err(Error::UnsupportedFormat { magic }) => println!("only PE32+ is supported, got 0x{magic:04X}"),
//!     Err(Error::CorruptImage { message, .. }) => println!("corrupt image: {message}"),
//!     Err(e) => println!("error: {e}"),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo install cargo-fuzz
//! cargo +nightly fuzz run decode --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
#[macro_use]
pub(crate) mod error;

/// Raw image ownership, little-endian reads and the byte cursor.
pub mod file;

/// PE32+ image and COFF object decoders.
pub mod pe;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use pescope::prelude::*;
///
/// let exe = Executable::from_file("app.exe")?;
/// let imports: &ImportTable = exe.imports();
/// println!("{} DLLs", imports.len());
/// # Ok::<(), pescope::Error>(())
/// ```
pub mod prelude;

/// `pescope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`]. Used consistently throughout the crate.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Executable, Result};
///
/// fn load(path: &str) -> Result<Executable> {
///     Executable::from_file(path)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `pescope` Error type
///
/// The single error type for every decode operation.
pub use error::Error;

/// Main entry points: a decoded PE32+ image and a decoded COFF object file.
pub use pe::{object::ObjectFile, Executable};

/// Low-level access to the raw bytes.
///
/// # Example
///
/// ```rust
/// use pescope::{hex_dump, Parser, RawImage};
///
/// let image = RawImage::from_mem(b"MZ\x90\x00".to_vec());
/// let mut parser = Parser::new(image.data());
/// assert_eq!(parser.read_le::<u16>()?, 0x5A4D);
/// assert!(hex_dump(image.data(), 0).starts_with("00000000  4d 5a"));
/// # Ok::<(), pescope::Error>(())
/// ```
pub use file::{hex::hex_dump, parser::Parser, RawImage};
