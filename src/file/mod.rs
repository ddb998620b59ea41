//! Raw image ownership and low-level byte access.
//!
//! This module owns the bytes of the file being decoded and provides the bounds-checked
//! primitives every decoder builds on. A [`crate::file::RawImage`] is read once, up front, and
//! is never mutated afterwards; decoders either copy bytes out of it or borrow short-lived
//! slices while a decode call runs.
//!
//! # Key Components
//!
//! - [`crate::file::RawImage`] - Immutable owner of the complete file contents
//! - [`crate::file::parser::Parser`] - Cursor for decoding records field by field
//! - [`crate::file::io`] - Little-endian primitive reads with explicit length checks
//! - [`crate::file::hex::hex_dump`] - Offset/hex/ASCII rendering of raw bytes
//!
//! # Examples
//!
//! ```rust
//! use pescope::RawImage;
//!
//! let image = RawImage::from_mem(vec![b'M', b'Z', 0x90, 0x00]);
//! assert_eq!(image.len(), 4);
//! assert_eq!(image.data_slice(0, 2)?, b"MZ");
//! assert!(image.data_slice(2, 4).is_err());
//! # Ok::<(), pescope::Error>(())
//! ```

pub mod hex;
pub mod io;
pub mod parser;

use std::{fs, path::Path};

use crate::Result;

/// The complete, immutable contents of a PE image or COFF object file.
///
/// `RawImage` is the sole owner of the file bytes for the duration of a decode. It is created
/// once per decode call, either by reading a whole file from disk or by taking ownership of a
/// caller-supplied buffer, and exposes only shared, bounds-checked access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    data: Vec<u8>,
}

impl RawImage {
    /// Reads the entire file at `path` into a new image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<RawImage> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        log::debug!("read {} bytes from {}", data.len(), path.display());

        Ok(RawImage { data })
    }

    /// Takes ownership of an in-memory buffer.
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> RawImage {
        RawImage { data }
    }

    /// Returns the entire buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedBuffer`] if `offset + len` overflows or exceeds the
    /// buffer length.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(truncated_error!(offset, len, self.data.len()));
        };

        if offset_end > self.data.len() {
            return Err(truncated_error!(offset, len, self.data.len()));
        }

        Ok(&self.data[offset..offset_end])
    }

    /// Returns the total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for RawImage {
    fn from(data: Vec<u8>) -> Self {
        RawImage::from_mem(data)
    }
}

impl AsRef<[u8]> for RawImage {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}
