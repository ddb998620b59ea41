//! Cursor-based byte parser for PE/COFF structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice. Header and table decoders position a parser at the start of a record and then
//! read its fields in declaration order, so the on-disk layout reads top to bottom in code.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser::seek`] - Move to a specific position
//! - [`crate::file::parser::Parser::advance_by`] - Skip reserved or unused bytes
//! - [`crate::file::parser::Parser::read_le`] - Read a little-endian primitive
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a fixed-length byte run
//! - [`crate::file::parser::Parser::read_cstring`] - Read a null-terminated string
//!
//! # Examples
//!
//! ```rust
//! use pescope::Parser;
//!
//! let data = [0x64, 0x86, 0x02, 0x00, b'.', b't', b'e', b'x', b't', 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x8664);
//! assert_eq!(parser.read_le::<u16>()?, 2);
//! assert_eq!(parser.read_cstring()?, ".text");
//! assert!(!parser.has_more_data());
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, PeIO},
    Result,
};

/// A generic binary data parser for reading PE/COFF records.
///
/// `Parser` maintains an internal position cursor and checks bounds on every operation, so
/// reading a truncated or malformed record yields [`crate::Error::TruncatedBuffer`] rather than
/// a panic.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed; the next read will fail.
    ///
    /// # Arguments
    /// * `pos` - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(truncated_error!(pos, 0, self.data.len()));
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Arguments
    /// * `step` - Amount of bytes to advance
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.position = self.calc_end_position(step)?;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at a value of type `T` in little-endian format without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if reading `T` would exceed the data length.
    pub fn peek_le<T: PeIO>(&self) -> Result<T> {
        let mut temp_position = self.position;
        read_le_at::<T>(self.data, &mut temp_position)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if reading would exceed the data length.
    pub fn read_le<T: PeIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Returns the number of bytes left between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Ensures that at least `needed` bytes are available from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if fewer than `needed` bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(truncated_error!(self.position, needed, self.data.len()));
        }
        Ok(())
    }

    /// Calculates an end position safely with overflow checking.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the calculation would overflow
    /// or if the resulting position exceeds the data length.
    pub fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(truncated_error!(self.position, length, self.data.len()))?;

        if end > self.data.len() {
            return Err(truncated_error!(self.position, length, self.data.len()));
        }

        Ok(end)
    }

    /// Reads a slice of bytes of the specified length from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if reading `length` bytes would exceed the data.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a null-terminated string and advance past its terminator.
    ///
    /// Names in PE images are ASCII in practice; any other byte sequence is decoded lossily
    /// rather than rejected.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if no terminator exists before the end of the
    /// data.
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.position;
        let rest = self.data.get(start..).unwrap_or_default();

        let Some(length) = rest.iter().position(|&b| b == 0) else {
            return Err(truncated_error!(start, rest.len() + 1, self.data.len()));
        };

        self.position = start + length + 1;
        Ok(String::from_utf8_lossy(&rest[..length]).into_owned())
    }
}
