//! Low-level little-endian reading utilities for PE/COFF decoding.
//!
//! Every multi-byte field in a PE image or COFF object is stored little-endian and may sit at
//! any alignment. This module turns such byte ranges into typed values with an explicit length
//! check before every read, so a malformed or truncated image surfaces as
//! [`crate::Error::TruncatedBuffer`] instead of an out-of-bounds access.
//!
//! # Key Components
//!
//! - [`crate::file::io::PeIO`] - Trait describing the fixed-size byte representation of a primitive
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//!
//! # Examples
//!
//! ```rust
//! use pescope::file::io::read_le_at;
//!
//! let data = [0x4C, 0x01, 0x03, 0x00];
//! let mut offset = 0;
//!
//! let machine: u16 = read_le_at(&data, &mut offset)?;
//! let sections: u16 = read_le_at(&data, &mut offset)?;
//!
//! assert_eq!(machine, 0x014C);
//! assert_eq!(sections, 3);
//! assert_eq!(offset, 4);
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All functions are pure and operate on caller-owned buffers and offsets.

use crate::Result;

/// Trait for primitive types that can be decoded from a fixed-size little-endian byte array.
///
/// Each implementation names the byte array matching its width (e.g. `[u8; 4]` for `u32`);
/// [`read_le_at`] slices exactly that many bytes after checking the bounds.
pub trait PeIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

impl PeIO for u64 {
    type Bytes = [u8; 8];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u64::from_le_bytes(bytes)
    }
}

impl PeIO for u32 {
    type Bytes = [u8; 4];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u32::from_le_bytes(bytes)
    }
}

impl PeIO for u16 {
    type Bytes = [u8; 2];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u16::from_le_bytes(bytes)
    }
}

impl PeIO for u8 {
    type Bytes = [u8; 1];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u8::from_le_bytes(bytes)
    }
}

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedBuffer`] if there are insufficient bytes.
pub fn read_le<T: PeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`.
///
/// On success the offset is advanced by the width of `T`; on failure it is left untouched.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (will be advanced after reading)
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedBuffer`] if `offset + size_of::<T>()` exceeds the buffer
/// or overflows.
pub fn read_le_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(truncated_error!(*offset, type_len, data.len()));
    };
    if end > data.len() {
        return Err(truncated_error!(*offset, type_len, data.len()));
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(truncated_error!(*offset, type_len, data.len()));
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}
