use thiserror::Error;

use crate::pe::headers::magic_name;

macro_rules! corrupt_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::CorruptImage {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::CorruptImage {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! truncated_error {
    ($offset:expr, $len:expr, $available:expr) => {
        crate::Error::TruncatedBuffer {
            offset: $offset,
            len: $len,
            available: $available,
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every decode operation either yields a fully populated value or exactly one of these
/// variants. No partially decoded structure is ever handed back to the caller.
///
/// # Error Categories
///
/// - [`Error::FileError`] - The source path could not be opened or read
/// - [`Error::TruncatedBuffer`] - A fixed-size read would run past the end of the buffer
/// - [`Error::UnsupportedFormat`] - The optional header is not PE32+
/// - [`Error::CorruptImage`] - An RVA resolves to no section, a section's raw data lies outside
///   the file, or a sentinel-terminated table runs out of bytes
/// - [`Error::UnresolvedReference`] - A string or table derived from an RVA lies outside the
///   host section's raw bytes
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, Executable};
/// use std::path::Path;
///
/// match Executable::from_file(Path::new("program.exe")) {
///     Ok(exe) => println!("{} sections", exe.sections().len()),
///     Err(Error::UnsupportedFormat { magic }) => eprintln!("not PE32+: 0x{magic:04X}"),
///     Err(Error::CorruptImage { message, file, line }) => {
///         eprintln!("corrupt image: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    ///
    /// Wraps the standard I/O error raised while opening or reading the source path.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A fixed-size read would have exceeded the buffer bounds.
    ///
    /// # Fields
    ///
    /// * `offset` - Where the read was attempted
    /// * `len` - How many bytes the read needed
    /// * `available` - Total length of the buffer being read
    #[error("Truncated buffer - reading {len} bytes at offset {offset} exceeds {available} available bytes")]
    TruncatedBuffer {
        /// Start of the attempted read
        offset: usize,
        /// Number of bytes requested
        len: usize,
        /// Size of the buffer that was read from
        available: usize,
    },

    /// The optional header magic is not the PE32+ constant (0x20B).
    #[error("Unsupported format - optional header magic 0x{magic:04X} ({}), only PE32+ is supported", magic_name(*.magic))]
    UnsupportedFormat {
        /// The magic value found in the optional header
        magic: u16,
    },

    /// The image is structurally damaged.
    ///
    /// Raised when an RVA does not resolve to any section, when a section's raw data lies
    /// outside the file, or when a sentinel-terminated table exhausts its section without
    /// reaching the terminator. The error records where it was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was corrupt
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Corrupt image - {file}:{line}: {message}")]
    CorruptImage {
        /// The message to be printed for the CorruptImage error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A read computed from an RVA lies outside the raw bytes of its host section.
    #[error("Unresolved reference - RVA 0x{rva:08X} lies outside the raw data of section '{section}'")]
    UnresolvedReference {
        /// The RVA that could not be served
        rva: u32,
        /// Name of the section the RVA was resolved against
        section: String,
    },
}
