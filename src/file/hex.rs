//! Hexadecimal rendering of raw bytes.

use std::fmt::Write;

/// Number of bytes rendered per row.
pub const BYTES_PER_ROW: usize = 16;

/// Renders `bytes` as rows of `offset  hex bytes  |ascii|`.
///
/// `base` is added to every offset in the left column, so a section's bytes can be shown at
/// their file offset (or RVA) instead of starting from zero. Non-printable bytes appear as `.`
/// in the ASCII column.
///
/// # Examples
///
/// ```rust
/// use pescope::hex_dump;
///
/// let text = hex_dump(b"MZ\x90\x00", 0x400);
/// assert_eq!(
///     text,
///     "00000400  4d 5a 90 00                                      |MZ..|\n"
/// );
/// ```
#[must_use]
pub fn hex_dump(bytes: &[u8], base: u64) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(BYTES_PER_ROW) * 78);

    for (row, chunk) in bytes.chunks(BYTES_PER_ROW).enumerate() {
        let offset = base.wrapping_add((row * BYTES_PER_ROW) as u64);
        let _ = write!(out, "{offset:08x} ");

        for column in 0..BYTES_PER_ROW {
            match chunk.get(column) {
                Some(byte) => {
                    let _ = write!(out, " {byte:02x}");
                }
                None => out.push_str("   "),
            }
        }

        out.push_str("  |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }

    out
}
