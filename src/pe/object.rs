//! COFF object file decoding.
//!
//! An object file is a bare COFF file header at offset 0 followed immediately by its section
//! table. There is no DOS stub, no `"PE\0\0"` signature, no optional header and no data
//! directory, so imports and exports are never resolved and section bytes are not extracted.

use std::path::Path;

use crate::{
    file::RawImage,
    pe::{
        headers::{CoffHeader, COFF_HEADER_SIZE},
        sections::{SectionHeader, SectionTable},
    },
    Result,
};

/// A decoded COFF object file.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::ObjectFile;
///
/// let object = ObjectFile::from_file("main.obj")?;
/// for section in object.sections() {
///     println!("{:>3} {:<8} {} bytes", section.index, section.name(), section.size_of_raw_data);
/// }
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    coff: CoffHeader,
    sections: SectionTable,
}

impl ObjectFile {
    /// Reads and decodes the object file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, or any error from
    /// [`ObjectFile::parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<ObjectFile> {
        let image = RawImage::from_file(path)?;
        ObjectFile::parse(&image)
    }

    /// Decodes an object file from an in-memory buffer.
    ///
    /// # Errors
    /// See [`ObjectFile::parse`].
    pub fn from_mem(data: Vec<u8>) -> Result<ObjectFile> {
        ObjectFile::parse(&RawImage::from_mem(data))
    }

    /// Decodes the COFF file header and section table of `image`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the header or the section table extends
    /// past the end of the image.
    pub fn parse(image: &RawImage) -> Result<ObjectFile> {
        let data = image.data();
        let coff = CoffHeader::read(data, 0)?;

        if coff.size_of_optional_header != 0 {
            log::warn!(
                "object file declares a {}-byte optional header; section table read at offset {}",
                coff.size_of_optional_header,
                COFF_HEADER_SIZE
            );
        }

        let sections = SectionTable::read(data, COFF_HEADER_SIZE, coff.number_of_sections)?;
        log::debug!(
            "decoded object file for {} with {} sections",
            coff.machine_name(),
            sections.len()
        );

        Ok(ObjectFile { coff, sections })
    }

    /// The COFF file header.
    #[must_use]
    pub fn coff(&self) -> &CoffHeader {
        &self.coff
    }

    /// The section table.
    #[must_use]
    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// All section headers named `name`, in table order.
    #[must_use]
    pub fn sections_named(&self, name: &str) -> Vec<&SectionHeader> {
        self.sections.get(name)
    }
}
