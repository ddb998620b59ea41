//! Relative virtual address resolution.
//!
//! An RVA is meaningful only once a section claims it. Resolution is a linear, first-match scan
//! over the section table in table order: sections may overlap in malformed images and the
//! earliest header wins. Once a host section is found, every further read derived from an RVA
//! (strings, name tables, lookup tables) goes through a [`SectionView`] over that section's
//! extracted bytes and is bounds-checked against them.

use crate::{
    file::parser::Parser,
    pe::sections::{SectionData, SectionHeader, SectionTable},
    Error, Result,
};

/// Returns the first section, in table order, whose `[VirtualAddress, VirtualAddress +
/// VirtualSize)` interval contains `rva`.
///
/// # Examples
///
/// ```rust
/// use pescope::pe::{rva::find_section_containing, sections::{SectionHeader, SectionTable}};
///
/// let text = SectionHeader {
///     index: 0,
///     raw_name: *b".text\0\0\0",
///     virtual_size: 0x100,
///     virtual_address: 0x1000,
///     size_of_raw_data: 0,
///     pointer_to_raw_data: 0,
///     pointer_to_relocations: 0,
///     pointer_to_linenumbers: 0,
///     number_of_relocations: 0,
///     number_of_linenumbers: 0,
///     characteristics: 0,
/// };
/// let table = SectionTable::from_headers(vec![text]);
///
/// assert!(find_section_containing(0x1000, &table).is_some());
/// assert!(find_section_containing(0x1100, &table).is_none());
/// ```
#[must_use]
pub fn find_section_containing(rva: u32, sections: &SectionTable) -> Option<&SectionHeader> {
    sections.iter().find(|header| header.contains_rva(rva))
}

/// Offset of `rva` within `section`, `rva - VirtualAddress`.
///
/// The caller is expected to have resolved `section` through [`find_section_containing`];
/// an address below the section base yields `None`.
#[must_use]
pub fn rva_to_section_offset(rva: u32, section: &SectionHeader) -> Option<usize> {
    section.rva_to_section_offset(rva)
}

/// Bounded read access to one section's raw bytes, addressed by RVA.
#[derive(Debug, Clone, Copy)]
pub struct SectionView<'a> {
    header: &'a SectionHeader,
    data: &'a [u8],
}

impl<'a> SectionView<'a> {
    /// Resolves the section hosting `rva` and pairs its header with its extracted bytes.
    ///
    /// `section_data` holds the raw bytes of every section in table order.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptImage`] if no section contains `rva`.
    pub fn resolve(
        rva: u32,
        sections: &'a SectionTable,
        section_data: &'a [SectionData],
    ) -> Result<SectionView<'a>> {
        let Some(header) = find_section_containing(rva, sections) else {
            return Err(corrupt_error!(
                "RVA 0x{:08X} does not fall inside any section",
                rva
            ));
        };

        let Some(data) = section_data.get(header.index) else {
            return Err(corrupt_error!(
                "Section '{}' has no extracted data",
                header.name()
            ));
        };

        Ok(SectionView::new(header, data.bytes()))
    }

    /// Pairs a header with its bytes.
    #[must_use]
    pub fn new(header: &'a SectionHeader, data: &'a [u8]) -> SectionView<'a> {
        SectionView { header, data }
    }

    /// The host section header.
    #[must_use]
    pub fn header(&self) -> &'a SectionHeader {
        self.header
    }

    /// The host section's raw bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Offset of `rva` in the section's raw bytes, which must address at least one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if `rva` lies below the section base or at
    /// or beyond the end of its raw bytes.
    pub fn offset_of(&self, rva: u32) -> Result<usize> {
        match self.header.rva_to_section_offset(rva) {
            Some(offset) if offset < self.data.len() => Ok(offset),
            _ => Err(self.unresolved(rva)),
        }
    }

    /// Everything from `rva` to the end of the section's raw bytes, for sentinel-terminated
    /// scans. May be empty when `rva` sits exactly at the end.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if `rva` lies below the section base or
    /// past the end of its raw bytes.
    pub fn tail(&self, rva: u32) -> Result<&'a [u8]> {
        match self.header.rva_to_section_offset(rva) {
            Some(offset) if offset <= self.data.len() => Ok(&self.data[offset..]),
            _ => Err(self.unresolved(rva)),
        }
    }

    /// `len` bytes starting at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if any of the bytes lies outside the
    /// section's raw bytes.
    pub fn slice(&self, rva: u32, len: usize) -> Result<&'a [u8]> {
        let tail = self.tail(rva)?;
        tail.get(..len).ok_or_else(|| self.unresolved(rva))
    }

    /// Reads a little-endian `u32` at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if the value does not fit in the section.
    pub fn read_u32(&self, rva: u32) -> Result<u32> {
        let bytes = self.slice(rva, 4)?;
        Parser::new(bytes).read_le::<u32>()
    }

    /// Reads a null-terminated string at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if `rva` lies outside the section or the
    /// string is not terminated before the section's raw bytes end.
    pub fn read_cstring(&self, rva: u32) -> Result<String> {
        let start = self.offset_of(rva)?;
        let mut parser = Parser::new(&self.data[start..]);
        parser.read_cstring().map_err(|_| self.unresolved(rva))
    }

    fn unresolved(&self, rva: u32) -> Error {
        Error::UnresolvedReference {
            rva,
            section: self.header.name(),
        }
    }
}
