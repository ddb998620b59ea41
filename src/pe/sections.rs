//! Section header table and raw section bytes.
//!
//! Every section is described by a 40-byte header; the table holds `NumberOfSections` of them
//! back to back. Headers are kept in table order and additionally indexed by name. Object files
//! legitimately repeat names (`.text$mn`, `.debug$S`, ...), so a name maps to every header that
//! carries it rather than to the last one seen.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::{file::parser::Parser, Result};

/// Size of a single section header in bytes.
pub const SECTION_HEADER_SIZE: usize = 40;
/// Length of the raw section name field.
pub const SECTION_NAME_SIZE: usize = 8;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flags of the section header `Characteristics` field
    pub struct SectionCharacteristics : u32 {
        /// The section should not be padded to the next boundary (object files only)
        const TYPE_NO_PAD = 0x0000_0008;
        /// The section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// The section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// The section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// The section contains comments or other information (object files only)
        const LNK_INFO = 0x0000_0200;
        /// The section will not become part of the image (object files only)
        const LNK_REMOVE = 0x0000_0800;
        /// The section contains COMDAT data (object files only)
        const LNK_COMDAT = 0x0000_1000;
        /// The section contains data referenced through the global pointer
        const GPREL = 0x0000_8000;
        /// Alignment bits, see [`SectionCharacteristics::alignment`] (object files only)
        const ALIGN_MASK = 0x00F0_0000;
        /// The section contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// The section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// The section cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// The section is not pageable
        const MEM_NOT_PAGED = 0x0800_0000;
        /// The section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// The section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// The section can be read
        const MEM_READ = 0x4000_0000;
        /// The section can be written to
        const MEM_WRITE = 0x8000_0000;
    }
}

impl SectionCharacteristics {
    const ALIGN_SHIFT: u32 = 20;

    /// Data alignment in bytes encoded in the 4-bit alignment field.
    ///
    /// Values 1..=14 encode 1, 2, 4, ... 8192 bytes. Zero means no alignment was specified and
    /// 15 is undefined; both yield `None`.
    #[must_use]
    pub fn alignment(&self) -> Option<u32> {
        let encoded = (self.bits() & Self::ALIGN_MASK.bits()) >> Self::ALIGN_SHIFT;
        match encoded {
            1..=14 => Some(1 << (encoded - 1)),
            _ => None,
        }
    }
}

/// A decoded section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Zero-based position of this header in the section table
    pub index: usize,
    /// The raw 8-byte name field, see [`SectionHeader::name`]
    pub raw_name: [u8; SECTION_NAME_SIZE],
    /// Size of the section when loaded into memory
    pub virtual_size: u32,
    /// RVA of the first byte of the section when loaded
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the section's first page on disk
    pub pointer_to_raw_data: u32,
    /// File offset of the relocation entries
    pub pointer_to_relocations: u32,
    /// File offset of the COFF line-number entries
    pub pointer_to_linenumbers: u32,
    /// Number of relocation entries
    pub number_of_relocations: u16,
    /// Number of line-number entries
    pub number_of_linenumbers: u16,
    /// Raw `Characteristics` bits, see [`SectionHeader::characteristics`]
    pub characteristics: u32,
}

impl SectionHeader {
    /// Decodes one 40-byte section header from the parser's current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if fewer than 40 bytes remain.
    pub fn read(parser: &mut Parser<'_>, index: usize) -> Result<SectionHeader> {
        parser.ensure_remaining(SECTION_HEADER_SIZE)?;

        let mut raw_name = [0u8; SECTION_NAME_SIZE];
        raw_name.copy_from_slice(parser.read_bytes(SECTION_NAME_SIZE)?);

        Ok(SectionHeader {
            index,
            raw_name,
            virtual_size: parser.read_le::<u32>()?,
            virtual_address: parser.read_le::<u32>()?,
            size_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
            pointer_to_relocations: parser.read_le::<u32>()?,
            pointer_to_linenumbers: parser.read_le::<u32>()?,
            number_of_relocations: parser.read_le::<u16>()?,
            number_of_linenumbers: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u32>()?,
        })
    }

    /// The section name.
    ///
    /// If any of the 8 name bytes is zero the name ends at the first zero; otherwise all 8
    /// bytes form the name. Long object-file names of the form `/123` are returned as-is.
    #[must_use]
    pub fn name(&self) -> String {
        let end = self
            .raw_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SECTION_NAME_SIZE);
        String::from_utf8_lossy(&self.raw_name[..end]).into_owned()
    }

    /// The `Characteristics` field as typed flags; unknown bits are retained.
    #[must_use]
    pub fn characteristics(&self) -> SectionCharacteristics {
        SectionCharacteristics::from_bits_retain(self.characteristics)
    }

    /// Returns `true` if `rva` lies in `[virtual_address, virtual_address + virtual_size)`.
    ///
    /// The end of the interval is computed in 64 bits and cannot wrap.
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        let start = u64::from(self.virtual_address);
        let end = start + u64::from(self.virtual_size);
        (start..end).contains(&u64::from(rva))
    }

    /// Offset of `rva` relative to the start of this section.
    ///
    /// Callers establish containment with [`SectionHeader::contains_rva`] first; an address
    /// below the section base yields `None`.
    #[must_use]
    pub fn rva_to_section_offset(&self, rva: u32) -> Option<usize> {
        rva.checked_sub(self.virtual_address).map(|offset| offset as usize)
    }

    /// End of the on-disk range, computed in 64 bits.
    #[must_use]
    pub fn raw_data_end(&self) -> u64 {
        u64::from(self.pointer_to_raw_data) + u64::from(self.size_of_raw_data)
    }
}

/// The decoded section header table.
///
/// Headers are stored in table order; [`SectionTable::get`] returns every header carrying a
/// given name, again in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    headers: Vec<SectionHeader>,
    by_name: HashMap<String, Vec<usize>>,
}

impl SectionTable {
    /// Decodes `count` consecutive section headers starting at `offset`.
    ///
    /// The full table is bounds-checked before any header is allocated.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the table extends past the end of `data`.
    pub fn read(data: &[u8], offset: usize, count: u16) -> Result<SectionTable> {
        let count = usize::from(count);
        let table_len = count * SECTION_HEADER_SIZE;
        if offset > data.len() {
            return Err(truncated_error!(offset, table_len, data.len()));
        }

        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        parser.ensure_remaining(table_len)?;

        let mut headers = Vec::with_capacity(count);
        for index in 0..count {
            headers.push(SectionHeader::read(&mut parser, index)?);
        }

        log::debug!("decoded {count} section headers at offset 0x{offset:X}");
        Ok(SectionTable::from_headers(headers))
    }

    /// Builds a table from headers already in table order.
    #[must_use]
    pub fn from_headers(headers: Vec<SectionHeader>) -> SectionTable {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, header) in headers.iter().enumerate() {
            by_name.entry(header.name()).or_default().push(position);
        }

        SectionTable { headers, by_name }
    }

    /// All headers named `name`, in table order. Empty if there is none.
    #[must_use]
    pub fn get(&self, name: &str) -> Vec<&SectionHeader> {
        self.by_name
            .get(name)
            .map(|positions| positions.iter().map(|&p| &self.headers[p]).collect())
            .unwrap_or_default()
    }

    /// The first header named `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&SectionHeader> {
        self.by_name
            .get(name)
            .and_then(|positions| positions.first())
            .map(|&p| &self.headers[p])
    }

    /// Returns `true` if at least one header is named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The header at table position `index`.
    #[must_use]
    pub fn by_index(&self, index: usize) -> Option<&SectionHeader> {
        self.headers.get(index)
    }

    /// Iterates all headers in table order, duplicates included.
    pub fn iter(&self) -> std::slice::Iter<'_, SectionHeader> {
        self.headers.iter()
    }

    /// Distinct section names in order of first appearance.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.by_name.len());
        for header in &self.headers {
            let name = header.name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Number of headers in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns `true` if the table has no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<'a> IntoIterator for &'a SectionTable {
    type Item = &'a SectionHeader;
    type IntoIter = std::slice::Iter<'a, SectionHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

/// The on-disk bytes of one section, copied out of the image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionData {
    bytes: Vec<u8>,
}

impl SectionData {
    /// Copies `[PointerToRawData, PointerToRawData + SizeOfRawData)` out of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptImage`] if the range extends past the end of `data`.
    pub fn extract(data: &[u8], header: &SectionHeader) -> Result<SectionData> {
        let end = header.raw_data_end();
        if end > data.len() as u64 {
            return Err(corrupt_error!(
                "Section '{}' raw data 0x{:X}..0x{:X} exceeds file size 0x{:X}",
                header.name(),
                header.pointer_to_raw_data,
                end,
                data.len()
            ));
        }

        let start = header.pointer_to_raw_data as usize;
        Ok(SectionData {
            bytes: data[start..end as usize].to_vec(),
        })
    }

    /// The section's raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of raw bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the section has no bytes on disk.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
