//! PE32+ image and COFF object decoding.
//!
//! Decoding is a single pass of offset arithmetic over a [`crate::RawImage`]: the DOS header
//! locates the NT signature, the COFF file header and PE32+ optional header follow at fixed
//! offsets, the data directory table follows the optional header, and the section table
//! follows the data directories. Section bytes are then copied out, and the import and export
//! directories are resolved through the section table.
//!
//! # Key Components
//!
//! - [`crate::pe::Executable`] - Fully decoded `.exe`/`.dll`
//! - [`crate::pe::object::ObjectFile`] - Fully decoded `.obj`
//! - [`crate::pe::headers`] - DOS, COFF and optional headers, data directories
//! - [`crate::pe::sections`] - Section headers and raw section bytes
//! - [`crate::pe::rva`] - RVA to section resolution
//! - [`crate::pe::imports`] / [`crate::pe::exports`] - Import and export tables
//!
//! # Error Handling
//!
//! A decode either returns a complete [`crate::pe::Executable`] or a single [`crate::Error`];
//! nothing partially decoded is ever handed out.
//!
//! # Thread Safety
//!
//! Every decoded type owns its data and is [`Send`] + [`Sync`]. Independent images can be
//! decoded in parallel without coordination.

pub mod exports;
pub mod headers;
pub mod imports;
pub mod object;
pub mod rva;
pub mod sections;

use std::path::Path;

use crate::{
    file::{io::read_le_at, RawImage},
    Result,
};
use exports::ExportTable;
use headers::{
    CoffHeader, DataDirectories, DosHeader, OptionalHeader64, COFF_HEADER_SIZE,
    OPTIONAL_HEADER64_FIXED_SIZE, PE_SIGNATURE,
};
use imports::ImportTable;
use rva::SectionView;
use sections::{SectionData, SectionHeader, SectionTable};

/// A fully decoded PE32+ executable or DLL.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::Executable;
///
/// let exe = Executable::from_file("C:/Windows/System32/notepad.exe")?;
/// println!("entry point RVA: 0x{:08X}", exe.optional_header().address_of_entry_point);
///
/// for entry in exe.imports() {
///     println!("{}: {} functions", entry.dll, entry.functions.len());
/// }
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    dos_header: DosHeader,
    nt_signature: u32,
    coff_header: CoffHeader,
    optional_header: OptionalHeader64,
    data_directories: DataDirectories,
    sections: SectionTable,
    section_data: Vec<SectionData>,
    imports: ImportTable,
    exports: ExportTable,
}

impl Executable {
    /// Reads and decodes the image at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, or any error from
    /// [`Executable::parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Executable> {
        let image = RawImage::from_file(path)?;
        Executable::parse(&image)
    }

    /// Decodes an image from an in-memory buffer.
    ///
    /// # Errors
    /// See [`Executable::parse`].
    pub fn from_mem(data: Vec<u8>) -> Result<Executable> {
        Executable::parse(&RawImage::from_mem(data))
    }

    /// Decodes every header, the section table, section bytes, imports and exports of `image`.
    ///
    /// # Errors
    /// - [`crate::Error::TruncatedBuffer`] if a header or table extends past the image
    /// - [`crate::Error::UnsupportedFormat`] if the optional header is not PE32+
    /// - [`crate::Error::CorruptImage`] if section bytes lie outside the image, a directory RVA
    ///   is unmapped, or a sentinel-terminated table is not terminated
    /// - [`crate::Error::UnresolvedReference`] if an RVA-derived read leaves its host section
    pub fn parse(image: &RawImage) -> Result<Executable> {
        let data = image.data();

        let dos_header = DosHeader::read(data)?;
        let coff_offset = usize::try_from(dos_header.coff_header_offset()).unwrap_or(usize::MAX);
        let coff_header = CoffHeader::read(data, coff_offset)?;

        let mut signature_offset = dos_header.nt_signature_offset as usize;
        let nt_signature = read_le_at::<u32>(data, &mut signature_offset)?;
        if nt_signature != PE_SIGNATURE {
            log::warn!(
                "expected PE signature at offset 0x{:X}, found 0x{:08X}",
                dos_header.nt_signature_offset,
                nt_signature
            );
        }

        let optional_offset = coff_offset + COFF_HEADER_SIZE;
        let optional_header = OptionalHeader64::read(data, optional_offset)?;

        let directories_offset = optional_offset + OPTIONAL_HEADER64_FIXED_SIZE;
        let data_directories = DataDirectories::read(
            data,
            directories_offset,
            optional_header.number_of_rva_and_sizes,
        )?;

        let section_table_offset = directories_offset + data_directories.byte_len();
        let declared_offset = optional_offset + usize::from(coff_header.size_of_optional_header);
        if section_table_offset != declared_offset {
            log::warn!(
                "section table follows the data directories at 0x{section_table_offset:X}, \
                 SizeOfOptionalHeader points at 0x{declared_offset:X}"
            );
        }

        let sections = SectionTable::read(
            data,
            section_table_offset,
            coff_header.number_of_sections,
        )?;
        let section_data = sections
            .iter()
            .map(|header| SectionData::extract(data, header))
            .collect::<Result<Vec<_>>>()?;

        let imports = ImportTable::parse(&data_directories, &sections, &section_data)?;
        let exports = ExportTable::parse(&data_directories, &sections, &section_data)?;

        log::debug!(
            "decoded {} image: {} sections, {} imported DLLs, {} exported names",
            coff_header.machine_name(),
            sections.len(),
            imports.len(),
            exports.len()
        );

        Ok(Executable {
            dos_header,
            nt_signature,
            coff_header,
            optional_header,
            data_directories,
            sections,
            section_data,
            imports,
            exports,
        })
    }

    /// The DOS header.
    #[must_use]
    pub fn dos_header(&self) -> &DosHeader {
        &self.dos_header
    }

    /// The 4 bytes found at the NT signature offset, `0x00004550` in well-formed images.
    #[must_use]
    pub fn nt_signature(&self) -> u32 {
        self.nt_signature
    }

    /// The COFF file header.
    #[must_use]
    pub fn coff_header(&self) -> &CoffHeader {
        &self.coff_header
    }

    /// The PE32+ optional header.
    #[must_use]
    pub fn optional_header(&self) -> &OptionalHeader64 {
        &self.optional_header
    }

    /// The data directory table.
    #[must_use]
    pub fn data_directories(&self) -> &DataDirectories {
        &self.data_directories
    }

    /// The section table.
    #[must_use]
    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// Raw bytes of the section at table position `index`.
    #[must_use]
    pub fn section_data(&self, index: usize) -> Option<&SectionData> {
        self.section_data.get(index)
    }

    /// Raw bytes of the first section named `name`.
    #[must_use]
    pub fn section_bytes(&self, name: &str) -> Option<&[u8]> {
        self.sections
            .first(name)
            .and_then(|header| self.section_data(header.index))
            .map(SectionData::bytes)
    }

    /// The section hosting `rva`, first match in table order.
    #[must_use]
    pub fn section_containing(&self, rva: u32) -> Option<&SectionHeader> {
        rva::find_section_containing(rva, &self.sections)
    }

    /// The import table.
    #[must_use]
    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    /// The export table.
    #[must_use]
    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    /// The module name recorded in the export directory, `None` if nothing is exported.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptImage`] or [`crate::Error::UnresolvedReference`] if the
    /// name RVA cannot be read from a section.
    pub fn export_module_name(&self) -> Result<Option<String>> {
        let Some(directory) = self.exports.directory() else {
            return Ok(None);
        };
        if directory.name_rva == 0 {
            return Ok(None);
        }

        let host = SectionView::resolve(directory.name_rva, &self.sections, &self.section_data)?;
        host.read_cstring(directory.name_rva).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pe::headers::{DataDirectoryType, PE32PLUS_MAGIC, PE32_MAGIC},
        test::ImageBuilder,
        Error,
    };

    #[test]
    fn minimal_image() {
        let exe = Executable::from_mem(ImageBuilder::new().build()).unwrap();

        assert_eq!(exe.dos_header().magic, 0x5A4D);
        assert_eq!(exe.nt_signature(), PE_SIGNATURE);
        assert_eq!(exe.optional_header().magic, PE32PLUS_MAGIC);
        assert_eq!(exe.data_directories().len(), 16);
        assert!(exe.sections().is_empty());
        assert!(exe.imports().is_empty());
        assert!(exe.exports().is_empty());
        assert_eq!(exe.export_module_name().unwrap(), None);
    }

    #[test]
    fn sections_and_bytes() {
        let exe = Executable::from_mem(
            ImageBuilder::new()
                .section(b".text\0\0\0", 0x1000, b"\xC3\xCC\xCC\xCC".to_vec())
                .section(b".rdata\0\0", 0x2000, b"hello\0".to_vec())
                .build(),
        )
        .unwrap();

        assert_eq!(exe.sections().len(), 2);
        assert_eq!(exe.section_bytes(".text").unwrap(), b"\xC3\xCC\xCC\xCC");
        assert_eq!(exe.section_bytes(".rdata").unwrap(), b"hello\0");
        assert!(exe.section_bytes(".reloc").is_none());
        assert_eq!(exe.section_containing(0x2003).unwrap().name(), ".rdata");
        assert!(exe.section_containing(0x500).is_none());
    }

    #[test]
    fn imports_and_exports() {
        let exe = Executable::from_mem(
            ImageBuilder::new()
                .section(b".text\0\0\0", 0x1000, vec![0xC3])
                .imports(
                    b".idata\0\0",
                    0x3000,
                    &[("KERNEL32.dll", &["ExitProcess", "Sleep"])],
                )
                .exports(b".edata\0\0", 0x4000, "sample.dll", &["Run", "Stop"])
                .build(),
        )
        .unwrap();

        assert_eq!(
            exe.imports().functions("KERNEL32.dll").unwrap(),
            ["ExitProcess", "Sleep"]
        );
        assert_eq!(exe.exports().names(), ["Run", "Stop"]);
        assert_eq!(
            exe.export_module_name().unwrap().as_deref(),
            Some("sample.dll")
        );
        assert_eq!(
            exe.data_directories()
                .get(DataDirectoryType::ImportTable)
                .unwrap()
                .virtual_address,
            0x3000
        );
    }

    #[test]
    fn pe32_rejected() {
        let data = ImageBuilder::new().magic(PE32_MAGIC).build();
        assert!(matches!(
            Executable::from_mem(data),
            Err(Error::UnsupportedFormat { magic: PE32_MAGIC })
        ));
    }

    #[test]
    fn short_buffer() {
        assert!(matches!(
            Executable::from_mem(vec![0u8; 63]),
            Err(Error::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn lfanew_past_end() {
        let mut data = ImageBuilder::new().build();
        data[60..64].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        assert!(matches!(
            Executable::from_mem(data),
            Err(Error::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn missing_signature_still_decodes() {
        let mut data = ImageBuilder::new().build();
        let lfanew = u32::from_le_bytes([data[60], data[61], data[62], data[63]]) as usize;
        data[lfanew..lfanew + 4].copy_from_slice(b"NE\0\0");

        let exe = Executable::from_mem(data).unwrap();
        assert_eq!(exe.nt_signature(), 0x0000_454E);
    }

    #[test]
    fn section_data_past_end_is_corrupt() {
        let mut data = ImageBuilder::new()
            .section(b".text\0\0\0", 0x1000, vec![0x90; 0x10])
            .build();
        data.truncate(data.len() - 1);
        assert!(matches!(
            Executable::from_mem(data),
            Err(Error::CorruptImage { .. })
        ));
    }

    #[test]
    fn fewer_data_directories() {
        let exe = Executable::from_mem(
            ImageBuilder::new()
                .directory_count(1)
                .section(b".text\0\0\0", 0x1000, vec![0xC3])
                .build(),
        )
        .unwrap();

        assert_eq!(exe.data_directories().len(), 1);
        assert!(exe.data_directories().import_table().is_none());
        assert!(exe.imports().is_empty());
        assert_eq!(exe.sections().len(), 1);
    }
}
