//! Export directory decoding.
//!
//! Only the export name pointer table is walked: it holds `NumberOfNamePointers` RVAs, each
//! pointing at a null-terminated function name. Ordinals and export addresses are kept on the
//! decoded [`ExportDirectory`] as raw values but are not resolved.

use crate::{
    file::parser::Parser,
    pe::{
        headers::DataDirectories,
        rva::SectionView,
        sections::{SectionData, SectionTable},
    },
    Result,
};

/// Size of the export directory table.
pub const EXPORT_DIRECTORY_SIZE: usize = 40;
/// Size of one export name pointer.
pub const NAME_POINTER_SIZE: usize = 4;

/// The 40-byte export directory table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportDirectory {
    /// Reserved, must be zero
    pub characteristics: u32,
    /// Time and date the export data was created
    pub time_date_stamp: u32,
    /// Major version number
    pub major_version: u16,
    /// Minor version number
    pub minor_version: u16,
    /// RVA of the ASCII name of the DLL
    pub name_rva: u32,
    /// Starting ordinal number for exports in this image
    pub ordinal_base: u32,
    /// Number of entries in the export address table
    pub number_of_functions: u32,
    /// Number of entries in the name pointer table
    pub number_of_names: u32,
    /// RVA of the export address table
    pub address_of_functions: u32,
    /// RVA of the export name pointer table
    pub address_of_names: u32,
    /// RVA of the ordinal table
    pub address_of_name_ordinals: u32,
}

impl ExportDirectory {
    /// Decodes the export directory from a 40-byte slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if `data` is shorter than 40 bytes.
    pub fn read(data: &[u8]) -> Result<ExportDirectory> {
        let mut parser = Parser::new(data);
        parser.ensure_remaining(EXPORT_DIRECTORY_SIZE)?;

        Ok(ExportDirectory {
            characteristics: parser.read_le::<u32>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            major_version: parser.read_le::<u16>()?,
            minor_version: parser.read_le::<u16>()?,
            name_rva: parser.read_le::<u32>()?,
            ordinal_base: parser.read_le::<u32>()?,
            number_of_functions: parser.read_le::<u32>()?,
            number_of_names: parser.read_le::<u32>()?,
            address_of_functions: parser.read_le::<u32>()?,
            address_of_names: parser.read_le::<u32>()?,
            address_of_name_ordinals: parser.read_le::<u32>()?,
        })
    }
}

/// A function exported by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportedFunction {
    /// The exported name
    pub name: String,
}

/// The decoded export directory and its exported names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    directory: Option<ExportDirectory>,
    functions: Vec<ExportedFunction>,
}

impl ExportTable {
    /// Walks the export directory referenced by data directory slot 0.
    ///
    /// A missing slot or a zero RVA yields an empty table. `section_data` holds the raw bytes
    /// of every section in table order.
    ///
    /// # Errors
    /// - [`crate::Error::CorruptImage`] if the directory RVA resolves to no section
    /// - [`crate::Error::UnresolvedReference`] if the directory, the name pointer table or a
    ///   name falls outside the host section's bytes
    pub fn parse(
        directories: &DataDirectories,
        sections: &SectionTable,
        section_data: &[SectionData],
    ) -> Result<ExportTable> {
        let Some(entry) = directories.export_table().filter(|d| d.is_present()) else {
            return Ok(ExportTable::default());
        };

        let host = SectionView::resolve(entry.virtual_address, sections, section_data)?;
        let directory =
            ExportDirectory::read(host.slice(entry.virtual_address, EXPORT_DIRECTORY_SIZE)?)?;

        let count = directory.number_of_names as usize;
        if count == 0 {
            return Ok(ExportTable {
                directory: Some(directory),
                functions: Vec::new(),
            });
        }

        let Some(table_len) = count.checked_mul(NAME_POINTER_SIZE) else {
            return Err(corrupt_error!("Export name pointer count {} overflows", count));
        };
        let mut parser = Parser::new(host.slice(directory.address_of_names, table_len)?);

        let mut functions = Vec::with_capacity(count);
        for _ in 0..count {
            let name_rva = parser.read_le::<u32>()?;
            functions.push(ExportedFunction {
                name: host.read_cstring(name_rva)?,
            });
        }

        log::debug!(
            "decoded {} exported names from section '{}'",
            functions.len(),
            host.header().name()
        );

        Ok(ExportTable {
            directory: Some(directory),
            functions,
        })
    }

    /// The decoded export directory, `None` if the image exports nothing.
    #[must_use]
    pub fn directory(&self) -> Option<&ExportDirectory> {
        self.directory.as_ref()
    }

    /// Exported functions in name pointer table order.
    #[must_use]
    pub fn functions(&self) -> &[ExportedFunction] {
        &self.functions
    }

    /// Exported names in name pointer table order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    /// Iterates the exported functions.
    pub fn iter(&self) -> std::slice::Iter<'_, ExportedFunction> {
        self.functions.iter()
    }

    /// Number of exported names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if nothing is exported by name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExportTable {
    type Item = &'a ExportedFunction;
    type IntoIter = std::slice::Iter<'a, ExportedFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.iter()
    }
}
