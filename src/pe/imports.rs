//! Import directory decoding.
//!
//! The import directory is a sentinel-terminated array of 20-byte descriptors, one per imported
//! DLL. Each descriptor points at an import lookup table, itself a sentinel-terminated array of
//! 8-byte entries. Neither array has an element count, so both scans are bounded by the bytes
//! remaining in the section that hosts the import directory; running out of bytes before the
//! all-zero terminator is reported as [`crate::Error::CorruptImage`].
//!
//! All RVAs reachable from the directory (DLL names, lookup tables, hint/name entries) are
//! resolved against that same host section.

use crate::{
    file::parser::Parser,
    pe::{
        headers::DataDirectories,
        rva::SectionView,
        sections::{SectionData, SectionTable},
    },
    Result,
};

/// Size of a single import directory entry.
pub const IMPORT_DESCRIPTOR_SIZE: usize = 20;
/// Size of a single PE32+ import lookup table entry.
pub const IMPORT_LOOKUP_ENTRY_SIZE: usize = 8;
/// Size of the ordinal hint that precedes a function name in a hint/name entry.
pub const HINT_SIZE: u32 = 2;

/// One 20-byte import directory entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportDescriptor {
    /// RVA of the import lookup table
    pub import_lookup_table_rva: u32,
    /// Zero until bound, then the timestamp of the bound DLL
    pub time_date_stamp: u32,
    /// Index of the first forwarder reference
    pub forwarder_chain: u32,
    /// RVA of the null-terminated DLL name
    pub name_rva: u32,
    /// RVA of the import address table
    pub import_address_table_rva: u32,
}

impl ImportDescriptor {
    /// Decodes one descriptor from the parser's current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if fewer than 20 bytes remain.
    pub fn read(parser: &mut Parser<'_>) -> Result<ImportDescriptor> {
        parser.ensure_remaining(IMPORT_DESCRIPTOR_SIZE)?;

        Ok(ImportDescriptor {
            import_lookup_table_rva: parser.read_le::<u32>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            forwarder_chain: parser.read_le::<u32>()?,
            name_rva: parser.read_le::<u32>()?,
            import_address_table_rva: parser.read_le::<u32>()?,
        })
    }

    /// Returns `true` for the all-zero terminating entry.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        *self == ImportDescriptor::default()
    }

    /// The table to walk for function names: the lookup table, or the import address table
    /// when the lookup table RVA is zero (as some linkers emit).
    #[must_use]
    pub fn lookup_rva(&self) -> u32 {
        if self.import_lookup_table_rva != 0 {
            self.import_lookup_table_rva
        } else {
            self.import_address_table_rva
        }
    }
}

/// One 8-byte import lookup table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLookupEntry(pub u64);

impl ImportLookupEntry {
    /// Bit 63, set when the function is imported by ordinal.
    pub const ORDINAL_FLAG: u64 = 1 << 63;
    /// Bits 0..=62, the ordinal number or the hint/name RVA.
    pub const VALUE_MASK: u64 = !Self::ORDINAL_FLAG;

    /// Returns `true` if the entry imports by ordinal.
    #[must_use]
    pub fn is_ordinal(&self) -> bool {
        self.0 & Self::ORDINAL_FLAG != 0
    }

    /// The low 63 bits of the entry.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0 & Self::VALUE_MASK
    }

    /// Returns `true` for the terminating entry (flag clear, value zero).
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.0 == 0
    }
}

/// Functions imported from one DLL, in lookup table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportEntry {
    /// The DLL name as stored in the image
    pub dll: String,
    /// Imported function names; ordinal imports appear as `#<ordinal>`
    pub functions: Vec<String>,
}

/// DLL name to imported functions, in import directory order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    entries: Vec<ImportEntry>,
}

impl ImportTable {
    /// Walks the import directory referenced by data directory slot 1.
    ///
    /// A missing slot or a zero RVA yields an empty table. `section_data` holds the raw bytes
    /// of every section in table order.
    ///
    /// # Errors
    /// - [`crate::Error::CorruptImage`] if the directory RVA resolves to no section, or if the
    ///   directory or a lookup table is not terminated within the host section
    /// - [`crate::Error::UnresolvedReference`] if a name or table RVA falls outside the host
    ///   section's bytes
    pub fn parse(
        directories: &DataDirectories,
        sections: &SectionTable,
        section_data: &[SectionData],
    ) -> Result<ImportTable> {
        let mut table = ImportTable::default();

        let Some(directory) = directories.import_table().filter(|d| d.is_present()) else {
            return Ok(table);
        };

        let host = SectionView::resolve(directory.virtual_address, sections, section_data)?;
        let mut parser = Parser::new(host.tail(directory.virtual_address)?);

        loop {
            if parser.remaining() < IMPORT_DESCRIPTOR_SIZE {
                return Err(corrupt_error!(
                    "Import directory at RVA 0x{:08X} is not terminated within section '{}'",
                    directory.virtual_address,
                    host.header().name()
                ));
            }

            let descriptor = ImportDescriptor::read(&mut parser)?;
            if descriptor.is_sentinel() {
                break;
            }

            let dll = host.read_cstring(descriptor.name_rva)?;
            let functions = read_lookup_table(&host, &descriptor, &dll)?;
            log::debug!("{dll}: {} imported functions", functions.len());

            table.insert(dll, functions);
        }

        Ok(table)
    }

    /// Appends `functions` under `dll`, extending the existing entry if the DLL already
    /// appeared earlier in the directory.
    fn insert(&mut self, dll: String, functions: Vec<String>) {
        match self.entries.iter_mut().find(|entry| entry.dll == dll) {
            Some(entry) => entry.functions.extend(functions),
            None => self.entries.push(ImportEntry { dll, functions }),
        }
    }

    /// The entry for `dll`, matched exactly.
    #[must_use]
    pub fn get(&self, dll: &str) -> Option<&ImportEntry> {
        self.entries.iter().find(|entry| entry.dll == dll)
    }

    /// Imported function names for `dll`.
    #[must_use]
    pub fn functions(&self, dll: &str) -> Option<&[String]> {
        self.get(dll).map(|entry| entry.functions.as_slice())
    }

    /// Iterates the entries in import directory order.
    pub fn iter(&self) -> std::slice::Iter<'_, ImportEntry> {
        self.entries.iter()
    }

    /// DLL names in import directory order.
    #[must_use]
    pub fn dll_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.dll.as_str()).collect()
    }

    /// Total number of imported functions across all DLLs.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.functions.len()).sum()
    }

    /// Number of imported DLLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is imported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ImportTable {
    type Item = &'a ImportEntry;
    type IntoIter = std::slice::Iter<'a, ImportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn read_lookup_table(
    host: &SectionView<'_>,
    descriptor: &ImportDescriptor,
    dll: &str,
) -> Result<Vec<String>> {
    let lookup_rva = descriptor.lookup_rva();
    if lookup_rva == 0 {
        log::warn!("{dll}: import descriptor has neither a lookup table nor an address table");
        return Ok(Vec::new());
    }

    let mut parser = Parser::new(host.tail(lookup_rva)?);
    let mut functions = Vec::new();

    loop {
        if parser.remaining() < IMPORT_LOOKUP_ENTRY_SIZE {
            return Err(corrupt_error!(
                "Import lookup table for {} at RVA 0x{:08X} is not terminated within section '{}'",
                dll,
                lookup_rva,
                host.header().name()
            ));
        }

        let entry = ImportLookupEntry(parser.read_le::<u64>()?);
        if entry.is_sentinel() {
            break;
        }

        if entry.is_ordinal() {
            functions.push(format!("#{}", entry.value()));
            continue;
        }

        let Some(name_rva) = u32::try_from(entry.value())
            .ok()
            .and_then(|rva| rva.checked_add(HINT_SIZE))
        else {
            return Err(corrupt_error!(
                "Import lookup entry 0x{:016X} for {} is not a valid hint/name RVA",
                entry.0,
                dll
            ));
        };

        functions.push(host.read_cstring(name_rva)?);
    }

    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pe::{headers::DataDirectory, sections::SectionHeader},
        Error,
    };

    const IDATA_RVA: u32 = 0x3000;

    /// One `.idata` section at `IDATA_RVA` whose raw bytes are `bytes`.
    fn idata(bytes: Vec<u8>, virtual_size: u32) -> (SectionTable, Vec<SectionData>) {
        let header = SectionHeader {
            index: 0,
            raw_name: *b".idata\0\0",
            virtual_size,
            virtual_address: IDATA_RVA,
            size_of_raw_data: bytes.len() as u32,
            pointer_to_raw_data: 0,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: 0,
        };
        let data = SectionData::extract(&bytes, &header).unwrap();
        (SectionTable::from_headers(vec![header]), vec![data])
    }

    fn import_dir(rva: u32) -> DataDirectories {
        DataDirectories::from_entries(vec![
            DataDirectory::default(),
            DataDirectory {
                virtual_address: rva,
                size: 0x28,
            },
        ])
    }

    fn descriptor(ilt: u32, name: u32, iat: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        for field in [ilt, 0, 0, name, iat] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    fn put(buf: &mut Vec<u8>, at: usize, bytes: &[u8]) {
        if buf.len() < at + bytes.len() {
            buf.resize(at + bytes.len(), 0);
        }
        buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// Two descriptors at offset 0; lookup tables at 0x40/0x60, names at 0x80.., hint/name
    /// entries at 0xA0...
    fn two_dll_section() -> Vec<u8> {
        let rva = |offset: u32| IDATA_RVA + offset;
        let mut buf = Vec::new();
        put(&mut buf, 0x00, &descriptor(rva(0x40), rva(0x80), rva(0x40)));
        put(&mut buf, 0x14, &descriptor(rva(0x60), rva(0x90), rva(0x60)));
        put(&mut buf, 0x28, &[0u8; 20]);

        put(&mut buf, 0x40, &u64::from(rva(0xA0)).to_le_bytes());
        put(&mut buf, 0x48, &u64::from(rva(0xB0)).to_le_bytes());
        put(&mut buf, 0x50, &0u64.to_le_bytes());

        put(&mut buf, 0x60, &(ImportLookupEntry::ORDINAL_FLAG | 17).to_le_bytes());
        put(&mut buf, 0x68, &u64::from(rva(0xC0)).to_le_bytes());
        put(&mut buf, 0x70, &0u64.to_le_bytes());

        put(&mut buf, 0x80, b"KERNEL32.dll\0");
        put(&mut buf, 0x90, b"USER32.dll\0");
        put(&mut buf, 0xA0, b"\x01\x00ExitProcess\0");
        put(&mut buf, 0xB0, b"\x02\x00GetLastError\0");
        put(&mut buf, 0xC0, b"\x00\x00MessageBoxW\0");
        buf.resize(0xE0, 0);
        buf
    }

    #[test]
    fn lookup_entry_bits() {
        let by_name = ImportLookupEntry(0x0000_0000_0000_3040);
        assert!(!by_name.is_ordinal());
        assert_eq!(by_name.value(), 0x3040);

        let by_ordinal = ImportLookupEntry(0x8000_0000_0000_0010);
        assert!(by_ordinal.is_ordinal());
        assert_eq!(by_ordinal.value(), 0x10);
        assert!(!by_ordinal.is_sentinel());

        assert!(ImportLookupEntry(0).is_sentinel());
        assert!(!ImportLookupEntry(ImportLookupEntry::ORDINAL_FLAG).is_sentinel());
    }

    #[test]
    fn parse_two_dlls() {
        let (sections, data) = idata(two_dll_section(), 0x100);
        let imports = ImportTable::parse(&import_dir(IDATA_RVA), &sections, &data).unwrap();

        assert_eq!(imports.dll_names(), ["KERNEL32.dll", "USER32.dll"]);
        assert_eq!(
            imports.functions("KERNEL32.dll").unwrap(),
            ["ExitProcess", "GetLastError"]
        );
        assert_eq!(
            imports.functions("USER32.dll").unwrap(),
            ["#17", "MessageBoxW"]
        );
        assert_eq!(imports.function_count(), 4);
        assert!(imports.get("ADVAPI32.dll").is_none());
    }

    #[test]
    fn missing_directory_is_empty() {
        let (sections, data) = idata(two_dll_section(), 0x100);

        let none = DataDirectories::from_entries(vec![DataDirectory::default()]);
        assert!(ImportTable::parse(&none, &sections, &data).unwrap().is_empty());

        let zero = import_dir(0);
        assert!(ImportTable::parse(&zero, &sections, &data).unwrap().is_empty());
    }

    #[test]
    fn sentinel_first_is_empty() {
        let (sections, data) = idata(vec![0u8; 0x20], 0x20);
        let imports = ImportTable::parse(&import_dir(IDATA_RVA), &sections, &data).unwrap();
        assert!(imports.is_empty());
    }

    #[test]
    fn unresolved_directory_is_corrupt() {
        let (sections, data) = idata(two_dll_section(), 0x100);
        assert!(matches!(
            ImportTable::parse(&import_dir(0x9000), &sections, &data),
            Err(Error::CorruptImage { .. })
        ));
    }

    #[test]
    fn unterminated_directory_is_corrupt() {
        let rva = |offset: u32| IDATA_RVA + offset;
        let mut buf = Vec::new();
        put(&mut buf, 0x00, b"A.dll\0");
        put(&mut buf, 0x10, b"\0\0Fn\0");
        put(&mut buf, 0x18, &u64::from(rva(0x10)).to_le_bytes());
        put(&mut buf, 0x20, &0u64.to_le_bytes());
        put(&mut buf, 0x28, &descriptor(rva(0x18), rva(0x00), 0));
        let (sections, data) = idata(buf, 0x100);

        assert!(matches!(
            ImportTable::parse(&import_dir(rva(0x28)), &sections, &data),
            Err(Error::CorruptImage { .. })
        ));
    }

    #[test]
    fn directory_without_room_for_sentinel_is_corrupt() {
        let (sections, data) = idata(vec![0u8; 19], 0x100);
        assert!(matches!(
            ImportTable::parse(&import_dir(IDATA_RVA), &sections, &data),
            Err(Error::CorruptImage { .. })
        ));
    }

    #[test]
    fn unterminated_lookup_table_is_corrupt() {
        let rva = |offset: u32| IDATA_RVA + offset;
        let mut buf = Vec::new();
        put(&mut buf, 0x00, b"A.dll\0");
        put(&mut buf, 0x10, b"\0\0Fn\0");
        put(&mut buf, 0x20, &descriptor(rva(0x48), rva(0x00), 0));
        put(&mut buf, 0x34, &[0u8; 20]);
        put(&mut buf, 0x48, &u64::from(rva(0x10)).to_le_bytes());
        put(&mut buf, 0x50, &u64::from(rva(0x10)).to_le_bytes());
        let (sections, data) = idata(buf, 0x100);

        assert!(matches!(
            ImportTable::parse(&import_dir(rva(0x20)), &sections, &data),
            Err(Error::CorruptImage { .. })
        ));
    }

    #[test]
    fn dll_name_outside_section_is_unresolved() {
        let mut buf = two_dll_section();
        put(&mut buf, 0x00, &descriptor(IDATA_RVA + 0x40, 0x8000, 0));
        let (sections, data) = idata(buf, 0x100);

        assert!(matches!(
            ImportTable::parse(&import_dir(IDATA_RVA), &sections, &data),
            Err(Error::UnresolvedReference { rva: 0x8000, .. })
        ));
    }

    #[test]
    fn address_table_fallback() {
        let mut buf = two_dll_section();
        put(&mut buf, 0x00, &descriptor(0, IDATA_RVA + 0x80, IDATA_RVA + 0x40));
        let (sections, data) = idata(buf, 0x100);

        let imports = ImportTable::parse(&import_dir(IDATA_RVA), &sections, &data).unwrap();
        assert_eq!(
            imports.functions("KERNEL32.dll").unwrap(),
            ["ExitProcess", "GetLastError"]
        );
    }

    #[test]
    fn repeated_dll_is_merged() {
        let mut buf = two_dll_section();
        put(&mut buf, 0x14, &descriptor(IDATA_RVA + 0x60, IDATA_RVA + 0x80, 0));
        let (sections, data) = idata(buf, 0x100);

        let imports = ImportTable::parse(&import_dir(IDATA_RVA), &sections, &data).unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(
            imports.functions("KERNEL32.dll").unwrap(),
            ["ExitProcess", "GetLastError", "#17", "MessageBoxW"]
        );
    }
}
