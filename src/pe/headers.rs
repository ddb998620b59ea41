//! DOS header, COFF file header, PE32+ optional header and data directories.
//!
//! Each header is decoded field by field at a computed offset with a [`crate::Parser`]; nothing
//! is reinterpreted in place. The offsets chain as follows:
//!
//! ```text
//! 0x00                      DOS header (64 bytes, e_lfanew at byte 60)
//! e_lfanew                  "PE\0\0" signature (4 bytes)
//! e_lfanew + 4              COFF file header (20 bytes)
//! e_lfanew + 24             optional header, fixed part (112 bytes for PE32+)
//! e_lfanew + 136            data directories (NumberOfRvaAndSizes x 8 bytes)
//! ```
//!
//! Object files start directly with the COFF file header at offset 0 and have no optional
//! header; see [`crate::pe::object`].

use bitflags::bitflags;
use strum::{Display, EnumCount, EnumIter, FromRepr};

use crate::{file::parser::Parser, Result};

/// Size of the DOS header in bytes.
pub const DOS_HEADER_SIZE: usize = 64;
/// Offset of `e_lfanew`, the file offset of the NT signature, inside the DOS header.
pub const NT_SIGNATURE_OFFSET_FIELD: usize = 60;
/// Size of the `"PE\0\0"` signature preceding the COFF file header.
pub const PE_SIGNATURE_SIZE: usize = 4;
/// The `"PE\0\0"` signature as a little-endian `u32`.
pub const PE_SIGNATURE: u32 = 0x0000_4550;
/// Size of the COFF file header in bytes.
pub const COFF_HEADER_SIZE: usize = 20;
/// Size of the fixed part of the PE32+ optional header, up to and including
/// `NumberOfRvaAndSizes`.
pub const OPTIONAL_HEADER64_FIXED_SIZE: usize = 112;
/// Size of a single data directory entry.
pub const DATA_DIRECTORY_SIZE: usize = 8;
/// Number of data directory slots defined by the format.
pub const STANDARD_DATA_DIRECTORY_COUNT: usize = 16;

/// Optional header magic for PE32 images.
pub const PE32_MAGIC: u16 = 0x010B;
/// Optional header magic for PE32+ images.
pub const PE32PLUS_MAGIC: u16 = 0x020B;
/// Optional header magic for ROM images.
pub const ROM_MAGIC: u16 = 0x0107;

/// Machine type for Intel 386 and compatibles.
pub const MACHINE_I386: u16 = 0x014C;
/// Machine type for Intel Itanium.
pub const MACHINE_IA64: u16 = 0x0200;
/// Machine type for x64.
pub const MACHINE_AMD64: u16 = 0x8664;

/// Unused bytes between `ImageBase` and `NumberOfRvaAndSizes` in the PE32+ optional header.
const OPTIONAL_HEADER64_SKIPPED: usize = 76;

/// Returns a human-readable name for a COFF machine type.
#[must_use]
pub fn machine_name(machine: u16) -> &'static str {
    match machine {
        MACHINE_I386 => "Intel 386",
        MACHINE_IA64 => "Intel Itanium",
        MACHINE_AMD64 => "AMD64",
        _ => "<Unknown architecture>",
    }
}

/// Returns a human-readable name for an optional header magic.
#[must_use]
pub fn magic_name(magic: u16) -> &'static str {
    match magic {
        PE32_MAGIC => "PE32",
        PE32PLUS_MAGIC => "PE32+",
        ROM_MAGIC => "ROM image",
        _ => "<Unknown signature>",
    }
}

/// The DOS stub header.
///
/// Only `e_lfanew` is meaningful for locating the PE headers; the `MZ` magic is kept for
/// display and is not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosHeader {
    /// The `e_magic` field, `0x5A4D` ("MZ") in well-formed images
    pub magic: u16,
    /// File offset of the `"PE\0\0"` signature (`e_lfanew`)
    pub nt_signature_offset: u32,
}

impl DosHeader {
    /// Decodes the 64-byte DOS header at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if `data` is shorter than 64 bytes.
    pub fn read(data: &[u8]) -> Result<DosHeader> {
        if data.len() < DOS_HEADER_SIZE {
            return Err(truncated_error!(0, DOS_HEADER_SIZE, data.len()));
        }

        let mut parser = Parser::new(&data[..DOS_HEADER_SIZE]);
        let magic = parser.read_le::<u16>()?;
        parser.seek(NT_SIGNATURE_OFFSET_FIELD)?;
        let nt_signature_offset = parser.read_le::<u32>()?;

        Ok(DosHeader {
            magic,
            nt_signature_offset,
        })
    }

    /// File offset of the COFF file header, just past the 4-byte NT signature.
    ///
    /// Computed in `u64` so a hostile `e_lfanew` cannot overflow.
    #[must_use]
    pub fn coff_header_offset(&self) -> u64 {
        u64::from(self.nt_signature_offset) + PE_SIGNATURE_SIZE as u64
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flags of the COFF file header `Characteristics` field
    pub struct FileCharacteristics : u16 {
        /// The image does not contain base relocations
        const RELOCS_STRIPPED = 0x0001;
        /// The image is valid and can be run
        const EXECUTABLE_IMAGE = 0x0002;
        /// COFF line numbers have been removed (deprecated)
        const LINE_NUMS_STRIPPED = 0x0004;
        /// COFF local symbols have been removed (deprecated)
        const LOCAL_SYMS_STRIPPED = 0x0008;
        /// Aggressively trim working set (obsolete)
        const AGGRESSIVE_WS_TRIM = 0x0010;
        /// The application can handle addresses above 2 GB
        const LARGE_ADDRESS_AWARE = 0x0020;
        /// Little endian (deprecated)
        const BYTES_REVERSED_LO = 0x0080;
        /// The machine is based on a 32-bit-word architecture
        const MACHINE_32BIT = 0x0100;
        /// Debugging information is removed from the image file
        const DEBUG_STRIPPED = 0x0200;
        /// Copy the image to swap if it is on removable media
        const REMOVABLE_RUN_FROM_SWAP = 0x0400;
        /// Copy the image to swap if it is on network media
        const NET_RUN_FROM_SWAP = 0x0800;
        /// The image file is a system file
        const SYSTEM = 0x1000;
        /// The image file is a dynamic-link library
        const DLL = 0x2000;
        /// Run only on a uniprocessor machine
        const UP_SYSTEM_ONLY = 0x4000;
        /// Big endian (deprecated)
        const BYTES_REVERSED_HI = 0x8000;
    }
}

/// The COFF file header shared by PE images and object files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoffHeader {
    /// Target machine architecture
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Seconds since 1970-01-01 00:00 UTC when the file was created
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table, or zero
    pub pointer_to_symbol_table: u32,
    /// Number of entries in the symbol table
    pub number_of_symbols: u32,
    /// Size of the optional header that follows, zero for object files
    pub size_of_optional_header: u16,
    /// Raw `Characteristics` bits, see [`CoffHeader::characteristics`]
    pub characteristics: u16,
}

impl CoffHeader {
    /// Decodes the 20-byte COFF file header at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the record extends past the end of `data`.
    pub fn read(data: &[u8], offset: usize) -> Result<CoffHeader> {
        if offset > data.len() {
            return Err(truncated_error!(offset, COFF_HEADER_SIZE, data.len()));
        }
        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        parser.ensure_remaining(COFF_HEADER_SIZE)?;

        Ok(CoffHeader {
            machine: parser.read_le::<u16>()?,
            number_of_sections: parser.read_le::<u16>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            pointer_to_symbol_table: parser.read_le::<u32>()?,
            number_of_symbols: parser.read_le::<u32>()?,
            size_of_optional_header: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u16>()?,
        })
    }

    /// The `Characteristics` field as typed flags; unknown bits are retained.
    #[must_use]
    pub fn characteristics(&self) -> FileCharacteristics {
        FileCharacteristics::from_bits_retain(self.characteristics)
    }

    /// Human-readable name of [`CoffHeader::machine`].
    #[must_use]
    pub fn machine_name(&self) -> &'static str {
        machine_name(self.machine)
    }
}

/// The fixed part of the PE32+ optional header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalHeader64 {
    /// Always [`PE32PLUS_MAGIC`] for a successfully decoded header
    pub magic: u16,
    /// Linker major version
    pub major_linker_version: u8,
    /// Linker minor version
    pub minor_linker_version: u8,
    /// Total size of all code sections
    pub size_of_code: u32,
    /// Total size of all initialized data sections
    pub size_of_initialized_data: u32,
    /// Total size of all uninitialized data sections
    pub size_of_uninitialized_data: u32,
    /// RVA of the entry point, zero if none
    pub address_of_entry_point: u32,
    /// RVA of the start of the code section
    pub base_of_code: u32,
    /// Preferred load address of the image
    pub image_base: u64,
    /// Number of data directory entries that follow the fixed part
    pub number_of_rva_and_sizes: u32,
}

impl OptionalHeader64 {
    /// Decodes the PE32+ optional header at `offset`.
    ///
    /// The magic is read and checked before anything else, so a PE32 or ROM image is rejected
    /// even when the rest of its (differently laid out) header would not fit.
    ///
    /// # Errors
    /// - [`crate::Error::TruncatedBuffer`] if the magic or the fixed part extends past `data`
    /// - [`crate::Error::UnsupportedFormat`] if the magic is not [`PE32PLUS_MAGIC`]
    pub fn read(data: &[u8], offset: usize) -> Result<OptionalHeader64> {
        if offset > data.len() {
            return Err(truncated_error!(offset, 2, data.len()));
        }
        let mut parser = Parser::new(data);
        parser.seek(offset)?;

        let magic = parser.read_le::<u16>()?;
        if magic != PE32PLUS_MAGIC {
            return Err(crate::Error::UnsupportedFormat { magic });
        }

        parser.ensure_remaining(OPTIONAL_HEADER64_FIXED_SIZE - 2)?;

        let major_linker_version = parser.read_le::<u8>()?;
        let minor_linker_version = parser.read_le::<u8>()?;
        let size_of_code = parser.read_le::<u32>()?;
        let size_of_initialized_data = parser.read_le::<u32>()?;
        let size_of_uninitialized_data = parser.read_le::<u32>()?;
        let address_of_entry_point = parser.read_le::<u32>()?;
        let base_of_code = parser.read_le::<u32>()?;
        let image_base = parser.read_le::<u64>()?;
        parser.advance_by(OPTIONAL_HEADER64_SKIPPED)?;
        let number_of_rva_and_sizes = parser.read_le::<u32>()?;

        Ok(OptionalHeader64 {
            magic,
            major_linker_version,
            minor_linker_version,
            size_of_code,
            size_of_initialized_data,
            size_of_uninitialized_data,
            address_of_entry_point,
            base_of_code,
            image_base,
            number_of_rva_and_sizes,
        })
    }

    /// Human-readable name of [`OptionalHeader64::magic`].
    #[must_use]
    pub fn magic_name(&self) -> &'static str {
        magic_name(self.magic)
    }
}

/// The fixed data directory slots.
///
/// Slot indices are defined by the format; index 0 is always the export table and index 1
/// the import table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, FromRepr, Display,
)]
#[repr(u8)]
pub enum DataDirectoryType {
    /// Export table
    #[strum(to_string = "Export Directory")]
    ExportTable = 0,
    /// Import table
    #[strum(to_string = "Import Directory")]
    ImportTable = 1,
    /// Resource table
    #[strum(to_string = "Resource Directory")]
    ResourceTable = 2,
    /// Exception table
    #[strum(to_string = "Exception Directory")]
    ExceptionTable = 3,
    /// Attribute certificate table
    #[strum(to_string = "Security Directory")]
    CertificateTable = 4,
    /// Base relocation table
    #[strum(to_string = "Base Relocation Table")]
    BaseRelocationTable = 5,
    /// Debug data
    #[strum(to_string = "Debug Directory")]
    Debug = 6,
    /// Reserved, architecture data
    #[strum(to_string = "Architecture-Specific Data")]
    Architecture = 7,
    /// Global pointer register value
    #[strum(to_string = "RVA of Global Pointer Register")]
    GlobalPtr = 8,
    /// Thread local storage table
    #[strum(to_string = "Thread-Local Storage Directory")]
    TlsTable = 9,
    /// Load configuration table
    #[strum(to_string = "Load Configuration Directory")]
    LoadConfigTable = 10,
    /// Bound import table
    #[strum(to_string = "Bound Import Directory in headers")]
    BoundImport = 11,
    /// Import address table
    #[strum(to_string = "Import Address Table")]
    ImportAddressTable = 12,
    /// Delay import descriptor
    #[strum(to_string = "Delay Import Descriptor")]
    DelayImportDescriptor = 13,
    /// CLR runtime header
    #[strum(to_string = "CLR header")]
    ClrRuntimeHeader = 14,
    /// Reserved, must be zero
    #[strum(to_string = "Reserved")]
    Reserved = 15,
}

impl DataDirectoryType {
    /// Position of this slot in the data directory table.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up the slot at `index`, `None` past the 16 defined slots.
    #[must_use]
    pub fn from_index(index: usize) -> Option<DataDirectoryType> {
        u8::try_from(index).ok().and_then(Self::from_repr)
    }

    /// Description of the slot at `index`, including indices past the defined slots.
    #[must_use]
    pub fn describe(index: usize) -> String {
        match Self::from_index(index) {
            Some(kind) => kind.to_string(),
            None => "<Unknown data directory>".to_string(),
        }
    }
}

/// A single (RVA, size) data directory entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    /// RVA of the referenced structure, zero when absent
    pub virtual_address: u32,
    /// Size of the referenced structure in bytes
    pub size: u32,
}

impl DataDirectory {
    /// Returns `true` when the directory points somewhere.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0
    }
}

/// The data directory table, exactly as many entries as the optional header declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDirectories {
    entries: Vec<DataDirectory>,
}

impl DataDirectories {
    /// Decodes `count` consecutive 8-byte (RVA, size) pairs at `offset`.
    ///
    /// The whole table is bounds-checked before anything is allocated, so a hostile count
    /// cannot trigger a large allocation.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the table extends past the end of `data`.
    pub fn read(data: &[u8], offset: usize, count: u32) -> Result<DataDirectories> {
        let count = count as usize;
        let Some(table_len) = count.checked_mul(DATA_DIRECTORY_SIZE) else {
            return Err(truncated_error!(offset, usize::MAX, data.len()));
        };
        if offset > data.len() {
            return Err(truncated_error!(offset, table_len, data.len()));
        }

        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        parser.ensure_remaining(table_len)?;

        if count > STANDARD_DATA_DIRECTORY_COUNT {
            log::warn!(
                "optional header declares {count} data directories, more than the {STANDARD_DATA_DIRECTORY_COUNT} defined slots"
            );
        }

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(DataDirectory {
                virtual_address: parser.read_le::<u32>()?,
                size: parser.read_le::<u32>()?,
            });
        }

        Ok(DataDirectories { entries })
    }

    /// Builds a table from already decoded entries.
    #[must_use]
    pub fn from_entries(entries: Vec<DataDirectory>) -> DataDirectories {
        DataDirectories { entries }
    }

    /// Returns the entry for `kind`, `None` if the table is too short to contain it.
    #[must_use]
    pub fn get(&self, kind: DataDirectoryType) -> Option<&DataDirectory> {
        self.entries.get(kind.index())
    }

    /// The export table entry, if the table has slot 0.
    #[must_use]
    pub fn export_table(&self) -> Option<&DataDirectory> {
        self.get(DataDirectoryType::ExportTable)
    }

    /// The import table entry, if the table has slot 1.
    #[must_use]
    pub fn import_table(&self) -> Option<&DataDirectory> {
        self.get(DataDirectoryType::ImportTable)
    }

    /// Iterates all entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &DataDirectory> {
        self.entries.iter()
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the table on disk.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.entries.len() * DATA_DIRECTORY_SIZE
    }
}
