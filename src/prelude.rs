//! # pescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the pescope
//! library. Import it to get quick access to everything needed for inspecting a PE32+ image or
//! COFF object file.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pescope operations
pub use crate::Error;

/// The result type used throughout pescope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Decoded PE32+ executable or DLL
pub use crate::Executable;

/// Decoded COFF object file
pub use crate::ObjectFile;

/// Low-level file parsing utilities
pub use crate::{hex_dump, Parser, RawImage};

// ================================================================================================
// Headers
// ================================================================================================

/// DOS, COFF and optional headers
pub use crate::pe::headers::{
    machine_name, magic_name, CoffHeader, DataDirectories, DataDirectory, DataDirectoryType,
    DosHeader, FileCharacteristics, OptionalHeader64,
};

// ================================================================================================
// Sections and Address Resolution
// ================================================================================================

/// Section table types
pub use crate::pe::sections::{SectionCharacteristics, SectionData, SectionHeader, SectionTable};

/// RVA to section resolution
pub use crate::pe::rva::{find_section_containing, rva_to_section_offset, SectionView};

// ================================================================================================
// Imports and Exports
// ================================================================================================

/// Import table types
pub use crate::pe::imports::{ImportDescriptor, ImportEntry, ImportLookupEntry, ImportTable};

/// Export table types
pub use crate::pe::exports::{ExportDirectory, ExportTable, ExportedFunction};
