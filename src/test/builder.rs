//! Byte-level builders for synthetic PE32+ images and COFF object files.
//!
//! Only the standard library is used here so that integration tests and benchmarks can pull
//! this file in with `#[path]` and exercise the public API against the same fixtures.
#![allow(dead_code)]

const LFANEW: usize = 0x80;
const FILE_ALIGNMENT: usize = 0x200;
const COFF_SIZE: usize = 20;
const OPTIONAL_FIXED_SIZE: usize = 112;
const SECTION_SIZE: usize = 40;

/// Characteristics used for generated image sections: initialized data, readable.
pub const DATA_CHARACTERISTICS: u32 = 0x4000_0040;
/// Characteristics used for generated code sections: code, executable, readable.
pub const CODE_CHARACTERISTICS: u32 = 0x6000_0020;

struct BuiltSection {
    name: [u8; 8],
    virtual_address: u32,
    virtual_size: u32,
    characteristics: u32,
    bytes: Vec<u8>,
}

/// Assembles a PE32+ image: DOS header, `"PE\0\0"`, COFF header, optional header, data
/// directories, section table and file-aligned section bytes, in that order.
pub struct ImageBuilder {
    machine: u16,
    magic: u16,
    time_date_stamp: u32,
    characteristics: u16,
    linker: (u8, u8),
    entry_point: u32,
    base_of_code: u32,
    image_base: u64,
    directory_count: u32,
    directories: [(u32, u32); 16],
    sections: Vec<BuiltSection>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        ImageBuilder::new()
    }
}

impl ImageBuilder {
    pub fn new() -> ImageBuilder {
        ImageBuilder {
            machine: 0x8664,
            magic: 0x020B,
            time_date_stamp: 0x6502_0304,
            characteristics: 0x0022,
            linker: (14, 36),
            entry_point: 0x1000,
            base_of_code: 0x1000,
            image_base: 0x1_4000_0000,
            directory_count: 16,
            directories: [(0, 0); 16],
            sections: Vec::new(),
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn magic(mut self, magic: u16) -> Self {
        self.magic = magic;
        self
    }

    pub fn time_date_stamp(mut self, stamp: u32) -> Self {
        self.time_date_stamp = stamp;
        self
    }

    pub fn characteristics(mut self, characteristics: u16) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn linker(mut self, major: u8, minor: u8) -> Self {
        self.linker = (major, minor);
        self
    }

    pub fn entry_point(mut self, rva: u32) -> Self {
        self.entry_point = rva;
        self
    }

    pub fn base_of_code(mut self, rva: u32) -> Self {
        self.base_of_code = rva;
        self
    }

    pub fn image_base(mut self, base: u64) -> Self {
        self.image_base = base;
        self
    }

    /// Number of data directories written, zero-filled past the 16 standard slots.
    pub fn directory_count(mut self, count: u32) -> Self {
        self.directory_count = count;
        self
    }

    pub fn directory(mut self, index: usize, rva: u32, size: u32) -> Self {
        self.directories[index] = (rva, size);
        self
    }

    /// Adds a section whose virtual size equals its raw size.
    pub fn section(self, name: &[u8; 8], rva: u32, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u32;
        self.section_sized(name, rva, size, bytes)
    }

    /// Adds a section with an explicit virtual size.
    pub fn section_sized(mut self, name: &[u8; 8], rva: u32, virtual_size: u32, bytes: Vec<u8>) -> Self {
        let characteristics = if name.starts_with(b".text") {
            CODE_CHARACTERISTICS
        } else {
            DATA_CHARACTERISTICS
        };
        self.sections.push(BuiltSection {
            name: *name,
            virtual_address: rva,
            virtual_size,
            characteristics,
            bytes,
        });
        self
    }

    /// Adds a section holding a complete import directory and points directory slot 1 at it.
    ///
    /// Function names of the form `#<n>` are emitted as ordinal imports.
    pub fn imports(self, name: &[u8; 8], rva: u32, dlls: &[(&str, &[&str])]) -> Self {
        let bytes = import_section(rva, dlls);
        let size = ((dlls.len() + 1) * 20) as u32;
        self.section(name, rva, bytes).directory(1, rva, size)
    }

    /// Adds a section holding an export directory and points directory slot 0 at it.
    ///
    /// Name strings are stored in reverse order so storage order differs from table order.
    pub fn exports(self, name: &[u8; 8], rva: u32, module: &str, names: &[&str]) -> Self {
        let bytes = export_section(rva, module, names);
        let size = bytes.len() as u32;
        self.section(name, rva, bytes).directory(0, rva, size)
    }

    pub fn build(&self) -> Vec<u8> {
        let directories_len = self.directory_count as usize * 8;
        let table_offset = LFANEW + 4 + COFF_SIZE + OPTIONAL_FIXED_SIZE + directories_len;
        let headers_end = table_offset + self.sections.len() * SECTION_SIZE;

        let mut raw_pointers = Vec::with_capacity(self.sections.len());
        let mut cursor = align(headers_end, FILE_ALIGNMENT);
        for section in &self.sections {
            raw_pointers.push(cursor);
            cursor = align(cursor + section.bytes.len(), FILE_ALIGNMENT);
        }

        let mut out = vec![0u8; LFANEW];
        out[0..2].copy_from_slice(b"MZ");
        out[60..64].copy_from_slice(&(LFANEW as u32).to_le_bytes());

        out.extend_from_slice(b"PE\0\0");
        push16(&mut out, self.machine);
        push16(&mut out, self.sections.len() as u16);
        push32(&mut out, self.time_date_stamp);
        push32(&mut out, 0);
        push32(&mut out, 0);
        push16(&mut out, (OPTIONAL_FIXED_SIZE + directories_len) as u16);
        push16(&mut out, self.characteristics);

        let size_of_code: u32 = self
            .sections
            .iter()
            .filter(|s| s.characteristics == CODE_CHARACTERISTICS)
            .map(|s| s.bytes.len() as u32)
            .sum();
        let size_of_data: u32 = self
            .sections
            .iter()
            .filter(|s| s.characteristics == DATA_CHARACTERISTICS)
            .map(|s| s.bytes.len() as u32)
            .sum();

        push16(&mut out, self.magic);
        out.push(self.linker.0);
        out.push(self.linker.1);
        push32(&mut out, size_of_code);
        push32(&mut out, size_of_data);
        push32(&mut out, 0);
        push32(&mut out, self.entry_point);
        push32(&mut out, self.base_of_code);
        out.extend_from_slice(&self.image_base.to_le_bytes());
        out.extend_from_slice(&[0u8; 76]);
        push32(&mut out, self.directory_count);

        for index in 0..self.directory_count as usize {
            let (rva, size) = self.directories.get(index).copied().unwrap_or((0, 0));
            push32(&mut out, rva);
            push32(&mut out, size);
        }

        for (section, &pointer) in self.sections.iter().zip(&raw_pointers) {
            out.extend_from_slice(&section.name);
            push32(&mut out, section.virtual_size);
            push32(&mut out, section.virtual_address);
            push32(&mut out, section.bytes.len() as u32);
            push32(&mut out, if section.bytes.is_empty() { 0 } else { pointer as u32 });
            push32(&mut out, 0);
            push32(&mut out, 0);
            push16(&mut out, 0);
            push16(&mut out, 0);
            push32(&mut out, section.characteristics);
        }

        for (section, &pointer) in self.sections.iter().zip(&raw_pointers) {
            out.resize(pointer, 0);
            out.extend_from_slice(&section.bytes);
        }

        out
    }
}

/// Assembles a COFF object file: file header at offset 0, section table, section bytes.
pub struct ObjectBuilder {
    machine: u16,
    sections: Vec<([u8; 8], u32, u32)>,
}

impl Default for ObjectBuilder {
    fn default() -> Self {
        ObjectBuilder::new()
    }
}

impl ObjectBuilder {
    pub fn new() -> ObjectBuilder {
        ObjectBuilder {
            machine: 0x8664,
            sections: Vec::new(),
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Adds a section with `raw_size` bytes of `0xCC` filler.
    pub fn section(mut self, name: &[u8; 8], raw_size: u32, characteristics: u32) -> Self {
        self.sections.push((*name, raw_size, characteristics));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push16(&mut out, self.machine);
        push16(&mut out, self.sections.len() as u16);
        push32(&mut out, 0x6502_0304);
        push32(&mut out, 0);
        push32(&mut out, 0);
        push16(&mut out, 0);
        push16(&mut out, 0);

        let mut pointer = COFF_SIZE + self.sections.len() * SECTION_SIZE;
        for (name, raw_size, characteristics) in &self.sections {
            out.extend_from_slice(name);
            push32(&mut out, 0);
            push32(&mut out, 0);
            push32(&mut out, *raw_size);
            push32(&mut out, pointer as u32);
            push32(&mut out, 0);
            push32(&mut out, 0);
            push16(&mut out, 0);
            push16(&mut out, 0);
            push32(&mut out, *characteristics);
            pointer += *raw_size as usize;
        }

        for (_, raw_size, _) in &self.sections {
            out.extend(std::iter::repeat(0xCC).take(*raw_size as usize));
        }

        out
    }
}

fn import_section(base: u32, dlls: &[(&str, &[&str])]) -> Vec<u8> {
    let rva = |offset: usize| base + offset as u32;

    let mut lookup_offsets = Vec::with_capacity(dlls.len());
    let mut cursor = (dlls.len() + 1) * 20;
    for (_, functions) in dlls {
        lookup_offsets.push(cursor);
        cursor += (functions.len() + 1) * 8;
    }

    let strings_base = cursor;
    let mut strings = Vec::new();
    let mut name_offsets = Vec::with_capacity(dlls.len());
    let mut lookup_entries: Vec<Vec<u64>> = Vec::with_capacity(dlls.len());
    for (dll, functions) in dlls {
        name_offsets.push(strings_base + strings.len());
        strings.extend_from_slice(dll.as_bytes());
        strings.push(0);

        let mut entries = Vec::with_capacity(functions.len());
        for (hint, function) in functions.iter().enumerate() {
            if let Some(ordinal) = function.strip_prefix('#').and_then(|n| n.parse::<u64>().ok()) {
                entries.push((1u64 << 63) | ordinal);
                continue;
            }
            if strings.len() % 2 == 1 {
                strings.push(0);
            }
            entries.push(u64::from(rva(strings_base + strings.len())));
            strings.extend_from_slice(&(hint as u16).to_le_bytes());
            strings.extend_from_slice(function.as_bytes());
            strings.push(0);
        }
        lookup_entries.push(entries);
    }

    let mut out = Vec::with_capacity(strings_base + strings.len());
    for (index, _) in dlls.iter().enumerate() {
        push32(&mut out, rva(lookup_offsets[index]));
        push32(&mut out, 0);
        push32(&mut out, 0);
        push32(&mut out, rva(name_offsets[index]));
        push32(&mut out, rva(lookup_offsets[index]));
    }
    out.extend_from_slice(&[0u8; 20]);

    for entries in &lookup_entries {
        for entry in entries {
            out.extend_from_slice(&entry.to_le_bytes());
        }
        out.extend_from_slice(&0u64.to_le_bytes());
    }

    out.extend_from_slice(&strings);
    out
}

fn export_section(base: u32, module: &str, names: &[&str]) -> Vec<u8> {
    let rva = |offset: usize| base + offset as u32;
    let pointers_offset = 40;
    let module_offset = pointers_offset + names.len() * 4;

    let mut strings = Vec::new();
    strings.extend_from_slice(module.as_bytes());
    strings.push(0);

    let mut name_offsets = vec![0usize; names.len()];
    for (index, name) in names.iter().enumerate().rev() {
        name_offsets[index] = module_offset + strings.len();
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
    }

    let mut out = Vec::new();
    push32(&mut out, 0);
    push32(&mut out, 0x6502_0304);
    push16(&mut out, 0);
    push16(&mut out, 0);
    push32(&mut out, rva(module_offset));
    push32(&mut out, 1);
    push32(&mut out, names.len() as u32);
    push32(&mut out, names.len() as u32);
    push32(&mut out, 0);
    push32(&mut out, rva(pointers_offset));
    push32(&mut out, 0);

    for offset in name_offsets {
        push32(&mut out, rva(offset));
    }
    out.extend_from_slice(&strings);
    out
}

fn align(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn push16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
