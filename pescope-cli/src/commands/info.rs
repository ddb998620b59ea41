use std::path::Path;

use pescope::pe::headers::DataDirectoryType;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{flag_names, load_executable},
    output::{hex32, print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub machine: String,
    pub format: String,
    pub timestamp: u32,
    pub characteristics: String,
    pub linker_version: String,
    pub entry_point: String,
    pub base_of_code: String,
    pub image_base: String,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
    pub section_count: usize,
    pub imported_dll_count: usize,
    pub imported_function_count: usize,
    pub exported_name_count: usize,
    pub directories: Vec<DirectoryInfo>,
}

#[derive(Debug, Serialize)]
pub struct DirectoryInfo {
    pub index: usize,
    pub name: String,
    pub rva: String,
    pub size: u32,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let exe = load_executable(path)?;
    let coff = exe.coff_header();
    let optional = exe.optional_header();

    let directories = exe
        .data_directories()
        .iter()
        .enumerate()
        .map(|(index, dir)| DirectoryInfo {
            index,
            name: DataDirectoryType::describe(index),
            rva: hex32(dir.virtual_address),
            size: dir.size,
            present: dir.is_present(),
            section: dir
                .is_present()
                .then(|| exe.section_containing(dir.virtual_address))
                .flatten()
                .map(|s| s.name()),
        })
        .collect();

    let info = ImageInfo {
        machine: format!("{} (0x{:04X})", coff.machine_name(), coff.machine),
        format: optional.magic_name().to_string(),
        timestamp: coff.time_date_stamp,
        characteristics: flag_names(coff.characteristics().iter_names().map(|(name, _)| name)),
        linker_version: format!(
            "{}.{}",
            optional.major_linker_version, optional.minor_linker_version
        ),
        entry_point: hex32(optional.address_of_entry_point),
        base_of_code: hex32(optional.base_of_code),
        image_base: format!("0x{:016X}", optional.image_base),
        size_of_code: optional.size_of_code,
        size_of_initialized_data: optional.size_of_initialized_data,
        size_of_uninitialized_data: optional.size_of_uninitialized_data,
        export_name: exe.export_module_name()?,
        section_count: exe.sections().len(),
        imported_dll_count: exe.imports().len(),
        imported_function_count: exe.imports().function_count(),
        exported_name_count: exe.exports().len(),
        directories,
    };

    print_output(&info, opts, |info| {
        println!("Machine:         {}", info.machine);
        println!("Format:          {}", info.format);
        println!("Timestamp:       0x{:08X}", info.timestamp);
        println!("Characteristics: {}", info.characteristics);
        println!("Linker:          {}", info.linker_version);
        println!("Entry point:     {}", info.entry_point);
        println!("Base of code:    {}", info.base_of_code);
        println!("Image base:      {}", info.image_base);
        println!("Code size:       {}", info.size_of_code);
        println!("Init. data:      {}", info.size_of_initialized_data);
        println!("Uninit. data:    {}", info.size_of_uninitialized_data);
        if let Some(name) = &info.export_name {
            println!("Export name:     {name}");
        }
        println!("Sections:        {}", info.section_count);
        println!(
            "Imports:         {} functions from {} DLLs",
            info.imported_function_count, info.imported_dll_count
        );
        println!("Exports:         {}", info.exported_name_count);

        let present: Vec<&DirectoryInfo> =
            info.directories.iter().filter(|d| d.present).collect();
        if !present.is_empty() {
            println!("\nData directories:");
            let mut tw = TabWriter::new(&[
                ("#", Align::Right),
                ("Name", Align::Left),
                ("RVA", Align::Left),
                ("Size", Align::Right),
                ("Section", Align::Left),
            ])
            .indent("  ");
            for dir in present {
                tw.row(vec![
                    dir.index.to_string(),
                    dir.name.clone(),
                    dir.rva.clone(),
                    dir.size.to_string(),
                    dir.section.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            tw.print();
        }
    })
}
