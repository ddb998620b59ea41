use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::{
        common::{flag_names, load_object},
        sections::{print_section_table, section_rows, SectionInfo},
    },
    output::print_output,
};

#[derive(Debug, Serialize)]
struct ObjectInfo {
    machine: String,
    timestamp: u32,
    symbol_table: String,
    symbol_count: u32,
    characteristics: String,
    sections: Vec<SectionInfo>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let object = load_object(path)?;
    let coff = object.coff();

    let info = ObjectInfo {
        machine: format!("{} (0x{:04X})", coff.machine_name(), coff.machine),
        timestamp: coff.time_date_stamp,
        symbol_table: format!("0x{:08X}", coff.pointer_to_symbol_table),
        symbol_count: coff.number_of_symbols,
        characteristics: flag_names(coff.characteristics().iter_names().map(|(name, _)| name)),
        sections: section_rows(object.sections()),
    };

    print_output(&info, opts, |info| {
        println!("Machine:         {}", info.machine);
        println!("Timestamp:       0x{:08X}", info.timestamp);
        println!("Symbol table:    {}", info.symbol_table);
        println!("Symbols:         {}", info.symbol_count);
        println!("Characteristics: {}", info.characteristics);
        println!("\nSections ({}):", info.sections.len());
        print_section_table(&info.sections);
    })
}
