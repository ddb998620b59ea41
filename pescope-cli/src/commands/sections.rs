use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{flag_names, load_executable},
    output::{hex32, print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct SectionInfo {
    pub index: usize,
    pub name: String,
    pub virtual_address: String,
    pub virtual_size: u32,
    pub raw_offset: String,
    pub raw_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<u32>,
    pub characteristics: String,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let exe = load_executable(path)?;
    let sections = section_rows(exe.sections());

    print_output(&sections, opts, |sections| {
        println!("Sections ({}):", sections.len());
        print_section_table(sections);
    })
}

/// Builds serializable rows for every header in table order.
pub fn section_rows(table: &pescope::pe::sections::SectionTable) -> Vec<SectionInfo> {
    table
        .iter()
        .map(|s| {
            let flags = s.characteristics();
            SectionInfo {
                index: s.index,
                name: s.name(),
                virtual_address: hex32(s.virtual_address),
                virtual_size: s.virtual_size,
                raw_offset: hex32(s.pointer_to_raw_data),
                raw_size: s.size_of_raw_data,
                alignment: flags.alignment(),
                characteristics: flag_names(flags.iter_names().map(|(name, _)| name)),
            }
        })
        .collect()
}

pub fn print_section_table(sections: &[SectionInfo]) {
    let mut tw = TabWriter::new(&[
        ("#", Align::Right),
        ("Name", Align::Left),
        ("VirtAddr", Align::Left),
        ("VirtSize", Align::Right),
        ("RawPtr", Align::Left),
        ("RawSize", Align::Right),
        ("Characteristics", Align::Left),
    ])
    .indent("  ");
    for s in sections {
        tw.row(vec![
            s.index.to_string(),
            s.name.clone(),
            s.virtual_address.clone(),
            s.virtual_size.to_string(),
            s.raw_offset.clone(),
            s.raw_size.to_string(),
            s.characteristics.clone(),
        ]);
    }
    tw.print();
}
