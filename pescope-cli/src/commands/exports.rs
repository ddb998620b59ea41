use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_executable,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct ExportsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ordinal_base: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_count: Option<u32>,
    names: Vec<String>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let exe = load_executable(path)?;
    let exports = exe.exports();

    let output = ExportsOutput {
        module: exe.export_module_name()?,
        ordinal_base: exports.directory().map(|d| d.ordinal_base),
        function_count: exports.directory().map(|d| d.number_of_functions),
        names: exports.iter().map(|f| f.name.clone()).collect(),
    };

    print_output(&output, opts, |out| {
        if let Some(module) = &out.module {
            println!("Module:       {module}");
        }
        if let Some(base) = out.ordinal_base {
            println!("Ordinal base: {base}");
        }
        if let Some(count) = out.function_count {
            println!("Functions:    {count}");
        }

        if out.names.is_empty() {
            println!("Exports: none");
            return;
        }
        println!("Exported names ({}):", out.names.len());
        let mut tw = TabWriter::new(&[("#", Align::Right), ("Name", Align::Left)]).indent("  ");
        for (i, name) in out.names.iter().enumerate() {
            tw.row(vec![i.to_string(), name.clone()]);
        }
        tw.print();
    })
}
