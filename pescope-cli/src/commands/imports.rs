use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_executable,
    output::print_output,
};

#[derive(Debug, Serialize)]
struct ImportedDll {
    dll: String,
    functions: Vec<String>,
}

pub fn run(path: &Path, dll: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let exe = load_executable(path)?;

    let entries: Vec<ImportedDll> = exe
        .imports()
        .iter()
        .filter(|entry| dll.map_or(true, |wanted| entry.dll.eq_ignore_ascii_case(wanted)))
        .map(|entry| ImportedDll {
            dll: entry.dll.clone(),
            functions: entry.functions.clone(),
        })
        .collect();

    if let (Some(wanted), true) = (dll, entries.is_empty()) {
        anyhow::bail!("{} does not import from '{wanted}'", path.display());
    }

    print_output(&entries, opts, |entries| {
        if entries.is_empty() {
            println!("Imports: none");
            return;
        }
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("{} ({} functions):", entry.dll, entry.functions.len());
            for function in &entry.functions {
                println!("  {function}");
            }
        }
    })
}
