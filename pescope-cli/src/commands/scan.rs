use std::path::Path;

use pescope::pe::headers::FileCharacteristics;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{
        file_display_name, is_object_file, load_executable, load_object, process_directory,
    },
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct ScanEntry {
    file: String,
    kind: &'static str,
    machine: String,
    sections: usize,
    imported_dlls: usize,
    imported_functions: usize,
    exports: usize,
}

#[derive(Debug, Serialize)]
struct ScanSummary {
    decoded: usize,
    failed: usize,
    files: Vec<ScanEntry>,
}

fn scan_file(path: &Path) -> anyhow::Result<ScanEntry> {
    let file = file_display_name(path);
    if is_object_file(path) {
        let object = load_object(path)?;
        return Ok(ScanEntry {
            file,
            kind: "object",
            machine: object.coff().machine_name().to_string(),
            sections: object.sections().len(),
            imported_dlls: 0,
            imported_functions: 0,
            exports: 0,
        });
    }

    let exe = load_executable(path)?;
    let kind = if exe
        .coff_header()
        .characteristics()
        .contains(FileCharacteristics::DLL)
    {
        "dll"
    } else {
        "exe"
    };
    Ok(ScanEntry {
        file,
        kind,
        machine: exe.coff_header().machine_name().to_string(),
        sections: exe.sections().len(),
        imported_dlls: exe.imports().len(),
        imported_functions: exe.imports().function_count(),
        exports: exe.exports().len(),
    })
}

pub fn run(dir: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let (files, failed) = process_directory(dir, scan_file)?;
    let summary = ScanSummary {
        decoded: files.len(),
        failed,
        files,
    };

    print_output(&summary, opts, |summary| {
        if !summary.files.is_empty() {
            let mut tw = TabWriter::new(&[
                ("File", Align::Left),
                ("Kind", Align::Left),
                ("Machine", Align::Left),
                ("Sections", Align::Right),
                ("DLLs", Align::Right),
                ("Imports", Align::Right),
                ("Exports", Align::Right),
            ]);
            for entry in &summary.files {
                tw.row(vec![
                    entry.file.clone(),
                    entry.kind.to_string(),
                    entry.machine.clone(),
                    entry.sections.to_string(),
                    entry.imported_dlls.to_string(),
                    entry.imported_functions.to_string(),
                    entry.exports.to_string(),
                ]);
            }
            tw.print();
            println!();
        }
        println!("Decoded {} files, {} failed", summary.decoded, summary.failed);
    })
}
