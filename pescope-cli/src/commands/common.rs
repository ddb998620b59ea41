use std::path::{Path, PathBuf};

use anyhow::Context;
use pescope::{Executable, ObjectFile};
use rayon::prelude::*;

/// Load and decode a PE32+ image.
pub fn load_executable(path: &Path) -> anyhow::Result<Executable> {
    Executable::from_file(path).with_context(|| format!("failed to decode image: {}", path.display()))
}

/// Load and decode a COFF object file.
pub fn load_object(path: &Path) -> anyhow::Result<ObjectFile> {
    ObjectFile::from_file(path)
        .with_context(|| format!("failed to decode object file: {}", path.display()))
}

/// Collect all `.exe`, `.dll` and `.obj` files recursively from a directory.
pub fn collect_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_images_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_images_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_images_recursive(&path, files)?;
        } else if is_image_file(&path) || is_object_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Decode every image below `dir` in parallel with `process`.
///
/// Returns the successful results in path order and the number of files that failed; each
/// failure is logged.
pub fn process_directory<T, F>(dir: &Path, process: F) -> anyhow::Result<(Vec<T>, usize)>
where
    T: Send,
    F: Fn(&Path) -> anyhow::Result<T> + Sync,
{
    let files = collect_images(dir)?;
    log::info!("found {} files in {}", files.len(), dir.display());

    let outcomes: Vec<anyhow::Result<T>> = files.par_iter().map(|path| process(path)).collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut fail_count = 0;
    for (path, outcome) in files.iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                log::warn!("{}: {e:#}", file_display_name(path));
                fail_count += 1;
            }
        }
    }
    Ok((results, fail_count))
}

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| wanted.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

/// Returns true if the path has an `.exe` or `.dll` extension.
pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, &["exe", "dll"])
}

/// Returns true if the path has an `.obj` extension.
pub fn is_object_file(path: &Path) -> bool {
    has_extension(path, &["obj"])
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

/// Join the names of set flags with `" | "`, or `"-"` when none is set.
pub fn flag_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined: Vec<&str> = names.collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(" | ")
    }
}
