use std::path::Path;

use anyhow::Context;
use pescope::{hex_dump, RawImage};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_executable,
    output::{parse_number, print_output},
};

/// Selection of the bytes to dump.
pub struct DumpOptions<'a> {
    pub section: Option<&'a str>,
    pub index: Option<usize>,
    pub offset: &'a str,
    pub length: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DumpOutput {
    source: String,
    file_offset: u64,
    length: usize,
    hex: String,
}

pub fn run(path: &Path, dump: &DumpOptions<'_>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let offset = parse_number(dump.offset)?;
    let length = dump.length.map(parse_number).transpose()?;

    let (source, base, bytes) = match (dump.section, dump.index) {
        (None, None) => {
            let image = RawImage::from_file(path)
                .with_context(|| format!("failed to read file: {}", path.display()))?;
            (
                "file".to_string(),
                0,
                window(image.data(), offset, length)?.to_vec(),
            )
        }
        (name, index) => {
            let exe = load_executable(path)?;
            let header = match name {
                Some(name) => exe
                    .sections()
                    .first(name)
                    .with_context(|| format!("no section named '{name}'"))?,
                None => {
                    let index = index.unwrap_or_default();
                    exe.sections()
                        .by_index(index)
                        .with_context(|| format!("no section at index {index}"))?
                }
            };
            let data = exe
                .section_data(header.index)
                .with_context(|| format!("section '{}' has no data", header.name()))?;
            (
                format!("{} (#{})", header.name(), header.index),
                u64::from(header.pointer_to_raw_data),
                window(data.bytes(), offset, length)?.to_vec(),
            )
        }
    };

    let output = DumpOutput {
        source,
        file_offset: base + offset as u64,
        length: bytes.len(),
        hex: hex_dump(&bytes, base + offset as u64),
    };

    print_output(&output, opts, |out| {
        println!(
            "{}: {} bytes at file offset 0x{:X}",
            out.source, out.length, out.file_offset
        );
        print!("{}", out.hex);
    })
}

/// The bytes from `offset`, at most `length` of them.
fn window(bytes: &[u8], offset: usize, length: Option<usize>) -> anyhow::Result<&[u8]> {
    let tail = bytes.get(offset..).with_context(|| {
        format!(
            "offset 0x{offset:X} is past the end of the {} available bytes",
            bytes.len()
        )
    })?;
    let end = length.map_or(tail.len(), |len| len.min(tail.len()));
    Ok(&tail[..end])
}
