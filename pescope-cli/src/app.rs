use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pescope - PE32+ executable and COFF object file inspection
#[derive(Debug, Parser)]
#[command(name = "pescope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display image overview: headers, data directories, and counts.
    Info {
        /// Path to the PE32+ image.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List section headers in table order.
    Sections {
        /// Path to the PE32+ image.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List imported DLLs and their functions.
    Imports {
        /// Path to the PE32+ image.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Show only imports from this DLL (case-insensitive).
        #[arg(long, value_name = "NAME")]
        dll: Option<String>,
    },

    /// List functions exported by name.
    Exports {
        /// Path to the PE32+ image.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Display the COFF header and section table of an object file.
    Obj {
        /// Path to the COFF object file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Hex dump raw bytes of a section or of the whole file.
    Dump {
        /// Path to the PE32+ image.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Dump the first section with this name.
        #[arg(long, value_name = "NAME", conflicts_with = "index")]
        section: Option<String>,

        /// Dump the section at this table position.
        #[arg(long, value_name = "INDEX")]
        index: Option<usize>,

        /// Start offset within the selected bytes (hex like 0x40 or decimal).
        #[arg(long, value_name = "OFFSET", default_value = "0")]
        offset: String,

        /// Maximum number of bytes to dump (hex or decimal).
        #[arg(long, value_name = "LENGTH")]
        length: Option<String>,
    },

    /// Decode every .exe/.dll/.obj below a directory in parallel and summarize.
    Scan {
        /// Directory to scan recursively.
        #[arg(value_name = "DIR")]
        path: PathBuf,
    },
}
