mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })?;

    let cli = Cli::parse();

    // pescope info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("pescope", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Info { path } => commands::info::run(path, &cli.global),
        Command::Sections { path } => commands::sections::run(path, &cli.global),
        Command::Imports { path, dll } => commands::imports::run(path, dll.as_deref(), &cli.global),
        Command::Exports { path } => commands::exports::run(path, &cli.global),
        Command::Obj { path } => commands::obj::run(path, &cli.global),
        Command::Dump {
            path,
            section,
            index,
            offset,
            length,
        } => commands::dump::run(
            path,
            &commands::dump::DumpOptions {
                section: section.as_deref(),
                index: *index,
                offset,
                length: length.as_deref(),
            },
            &cli.global,
        ),
        Command::Scan { path } => commands::scan::run(path, &cli.global),
    }
}
