//! Docgen from source - Command-line tool for generating project documentation.
//!
//! This binary runs the documentation pipeline on a NestJS TypeScript project: the external
//! structure parser, the route extractor, the interface miner and the relationship diagram
//! feed one long-form document written under the output directory.
//!
//! # Usage
//!
//! ```bash
//! docgen-from-source [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate Markdown documentation:
//! ```bash
//! docgen-from-source ./shop-api
//! ```
//!
//! Generate the JSON document model into `docs/`:
//! ```bash
//! docgen-from-source ./shop-api -f json -o docs
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! docgen-from-source ./shop-api -v
//! ```

use anyhow::Result;
use clap::Parser;
use docgen_from_source::cli;
use log::info;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Docgen from source starting...");

    let args = cli::parse_args_from_parsed(args)?;

    cli::run(args)?;

    info!("Documentation generation completed successfully");

    Ok(())
}
