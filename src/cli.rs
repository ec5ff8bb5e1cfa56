use crate::serializer::OutputFormat;
use crate::service::{DocumentationService, ServiceConfig};
use crate::upstream::DEFAULT_PARSER_PATH;
use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

/// Docgen from source - Generate project documentation from a NestJS TypeScript project
#[derive(Parser, Debug)]
#[command(name = "docgen-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Directory receiving `<project>/` output folders
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "markdown")]
    pub output_format: OutputFormat,

    /// Structure parser executable
    #[arg(long = "parser", env = "GO_PARSER_PATH", default_value = DEFAULT_PARSER_PATH)]
    pub parser: PathBuf,

    /// Folder listing exclusion regex; replaces the defaults when given
    #[arg(long = "exclude", value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    for pattern in &args.exclude {
        if let Err(e) = regex::Regex::new(pattern) {
            anyhow::bail!("Invalid --exclude pattern {}: {}", pattern, e);
        }
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    info!("Output directory: {}", args.output_dir.display());
    info!("Structure parser: {}", args.parser.display());
    if !args.exclude.is_empty() {
        info!("Folder exclusions: {:?}", args.exclude);
    }

    Ok(args)
}

impl CliArgs {
    /// Service settings described by these arguments
    pub fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig {
            parser_path: self.parser.clone(),
            output_root: self.output_dir.clone(),
            format: self.output_format,
            ..Default::default()
        };
        if !self.exclude.is_empty() {
            config.excludes = self.exclude.clone();
        }
        config
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting documentation generation...");

    let service = DocumentationService::new(args.service_config());
    let bytes = service.generate(&args.project_path)?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Document: {}", service.document_path(&args.project_path).display());
    info!("  - Size: {} bytes", bytes.len());

    Ok(())
}
