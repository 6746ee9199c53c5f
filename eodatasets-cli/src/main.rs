//! eodatasets CLI - Command-line interface
//!
//! Packages satellite datasets, writes metadata for existing datasets in
//! place and verifies checksum manifests.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use eodatasets::config::PackagingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{metadata, package, verify};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "eodatasets", version, about = "Package Earth-observation datasets")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.eodatasets/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Package datasets into a destination directory
    Package(package::PackageArgs),
    /// Write metadata for existing datasets in place
    Metadata(metadata::MetadataArgs),
    /// Verify the checksums of packaged datasets
    Verify(verify::VerifyArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Package(args) => package::run(args, config),
        Commands::Metadata(args) => metadata::run(args),
        Commands::Verify(args) => verify::run(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PackagingConfig, CliError> {
    match path {
        Some(path) => Ok(PackagingConfig::load_from(path)?),
        None => Ok(PackagingConfig::load()?),
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_command() {
        let cli = Cli::try_parse_from([
            "eodatasets",
            "--debug",
            "package",
            "nbar",
            "/data/in",
            "--destination",
            "/data/out",
            "--parent",
            "/data/level1",
            "--hard-link",
            "--no-compress",
        ])
        .unwrap();

        assert!(cli.debug);
        let Commands::Package(args) = cli.command else {
            panic!("expected package command");
        };
        assert_eq!(
            args.driver,
            eodatasets::Driver::Nbar(eodatasets::NbarSubset::Brdf)
        );
        assert_eq!(args.datasets, vec![PathBuf::from("/data/in")]);
        assert_eq!(args.parents, vec![PathBuf::from("/data/level1")]);
        assert!(args.hard_link);
        assert!(args.no_compress);
    }

    #[test]
    fn test_unknown_driver_is_rejected() {
        let result = Cli::try_parse_from([
            "eodatasets",
            "package",
            "nope",
            "/data/in",
            "--destination",
            "/data/out",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_verify_command() {
        let cli = Cli::try_parse_from(["eodatasets", "verify", "/a", "/b"]).unwrap();
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify command");
        };
        assert_eq!(args.packages.len(), 2);
    }
}
