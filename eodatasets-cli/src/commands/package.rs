//! Package command - copy datasets into labelled packages.

use std::path::PathBuf;

use clap::Args;
use eodatasets::config::PackagingConfig;
use eodatasets::extract::Collaborators;
use eodatasets::provenance::ProcessContext;
use eodatasets::run::{package_data_folders, source_datasets_from_paths, DatasetOrigin, FolderPackaging};
use eodatasets::Driver;

use super::parse_driver;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Package type (raw, level1, nbar, nbart, lambertian, pqa, eods)
    #[arg(value_parser = parse_driver)]
    pub driver: Driver,

    /// Dataset folders to package
    #[arg(required = true)]
    pub datasets: Vec<PathBuf>,

    /// Directory to create packages in
    #[arg(long, short)]
    pub destination: PathBuf,

    /// Metadata of a parent dataset (repeatable)
    #[arg(long = "parent", value_name = "PATH")]
    pub parents: Vec<PathBuf>,

    /// Extra file to include in each package (repeatable)
    #[arg(long = "additional", value_name = "FILE")]
    pub additional_files: Vec<PathBuf>,

    /// Hard link files instead of copying
    #[arg(long)]
    pub hard_link: bool,

    /// Don't recompress TIFF imagery
    #[arg(long)]
    pub no_compress: bool,

    /// Datasets were processed elsewhere: don't record this machine
    #[arg(long)]
    pub existing: bool,

    /// Host the datasets were processed on (with --existing)
    #[arg(long, requires = "existing")]
    pub source_hostname: Option<String>,
}

/// Run the package command.
pub fn run(args: PackageArgs, config: PackagingConfig) -> Result<(), CliError> {
    if !args.destination.is_dir() {
        return Err(CliError::Config(format!(
            "destination is not a directory: {}",
            args.destination.display()
        )));
    }

    let mut config = config;
    if args.hard_link {
        config = config.with_hard_link(true);
    }
    if args.no_compress {
        config = config.with_compress_imagery(false);
    }

    let origin = if args.existing {
        DatasetOrigin::Existing {
            hostname: args.source_hostname,
        }
    } else {
        DatasetOrigin::Local
    };

    let context = ProcessContext::detect();
    let collaborators = Collaborators::new();
    let job = FolderPackaging {
        driver: args.driver,
        origin,
        source_datasets: source_datasets_from_paths(&args.parents)?,
        additional_files: args.additional_files,
        collaborators: &collaborators,
        config: &config,
        context: &context,
    };

    let result = package_data_folders(&job, &args.datasets, &args.destination)?;

    for path in &result.created {
        println!("Created {}", path.display());
    }
    for path in &result.existing {
        println!("Already exists {}", path.display());
    }
    Ok(())
}
