//! Metadata command - write metadata for datasets in place.

use std::path::PathBuf;

use clap::Args;
use eodatasets::extract::Collaborators;
use eodatasets::package::package_inplace_dataset;
use eodatasets::provenance::ProcessContext;
use eodatasets::run::{init_existing_dataset, source_datasets_from_paths};
use eodatasets::Driver;

use super::parse_driver;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct MetadataArgs {
    /// Package type (raw, level1, nbar, nbart, lambertian, pqa, eods)
    #[arg(value_parser = parse_driver)]
    pub driver: Driver,

    /// Datasets to describe
    #[arg(required = true)]
    pub datasets: Vec<PathBuf>,

    /// Metadata of a parent dataset (repeatable)
    #[arg(long = "parent", value_name = "PATH")]
    pub parents: Vec<PathBuf>,

    /// Host the datasets were processed on
    #[arg(long)]
    pub source_hostname: Option<String>,
}

/// Run the metadata command.
pub fn run(args: MetadataArgs) -> Result<(), CliError> {
    let context = ProcessContext::detect();
    let collaborators = Collaborators::new();
    let sources = source_datasets_from_paths(&args.parents)?;

    for path in &args.datasets {
        let dataset = init_existing_dataset(
            path,
            sources.clone(),
            None,
            args.source_hostname.clone(),
            &context,
        )?;
        let written = package_inplace_dataset(&args.driver, dataset, path, &collaborators)?;
        println!("Wrote {}", written.display());
    }
    Ok(())
}
