//! Packaging whole folders on the filesystem.
//!
//! Each input folder is packaged into a hidden staging directory inside the
//! destination and only renamed to `<destination>/<ga_label>` once complete,
//! so a failed run never leaves a partial package under its final name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PackagingConfig;
use crate::driver::Driver;
use crate::error::{DatasetError, DatasetResult};
use crate::extract::Collaborators;
use crate::metadata::{DatasetMetadata, LineageMetadata, MachineMetadata};
use crate::package::{package_dataset, PackageOutcome};
use crate::provenance::ProcessContext;
use crate::serialise::read_dataset_metadata;

/// Prefix of staging directories within a destination.
pub const STAGING_PREFIX: &str = ".packagetmp.";

/// Where a dataset was processed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatasetOrigin {
    /// Just processed on this machine: full machine details are recorded.
    #[default]
    Local,
    /// An older dataset of mostly unknown provenance.
    Existing {
        /// Host it was processed on, if known.
        hostname: Option<String>,
    },
}

/// Parent datasets keyed by their product type.
pub type SourceDatasets = BTreeMap<String, DatasetMetadata>;

/// Creation time of a directory: its change time, in UTC.
fn creation_time(directory: &Path) -> DatasetResult<Option<NaiveDateTime>> {
    let metadata = fs::metadata(directory).map_err(|e| DatasetError::io(directory, e))?;

    #[cfg(unix)]
    let (secs, nanos) = {
        use std::os::unix::fs::MetadataExt;
        (metadata.ctime(), metadata.ctime_nsec() as u32)
    };
    #[cfg(not(unix))]
    let (secs, nanos) = {
        let modified = metadata
            .modified()
            .map_err(|e| DatasetError::io(directory, e))?;
        let since_epoch = modified
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        (since_epoch.as_secs() as i64, since_epoch.subsec_nanos())
    };

    Ok(DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc()))
}

fn init_dataset(
    directory: &Path,
    source_datasets: SourceDatasets,
    id: Option<Uuid>,
    machine: MachineMetadata,
) -> DatasetResult<DatasetMetadata> {
    let mut dataset = match id {
        Some(id) => DatasetMetadata::with_id(id),
        None => DatasetMetadata::new(),
    };
    dataset.creation_dt = creation_time(directory)?;
    dataset.lineage = Some(LineageMetadata {
        machine: Some(machine),
        source_datasets,
        ..Default::default()
    });
    Ok(dataset)
}

/// Blank metadata for a dataset just processed on this machine.
pub fn init_locally_processed_dataset(
    directory: &Path,
    source_datasets: SourceDatasets,
    id: Option<Uuid>,
    context: &ProcessContext,
) -> DatasetResult<DatasetMetadata> {
    init_dataset(directory, source_datasets, id, context.machine_metadata())
}

/// Blank metadata for an existing dataset of mostly unknown provenance.
///
/// Only the hostname it was processed on (if known) and the software doing
/// the packaging are recorded.
pub fn init_existing_dataset(
    directory: &Path,
    source_datasets: SourceDatasets,
    id: Option<Uuid>,
    source_hostname: Option<String>,
    context: &ProcessContext,
) -> DatasetResult<DatasetMetadata> {
    let machine = MachineMetadata {
        hostname: source_hostname,
        software: Some(context.software.to_map()),
        ..Default::default()
    };
    init_dataset(directory, source_datasets, id, machine)
}

/// Read the metadata of each parent dataset, keyed by its product type.
pub fn source_datasets_from_paths(paths: &[PathBuf]) -> DatasetResult<SourceDatasets> {
    let mut sources = SourceDatasets::new();
    for path in paths {
        let metadata = read_dataset_metadata(path)?;
        let Some(product_type) = metadata.product_type.clone() else {
            return Err(DatasetError::MalformedDocument {
                path: path.clone(),
                reason: "parent dataset has no product_type".to_string(),
            });
        };
        sources.insert(product_type, metadata);
    }
    Ok(sources)
}

/// Everything needed to package a batch of folders.
pub struct FolderPackaging<'a> {
    pub driver: Driver,
    pub origin: DatasetOrigin,
    pub source_datasets: SourceDatasets,
    pub additional_files: Vec<PathBuf>,
    pub collaborators: &'a Collaborators,
    pub config: &'a PackagingConfig,
    pub context: &'a ProcessContext,
}

/// Packages written by [`package_data_folders`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedFolders {
    pub created: Vec<PathBuf>,
    /// Packages that already existed, and were left untouched.
    pub existing: Vec<PathBuf>,
}

/// Package each input folder into `destination`, named by its label.
pub fn package_data_folders(
    job: &FolderPackaging<'_>,
    input_paths: &[PathBuf],
    destination: &Path,
) -> DatasetResult<PackagedFolders> {
    let mut result = PackagedFolders::default();

    for folder in input_paths {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(destination)
            .map_err(|e| DatasetError::io(destination, e))?;

        let dataset = match &job.origin {
            DatasetOrigin::Local => init_locally_processed_dataset(
                folder,
                job.source_datasets.clone(),
                None,
                job.context,
            )?,
            DatasetOrigin::Existing { hostname } => init_existing_dataset(
                folder,
                job.source_datasets.clone(),
                None,
                hostname.clone(),
                job.context,
            )?,
        };

        let outcome = package_dataset(
            &job.driver,
            dataset,
            folder,
            staging.path(),
            &job.additional_files,
            job.collaborators,
            job.config,
        )?;
        let packaged = match outcome {
            PackageOutcome::Packaged(packaged) => packaged,
            PackageOutcome::AlreadyPackaged(path) => {
                result.existing.push(path);
                continue;
            }
        };
        let label = packaged.ga_label.ok_or_else(|| {
            DatasetError::IncompletePackage("packaged dataset has no label".to_string())
        })?;

        // Package permissions match the destination.
        let permissions = fs::metadata(destination)
            .map_err(|e| DatasetError::io(destination, e))?
            .permissions();
        fs::set_permissions(staging.path(), permissions)
            .map_err(|e| DatasetError::io(staging.path(), e))?;

        let packaged_path = destination.join(&label);
        if packaged_path.exists() {
            warn!(path = %packaged_path.display(), "Package already exists");
            result.existing.push(packaged_path);
            continue;
        }

        let staged = staging.into_path();
        fs::rename(&staged, &packaged_path).map_err(|e| DatasetError::io(&packaged_path, e))?;
        info!(path = %packaged_path.display(), "Completed package");
        result.created.push(packaged_path);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PlatformMetadata;
    use crate::serialise::write_dataset_metadata;
    use tempfile::TempDir;

    #[test]
    fn test_init_local_records_machine() {
        let temp = TempDir::new().unwrap();
        let context = ProcessContext::detect();
        let id = Uuid::new_v4();

        let dataset =
            init_locally_processed_dataset(temp.path(), SourceDatasets::new(), Some(id), &context)
                .unwrap();

        assert_eq!(dataset.id, id);
        assert!(dataset.creation_dt.is_some());
        let machine = dataset.lineage.unwrap().machine.unwrap();
        assert_eq!(machine.runtime_id, Some(context.runtime_id));
        assert_eq!(machine.hostname, context.hostname);
    }

    #[test]
    fn test_init_existing_records_only_hostname() {
        let temp = TempDir::new().unwrap();
        let context = ProcessContext::detect();

        let dataset = init_existing_dataset(
            temp.path(),
            SourceDatasets::new(),
            None,
            Some("old-host".to_string()),
            &context,
        )
        .unwrap();

        let machine = dataset.lineage.unwrap().machine.unwrap();
        assert_eq!(machine.hostname.as_deref(), Some("old-host"));
        assert_eq!(machine.runtime_id, None);
        assert_eq!(machine.uname, None);
        assert!(machine.software.unwrap()["rust"].contains_key("eodatasets"));
    }

    #[test]
    fn test_source_datasets_keyed_by_product_type() {
        let temp = TempDir::new().unwrap();
        let mut parent = DatasetMetadata::new();
        parent.product_type = Some("level1".to_string());
        parent.platform = Some(PlatformMetadata::new("LANDSAT_8"));
        write_dataset_metadata(temp.path(), &parent).unwrap();

        let sources = source_datasets_from_paths(&[temp.path().to_path_buf()]).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources["level1"].id, parent.id);
    }

    #[test]
    fn test_source_dataset_without_product_type() {
        let temp = TempDir::new().unwrap();
        write_dataset_metadata(temp.path(), &DatasetMetadata::new()).unwrap();

        assert!(matches!(
            source_datasets_from_paths(&[temp.path().to_path_buf()]),
            Err(DatasetError::MalformedDocument { .. })
        ));
    }
}
