//! Packaging datasets.
//!
//! A packaged dataset is a directory holding copies of the source files
//! under `product/`, any caller-supplied files under `additional/`, a
//! metadata document and a checksum manifest:
//!
//! ```text
//! <target>/
//! ├── ga-metadata.yaml
//! ├── package.sha256
//! ├── product/...
//! └── additional/...
//! ```
//!
//! Packaging is idempotent: a target that already holds a metadata document
//! is left alone. Making the result visible under its final name is left to
//! the caller (see [`crate::run::package_data_folders`]).

mod copy;
mod expand;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checksum::{PackageChecksum, CHECKSUM_FILE_NAME};
use crate::config::PackagingConfig;
use crate::driver::Driver;
use crate::error::{DatasetError, DatasetResult};
use crate::extract::{BrowseImageCreator, Collaborators};
use crate::lineage::borrow_from_sources;
use crate::metadata::DatasetMetadata;
use crate::serialise::{write_dataset_metadata, METADATA_FILE_NAME};

pub use copy::{copy_file, file_size_bytes};
pub use expand::{dataset_files, expand_driver_metadata};

/// Directory of copied source files within a package.
pub const PRODUCT_DIR: &str = "product";

/// Directory of caller-supplied files within a package.
pub const ADDITIONAL_DIR: &str = "additional";

/// Result of packaging a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageOutcome {
    /// The dataset was packaged. Paths in the metadata point into the package.
    Packaged(DatasetMetadata),
    /// The target already held a packaged dataset; nothing was written.
    AlreadyPackaged(PathBuf),
}

impl PackageOutcome {
    pub fn is_packaged(&self) -> bool {
        matches!(self, PackageOutcome::Packaged(_))
    }
}

/// Copies a dataset's files into a target directory and commits its
/// metadata and checksums.
pub struct Packager<'a> {
    driver: Driver,
    config: &'a PackagingConfig,
    additional_files: &'a [PathBuf],
    browse: Option<&'a dyn BrowseImageCreator>,
}

impl<'a> Packager<'a> {
    pub fn new(driver: Driver, config: &'a PackagingConfig) -> Self {
        Self {
            driver,
            config,
            additional_files: &[],
            browse: None,
        }
    }

    /// Files to copy into `additional/`.
    pub fn with_additional_files(mut self, files: &'a [PathBuf]) -> Self {
        self.additional_files = files;
        self
    }

    /// Create browse images once the files are in place.
    pub fn with_browse(mut self, creator: &'a dyn BrowseImageCreator) -> Self {
        self.browse = Some(creator);
        self
    }

    /// Package `dataset`, whose files live under `source_root`, into
    /// `target_root`.
    ///
    /// The caller's metadata is not modified: the packaged copy, with paths
    /// pointing into the package, is returned.
    pub fn package(
        &self,
        dataset: &DatasetMetadata,
        source_root: &Path,
        target_root: &Path,
    ) -> DatasetResult<PackageOutcome> {
        if is_packaged(target_root) {
            info!(path = %target_root.display(), "Already packaged, skipping");
            return Ok(PackageOutcome::AlreadyPackaged(target_root.to_path_buf()));
        }
        validate_metadata(dataset)?;

        debug!(from = %source_root.display(), to = %target_root.display(), "Packaging");
        let product_dir = target_root.join(PRODUCT_DIR);
        fs::create_dir_all(&product_dir).map_err(|e| DatasetError::io(&product_dir, e))?;

        let mut dataset = dataset.clone();
        let mut checksums = PackageChecksum::new();
        let mut copied = Vec::new();

        let bands: Vec<(String, PathBuf)> = dataset
            .image
            .as_ref()
            .map(|image| {
                image
                    .bands
                    .iter()
                    .map(|(number, band)| (number.clone(), band.path.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for (number, source) in bands {
            let destination = self.copy_into(
                &dataset,
                source_root,
                &product_dir,
                &source,
                &mut checksums,
                &mut copied,
            )?;
            if let Some(band) = dataset.image.as_mut().and_then(|i| i.bands.get_mut(&number)) {
                band.path = destination;
            }
        }

        for index in 0..dataset.ancillary_files.len() {
            let source = dataset.ancillary_files[index].path.clone();
            let destination = self.copy_into(
                &dataset,
                source_root,
                &product_dir,
                &source,
                &mut checksums,
                &mut copied,
            )?;
            dataset.ancillary_files[index].path = destination;
        }

        self.write_additional_files(target_root, &mut checksums)?;

        dataset.size_bytes = Some(file_size_bytes(&copied)?);

        if let Some(creator) = self.browse {
            let bands = self.driver.browse_image_bands(&dataset)?;
            let browse = creator.create_browse_images(&dataset, &bands, target_root)?;
            for image in browse.values() {
                checksums.add_file(&image.path)?;
            }
            if !browse.is_empty() {
                dataset.browse = Some(browse);
            }
        }

        let checksum_path = target_root.join(CHECKSUM_FILE_NAME);
        dataset.checksum_path = Some(checksum_path.clone());

        let metadata_path = write_dataset_metadata(target_root, &dataset)?;
        checksums.add_file(&metadata_path)?;
        checksums.write(&checksum_path)?;

        info!(
            label = dataset.ga_label.as_deref().unwrap_or_default(),
            files = checksums.len(),
            "Packaged dataset"
        );
        Ok(PackageOutcome::Packaged(dataset))
    }

    /// Copy one source file into the package, recording every output.
    fn copy_into(
        &self,
        dataset: &DatasetMetadata,
        source_root: &Path,
        product_dir: &Path,
        source: &Path,
        checksums: &mut PackageChecksum,
        copied: &mut Vec<PathBuf>,
    ) -> DatasetResult<PathBuf> {
        let relative = match source.strip_prefix(source_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => PathBuf::from(source.file_name().unwrap_or_default()),
        };
        let destination = product_dir.join(self.driver.translate_path(dataset, &relative)?);

        for output in copy_file(source, &destination, self.config)? {
            checksums.add_file(&output)?;
            copied.push(output);
        }
        Ok(destination)
    }

    fn write_additional_files(
        &self,
        target_root: &Path,
        checksums: &mut PackageChecksum,
    ) -> DatasetResult<()> {
        if self.additional_files.is_empty() {
            return Ok(());
        }
        let additional_dir = target_root.join(ADDITIONAL_DIR);
        fs::create_dir_all(&additional_dir).map_err(|e| DatasetError::io(&additional_dir, e))?;

        for path in self.additional_files {
            let destination = additional_dir.join(path.file_name().unwrap_or_default());
            fs::copy(path, &destination).map_err(|e| DatasetError::io(&destination, e))?;
            checksums.add_file(&destination)?;
        }
        Ok(())
    }
}

/// Whether `target_root` already holds a packaged dataset.
pub fn is_packaged(target_root: &Path) -> bool {
    target_root.join(METADATA_FILE_NAME).exists()
}

/// Check that the metadata is complete enough to package.
pub fn validate_metadata(dataset: &DatasetMetadata) -> DatasetResult<()> {
    if dataset.platform_code().map_or(true, str::is_empty) {
        return Err(DatasetError::IncompletePackage(format!(
            "dataset {} has no platform code",
            dataset.id
        )));
    }
    Ok(())
}

fn check_additional_files_exist(additional_files: &[PathBuf]) -> DatasetResult<()> {
    match additional_files.iter().find(|p| !p.is_file()) {
        Some(missing) => Err(DatasetError::MissingAdditionalFile(missing.clone())),
        None => Ok(()),
    }
}

fn absolute(path: &Path) -> DatasetResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|e| DatasetError::io(path, e))?;
    Ok(cwd.join(path))
}

/// Populate, validate and package the dataset at `image_path` into `target`.
///
/// `dataset` is typically fresh from [`crate::run::init_locally_processed_dataset`]
/// or [`crate::run::init_existing_dataset`].
pub fn package_dataset(
    driver: &Driver,
    mut dataset: DatasetMetadata,
    image_path: &Path,
    target: &Path,
    additional_files: &[PathBuf],
    collaborators: &Collaborators,
    config: &PackagingConfig,
) -> DatasetResult<PackageOutcome> {
    check_additional_files_exist(additional_files)?;
    let image_path = absolute(image_path)?;
    let target = absolute(target)?;

    driver.fill_metadata(&mut dataset, &image_path, additional_files, collaborators)?;
    borrow_from_sources(driver, &mut dataset);

    if is_packaged(&target) {
        info!(path = %target.display(), "Already packaged, skipping");
        return Ok(PackageOutcome::AlreadyPackaged(target));
    }

    validate_metadata(&dataset)?;
    expand_driver_metadata(driver, &mut dataset, &image_path)?;

    let mut packager = Packager::new(*driver, config).with_additional_files(additional_files);
    if let Some(browse) = collaborators.browse.as_deref() {
        packager = packager.with_browse(browse);
    }
    packager.package(&dataset, &image_path, &target)
}

/// Write a metadata document for a dataset in place, without copying it.
///
/// Returns the path of the written document.
pub fn package_inplace_dataset(
    driver: &Driver,
    mut dataset: DatasetMetadata,
    image_path: &Path,
    collaborators: &Collaborators,
) -> DatasetResult<PathBuf> {
    let image_path = absolute(image_path)?;
    driver.fill_metadata(&mut dataset, &image_path, &[], collaborators)?;
    borrow_from_sources(driver, &mut dataset);

    let existing_checksums = image_path.join(CHECKSUM_FILE_NAME);
    if existing_checksums.is_file() {
        dataset.checksum_path = Some(existing_checksums);
    }

    validate_metadata(&dataset)?;
    expand_driver_metadata(driver, &mut dataset, &image_path)?;
    write_dataset_metadata(&image_path, &dataset)
}
