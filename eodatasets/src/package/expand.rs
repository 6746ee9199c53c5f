//! Driver-derived metadata that is only known once a dataset is complete.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::copy::file_size_bytes;
use crate::codes::expand_groundstation;
use crate::driver::{walk_error, Driver};
use crate::error::DatasetResult;
use crate::metadata::{AncillaryFile, DatasetMetadata, ANCILLARY_FILE_TYPE_OTHER};

/// Files of the dataset at `path` that the driver includes, in name order.
///
/// Hidden files and directories are skipped. A single-file dataset is just
/// that file.
pub fn dataset_files(driver: &Driver, path: &Path) -> DatasetResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(path, e))?;
        if entry.file_type().is_file() && driver.include_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Fill in the product type, label, bands, ancillary files and size of a
/// dataset located at `path`.
///
/// Each included file becomes a band if the driver recognises it, otherwise
/// an ancillary file of type `other`.
pub fn expand_driver_metadata(
    driver: &Driver,
    dataset: &mut DatasetMetadata,
    path: &Path,
) -> DatasetResult<()> {
    dataset.product_type = Some(driver.id().to_string());
    let label = driver.ga_label(dataset)?;
    debug!(label = %label, "Generated label");
    dataset.ga_label = Some(label);

    let files = dataset_files(driver, path)?;
    dataset.size_bytes = Some(file_size_bytes(&files)?);

    dataset
        .ancillary_files
        .retain(|f| f.kind != ANCILLARY_FILE_TYPE_OTHER);
    for file in files {
        match driver.to_band(dataset, &file)? {
            Some(band) => {
                dataset
                    .image_mut()
                    .bands
                    .entry(band.number.clone())
                    .and_modify(|existing| existing.path.clone_from(&band.path))
                    .or_insert(band);
            }
            None => dataset.ancillary_files.push(AncillaryFile::other(file)),
        }
    }

    expand_groundstation(dataset);
    Ok(())
}
