//! Borrowing fields from a dataset's parent.
//!
//! Derived products (level1, nbar, pqa) describe the same acquisition as the
//! dataset they were computed from. Rather than re-extracting those fields,
//! they are borrowed from the single parent recorded in
//! `lineage.source_datasets`.
//!
//! Borrowing only fills gaps: a field the child already has is never
//! overwritten. Composite datasets with several true sources aren't
//! supported.

use tracing::debug;

use crate::driver::Driver;
use crate::metadata::DatasetMetadata;

/// Copy common fields from a single parent dataset into `dataset`.
///
/// Copies platform, instrument, acquisition and extent (field by field), and
/// both satellite reference points when the child has no start point.
pub fn borrow_single_sourced_fields(dataset: &mut DatasetMetadata, parent: &DatasetMetadata) {
    if dataset.platform_code().is_none() && parent.platform.is_some() {
        dataset.platform.clone_from(&parent.platform);
    }
    if dataset.instrument_name().is_none() && parent.instrument.is_some() {
        dataset.instrument.clone_from(&parent.instrument);
    }

    if let Some(extent) = parent.extent.as_ref() {
        dataset.extent_mut().fill_gaps_from(extent);
    }
    if let Some(acquisition) = parent.acquisition.as_ref() {
        dataset.acquisition_mut().fill_gaps_from(acquisition);
    }

    if let Some(parent_image) = parent.image.as_ref() {
        let image = dataset.image_mut();
        if image.satellite_ref_point_start.is_none() {
            image.satellite_ref_point_start = parent_image.satellite_ref_point_start;
            image.satellite_ref_point_end = parent_image.satellite_ref_point_end;
        }
    }
}

/// The parent a driver would borrow from: its first expected source that is
/// present in the dataset's lineage.
pub fn parent_for<'a>(driver: &Driver, dataset: &'a DatasetMetadata) -> Option<&'a DatasetMetadata> {
    driver
        .expected_sources()
        .iter()
        .find_map(|source| dataset.source_dataset(source.id()))
}

/// Borrow fields from the driver's parent, if one is recorded.
///
/// Returns whether a parent was found.
pub fn borrow_from_sources(driver: &Driver, dataset: &mut DatasetMetadata) -> bool {
    let Some(lineage) = dataset.lineage.take() else {
        return false;
    };

    let parent = driver
        .expected_sources()
        .iter()
        .find_map(|source| lineage.source_datasets.get(source.id()));

    let found = match parent {
        Some(parent) => {
            debug!(driver = %driver, parent = %parent.id, "Borrowing fields from parent");
            borrow_single_sourced_fields(dataset, parent);
            true
        }
        None => false,
    };

    dataset.lineage = Some(lineage);
    found
}
