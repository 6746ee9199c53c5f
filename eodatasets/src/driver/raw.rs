//! Raw satellite telemetry.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::DatasetResult;
use crate::extract::{Collaborators, FormatFamily};
use crate::label::{fill_dataset_label, RAW_TEMPLATE};
use crate::metadata::DatasetMetadata;

/// Extractors run for raw data, in order.
const RAW_FAMILIES: &[FormatFamily] = &[
    FormatFamily::AdsFolder,
    FormatFamily::Rcc,
    FormatFamily::Mdf,
    FormatFamily::PassInfo,
    FormatFamily::Pds,
    FormatFamily::NppHdf5,
];

pub(super) fn fill_metadata(
    dataset: &mut DatasetMetadata,
    path: &Path,
    additional_files: &[PathBuf],
    collaborators: &Collaborators,
) -> DatasetResult<()> {
    collaborators
        .extractors
        .run_all(RAW_FAMILIES, dataset, path, additional_files)?;
    dataset.ga_level.get_or_insert_with(|| "P00".to_string());
    Ok(())
}

/// Raw datasets carry an extra identifier column derived from ADS folder
/// names: the USGS interval id for Landsat, otherwise whichever of orbit,
/// RMS string and ground station are known.
///
/// Examples:
/// - `LS8_OLITIRS_STD-MD_P00_LC81160740742015089ASA00_116_074-084_20150330T022553Z20150330T022657`
/// - `AQUA_MODIS_STD-PDS_P00_65208.S1A1C1D1R1_0_0_20140807T031628Z20140807T031630`
fn folder_identifier(dataset: &DatasetMetadata) -> String {
    if let Some(usgs) = dataset.usgs.as_ref() {
        return usgs.interval_id.clone().unwrap_or_default();
    }

    let acquisition = dataset.acquisition.as_ref();
    let parts = [
        acquisition
            .and_then(|a| a.platform_orbit)
            .map(|o| o.to_string()),
        dataset.rms_string.clone(),
        acquisition
            .and_then(|a| a.groundstation.as_ref())
            .map(|gs| gs.code.clone()),
    ];
    parts.into_iter().flatten().collect::<Vec<_>>().join(".")
}

pub(super) fn ga_label(dataset: &DatasetMetadata) -> DatasetResult<String> {
    info!(id = %dataset.id, "Labelling raw dataset");
    fill_dataset_label(
        dataset,
        RAW_TEMPLATE,
        &[("folderident", folder_identifier(dataset))],
    )
}
