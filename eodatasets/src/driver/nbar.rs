//! Surface reflectance (NBAR) products.
//!
//! One NBAR run produces several subsets (BRDF corrected, terrain corrected,
//! lambertian), each packaged as its own dataset. Processing details are
//! read from `metadata/nbar-metadata.yaml` in the source folder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use super::ancillary::{parse_entry, read_document, value_to_string};
use super::{file_name, lower_suffix, stem, Driver, NbarSubset};
use crate::error::DatasetResult;
use crate::extract::Collaborators;
use crate::label::{fill_dataset_label, NBAR_TEMPLATE};
use crate::lineage::{borrow_from_sources, parent_for};
use crate::metadata::{AlgorithmMetadata, BandMetadata, DatasetMetadata, FormatMetadata};

/// Location of the processing document within the source folder.
pub(super) const METADATA_FILE: &str = "metadata/nbar-metadata.yaml";

#[derive(Debug, Deserialize)]
struct NbarDocument {
    algorithm_information: AlgorithmInformation,
    #[serde(default)]
    ancillary_data: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct AlgorithmInformation {
    algorithm_version: Value,
    #[serde(default)]
    arg25_doi: Option<String>,
    #[serde(default)]
    nbar_doi: Option<String>,
    #[serde(default)]
    nbar_terrain_corrected_doi: Option<String>,
}

pub(super) fn fill_metadata(
    subset: NbarSubset,
    dataset: &mut DatasetMetadata,
    path: &Path,
    collaborators: &Collaborators,
) -> DatasetResult<()> {
    let document_path = path.join(METADATA_FILE);
    let document: NbarDocument = read_document(&document_path)?;

    let driver = Driver::Nbar(subset);
    let parent_grid = parent_for(&driver, dataset).map(|p| p.grid_spatial.clone());
    if let Some(grid_spatial) = parent_grid {
        borrow_from_sources(&driver, dataset);

        // Images aren't inspected here, so the grid comes from the parent.
        dataset.grid_spatial = grid_spatial;
        let region = driver.calculate_valid_data_region(
            path,
            None,
            collaborators.valid_region.as_ref(),
        )?;
        if let Some(region) = region {
            dataset.projection_mut().valid_data = Some(region);
        }
    }

    let info = &document.algorithm_information;
    let doi = match subset {
        NbarSubset::Brdf => info.nbar_doi.clone(),
        _ => info.nbar_terrain_corrected_doi.clone(),
    };
    let lineage = dataset.lineage_mut();
    lineage.algorithm = Some(AlgorithmMetadata {
        name: Some(subset.name().to_string()),
        version: Some(value_to_string(&info.algorithm_version)),
        doi,
        parameters: None,
    });
    dataset.product_doi = info.arg25_doi.clone();

    // BRDF entries are nested per band and type: flatten to `<band>_brdf_<type>`.
    let mut entries = BTreeMap::new();
    for (name, value) in &document.ancillary_data {
        if name == "brdf" {
            for (band, types) in as_mapping(value) {
                for (kind, entry) in as_mapping(types) {
                    let key = format!("{band}_brdf_{kind}");
                    let entry = parse_entry(&document_path, &key, entry)?;
                    entries.insert(key, entry);
                }
            }
        } else {
            entries.insert(name.clone(), parse_entry(&document_path, name, value)?);
        }
    }
    debug!(count = entries.len(), "Read NBAR ancillary entries");

    let parameters: BTreeMap<String, Value> = entries
        .iter()
        .filter_map(|(name, entry)| entry.value.clone().map(|v| (name.clone(), v)))
        .collect();
    let ancillary: BTreeMap<_, _> = entries
        .iter()
        .filter_map(|(name, entry)| {
            let data_file = entry.data_file.as_deref()?;
            let base_name = data_file.rsplit('/').next().map(str::to_string);
            Some((name.clone(), entry.to_metadata(name, base_name)))
        })
        .collect();

    let lineage = dataset.lineage_mut();
    if !parameters.is_empty() {
        if let Some(algorithm) = lineage.algorithm.as_mut() {
            algorithm.parameters = Some(parameters);
        }
    }
    if !ancillary.is_empty() {
        lineage.ancillary = Some(ancillary);
    }

    // All NBARs are P54.
    dataset.ga_level = Some("P54".to_string());
    dataset.format = Some(FormatMetadata::new("GeoTIFF"));
    Ok(())
}

/// Key/value pairs of a YAML mapping as strings; empty for anything else.
fn as_mapping(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(k, v)| (value_to_string(k), v))
            .collect(),
        _ => Vec::new(),
    }
}

pub(super) fn ga_label(subset: NbarSubset, dataset: &DatasetMetadata) -> DatasetResult<String> {
    fill_dataset_label(
        dataset,
        NBAR_TEMPLATE,
        &[("nbartype", subset.product_id().to_uppercase())],
    )
}

pub(super) fn include_file(subset: NbarSubset, path: &Path) -> bool {
    let name = file_name(path);
    lower_suffix(path) == ".tif"
        && (name.starts_with(&format!("{}-reflectance", subset.name()))
            || name.starts_with(&format!("reflectance_{}", subset.name())))
}

/// Band number from the last `_` or `-` separated token of the name,
/// eg. `reflectance_brdf_2.tif` or `..._20140126_B4.tif`.
fn band_number(path: &Path) -> String {
    let token = stem(path)
        .rsplit(['_', '-'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match token.strip_prefix('b') {
        Some(number) => number.to_string(),
        None => token,
    }
}

pub(super) fn translate_path(
    subset: NbarSubset,
    dataset: &DatasetMetadata,
    path: &Path,
) -> DatasetResult<PathBuf> {
    let label = ga_label(subset, dataset)?;
    Ok(PathBuf::from(format!("{}_B{}.tif", label, band_number(path))))
}

pub(super) fn to_band(path: &Path) -> BandMetadata {
    BandMetadata::new(path, band_number(path))
}
