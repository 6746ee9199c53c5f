//! Pixel quality (PQA) products.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use super::ancillary::{parse_entry, read_document, value_to_string};
use super::{file_name, lower_suffix, Driver};
use crate::error::DatasetResult;
use crate::extract::Collaborators;
use crate::label::{fill_dataset_label, PQA_TEMPLATE};
use crate::lineage::{borrow_from_sources, parent_for};
use crate::metadata::{AlgorithmMetadata, BandMetadata, DatasetMetadata, FormatMetadata};

/// Location of the processing document within the source folder.
pub(super) const METADATA_FILE: &str = "metadata/pq-metadata.yaml";

/// Bit set in a PQ pixel when all bands contain data.
pub const CONTIGUOUS_DATA_BIT: u32 = 0b1_0000_0000;

/// Band id of the single PQ band.
pub const PQA_BAND: &str = "pqa";

#[derive(Debug, Deserialize)]
struct PqDocument {
    algorithm_information: AlgorithmInformation,
    #[serde(default)]
    ancillary: BTreeMap<String, Value>,
    #[serde(default)]
    tests_run: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct AlgorithmInformation {
    software_version: Value,
    #[serde(default)]
    pq_doi: Option<String>,
}

pub(super) fn fill_metadata(
    dataset: &mut DatasetMetadata,
    path: &Path,
    collaborators: &Collaborators,
) -> DatasetResult<()> {
    dataset.ga_level = Some("P55".to_string());

    let driver = Driver::Pqa;
    let parent_grid = parent_for(&driver, dataset).map(|p| p.grid_spatial.clone());
    if let Some(grid_spatial) = parent_grid {
        borrow_from_sources(&driver, dataset);

        dataset.grid_spatial = grid_spatial;
        let region = driver.calculate_valid_data_region(
            path,
            Some(CONTIGUOUS_DATA_BIT),
            collaborators.valid_region.as_ref(),
        )?;
        if let Some(region) = region {
            dataset.projection_mut().valid_data = Some(region);
        }
    }

    dataset.format = Some(FormatMetadata::new("GeoTIFF"));

    let document_path = path.join(METADATA_FILE);
    let document: PqDocument = read_document(&document_path)?;

    let mut ancillary = BTreeMap::new();
    for (name, value) in &document.ancillary {
        let entry = parse_entry(&document_path, name, value)?;
        let source = entry.data_source.as_ref().map(value_to_string);
        ancillary.insert(name.clone(), entry.to_metadata(name, source));
    }

    let lineage = dataset.lineage_mut();
    lineage.algorithm = Some(AlgorithmMetadata {
        name: Some("pqa".to_string()),
        version: Some(value_to_string(
            &document.algorithm_information.software_version,
        )),
        doi: document.algorithm_information.pq_doi.clone(),
        parameters: None,
    });
    if !ancillary.is_empty() {
        lineage.ancillary = Some(ancillary);
    }

    // Record which tests were run.
    let flags = document
        .tests_run
        .iter()
        .map(|(name, value)| (format!("tested_{name}"), value.clone()))
        .collect();
    dataset.product_flags = Some(flags);

    Ok(())
}

pub(super) fn ga_label(dataset: &DatasetMetadata) -> DatasetResult<String> {
    // Eg. `LS8_OLITIRS_PQ_P55_GAPQ01-032_090_081_20140726`
    fill_dataset_label(dataset, PQA_TEMPLATE, &[])
}

pub(super) fn include_file(path: &Path) -> bool {
    lower_suffix(path) == ".tif" && file_name(path).starts_with("pixel-quality")
}

/// Images are renamed to the label, keeping their directory.
pub(super) fn translate_path(dataset: &DatasetMetadata, path: &Path) -> DatasetResult<PathBuf> {
    let suffix = lower_suffix(path);
    if suffix != ".tif" {
        return Ok(path.to_path_buf());
    }
    let label = ga_label(dataset)?;
    Ok(path.with_file_name(format!("{label}{suffix}")))
}

pub(super) fn to_band(path: &Path) -> Option<BandMetadata> {
    if path.extension().and_then(|e| e.to_str()) != Some("tif") {
        return None;
    }
    Some(BandMetadata::new(path, PQA_BAND))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NbarSubset;
    use crate::metadata::{
        AcquisitionMetadata, ExtentMetadata, GroundstationMetadata, InstrumentMetadata,
        PlatformMetadata, RefPoint,
    };
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    const PQ_DOCUMENT: &str = r#"
algorithm_information:
  software_version: 1.0.2
  pq_doi: http://dx.doi.org/10.1109/IGARSS.2013.6723746
ancillary:
  sun_elevation:
    data_source: ACCA
    data_file: /g/data/v10/ancillary/sun.txt
    user: u08
    accessed: 2015-09-22 06:20:14
    modified: 2015-09-21 00:00:00
tests_run:
  band_saturation: true
  cloud_acca: false
"#;

    fn expected_pqa() -> DatasetMetadata {
        let mut dataset = DatasetMetadata::new();
        dataset.ga_level = Some("P55".to_string());
        dataset.platform = Some(PlatformMetadata::new("LANDSAT_8"));
        dataset.instrument = Some(InstrumentMetadata::new("OLI_TIRS"));
        dataset.format = Some(FormatMetadata::new("GeoTIFF"));
        dataset.acquisition = Some(AcquisitionMetadata {
            groundstation: Some(GroundstationMetadata::new("LGN")),
            ..Default::default()
        });
        dataset.extent = Some(ExtentMetadata {
            center_dt: NaiveDate::from_ymd_opt(2014, 10, 12)
                .unwrap()
                .and_hms_micro_opt(0, 56, 6, 5785),
            ..Default::default()
        });
        dataset.image_mut().satellite_ref_point_start = Some(RefPoint::new(101, 78));
        dataset
    }

    #[test]
    fn test_pqa_label() {
        assert_eq!(
            Driver::Pqa.ga_label(&expected_pqa()).unwrap(),
            "LS8_OLITIRS_PQ_P55_GAPQ01-032_101_078_20141012"
        );
    }

    #[test]
    fn test_pqa_label_ignores_ancillary_quality() {
        let mut dataset = expected_pqa();
        dataset.lineage_mut().ancillary_quality = Some("PREDICTIVE".to_string());
        assert_eq!(
            Driver::Pqa.ga_label(&dataset).unwrap(),
            "LS8_OLITIRS_PQ_P55_GAPQ01-032_101_078_20141012"
        );
    }

    #[test]
    fn test_pqa_to_band() {
        let dataset = expected_pqa();
        let band = Driver::Pqa
            .to_band(&dataset, Path::new("/in/pqa.tif"))
            .unwrap()
            .unwrap();
        assert_eq!(band, BandMetadata::new("/in/pqa.tif", "pqa"));

        assert!(Driver::Pqa
            .to_band(&dataset, Path::new("/in/process.log"))
            .unwrap()
            .is_none());
        assert!(Driver::Pqa
            .to_band(&dataset, Path::new("/in/passinfo"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pqa_translate_path() {
        let dataset = expected_pqa();
        assert_eq!(
            Driver::Pqa
                .translate_path(&dataset, Path::new("out/pixel-quality.tif"))
                .unwrap(),
            PathBuf::from("out/LS8_OLITIRS_PQ_P55_GAPQ01-032_101_078_20141012.tif")
        );
        assert_eq!(
            Driver::Pqa
                .translate_path(&dataset, Path::new("process.log"))
                .unwrap(),
            PathBuf::from("process.log")
        );
    }

    #[test]
    fn test_pqa_include_file() {
        assert!(Driver::Pqa.include_file(Path::new("pixel-quality-1.tif")));
        assert!(Driver::Pqa.include_file(Path::new("pixel-quality.TIF")));
        assert!(!Driver::Pqa.include_file(Path::new("pqa.tif")));
        assert!(!Driver::Pqa.include_file(Path::new("pixel-quality.log")));
    }

    #[test]
    fn test_pqa_fill_from_nbar_parent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("metadata")).unwrap();
        fs::write(temp.path().join(METADATA_FILE), PQ_DOCUMENT).unwrap();

        let mut nbar = expected_pqa();
        nbar.ga_level = Some("P54".to_string());
        nbar.product_type = Some(NbarSubset::Brdf.product_id().to_string());

        let mut dataset = DatasetMetadata::new();
        dataset
            .lineage_mut()
            .source_datasets
            .insert("nbar".to_string(), nbar);

        Driver::Pqa
            .fill_metadata(&mut dataset, temp.path(), &[], &Collaborators::default())
            .unwrap();

        assert_eq!(dataset.ga_level.as_deref(), Some("P55"));
        assert_eq!(dataset.platform_code(), Some("LANDSAT_8"));
        assert_eq!(
            dataset.image.as_ref().unwrap().satellite_ref_point_start,
            Some(RefPoint::new(101, 78))
        );

        let lineage = dataset.lineage.as_ref().unwrap();
        let algorithm = lineage.algorithm.as_ref().unwrap();
        assert_eq!(algorithm.name.as_deref(), Some("pqa"));
        assert_eq!(algorithm.version.as_deref(), Some("1.0.2"));
        let sun = &lineage.ancillary.as_ref().unwrap()["sun_elevation"];
        assert_eq!(sun.name.as_deref(), Some("ACCA"));
        assert_eq!(sun.uri.as_deref(), Some("/g/data/v10/ancillary/sun.txt"));

        let flags = dataset.product_flags.as_ref().unwrap();
        assert_eq!(flags["tested_band_saturation"], Value::Bool(true));
        assert_eq!(flags["tested_cloud_acca"], Value::Bool(false));

        assert_eq!(
            Driver::Pqa.ga_label(&dataset).unwrap(),
            "LS8_OLITIRS_PQ_P55_GAPQ01-032_101_078_20141012"
        );
    }
}
