//! Level-1 orthorectified imagery.

use std::path::{Path, PathBuf};

use crate::error::{DatasetError, DatasetResult};
use crate::extract::{Collaborators, FormatFamily};
use crate::label::{fill_dataset_label, ORTHO_TEMPLATE};
use crate::metadata::{BandMetadata, DatasetMetadata};

use super::{file_name, lower_suffix, stem};

pub(super) fn fill_metadata(
    dataset: &mut DatasetMetadata,
    path: &Path,
    additional_files: &[PathBuf],
    collaborators: &Collaborators,
) -> DatasetResult<()> {
    collaborators.extractors.run_all(
        &[FormatFamily::Level1, FormatFamily::Gqa],
        dataset,
        path,
        additional_files,
    )
}

pub(super) fn include_file(path: &Path) -> bool {
    !file_name(path).ends_with(".aux.xml")
}

pub(super) fn to_band(path: &Path) -> DatasetResult<Option<BandMetadata>> {
    if lower_suffix(path) != ".tif" {
        return Ok(None);
    }

    let name = stem(path).to_lowercase();

    // DEM images ship with the product but aren't bands.
    if name.ends_with("_dem") {
        return Ok(None);
    }

    // Images end in a band number, eg. `_B12.tif` or `_B6_VCID_2.tif`.
    let Some(position) = name.rfind("_b") else {
        return Err(DatasetError::UnexpectedFilename {
            driver: "level1".to_string(),
            path: path.to_path_buf(),
        });
    };

    Ok(Some(BandMetadata::new(path, &name[position + 2..])))
}

pub(super) fn ga_label(dataset: &DatasetMetadata) -> DatasetResult<String> {
    // Definitive ancillary data is normal, anything else is flagged.
    let ancillary_flag = match dataset
        .lineage
        .as_ref()
        .and_then(|l| l.ancillary_quality.as_deref())
    {
        Some(quality) if !quality.is_empty() && quality != "DEFINITIVE" => format!("-{quality}"),
        _ => String::new(),
    };

    fill_dataset_label(dataset, ORTHO_TEMPLATE, &[("ancillary_flag", ancillary_flag)])
}

#[cfg(test)]
mod tests {
    use crate::driver::Driver;
    use crate::error::DatasetError;
    use crate::metadata::{
        AcquisitionMetadata, DatasetMetadata, ExtentMetadata, GroundstationMetadata,
        InstrumentMetadata, PlatformMetadata, RefPoint,
    };
    use chrono::NaiveDate;
    use std::path::{Path, PathBuf};

    fn band_number(path: &str) -> Option<String> {
        Driver::Ortho
            .to_band(&DatasetMetadata::new(), Path::new(path))
            .unwrap()
            .map(|b| b.number)
    }

    #[test]
    fn test_band_numbers() {
        assert_eq!(
            band_number("/tmp/out/LT51030782005002ASA00_B3.TIF").as_deref(),
            Some("3")
        );
        assert_eq!(
            band_number("/tmp/out/LC81090852015088LGN00_B10.tif").as_deref(),
            Some("10")
        );
        assert_eq!(
            band_number("/data/output/LE70900782007292ASA00_B6_VCID_2.TIF").as_deref(),
            Some("6_vcid_2")
        );
    }

    #[test]
    fn test_band_keeps_source_path() {
        let band = Driver::Ortho
            .to_band(
                &DatasetMetadata::new(),
                Path::new("/tmp/out/LT51030782005002ASA00_B3.TIF"),
            )
            .unwrap()
            .unwrap();
        assert_eq!(band.path, PathBuf::from("/tmp/out/LT51030782005002ASA00_B3.TIF"));
    }

    #[test]
    fn test_non_bands() {
        assert_eq!(band_number("/tmp/out/LC81090852015088LGN00_MTL.txt"), None);
        assert_eq!(band_number("/tmp/out/passinfo"), None);
        assert_eq!(
            band_number("LT05_L1TP_108078_20060703_20170309_01_T1_DEM.TIF"),
            None
        );
    }

    #[test]
    fn test_unexpected_tif_fails() {
        let result = Driver::Ortho.to_band(
            &DatasetMetadata::new(),
            Path::new("/tmp/out/LC81090852015088LGN00.tif"),
        );
        assert!(matches!(
            result,
            Err(DatasetError::UnexpectedFilename { .. })
        ));
    }

    #[test]
    fn test_include_file_skips_aux_xml() {
        assert!(!Driver::Ortho.include_file(Path::new("something.TIF.aux.xml")));
        assert!(Driver::Ortho.include_file(Path::new("LC81120792014026ASA00_B5.TIF")));
    }

    fn ls7_ortho() -> DatasetMetadata {
        let mut dataset = DatasetMetadata::new();
        dataset.platform = Some(PlatformMetadata::new("LANDSAT_7"));
        dataset.instrument = Some(InstrumentMetadata::new("ETM"));
        dataset.product_level = Some("L1G".to_string());
        dataset.projection_mut().orientation = Some("NORTH_UP".to_string());
        dataset.acquisition = Some(AcquisitionMetadata {
            groundstation: Some(GroundstationMetadata::new("ASA")),
            ..Default::default()
        });
        dataset.extent = Some(ExtentMetadata {
            center_dt: NaiveDate::from_ymd_opt(2005, 1, 7)
                .unwrap()
                .and_hms_opt(2, 3, 32),
            ..Default::default()
        });
        dataset.image_mut().satellite_ref_point_start = Some(RefPoint::new(114, 73));
        dataset
    }

    #[test]
    fn test_ortho_ls7_label() {
        assert_eq!(
            Driver::Ortho.ga_label(&ls7_ortho()).unwrap(),
            "LS7_ETM_SYS_P31_GALPGS01-002_114_073_20050107"
        );
    }

    #[test]
    fn test_ancillary_quality_flag() {
        let mut dataset = ls7_ortho();
        dataset.lineage_mut().ancillary_quality = Some("PREDICTIVE".to_string());
        assert_eq!(
            Driver::Ortho.ga_label(&dataset).unwrap(),
            "LS7_ETM_SYS_P31-PREDICTIVE_GALPGS01-002_114_073_20050107"
        );

        dataset.lineage_mut().ancillary_quality = Some("DEFINITIVE".to_string());
        assert_eq!(
            Driver::Ortho.ga_label(&dataset).unwrap(),
            "LS7_ETM_SYS_P31_GALPGS01-002_114_073_20050107"
        );
    }
}
