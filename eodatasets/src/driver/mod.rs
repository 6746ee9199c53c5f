//! Dataset drivers.
//!
//! A [`Driver`] encapsulates the rules for one product type: how to populate
//! metadata from a source folder, which files to include, how to name them,
//! which of them are image bands and how to label the packaged dataset.
//!
//! Drivers form a closed set. Each variant's rules live in its own module and
//! are dispatched from here.
//!
//! | Key                | Driver                    | Id                         | Expected source         |
//! |--------------------|---------------------------|----------------------------|-------------------------|
//! | `raw`              | [`Driver::Raw`]           | `satellite_telemetry_data` | none                    |
//! | `level1`, `ortho`  | [`Driver::Ortho`]         | `level1`                   | raw                     |
//! | `nbar`             | [`Driver::Nbar`] (brdf)   | `nbar`                     | level1                  |
//! | `nbart`            | [`Driver::Nbar`] (terrain)| `nbart`                    | level1                  |
//! | `lambertian`       | [`Driver::Nbar`]          | `lambertian`               | level1                  |
//! | `pqa`              | [`Driver::Pqa`]           | `pqa`                      | nbar, then level1       |
//! | `eods`             | [`Driver::Eods`]          | `EODS`                     | none                    |

mod ancillary;
mod eods;
mod nbar;
mod ortho;
mod pqa;
mod raw;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{DatasetError, DatasetResult};
use crate::extract::{Collaborators, ValidRegionCalculator};
use crate::metadata::{BandMetadata, DatasetMetadata, ValidDataRegion};

pub use eods::{parse_eods_name, EodsName};

/// Which portion of a surface reflectance product to package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NbarSubset {
    /// BRDF corrected.
    Brdf,
    /// Terrain corrected.
    Terrain,
    Lambertian,
}

impl NbarSubset {
    /// Subset name as used in source filenames.
    pub fn name(&self) -> &'static str {
        match self {
            NbarSubset::Brdf => "brdf",
            NbarSubset::Terrain => "terrain",
            NbarSubset::Lambertian => "lambertian",
        }
    }

    /// Product id of the packaged subset.
    pub fn product_id(&self) -> &'static str {
        match self {
            NbarSubset::Brdf => "nbar",
            NbarSubset::Terrain => "nbart",
            NbarSubset::Lambertian => "lambertian",
        }
    }
}

/// A dataset driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// Raw satellite telemetry.
    Raw,
    /// Level-1 orthorectified imagery.
    Ortho,
    /// Surface reflectance.
    Nbar(NbarSubset),
    /// Pixel quality.
    Pqa,
    /// Legacy EODS packages.
    Eods,
}

/// Keys accepted by [`Driver::from_key`].
pub const PACKAGE_DRIVER_KEYS: &[&str] = &[
    "raw",
    "pqa",
    "level1",
    "nbar",
    "nbart",
    "lambertian",
    "eods",
    "ortho",
];

const NO_SOURCES: &[Driver] = &[];
const RAW_SOURCES: &[Driver] = &[Driver::Raw];
const ORTHO_SOURCES: &[Driver] = &[Driver::Ortho];
const PQA_SOURCES: &[Driver] = &[Driver::Nbar(NbarSubset::Brdf), Driver::Ortho];

/// Default browse bands (red, green, blue) per platform.
const SATELLITE_BROWSE_BANDS: &[(&str, [&str; 3])] = &[
    ("LANDSAT_5", ["7", "4", "1"]),
    ("LANDSAT_7", ["7", "4", "1"]),
    ("LANDSAT_8", ["7", "5", "2"]),
];

impl Driver {
    /// Look up a driver by its package key.
    ///
    /// # Examples
    ///
    /// ```
    /// use eodatasets::{Driver, NbarSubset};
    ///
    /// assert_eq!(Driver::from_key("nbart").unwrap(), Driver::Nbar(NbarSubset::Terrain));
    /// assert_eq!(Driver::from_key("ortho").unwrap(), Driver::Ortho);
    /// assert!(Driver::from_key("nope").is_err());
    /// ```
    pub fn from_key(key: &str) -> DatasetResult<Self> {
        match key {
            "raw" => Ok(Driver::Raw),
            "pqa" => Ok(Driver::Pqa),
            "level1" | "ortho" => Ok(Driver::Ortho),
            "nbar" => Ok(Driver::Nbar(NbarSubset::Brdf)),
            "nbart" => Ok(Driver::Nbar(NbarSubset::Terrain)),
            "lambertian" => Ok(Driver::Nbar(NbarSubset::Lambertian)),
            "eods" => Ok(Driver::Eods),
            other => Err(DatasetError::UnknownDriver(other.to_string())),
        }
    }

    /// Short identifier of the product type, eg. `nbar`.
    ///
    /// Recorded as the dataset's `product_type` and used as its key in a
    /// child's `source_datasets`.
    pub fn id(&self) -> &'static str {
        match self {
            Driver::Raw => "satellite_telemetry_data",
            Driver::Ortho => "level1",
            Driver::Nbar(subset) => subset.product_id(),
            Driver::Pqa => "pqa",
            Driver::Eods => "EODS",
        }
    }

    /// Candidate parent drivers, in order of preference.
    pub fn expected_sources(&self) -> &'static [Driver] {
        match self {
            Driver::Raw | Driver::Eods => NO_SOURCES,
            Driver::Ortho => RAW_SOURCES,
            Driver::Nbar(_) => ORTHO_SOURCES,
            Driver::Pqa => PQA_SOURCES,
        }
    }

    /// Preferred parent driver, if the product has one.
    pub fn expected_source(&self) -> Option<Driver> {
        self.expected_sources().first().copied()
    }

    /// Populate `dataset` from the source at `path`.
    pub fn fill_metadata(
        &self,
        dataset: &mut DatasetMetadata,
        path: &Path,
        additional_files: &[PathBuf],
        collaborators: &Collaborators,
    ) -> DatasetResult<()> {
        debug!(driver = %self, path = %path.display(), "Filling metadata");
        match self {
            Driver::Raw => raw::fill_metadata(dataset, path, additional_files, collaborators),
            Driver::Ortho => ortho::fill_metadata(dataset, path, additional_files, collaborators),
            Driver::Nbar(subset) => nbar::fill_metadata(*subset, dataset, path, collaborators),
            Driver::Pqa => pqa::fill_metadata(dataset, path, collaborators),
            Driver::Eods => eods::fill_metadata(dataset, path, additional_files, collaborators),
        }
    }

    /// Generate the GA label for a dataset.
    pub fn ga_label(&self, dataset: &DatasetMetadata) -> DatasetResult<String> {
        match self {
            Driver::Raw => raw::ga_label(dataset),
            Driver::Ortho => ortho::ga_label(dataset),
            Driver::Nbar(subset) => nbar::ga_label(*subset, dataset),
            Driver::Pqa => pqa::ga_label(dataset),
            Driver::Eods => dataset.ga_label.clone().ok_or_else(|| {
                DatasetError::IncompletePackage("EODS dataset has no label".to_string())
            }),
        }
    }

    /// Whether a source file belongs in the package.
    pub fn include_file(&self, path: &Path) -> bool {
        match self {
            Driver::Ortho => ortho::include_file(path),
            Driver::Nbar(subset) => nbar::include_file(*subset, path),
            Driver::Pqa => pqa::include_file(path),
            Driver::Raw | Driver::Eods => true,
        }
    }

    /// Rename a source file (relative to the source root) for packaging.
    pub fn translate_path(&self, dataset: &DatasetMetadata, path: &Path) -> DatasetResult<PathBuf> {
        match self {
            Driver::Nbar(subset) => nbar::translate_path(*subset, dataset, path),
            Driver::Pqa => pqa::translate_path(dataset, path),
            _ => Ok(path.to_path_buf()),
        }
    }

    /// The band a file represents, if any.
    ///
    /// Files that aren't bands are still packaged, as ancillary files.
    pub fn to_band(
        &self,
        _dataset: &DatasetMetadata,
        path: &Path,
    ) -> DatasetResult<Option<BandMetadata>> {
        match self {
            Driver::Raw => Ok(None),
            Driver::Ortho => ortho::to_band(path),
            Driver::Nbar(_) => Ok(Some(nbar::to_band(path))),
            Driver::Pqa => Ok(pqa::to_band(path)),
            Driver::Eods => eods::to_band(path),
        }
    }

    /// Band ids for an RGB (or single band) browse image.
    pub fn browse_image_bands(&self, dataset: &DatasetMetadata) -> DatasetResult<Vec<String>> {
        if *self == Driver::Pqa {
            return Ok(vec!["pqa".to_string()]);
        }

        let platform = dataset.platform_code().unwrap_or_default();
        SATELLITE_BROWSE_BANDS
            .iter()
            .find(|(code, _)| *code == platform)
            .map(|(_, bands)| bands.iter().map(|b| b.to_string()).collect())
            .ok_or_else(|| DatasetError::UnknownBrowseBands(platform.to_string()))
    }

    /// Compute the valid data region over every included file under `path`.
    pub fn calculate_valid_data_region(
        &self,
        path: &Path,
        mask_value: Option<u32>,
        calculator: &dyn ValidRegionCalculator,
    ) -> DatasetResult<Option<ValidDataRegion>> {
        let mut images = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| walk_error(path, e))?;
            if entry.file_type().is_file() && self.include_file(entry.path()) {
                images.push(entry.into_path());
            }
        }
        calculator.valid_region(&images, mask_value)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

pub(crate) fn walk_error(root: &Path, err: walkdir::Error) -> DatasetError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
    DatasetError::io(path, source)
}

/// Lower-cased file extension including the dot, eg. `.tif`.
pub(crate) fn lower_suffix(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// File stem as a string (empty if not valid UTF-8).
pub(crate) fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// File name as a string (empty if not valid UTF-8).
pub(crate) fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or_default()
}
