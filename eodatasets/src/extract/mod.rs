//! Collaborator seams for format-specific work.
//!
//! Drivers don't parse instrument formats or rasters themselves. Instead they
//! call out to three kinds of collaborator:
//!
//! - [`Extractor`]: populates metadata fields from one family of source files
//!   (ADS folders, RCC files, MTL documents, ...)
//! - [`ValidRegionCalculator`]: computes the region of valid pixels in images
//! - [`BrowseImageCreator`]: renders a browse (preview) image after packaging
//!
//! Extractors are registered per [`FormatFamily`] in an [`ExtractorRegistry`].
//! A driver that asks for a family with nothing registered simply skips it.
//!
//! # Example
//!
//! ```
//! use eodatasets::extract::{Collaborators, FormatFamily};
//!
//! let collaborators = Collaborators::default();
//! assert!(collaborators.extractors.is_registered(FormatFamily::AdsFolder));
//! assert!(!collaborators.extractors.is_registered(FormatFamily::Rcc));
//! ```

mod adsfolder;
mod mdf;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::DatasetResult;
use crate::metadata::{BrowseMetadata, DatasetMetadata, ValidDataRegion};

pub use adsfolder::{parse_ads_filename, parse_ads_folder, AdsFile, AdsFolderExtractor};
pub use mdf::{parse_interval_id, IntervalId, MdfExtractor};

/// A family of source formats handled by one extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    /// Ground station ADS folder naming (`LANDSAT-8.11308`, `NNN.NNN.<time>.<gsi>`).
    AdsFolder,
    /// Landsat 5/7 raw RCC files.
    Rcc,
    /// Landsat 8 MDF interval folders.
    Mdf,
    /// Ground station `passinfo` documents.
    PassInfo,
    /// MODIS PDS files.
    Pds,
    /// NPP/VIIRS HDF5 files.
    NppHdf5,
    /// Level-1 MTL documents.
    Level1,
    /// Geometric quality assessment documents.
    Gqa,
    /// Raster image inspection (shape, cell size, projection).
    Image,
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatFamily::AdsFolder => "adsfolder",
            FormatFamily::Rcc => "rcc",
            FormatFamily::Mdf => "mdf",
            FormatFamily::PassInfo => "passinfo",
            FormatFamily::Pds => "pds",
            FormatFamily::NppHdf5 => "npphdf5",
            FormatFamily::Level1 => "level1",
            FormatFamily::Gqa => "gqa",
            FormatFamily::Image => "image",
        };
        write!(f, "{}", name)
    }
}

/// Populates metadata fields from source files of one format family.
///
/// Extractors fill what they recognise and leave everything else alone. A
/// path the extractor doesn't understand is not an error.
pub trait Extractor: Send + Sync {
    /// Fill `dataset` from files at `path` (and any caller-supplied extras).
    fn extract(
        &self,
        dataset: &mut DatasetMetadata,
        path: &Path,
        additional_files: &[PathBuf],
    ) -> DatasetResult<()>;
}

/// Extractors keyed by the format family they handle.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<FormatFamily, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the filename-driven extractors this crate ships.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(FormatFamily::AdsFolder, AdsFolderExtractor);
        registry.register(FormatFamily::Mdf, MdfExtractor);
        registry
    }

    /// Register (or replace) the extractor for a family.
    pub fn register(&mut self, family: FormatFamily, extractor: impl Extractor + 'static) {
        self.extractors.insert(family, Box::new(extractor));
    }

    pub fn is_registered(&self, family: FormatFamily) -> bool {
        self.extractors.contains_key(&family)
    }

    /// Run the extractor for `family`, if one is registered.
    pub fn run(
        &self,
        family: FormatFamily,
        dataset: &mut DatasetMetadata,
        path: &Path,
        additional_files: &[PathBuf],
    ) -> DatasetResult<()> {
        match self.extractors.get(&family) {
            Some(extractor) => {
                debug!(family = %family, path = %path.display(), "Running extractor");
                extractor.extract(dataset, path, additional_files)
            }
            None => {
                debug!(family = %family, "No extractor registered, skipping");
                Ok(())
            }
        }
    }

    /// Run extractors for each family in order.
    pub fn run_all(
        &self,
        families: &[FormatFamily],
        dataset: &mut DatasetMetadata,
        path: &Path,
        additional_files: &[PathBuf],
    ) -> DatasetResult<()> {
        for family in families {
            self.run(*family, dataset, path, additional_files)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<String> = self.extractors.keys().map(|k| k.to_string()).collect();
        families.sort();
        f.debug_struct("ExtractorRegistry")
            .field("families", &families)
            .finish()
    }
}

/// Computes the region of an image set containing valid data.
pub trait ValidRegionCalculator: Send + Sync {
    /// Compute the valid region over `images`.
    ///
    /// With a `mask_value`, a pixel is valid when that bit is set; otherwise
    /// any non-nodata pixel counts. `None` means the region is unknown.
    fn valid_region(
        &self,
        images: &[PathBuf],
        mask_value: Option<u32>,
    ) -> DatasetResult<Option<ValidDataRegion>>;
}

/// Calculator used when no raster support is plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidRegion;

impl ValidRegionCalculator for NoValidRegion {
    fn valid_region(
        &self,
        images: &[PathBuf],
        _mask_value: Option<u32>,
    ) -> DatasetResult<Option<ValidDataRegion>> {
        debug!(count = images.len(), "No valid region calculator configured");
        Ok(None)
    }
}

/// Creates browse images for a packaged dataset.
pub trait BrowseImageCreator: Send + Sync {
    /// Render browse images from `bands` (red, green, blue or a single band)
    /// into `target`, returning the entries to record keyed by name.
    ///
    /// Band paths in `dataset` already point at the packaged copies.
    fn create_browse_images(
        &self,
        dataset: &DatasetMetadata,
        bands: &[String],
        target: &Path,
    ) -> DatasetResult<BTreeMap<String, BrowseMetadata>>;
}

/// Everything a driver and the packager delegate to.
pub struct Collaborators {
    pub extractors: ExtractorRegistry,
    pub valid_region: Box<dyn ValidRegionCalculator>,
    pub browse: Option<Box<dyn BrowseImageCreator>>,
}

impl Collaborators {
    /// Builtin extractors, no raster support, no browse images.
    pub fn new() -> Self {
        Self {
            extractors: ExtractorRegistry::with_builtin(),
            valid_region: Box::new(NoValidRegion),
            browse: None,
        }
    }

    pub fn with_valid_region(mut self, calculator: impl ValidRegionCalculator + 'static) -> Self {
        self.valid_region = Box::new(calculator);
        self
    }

    pub fn with_browse(mut self, creator: impl BrowseImageCreator + 'static) -> Self {
        self.browse = Some(Box::new(creator));
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("extractors", &self.extractors)
            .field("browse", &self.browse.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PlatformMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
        platform: &'static str,
    }

    impl Extractor for CountingExtractor {
        fn extract(
            &self,
            dataset: &mut DatasetMetadata,
            _path: &Path,
            _additional_files: &[PathBuf],
        ) -> DatasetResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            dataset.platform = Some(PlatformMetadata::new(self.platform));
            Ok(())
        }
    }

    #[test]
    fn test_missing_family_is_skipped() {
        let registry = ExtractorRegistry::empty();
        let mut dataset = DatasetMetadata::new();
        registry
            .run(FormatFamily::Rcc, &mut dataset, Path::new("/nonexistent"), &[])
            .unwrap();
        assert!(dataset.platform.is_none());
    }

    #[test]
    fn test_run_all_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtractorRegistry::empty();
        registry.register(
            FormatFamily::Level1,
            CountingExtractor {
                calls: calls.clone(),
                platform: "LANDSAT_7",
            },
        );
        registry.register(
            FormatFamily::Gqa,
            CountingExtractor {
                calls: calls.clone(),
                platform: "LANDSAT_8",
            },
        );

        let mut dataset = DatasetMetadata::new();
        registry
            .run_all(
                &[FormatFamily::Level1, FormatFamily::Pds, FormatFamily::Gqa],
                &mut dataset,
                Path::new("/data"),
                &[],
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Last one wins.
        assert_eq!(dataset.platform_code(), Some("LANDSAT_8"));
    }

    #[test]
    fn test_register_replaces() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtractorRegistry::with_builtin();
        registry.register(
            FormatFamily::AdsFolder,
            CountingExtractor {
                calls: calls.clone(),
                platform: "AQUA",
            },
        );

        let mut dataset = DatasetMetadata::new();
        registry
            .run(FormatFamily::AdsFolder, &mut dataset, Path::new("/x"), &[])
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dataset.platform_code(), Some("AQUA"));
    }

    #[test]
    fn test_no_valid_region() {
        let region = NoValidRegion
            .valid_region(&[PathBuf::from("a.tif")], Some(0b1_0000_0000))
            .unwrap();
        assert!(region.is_none());
    }

    #[test]
    fn test_registry_debug_lists_families() {
        let debug = format!("{:?}", ExtractorRegistry::with_builtin());
        assert!(debug.contains("adsfolder"));
        assert!(debug.contains("mdf"));
    }
}
