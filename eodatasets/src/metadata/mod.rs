//! Dataset metadata model.
//!
//! [`DatasetMetadata`] is the aggregate describing one dataset and its
//! ancestry. It mirrors the fields of the `ga-metadata.yaml` document
//! one-to-one so it can be (de)serialised directly with serde.
//!
//! # Type Hierarchy
//!
//! ```text
//! DatasetMetadata
//! ├── platform / instrument / format / usgs
//! ├── acquisition ── groundstation
//! ├── extent ─────── coord (CoordPolygon)
//! ├── grid_spatial ─ projection ── valid_data
//! ├── image ──────── bands: { id → BandMetadata }
//! ├── browse:        { name → BrowseMetadata }
//! ├── ancillary_files
//! └── lineage ────── algorithm / machine / ancillary
//!                    source_datasets: { product type → DatasetMetadata }
//! ```
//!
//! Parent datasets under `lineage.source_datasets` are owned copies of
//! already-packaged metadata and are never modified by a child's processing.

mod paths;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use paths::{absolutize_path, rebase_path, relativize_path};

/// Ancillary file type recorded for packaged files that aren't bands.
pub const ANCILLARY_FILE_TYPE_OTHER: &str = "other";

/// A projected (or pixel) coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A satellite reference point (path/row for Landsat).
///
/// Either value may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
}

impl RefPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            height: None,
        }
    }
}

/// Corner coordinates in latitude/longitude.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordPolygon {
    pub ul: Coord,
    pub ur: Coord,
    pub ll: Coord,
    pub lr: Coord,
}

/// Corner coordinates in the dataset's own projection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointPolygon {
    pub ul: Point,
    pub ur: Point,
    pub ll: Point,
    pub lr: Point,
}

/// Region of an image containing valid data, as a GeoJSON-style polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidDataRegion {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl ValidDataRegion {
    /// A polygon with a single exterior ring.
    pub fn polygon(ring: Vec<[f64; 2]>) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![ring],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformMetadata {
    /// Eg. `LANDSAT_8`, `AQUA`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl PlatformMetadata {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentMetadata {
    /// Eg. `OLI_TIRS`, `ETM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_mode: Option<String>,
}

impl InstrumentMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatMetadata {
    /// Eg. `GeoTIFF`, `MD`, `RCC`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl FormatMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: None,
        }
    }
}

/// USGS identifiers.
///
/// A `(dataset_name, entity_id)` pair identifies a dataset in the USGS API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsgsMetadata {
    /// Typical format: `LXSPPPRRRYYYYDDDGSIVV`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundstationMetadata {
    /// GSI code of the station, eg. `ASA`.
    pub code: String,
    /// Common name, eg. `Alice Springs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Domain code as seen in EODS and dataset labels, eg. `002`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eods_domain_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antenna_coord: Option<Coord>,
}

impl GroundstationMetadata {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionMetadata {
    /// Acquisition of signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aos: Option<NaiveDateTime>,
    /// Loss of signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub los: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groundstation: Option<GroundstationMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_orbit: Option<u64>,
}

impl AcquisitionMetadata {
    /// Fill every unset field from `other`, leaving set fields alone.
    pub fn fill_gaps_from(&mut self, other: &AcquisitionMetadata) {
        fill(&mut self.aos, &other.aos);
        fill(&mut self.los, &other.los);
        fill(&mut self.groundstation, &other.groundstation);
        fill(&mut self.heading, &other.heading);
        fill(&mut self.platform_orbit, &other.platform_orbit);
    }
}

/// Standardised spatial and temporal extent (WGS84/GDA94 coordinates).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coord: Option<CoordPolygon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_dt: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_dt: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_dt: Option<NaiveDateTime>,
}

impl ExtentMetadata {
    /// Fill every unset field from `other`, leaving set fields alone.
    pub fn fill_gaps_from(&mut self, other: &ExtentMetadata) {
        fill(&mut self.reference_system, &other.reference_system);
        fill(&mut self.coord, &other.coord);
        fill(&mut self.from_dt, &other.from_dt);
        fill(&mut self.center_dt, &other.center_dt);
        fill(&mut self.to_dt, &other.to_dt);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionMetadata {
    pub name: String,
    pub resolution: f64,
    pub size: u64,
}

/// Projection and datum of the image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centre_point: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_ref_points: Option<PointPolygon>,
    /// Eg. `GDA94`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum: Option<String>,
    /// Eg. `GRS80`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipsoid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_in_pixel: Option<String>,
    /// Eg. `UTM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_projection: Option<String>,
    /// Eg. `NORTH_UP`, `NOMINAL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resampling_option: Option<String>,
    /// Eg. -53
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_data: Option<ValidDataRegion>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpatialMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<DimensionMetadata>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseMetadata {
    pub path: PathBuf,
    /// Eg. `image/jpeg`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_band: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green_band: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue_band: Option<String>,
}

/// One spectral or quality image channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BandMetadata {
    pub path: PathBuf,
    /// Offset of the band within its file (for multi-band files).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_offset: Option<String>,
    /// Eg. `thermal`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Eg. `visible_red`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Satellite band number. Not always numeric (`6_vcid_1`, `pqa`).
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_size: Option<Point>,
}

impl BandMetadata {
    pub fn new(path: impl Into<PathBuf>, number: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            number: number.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_ref_point_start: Option<RefPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_ref_point_end: Option<RefPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sun_azimuth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sun_elevation: Option<f64>,
    /// 0 to 100: estimated percentage of the image in daytime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_percentage_estimate: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bands: BTreeMap<String, BandMetadata>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, serde_yaml::Value>>,
}

/// Machine a dataset was processed on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Generated once per process run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Software versions by collection, eg. `{"rust": {"eodatasets": "0.4.0"}}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uname: Option<String>,
}

/// An ancillary input used by a processing algorithm.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AncillaryMetadata {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_dt: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_dt: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<AlgorithmMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineMetadata>,
    /// `PREDICTIVE` or `DEFINITIVE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancillary_quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancillary: Option<BTreeMap<String, AncillaryMetadata>>,
    /// Parent datasets keyed by their product type.
    pub source_datasets: BTreeMap<String, DatasetMetadata>,
}

/// A packaged file that isn't an image band.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AncillaryFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: PathBuf,
    pub description: String,
}

impl AncillaryFile {
    /// An unclassified ancillary file.
    pub fn other(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ANCILLARY_FILE_TYPE_OTHER.to_string(),
            path: path.into(),
            description: String::new(),
        }
    }
}

/// Metadata for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetMetadata {
    pub id: Uuid,
    /// Formally known as the `dataset_id`.
    /// Eg. `LS7_ETM_SYS_P31_GALPGS01-002_114_073_20050107`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ga_label: Option<String>,
    /// Eg. `P00`, `P51`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ga_level: Option<String>,
    /// Driver id of the product, eg. `level1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// `L1T`, `L1G`, `L1GT` etc. if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_dt: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usgs: Option<UsgsMetadata>,
    /// Reception string from the ground station's management system.
    /// Eg. `S1A1C1D1R1`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<InstrumentMetadata>,
    #[serde(rename = "format", skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition: Option<AcquisitionMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<ExtentMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_spatial: Option<GridSpatialMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browse: Option<BTreeMap<String, BrowseMetadata>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_flags: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<LineageMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ancillary_files: Vec<AncillaryFile>,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self::with_id(Uuid::new_v4())
    }
}

impl DatasetMetadata {
    /// Create empty metadata with a fresh random id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty metadata with the given id.
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            ga_label: None,
            ga_level: None,
            product_type: None,
            product_level: None,
            product_doi: None,
            creation_dt: None,
            size_bytes: None,
            checksum_path: None,
            usgs: None,
            rms_string: None,
            platform: None,
            instrument: None,
            format: None,
            acquisition: None,
            extent: None,
            grid_spatial: None,
            browse: None,
            image: None,
            product_flags: None,
            lineage: None,
            ancillary_files: Vec::new(),
        }
    }

    /// Platform code, if known.
    pub fn platform_code(&self) -> Option<&str> {
        self.platform.as_ref().and_then(|p| p.code.as_deref())
    }

    /// Instrument name, if known.
    pub fn instrument_name(&self) -> Option<&str> {
        self.instrument.as_ref().and_then(|i| i.name.as_deref())
    }

    /// Projection orientation, if known.
    pub fn orientation(&self) -> Option<&str> {
        self.grid_spatial
            .as_ref()
            .and_then(|g| g.projection.as_ref())
            .and_then(|p| p.orientation.as_deref())
    }

    /// Parent dataset recorded under the given product type.
    pub fn source_dataset(&self, product_type: &str) -> Option<&DatasetMetadata> {
        self.lineage
            .as_ref()
            .and_then(|l| l.source_datasets.get(product_type))
    }

    pub fn image_mut(&mut self) -> &mut ImageMetadata {
        self.image.get_or_insert_with(ImageMetadata::default)
    }

    pub fn extent_mut(&mut self) -> &mut ExtentMetadata {
        self.extent.get_or_insert_with(ExtentMetadata::default)
    }

    pub fn acquisition_mut(&mut self) -> &mut AcquisitionMetadata {
        self.acquisition
            .get_or_insert_with(AcquisitionMetadata::default)
    }

    pub fn lineage_mut(&mut self) -> &mut LineageMetadata {
        self.lineage.get_or_insert_with(LineageMetadata::default)
    }

    pub fn projection_mut(&mut self) -> &mut ProjectionMetadata {
        self.grid_spatial
            .get_or_insert_with(GridSpatialMetadata::default)
            .projection
            .get_or_insert_with(ProjectionMetadata::default)
    }

    /// Apply `f` to every file path recorded in this dataset and its parents.
    pub fn map_paths<F>(&mut self, f: &F)
    where
        F: Fn(&Path) -> PathBuf,
    {
        if let Some(checksum_path) = self.checksum_path.as_mut() {
            *checksum_path = f(checksum_path);
        }
        if let Some(image) = self.image.as_mut() {
            for band in image.bands.values_mut() {
                band.path = f(&band.path);
            }
        }
        if let Some(browse) = self.browse.as_mut() {
            for entry in browse.values_mut() {
                entry.path = f(&entry.path);
            }
        }
        for file in self.ancillary_files.iter_mut() {
            file.path = f(&file.path);
        }
        if let Some(lineage) = self.lineage.as_mut() {
            for source in lineage.source_datasets.values_mut() {
                source.map_paths(f);
            }
        }
    }
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}
