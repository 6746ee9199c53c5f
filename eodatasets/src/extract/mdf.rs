//! Metadata from Landsat 8 MDF interval folders.
//!
//! An interval id has the form `LXSPPPRRRrrrYYYYDDDGSIVV`:
//!
//! | Part  | Meaning                                   |
//! |-------|-------------------------------------------|
//! | `L`   | Landsat                                   |
//! | `X`   | sensor: `C` OLI+TIRS, `O` OLI, `T` TIRS    |
//! | `S`   | satellite number                          |
//! | `PPP` | WRS path                                  |
//! | `RRR` | first row                                 |
//! | `rrr` | last row                                  |
//! | `YYYYDDD` | acquisition year and day of year      |
//! | `GSI` | ground station                            |
//! | `VV`  | version                                   |
//!
//! The id is read from the folder name, or failing that from the
//! `<id>_MD5.txt` / `<id>_IDF.xml` files inside it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use super::Extractor;
use crate::error::{DatasetError, DatasetResult};
use crate::metadata::{
    DatasetMetadata, FormatMetadata, GroundstationMetadata, InstrumentMetadata, PlatformMetadata,
    RefPoint, UsgsMetadata,
};

/// A parsed USGS interval id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalId {
    pub id: String,
    pub sensor: char,
    pub satellite: u8,
    pub path: u32,
    pub start_row: u32,
    pub end_row: u32,
    pub date: NaiveDate,
    pub gsi: String,
    pub version: u32,
}

impl IntervalId {
    /// Instrument name for the sensor letter.
    pub fn instrument(&self) -> Option<&'static str> {
        match self.sensor {
            'C' => Some("OLI_TIRS"),
            'O' => Some("OLI"),
            'T' => Some("TIRS"),
            _ => None,
        }
    }

    pub fn platform_code(&self) -> String {
        format!("LANDSAT_{}", self.satellite)
    }
}

fn interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^L([COT])(\d)(\d{3})(\d{3})(\d{3})(\d{4})(\d{3})([A-Z]{3})(\d{2})$").unwrap()
    })
}

/// Parse an interval id such as `LC81160740842015089ASA00`.
///
/// # Examples
///
/// ```
/// use eodatasets::extract::parse_interval_id;
///
/// let id = parse_interval_id("LC81160740842015089ASA00").unwrap();
/// assert_eq!((id.path, id.start_row, id.end_row), (116, 74, 84));
/// assert_eq!(id.instrument(), Some("OLI_TIRS"));
/// assert!(parse_interval_id("LANDSAT-8.11308").is_none());
/// ```
pub fn parse_interval_id(name: &str) -> Option<IntervalId> {
    let caps = interval_pattern().captures(name)?;
    let num = |i: usize| caps[i].parse::<u32>().ok();

    Some(IntervalId {
        id: name.to_string(),
        sensor: caps[1].chars().next()?,
        satellite: caps[2].parse().ok()?,
        path: num(3)?,
        start_row: num(4)?,
        end_row: num(5)?,
        date: NaiveDate::from_yo_opt(num(6)? as i32, num(7)?)?,
        gsi: caps[8].to_string(),
        version: num(9)?,
    })
}

/// Find the interval id for an MDF folder.
fn find_interval_id(path: &Path) -> DatasetResult<Option<IntervalId>> {
    if let Some(id) = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_interval_id)
    {
        return Ok(Some(id));
    }

    if !path.is_dir() {
        return Ok(None);
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| DatasetError::io(path, e))? {
        let entry = entry.map_err(|e| DatasetError::io(path, e))?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    Ok(names.iter().find_map(|name| {
        let stem = name
            .strip_suffix("_MD5.txt")
            .or_else(|| name.strip_suffix("_IDF.xml"))?;
        parse_interval_id(stem)
    }))
}

/// Extracts interval, platform, instrument and path/row information.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdfExtractor;

impl Extractor for MdfExtractor {
    fn extract(
        &self,
        dataset: &mut DatasetMetadata,
        path: &Path,
        _additional_files: &[PathBuf],
    ) -> DatasetResult<()> {
        let Some(interval) = find_interval_id(path)? else {
            return Ok(());
        };
        debug!(interval_id = %interval.id, "Matched MDF interval");

        dataset
            .usgs
            .get_or_insert_with(UsgsMetadata::default)
            .interval_id
            .get_or_insert_with(|| interval.id.clone());

        if dataset.platform_code().is_none() {
            dataset.platform = Some(PlatformMetadata::new(interval.platform_code()));
        }
        if dataset.instrument_name().is_none() {
            if let Some(name) = interval.instrument() {
                dataset.instrument = Some(InstrumentMetadata::new(name));
            }
        }
        if dataset.format.is_none() {
            dataset.format = Some(FormatMetadata::new("MD"));
        }

        let image = dataset.image_mut();
        if image.satellite_ref_point_start.is_none() {
            image.satellite_ref_point_start = Some(RefPoint::new(interval.path, interval.start_row));
            image.satellite_ref_point_end = Some(RefPoint::new(interval.path, interval.end_row));
        }

        let acquisition = dataset.acquisition_mut();
        if acquisition.groundstation.is_none() {
            acquisition.groundstation = Some(GroundstationMetadata::new(interval.gsi.clone()));
        }

        Ok(())
    }
}
