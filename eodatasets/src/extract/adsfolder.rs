//! Metadata from ground station ADS folder and file naming.
//!
//! Raw passes land in folders named `<PLATFORM>.<orbit>` (eg.
//! `LANDSAT-8.11308`). Data files inside are named
//! `NNN.NNN.YYYYDDDHHMMSSmmm.GSI`, where the timestamp is the time the file's
//! data was received and the suffix is the receiving ground station.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::debug;

use super::Extractor;
use crate::codes::get_groundstation;
use crate::error::{DatasetError, DatasetResult};
use crate::metadata::{DatasetMetadata, GroundstationMetadata, PlatformMetadata};

/// Extracts platform, orbit, ground station and acquisition times.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdsFolderExtractor;

impl Extractor for AdsFolderExtractor {
    fn extract(
        &self,
        dataset: &mut DatasetMetadata,
        path: &Path,
        _additional_files: &[PathBuf],
    ) -> DatasetResult<()> {
        let folder = [Some(path), path.parent()]
            .into_iter()
            .flatten()
            .find_map(|p| p.file_name().and_then(|n| n.to_str()).and_then(parse_ads_folder));

        if let Some((platform, orbit)) = folder {
            debug!(platform = %platform, orbit, "Matched ADS folder");
            if dataset.platform_code().is_none() {
                dataset.platform = Some(PlatformMetadata::new(platform));
            }
            let acquisition = dataset.acquisition_mut();
            acquisition.platform_orbit.get_or_insert(orbit);
        }

        if !path.is_dir() {
            return Ok(());
        }

        let mut files = Vec::new();
        let entries = std::fs::read_dir(path).map_err(|e| DatasetError::io(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DatasetError::io(path, e))?;
            if let Some(parsed) = entry.file_name().to_str().and_then(parse_ads_filename) {
                files.push(parsed);
            }
        }

        // Earliest first, with a stable order for equal times.
        files.sort_by(|a, b| (a.received, a.index, &a.gsi).cmp(&(b.received, b.index, &b.gsi)));
        let (Some(first), Some(last)) = (files.first(), files.last()) else {
            return Ok(());
        };
        let (aos, los) = (first.received, last.received);
        debug!(count = files.len(), %aos, %los, "Found ADS data files");

        let gsi = first.gsi.clone();
        let acquisition = dataset.acquisition_mut();
        acquisition.aos.get_or_insert(aos);
        acquisition.los.get_or_insert(los);
        if acquisition.groundstation.is_none() {
            let code = get_groundstation(&gsi).map_or(gsi, |gs| gs.code.to_string());
            acquisition.groundstation = Some(GroundstationMetadata::new(code));
        }

        Ok(())
    }
}

fn folder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Z]+(?:-\d+)?)\.(\d+)$").unwrap())
}

fn file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // NNN.NNN.YYYYDDDHHMMSSmmm.GSI
        Regex::new(r"^(\d{3})\.(\d{3})\.(\d{4})(\d{3})(\d{2})(\d{2})(\d{2})(\d{3})\.([A-Za-z]+)$")
            .unwrap()
    })
}

/// Parse an ADS folder name into `(platform code, orbit)`.
///
/// # Examples
///
/// ```
/// use eodatasets::extract::parse_ads_folder;
///
/// assert_eq!(parse_ads_folder("LANDSAT-8.11308"), Some(("LANDSAT_8".to_string(), 11308)));
/// assert_eq!(parse_ads_folder("AQUA.65208"), Some(("AQUA".to_string(), 65208)));
/// assert_eq!(parse_ads_folder("LC81160740842015089ASA00"), None);
/// ```
pub fn parse_ads_folder(name: &str) -> Option<(String, u64)> {
    let caps = folder_pattern().captures(name)?;
    let platform = caps[1].replace('-', "_");
    let orbit = caps[2].parse().ok()?;
    Some((platform, orbit))
}

/// A data file within an ADS folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdsFile {
    /// Storage location number.
    pub index: u32,
    pub part: u32,
    pub received: NaiveDateTime,
    pub gsi: String,
}

/// Parse an ADS data filename, eg. `480.000.2015089022657325.ASA`.
pub fn parse_ads_filename(name: &str) -> Option<AdsFile> {
    let caps = file_pattern().captures(name)?;
    let num = |i: usize| caps[i].parse::<u32>().ok();

    let date = NaiveDate::from_yo_opt(num(3)? as i32, num(4)?)?;
    let time = NaiveTime::from_hms_milli_opt(num(5)?, num(6)?, num(7)?, num(8)?)?;

    Some(AdsFile {
        index: num(1)?,
        part: num(2)?,
        received: NaiveDateTime::new(date, time),
        gsi: caps[9].to_uppercase(),
    })
}
