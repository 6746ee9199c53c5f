//! Static code tables: ground stations and satellite short codes.
//!
//! All tables are read-only and shared process-wide.

use tracing::warn;

use crate::error::{DatasetError, DatasetResult};
use crate::metadata::{DatasetMetadata, GroundstationMetadata};

/// A receiving ground station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Groundstation {
    /// Standard GSI code.
    pub code: &'static str,
    /// Three-digit domain code used in EODS and dataset labels.
    pub eods_domain_code: &'static str,
    pub label: &'static str,
    /// Other names seen in ground station logs and filenames.
    pub aliases: &'static [&'static str],
}

/// Known ground stations.
pub static GROUNDSTATIONS: &[Groundstation] = &[
    Groundstation {
        code: "ASA",
        eods_domain_code: "002",
        label: "Alice Springs",
        aliases: &["ALSP", "ALICE", "ALICE SPRINGS", "ASN"],
    },
    Groundstation {
        code: "HOA",
        eods_domain_code: "011",
        label: "Hobart",
        aliases: &["HOB", "HOBART", "HBT"],
    },
    Groundstation {
        code: "LGN",
        eods_domain_code: "032",
        label: "Landsat Ground Network",
        aliases: &["LGS"],
    },
];

/// Platforms whose codes are already short enough for labels.
const SHORT_PLATFORMS: &[&str] = &["AQUA", "TERRA", "NPP"];

/// Find a ground station by its GSI code or any alias (case-insensitive).
///
/// # Examples
///
/// ```
/// use eodatasets::codes::get_groundstation;
///
/// assert_eq!(get_groundstation("alsp").unwrap().code, "ASA");
/// assert!(get_groundstation("NOPE").is_none());
/// ```
pub fn get_groundstation(gsi: &str) -> Option<&'static Groundstation> {
    let gsi = gsi.trim().to_uppercase();
    GROUNDSTATIONS
        .iter()
        .find(|gs| gs.code == gsi || gs.aliases.contains(&gsi.as_str()))
}

/// Find a ground station by its three-digit EODS domain code.
pub fn groundstation_for_domain_code(domain_code: &str) -> Option<&'static Groundstation> {
    GROUNDSTATIONS
        .iter()
        .find(|gs| gs.eods_domain_code == domain_code)
}

/// Translate a GSI code (or alias) to its EODS domain code.
pub fn groundstation_domain_code(gsi: &str) -> Option<&'static str> {
    get_groundstation(gsi).map(|gs| gs.eods_domain_code)
}

/// Normalise a dataset's ground station record against the table.
///
/// Unknown stations are left untouched.
pub fn expand_groundstation(dataset: &mut DatasetMetadata) {
    let Some(record) = dataset
        .acquisition
        .as_mut()
        .and_then(|a| a.groundstation.as_mut())
    else {
        return;
    };

    match get_groundstation(&record.code) {
        Some(gs) => fill_groundstation(record, gs),
        None => warn!(code = %record.code, "Unknown groundstation"),
    }
}

/// Build a full ground station record from the table entry.
pub fn groundstation_metadata(gs: &Groundstation) -> GroundstationMetadata {
    let mut record = GroundstationMetadata::new(gs.code);
    fill_groundstation(&mut record, gs);
    record
}

fn fill_groundstation(record: &mut GroundstationMetadata, gs: &Groundstation) {
    record.code = gs.code.to_string();
    record.label = Some(gs.label.to_string());
    record.eods_domain_code = Some(gs.eods_domain_code.to_string());
}

/// Short satellite code used in labels.
///
/// `LANDSAT_<n>` becomes `LS<n>`; `AQUA`, `TERRA` and `NPP` are used as-is.
///
/// # Examples
///
/// ```
/// use eodatasets::codes::short_satellite_code;
///
/// assert_eq!(short_satellite_code("LANDSAT_8").unwrap(), "LS8");
/// assert_eq!(short_satellite_code("AQUA").unwrap(), "AQUA");
/// assert!(short_satellite_code("Invalid").is_err());
/// ```
pub fn short_satellite_code(platform_code: &str) -> DatasetResult<String> {
    if let Some(number) = platform_code.strip_prefix("LANDSAT_") {
        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            return Ok(format!("LS{number}"));
        }
    }
    if SHORT_PLATFORMS.contains(&platform_code) {
        return Ok(platform_code.to_string());
    }
    Err(DatasetError::UnknownPlatform(platform_code.to_string()))
}
