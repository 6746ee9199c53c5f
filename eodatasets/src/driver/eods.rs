//! Legacy EODS packages.
//!
//! An EODS package is a directory named after its dataset, eg.
//! `LS7_ETM_NBAR_P54_GANBAR01-002_112_084_20010911`, holding its images in
//! `scene01/` and a `metadata.xml` document. The exact provenance of these
//! packages was never recorded, so they have no sources.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use super::{lower_suffix, stem};
use crate::codes::{groundstation_for_domain_code, groundstation_metadata};
use crate::error::{DatasetError, DatasetResult};
use crate::extract::{Collaborators, FormatFamily};
use crate::metadata::{
    BandMetadata, DatasetMetadata, FormatMetadata, InstrumentMetadata, PlatformMetadata, RefPoint,
};
use crate::serialise::parse_timestamp;

const SCENE_DIR: &str = "scene01";
const METADATA_XML: &str = "metadata.xml";

const AOS_ELEMENT: &str = "ACQUISITIONINFORMATION/EVENT/AOS";
const LOS_ELEMENT: &str = "ACQUISITIONINFORMATION/EVENT/LOS";
const FROM_ELEMENT: &str = "EXEXTENT/TEMPORALEXTENTFROM";
const TO_ELEMENT: &str = "EXEXTENT/TEMPORALEXTENTTO";

/// Fields of an EODS dataset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EodsName {
    /// Eg. `LS7`.
    pub vehicle: String,
    pub instrument: String,
    /// `NBAR`, `PQ` or `FC`.
    pub product_type: String,
    /// Eg. `P54`.
    pub level: String,
    /// Eg. `GANBAR01`.
    pub product: String,
    /// EODS domain code of the ground station, eg. `002`.
    pub groundstation: String,
    pub path: u32,
    pub row: u32,
    pub date: NaiveDate,
    pub version: Option<u32>,
}

impl EodsName {
    /// Platform code, eg. `LANDSAT_7`.
    pub fn platform_code(&self) -> String {
        format!("LANDSAT_{}", &self.vehicle[2..])
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<vehicle>LS[578])",
            r"_(?P<instrument>OLI_TIRS|OLI|TIRS|TM|ETM)",
            r"_(?P<type>NBAR|PQ|FC)",
            r"_(?P<level>[^-_]*)",
            r"_(?P<product>[^-_]*)",
            r"-(?P<groundstation>[0-9]{3})",
            r"_(?P<path>[0-9]{3})",
            r"_(?P<row>[0-9]{3})",
            r"_(?P<date>[12][0-9]{7})",
            r"(_(?P<version>[0-9]+))?$",
        ))
        .unwrap()
    })
}

/// Parse an EODS dataset name.
///
/// # Examples
///
/// ```
/// use eodatasets::driver::parse_eods_name;
///
/// let name = parse_eods_name("LS7_ETM_NBAR_P54_GANBAR01-002_112_084_20010911").unwrap();
/// assert_eq!(name.platform_code(), "LANDSAT_7");
/// assert_eq!((name.path, name.row), (112, 84));
/// assert!(parse_eods_name("LS9_ETM_NBAR_P54_GANBAR01-002_112_084_20010911").is_err());
/// ```
pub fn parse_eods_name(name: &str) -> DatasetResult<EodsName> {
    let invalid = |reason: &str| DatasetError::InvalidDatasetName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let caps = name_pattern()
        .captures(name)
        .ok_or_else(|| invalid("not an EODS dataset name"))?;

    let number = |field: &str| -> DatasetResult<u32> {
        caps[field]
            .parse()
            .map_err(|_| invalid(&format!("invalid {field}")))
    };
    let date = NaiveDate::parse_from_str(&caps["date"], "%Y%m%d")
        .map_err(|_| invalid("invalid date"))?;
    let version = match caps.name("version") {
        Some(v) => Some(
            v.as_str()
                .parse()
                .map_err(|_| invalid("invalid version"))?,
        ),
        None => None,
    };

    Ok(EodsName {
        vehicle: caps["vehicle"].to_string(),
        instrument: caps["instrument"].to_string(),
        product_type: caps["type"].to_string(),
        level: caps["level"].to_string(),
        product: caps["product"].to_string(),
        groundstation: caps["groundstation"].to_string(),
        path: number("path")?,
        row: number("row")?,
        date,
        version,
    })
}

pub(super) fn fill_metadata(
    dataset: &mut DatasetMetadata,
    path: &Path,
    additional_files: &[PathBuf],
    collaborators: &Collaborators,
) -> DatasetResult<()> {
    let label = stem(path).to_string();
    let fields = parse_eods_name(&label)?;

    dataset.product_type = Some(format!("EODS_{}", fields.product_type));
    dataset.ga_level = Some(fields.level.clone());
    dataset.ga_label = Some(label);
    dataset.format = Some(FormatMetadata::new("GeoTiff"));
    dataset.platform = Some(PlatformMetadata::new(fields.platform_code()));
    dataset.instrument = Some(InstrumentMetadata::new(fields.instrument.clone()));

    let ref_point = RefPoint::new(fields.path, fields.row);
    let image = dataset.image_mut();
    image.satellite_ref_point_start = Some(ref_point);
    image.satellite_ref_point_end = Some(ref_point);

    let scene_dir = path.join(SCENE_DIR);
    let mut images = Vec::new();
    for entry in fs::read_dir(&scene_dir).map_err(|e| DatasetError::io(&scene_dir, e))? {
        let entry = entry.map_err(|e| DatasetError::io(&scene_dir, e))?;
        images.push(entry.path());
    }
    images.sort();
    for image_path in images {
        if let Some(band) = to_band(&image_path)? {
            dataset.image_mut().bands.insert(band.number.clone(), band);
        }
    }
    collaborators
        .extractors
        .run(FormatFamily::Image, dataset, path, additional_files)?;

    if let Some(station) = groundstation_for_domain_code(&fields.groundstation) {
        dataset.acquisition_mut().groundstation = Some(groundstation_metadata(station));
    }

    let times = read_xml_times(&path.join(METADATA_XML))?;
    let time = |element: &str| times.get(element).and_then(|t| parse_timestamp(t));
    let aos = time(AOS_ELEMENT);
    let los = time(LOS_ELEMENT);
    let start = time(FROM_ELEMENT);
    let end = time(TO_ELEMENT);

    let (Some(start), Some(end)) = (start, end) else {
        return Err(DatasetError::MalformedDocument {
            path: path.join(METADATA_XML),
            reason: "no temporal extent".to_string(),
        });
    };
    check_against_name(start, fields.date)?;

    let acquisition = dataset.acquisition_mut();
    acquisition.aos = aos;
    acquisition.los = los;

    let extent = dataset.extent_mut();
    extent.from_dt = Some(start);
    extent.center_dt = Some(start + (end - start) / 2);
    extent.to_dt = Some(end);

    Ok(())
}

/// The document's start time must fall within a day of the name's date.
fn check_against_name(start: NaiveDateTime, named: NaiveDate) -> DatasetResult<()> {
    let difference = start - named.and_time(NaiveTime::MIN);
    if difference.num_days() != 0 {
        return Err(DatasetError::TimeMismatch(format!(
            "{start} is {} days from {named}",
            difference.num_days()
        )));
    }
    Ok(())
}

/// Text of the elements below the document root, keyed by their
/// slash-separated path. The first occurrence of each path wins.
fn read_xml_times(path: &Path) -> DatasetResult<HashMap<String, String>> {
    let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let xml_error = |reason: String| DatasetError::Xml {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = Reader::from_str(&content);
    reader.trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut values = HashMap::new();
    loop {
        match reader.read_event().map_err(|e| xml_error(e.to_string()))? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) if stack.len() > 1 => {
                let text = e.unescape().map_err(|e| xml_error(e.to_string()))?;
                values
                    .entry(stack[1..].join("/"))
                    .or_insert_with(|| text.trim().to_string());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(values)
}

pub(super) fn to_band(path: &Path) -> DatasetResult<Option<BandMetadata>> {
    if lower_suffix(path) != ".tif" {
        return Ok(None);
    }

    let name = stem(path);
    // Images end in a band number, eg. `_B12.tif`.
    let Some(position) = name.rfind('_') else {
        return Err(DatasetError::UnexpectedFilename {
            driver: "EODS".to_string(),
            path: path.to_path_buf(),
        });
    };

    let suffix = &name[position + 1..];
    let number = match suffix.strip_prefix(['B', 'b']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => suffix,
    };
    Ok(Some(BandMetadata::new(path, number)))
}
