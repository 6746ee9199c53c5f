//! Dataset label generation.
//!
//! A GA label is the canonical, human-readable identifier of a packaged
//! dataset and the name of its directory. Labels are rendered from a
//! per-driver template whose `{field}` placeholders are filled from the
//! dataset's metadata:
//!
//! ```text
//! LS8_OLITIRS_OTH_P51_GALPGS01-032_101_078_20141012
//! └┬┘ └──┬──┘ └┬┘ └┬┘        └┬┘ └┬┘ └┬┘ └──┬───┘
//! satnumber  level galevel stationcode path rows day
//!     sensor
//! ```
//!
//! Rendering is deterministic: the same metadata always yields the same label.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use tracing::warn;

use crate::codes::{groundstation_domain_code, short_satellite_code};
use crate::error::{DatasetError, DatasetResult};
use crate::metadata::{DatasetMetadata, RefPoint};

/// Raw telemetry label template.
pub const RAW_TEMPLATE: &str =
    "{satnumber}_{sensor}_STD-{format}_P00_{folderident}_{path}_{rows}_{startdt}Z{enddt}";

/// Level-1 (orthorectified) label template.
pub const ORTHO_TEMPLATE: &str = "{satnumber}_{sensor}_{level}_{galevel}{ancillary_flag}_GALPGS01-{stationcode}_{path}_{rows}_{day}";

/// Surface reflectance label template.
pub const NBAR_TEMPLATE: &str = "{satnumber}_{sensor}_{nbartype}_{galevel}_GA{nbartype}01-{stationcode}_{path}_{rows}_{day}";

/// Pixel quality label template.
pub const PQA_TEMPLATE: &str =
    "{satnumber}_{sensor}_PQ_{galevel}_GAPQ01-{stationcode}_{path}_{rows}_{day}";

/// Format a reference point range for display in a label.
///
/// Values are zero-padded to three digits. Unknown or zero values render as a
/// single `0`, and an end row is only shown when it differs from the start.
///
/// # Examples
///
/// ```
/// use eodatasets::label::format_path_row;
/// use eodatasets::metadata::RefPoint;
///
/// assert_eq!(format_path_row(Some(&RefPoint::new(78, 132)), None), ("078".into(), "132".into()));
/// assert_eq!(
///     format_path_row(Some(&RefPoint::new(78, 78)), Some(&RefPoint::new(78, 80))),
///     ("078".into(), "078-080".into())
/// );
/// assert_eq!(format_path_row(None, None), ("0".into(), "0".into()));
/// ```
pub fn format_path_row(start: Option<&RefPoint>, end: Option<&RefPoint>) -> (String, String) {
    let Some(start) = start else {
        return ("0".to_string(), "0".to_string());
    };

    let path = format_ref_value(start.x);
    let mut rows = format_ref_value(start.y);

    if let Some(end) = end {
        if end.y != start.y {
            rows.push('-');
            rows.push_str(&format_ref_value(end.y));
        }
    }

    (path, rows)
}

fn format_ref_value(value: Option<u32>) -> String {
    match value {
        Some(v) if v != 0 => format!("{v:03}"),
        _ => "0".to_string(),
    }
}

/// Map a dataset's product level and orientation to `(level, ga_level)` codes.
///
/// Returns `(None, None)` (with a warning) when no mapping applies.
pub fn process_code(dataset: &DatasetMetadata) -> (Option<&'static str>, Option<&'static str>) {
    let level = dataset.product_level.as_deref().map(str::to_uppercase);
    let level = level.as_deref();
    let orientation = dataset.orientation();

    if level == Some("L1T") {
        return (Some("OTH"), Some("P51"));
    }

    if orientation == Some("NORTH_UP") {
        match level {
            Some("L1G") => return (Some("SYS"), Some("P31")),
            Some("L1GT") => return (Some("OTH"), Some("P41")),
            _ => {}
        }
    }

    if matches!(orientation, Some("NOMINAL") | Some("NOM")) {
        return (Some("SYS"), Some("P11"));
    }

    if dataset.ga_level.as_deref() == Some("P00") {
        return (Some("satellite_telemetry_data"), Some("P00"));
    }

    warn!(
        level = ?level,
        orientation = ?orientation,
        "No process code mapped for level/orientation"
    );
    (None, None)
}

/// Remove ASCII punctuation, eg. `OLI_TIRS` becomes `OLITIRS`.
pub fn strip_punctuation(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

fn format_dt(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Value(String),
    /// The field exists but the dataset lacks what it needs.
    Unavailable(&'static str),
}

/// Values available to a label template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFields {
    fields: BTreeMap<String, Field>,
}

impl LabelFields {
    /// Collect the fields common to every template from a dataset.
    ///
    /// # Errors
    ///
    /// Fails if the platform code is missing or has no short code.
    pub fn for_dataset(dataset: &DatasetMetadata) -> DatasetResult<Self> {
        let platform = dataset
            .platform_code()
            .ok_or(DatasetError::MissingLabelField("platform code"))?;

        let (path, rows) = format_path_row(
            dataset
                .image
                .as_ref()
                .and_then(|i| i.satellite_ref_point_start.as_ref()),
            dataset
                .image
                .as_ref()
                .and_then(|i| i.satellite_ref_point_end.as_ref()),
        );

        let (level, ga_level) = process_code(dataset);
        let ga_level = ga_level.or(dataset.ga_level.as_deref());

        let acquisition = dataset.acquisition.as_ref();
        let station_code = acquisition
            .and_then(|a| a.groundstation.as_ref())
            .and_then(|gs| groundstation_domain_code(&gs.code));
        let start = acquisition.and_then(|a| a.aos.as_ref()).map(format_dt);
        let end = acquisition.and_then(|a| a.los.as_ref()).map(format_dt);
        let orbit = acquisition
            .and_then(|a| a.platform_orbit)
            .map(|o| o.to_string());

        let day = dataset
            .extent
            .as_ref()
            .and_then(|e| e.center_dt)
            .or_else(|| acquisition.and_then(|a| a.aos))
            .map(|d| d.format("%Y%m%d").to_string());

        let mut fields = Self {
            fields: BTreeMap::new(),
        };
        fields.set("satnumber", short_satellite_code(platform)?);
        fields.set_opt(
            "sensor",
            dataset.instrument_name().map(strip_punctuation),
        );
        fields.set_opt(
            "format",
            dataset
                .format
                .as_ref()
                .and_then(|f| f.name.as_deref())
                .map(str::to_uppercase),
        );
        fields.set_opt("level", level);
        fields.set_opt("galevel", ga_level);
        fields.set_opt(
            "usgs",
            dataset.usgs.as_ref().and_then(|u| u.scene_id.clone()),
        );
        fields.set("path", path);
        fields.set("rows", rows);
        fields.set_opt("orbit", orbit);
        fields.set_opt("stationcode", station_code);
        fields.set_opt("startdt", start);
        fields.set_opt("enddt", end);
        fields.set_opt(
            "ancillary_quality",
            dataset
                .lineage
                .as_ref()
                .and_then(|l| l.ancillary_quality.clone()),
        );
        fields.set_opt("rmsstring", dataset.rms_string.clone());
        match day {
            Some(day) => fields.set("day", day),
            None => {
                fields
                    .fields
                    .insert("day".to_string(), Field::Unavailable("acquisition date"));
            }
        }

        Ok(fields)
    }

    /// Set (or override) a field.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .insert(name.to_string(), Field::Value(value.into()));
    }

    /// Set a field, rendering an absent value as the empty string.
    pub fn set_opt<S: Into<String>>(&mut self, name: &str, value: Option<S>) {
        self.set(name, value.map(Into::into).unwrap_or_default());
    }

    /// Current value of a field, if it has one.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Field::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Substitute every `{field}` placeholder in `template`.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::UnknownLabelField`] for a placeholder with no field
    /// - [`DatasetError::MissingLabelField`] for a field the dataset can't provide
    pub fn render(&self, template: &str) -> DatasetResult<String> {
        let mut failure = None;
        let rendered = placeholder_pattern().replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match self.fields.get(name) {
                Some(Field::Value(v)) => v.clone(),
                Some(Field::Unavailable(what)) => {
                    failure.get_or_insert(DatasetError::MissingLabelField(*what));
                    String::new()
                }
                None => {
                    failure.get_or_insert_with(|| DatasetError::UnknownLabelField(name.to_string()));
                    String::new()
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").unwrap())
}

/// Render a template for a dataset with extra per-driver fields.
pub fn fill_dataset_label(
    dataset: &DatasetMetadata,
    template: &str,
    extras: &[(&str, String)],
) -> DatasetResult<String> {
    let mut fields = LabelFields::for_dataset(dataset)?;
    for (name, value) in extras {
        fields.set(name, value.clone());
    }
    fields.render(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        AcquisitionMetadata, ExtentMetadata, FormatMetadata, GroundstationMetadata,
        InstrumentMetadata, PlatformMetadata,
    };
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn ls8_ortho() -> DatasetMetadata {
        let mut dataset = DatasetMetadata::new();
        dataset.platform = Some(PlatformMetadata::new("LANDSAT_8"));
        dataset.instrument = Some(InstrumentMetadata::new("OLI_TIRS"));
        dataset.format = Some(FormatMetadata::new("GeoTiff"));
        dataset.product_level = Some("L1T".to_string());
        dataset.acquisition = Some(AcquisitionMetadata {
            groundstation: Some(GroundstationMetadata::new("LGN")),
            ..Default::default()
        });
        dataset.extent = Some(ExtentMetadata {
            center_dt: NaiveDate::from_ymd_opt(2014, 10, 12)
                .unwrap()
                .and_hms_opt(0, 56, 39),
            ..Default::default()
        });
        let image = dataset.image_mut();
        image.satellite_ref_point_start = Some(RefPoint::new(101, 78));
        image.satellite_ref_point_end = Some(RefPoint::new(101, 78));
        dataset
    }

    #[test]
    fn test_format_path_row_examples() {
        let p = |x, y| RefPoint::new(x, y);
        assert_eq!(
            format_path_row(Some(&p(12, 4)), None),
            ("012".to_string(), "004".to_string())
        );
        assert_eq!(
            format_path_row(Some(&p(78, 132)), Some(&p(78, 132))),
            ("078".to_string(), "132".to_string())
        );
        assert_eq!(
            format_path_row(Some(&RefPoint::default()), None),
            ("0".to_string(), "0".to_string())
        );
    }

    #[test]
    fn test_process_codes() {
        let mut dataset = DatasetMetadata::new();
        dataset.product_level = Some("l1t".to_string());
        assert_eq!(process_code(&dataset), (Some("OTH"), Some("P51")));

        dataset.product_level = Some("L1G".to_string());
        dataset.projection_mut().orientation = Some("NORTH_UP".to_string());
        assert_eq!(process_code(&dataset), (Some("SYS"), Some("P31")));

        dataset.product_level = Some("L1GT".to_string());
        assert_eq!(process_code(&dataset), (Some("OTH"), Some("P41")));

        dataset.product_level = None;
        dataset.projection_mut().orientation = Some("NOM".to_string());
        assert_eq!(process_code(&dataset), (Some("SYS"), Some("P11")));

        let mut raw = DatasetMetadata::new();
        raw.ga_level = Some("P00".to_string());
        assert_eq!(
            process_code(&raw),
            (Some("satellite_telemetry_data"), Some("P00"))
        );

        assert_eq!(process_code(&DatasetMetadata::new()), (None, None));
    }

    #[test]
    fn test_strip_punctuation() {
        assert_eq!(strip_punctuation("OLI_TIRS+"), "OLITIRS");
        assert_eq!(strip_punctuation("ETM"), "ETM");
    }

    #[test]
    fn test_ortho_label() {
        let label = fill_dataset_label(
            &ls8_ortho(),
            ORTHO_TEMPLATE,
            &[("ancillary_flag", String::new())],
        )
        .unwrap();
        assert_eq!(label, "LS8_OLITIRS_OTH_P51_GALPGS01-032_101_078_20141012");
    }

    #[test]
    fn test_pqa_label_falls_back_to_dataset_ga_level() {
        let mut dataset = ls8_ortho();
        dataset.product_level = None;
        dataset.ga_level = Some("P55".to_string());

        let label = fill_dataset_label(&dataset, PQA_TEMPLATE, &[]).unwrap();
        assert_eq!(label, "LS8_OLITIRS_PQ_P55_GAPQ01-032_101_078_20141012");
    }

    #[test]
    fn test_day_falls_back_to_aos() {
        let mut dataset = ls8_ortho();
        dataset.extent = None;
        dataset.acquisition_mut().aos = NaiveDate::from_ymd_opt(2014, 10, 13)
            .unwrap()
            .and_hms_opt(1, 0, 0);

        let fields = LabelFields::for_dataset(&dataset).unwrap();
        assert_eq!(fields.get("day"), Some("20141013"));
    }

    #[test]
    fn test_missing_day_only_fails_when_used() {
        let mut dataset = ls8_ortho();
        dataset.extent = None;

        let fields = LabelFields::for_dataset(&dataset).unwrap();
        assert_eq!(fields.render("{satnumber}_{path}").unwrap(), "LS8_101");
        assert!(matches!(
            fields.render("{satnumber}_{day}"),
            Err(DatasetError::MissingLabelField(_))
        ));
    }

    #[test]
    fn test_missing_platform_fails() {
        let mut dataset = ls8_ortho();
        dataset.platform = None;
        assert!(matches!(
            LabelFields::for_dataset(&dataset),
            Err(DatasetError::MissingLabelField(_))
        ));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let fields = LabelFields::for_dataset(&ls8_ortho()).unwrap();
        match fields.render("{satnumber}_{bogus}") {
            Err(DatasetError::UnknownLabelField(name)) => assert_eq!(name, "bogus"),
            other => panic!("Expected UnknownLabelField, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_values_render_empty() {
        let fields = LabelFields::for_dataset(&ls8_ortho()).unwrap();
        assert_eq!(fields.render("[{orbit}][{rmsstring}]").unwrap(), "[][]");
    }

    proptest! {
        #[test]
        fn prop_path_row_padding(x in 1u32..1000, y in 1u32..1000) {
            let (path, rows) = format_path_row(Some(&RefPoint::new(x, y)), None);
            prop_assert_eq!(path.len(), 3);
            prop_assert_eq!(rows.len(), 3);
            prop_assert_eq!(path.parse::<u32>().unwrap(), x);
            prop_assert_eq!(rows.parse::<u32>().unwrap(), y);
        }

        #[test]
        fn prop_row_range_only_when_rows_differ(x in 1u32..1000, y1 in 0u32..1000, y2 in 0u32..1000) {
            let (_, rows) = format_path_row(
                Some(&RefPoint::new(x, y1)),
                Some(&RefPoint::new(x, y2)),
            );
            prop_assert_eq!(rows.contains('-'), y1 != y2);
        }

        #[test]
        fn prop_label_is_deterministic(x in 1u32..234, y in 1u32..249) {
            let mut dataset = ls8_ortho();
            dataset.image_mut().satellite_ref_point_start = Some(RefPoint::new(x, y));
            dataset.image_mut().satellite_ref_point_end = Some(RefPoint::new(x, y));

            let extras = [("ancillary_flag", String::new())];
            let a = fill_dataset_label(&dataset, ORTHO_TEMPLATE, &extras).unwrap();
            let b = fill_dataset_label(&dataset.clone(), ORTHO_TEMPLATE, &extras).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
