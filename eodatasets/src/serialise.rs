//! Reading and writing dataset metadata documents.
//!
//! A directory dataset keeps its metadata in `ga-metadata.yaml` at its root.
//! A single-file dataset has a `<file>.ga-md.yaml` sidecar next to it.
//!
//! File paths inside a document are stored relative to the document's
//! directory, so a packaged dataset can be moved as a whole.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};
use crate::metadata::{absolutize_path, relativize_path, DatasetMetadata};

/// Metadata filename within a directory dataset.
pub const METADATA_FILE_NAME: &str = "ga-metadata.yaml";

/// Suffix of the sidecar metadata file of a single-file dataset.
pub const SIDECAR_SUFFIX: &str = ".ga-md.yaml";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a timestamp as written by processing pipelines.
///
/// Accepts a `T` or space separator, optional fractional seconds, an
/// optional trailing `Z`, and bare dates (midnight).
///
/// # Examples
///
/// ```
/// use eodatasets::serialise::parse_timestamp;
///
/// assert!(parse_timestamp("2015-09-22 06:20:14.360474").is_some());
/// assert!(parse_timestamp("2014-01-31T02:00:00Z").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let value = value.strip_suffix('Z').unwrap_or(value);

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Location of the metadata document for a dataset at `dataset_path`.
pub fn metadata_path_for(dataset_path: &Path) -> PathBuf {
    if dataset_path.is_dir() {
        return dataset_path.join(METADATA_FILE_NAME);
    }
    let mut name = dataset_path.file_name().unwrap_or_default().to_os_string();
    name.push(SIDECAR_SUFFIX);
    dataset_path.with_file_name(name)
}

fn is_metadata_document(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n == METADATA_FILE_NAME || n.ends_with(SIDECAR_SUFFIX))
        .unwrap_or(false)
}

/// Read dataset metadata.
///
/// `path` may be a metadata document, a dataset directory or a single-file
/// dataset. Relative file paths in the document become absolute.
pub fn read_dataset_metadata(path: &Path) -> DatasetResult<DatasetMetadata> {
    let document = if is_metadata_document(path) {
        path.to_path_buf()
    } else {
        metadata_path_for(path)
    };
    debug!(path = %document.display(), "Reading dataset metadata");

    let content = fs::read_to_string(&document).map_err(|e| DatasetError::io(&document, e))?;
    let mut dataset: DatasetMetadata =
        serde_yaml::from_str(&content).map_err(|source| DatasetError::Yaml {
            path: document.clone(),
            source,
        })?;

    let base = document.parent().unwrap_or(Path::new("")).to_path_buf();
    dataset.map_paths(&|p| absolutize_path(&base, p));
    Ok(dataset)
}

/// Write metadata for the dataset at `dataset_path`, returning the document
/// path.
///
/// File paths beneath the document's directory are written relative to it.
/// The caller's `dataset` is left untouched.
pub fn write_dataset_metadata(
    dataset_path: &Path,
    dataset: &DatasetMetadata,
) -> DatasetResult<PathBuf> {
    let document = metadata_path_for(dataset_path);
    let base = document.parent().unwrap_or(Path::new("")).to_path_buf();

    let mut relative = dataset.clone();
    relative.map_paths(&|p| relativize_path(&base, p));

    let content = serde_yaml::to_string(&relative).map_err(|source| DatasetError::Yaml {
        path: document.clone(),
        source,
    })?;
    fs::write(&document, content).map_err(|e| DatasetError::io(&document, e))?;

    debug!(path = %document.display(), "Wrote dataset metadata");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AncillaryFile, BandMetadata, PlatformMetadata};
    use tempfile::TempDir;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = NaiveDate::from_ymd_opt(2014, 1, 31)
            .unwrap()
            .and_hms_opt(2, 0, 0);
        assert_eq!(parse_timestamp("2014-01-31T02:00:00"), expected);
        assert_eq!(parse_timestamp("2014-01-31 02:00:00"), expected);
        assert_eq!(parse_timestamp(" 2014-01-31T02:00:00Z "), expected);
        assert_eq!(
            parse_timestamp("2014-01-31"),
            NaiveDate::from_ymd_opt(2014, 1, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
        );
        assert_eq!(
            parse_timestamp("2015-09-22 06:20:14.360474"),
            NaiveDate::from_ymd_opt(2015, 9, 22)
                .unwrap()
                .and_hms_micro_opt(6, 20, 14, 360474)
        );
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_metadata_path_for() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            metadata_path_for(temp.path()),
            temp.path().join("ga-metadata.yaml")
        );
        assert_eq!(
            metadata_path_for(&temp.path().join("scene.tif")),
            temp.path().join("scene.tif.ga-md.yaml")
        );
    }

    #[test]
    fn test_relative_paths_round_trip() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let mut dataset = DatasetMetadata::new();
        dataset.platform = Some(PlatformMetadata::new("LANDSAT_8"));
        dataset.checksum_path = Some(root.join("package.sha256"));
        dataset
            .image_mut()
            .bands
            .insert("1".to_string(), BandMetadata::new(root.join("product/b1.tif"), "1"));
        dataset
            .ancillary_files
            .push(AncillaryFile::other("/elsewhere/notes.txt"));

        let document = write_dataset_metadata(root, &dataset).unwrap();
        assert_eq!(document, root.join(METADATA_FILE_NAME));

        let content = fs::read_to_string(&document).unwrap();
        assert!(content.contains("path: product/b1.tif"));
        assert!(content.contains("checksum_path: package.sha256"));
        // Outside the dataset: left absolute.
        assert!(content.contains("/elsewhere/notes.txt"));
        // Caller's copy is unchanged.
        assert_eq!(dataset.checksum_path, Some(root.join("package.sha256")));

        let read = read_dataset_metadata(root).unwrap();
        assert_eq!(read, dataset);
        assert_eq!(read_dataset_metadata(&document).unwrap(), dataset);
    }

    #[test]
    fn test_read_missing_document() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            read_dataset_metadata(temp.path()),
            Err(DatasetError::Io { .. })
        ));
    }

    #[test]
    fn test_read_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(METADATA_FILE_NAME), "id: [not, a, uuid]").unwrap();
        assert!(matches!(
            read_dataset_metadata(temp.path()),
            Err(DatasetError::Yaml { .. })
        ));
    }
}
