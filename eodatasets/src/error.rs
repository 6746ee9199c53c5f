//! Error types for dataset packaging.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors that can occur while reading, labelling or packaging a dataset.
///
/// All errors are raised where they are detected and propagate to the
/// caller; nothing in this crate retries.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Required metadata is missing at commit time (eg. no platform code).
    #[error("incomplete dataset, not enough metadata found: {0}")]
    IncompletePackage(String),

    /// A file matched a driver's inclusion rule but not its band naming.
    #[error("unexpected tif image in {driver}: {}", path.display())]
    UnexpectedFilename { driver: String, path: PathBuf },

    /// Platform code has no short satellite code.
    #[error("unknown platform code {0:?}")]
    UnknownPlatform(String),

    /// No browse bands are defined for the platform.
    #[error("unknown browse bands for satellite {0:?}")]
    UnknownBrowseBands(String),

    /// No driver is registered under the given key.
    #[error("unknown package type {0:?}")]
    UnknownDriver(String),

    /// A label template needs a value the dataset doesn't have.
    #[error("cannot generate label: missing {0}")]
    MissingLabelField(&'static str),

    /// A label template references a field that doesn't exist.
    #[error("cannot generate label: unknown template field {{{0}}}")]
    UnknownLabelField(String),

    /// A dataset name doesn't follow the expected convention.
    #[error("invalid dataset name {name:?}: {reason}")]
    InvalidDatasetName { name: String, reason: String },

    /// Recorded times disagree with the dataset's own name.
    #[error("time information differs too much from source files: {0}")]
    TimeMismatch(String),

    /// An additional file given by the caller doesn't exist.
    #[error("given file does not exist: {}", .0.display())]
    MissingAdditionalFile(PathBuf),

    /// A metadata document was readable but had unexpected content.
    #[error("malformed document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// YAML (de)serialisation failed.
    #[error("YAML error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// XML parsing failed.
    #[error("XML error in {}: {reason}", path.display())]
    Xml { path: PathBuf, reason: String },

    /// An external tool (eg. gdal_translate) could not be run or failed.
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DatasetError {
    /// Build an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the dataset lacked required metadata.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, DatasetError::IncompletePackage(_))
    }
}
