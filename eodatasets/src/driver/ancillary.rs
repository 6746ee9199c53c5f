//! Processing documents written by the NBAR and PQA pipelines.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{DatasetError, DatasetResult};
use crate::metadata::AncillaryMetadata;
use crate::serialise::parse_timestamp;

/// One ancillary input as recorded by a processing pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AncillaryEntry {
    pub value: Option<Value>,
    pub data_file: Option<String>,
    pub data_source: Option<Value>,
    pub user: Option<Value>,
    pub accessed: Option<Value>,
    pub modified: Option<Value>,
}

impl AncillaryEntry {
    /// Lineage record for this entry, recorded under `kind`.
    pub fn to_metadata(&self, kind: &str, name: Option<String>) -> AncillaryMetadata {
        AncillaryMetadata {
            kind: Some(kind.to_string()),
            name,
            uri: self.data_file.clone(),
            file_owner: self.user.as_ref().map(value_to_string),
            access_dt: self
                .accessed
                .as_ref()
                .and_then(|v| parse_timestamp(&value_to_string(v))),
            modification_dt: self
                .modified
                .as_ref()
                .and_then(|v| parse_timestamp(&value_to_string(v))),
        }
    }
}

/// Read a YAML document into `T`.
pub(super) fn read_document<T: DeserializeOwned>(path: &Path) -> DatasetResult<T> {
    let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|source| DatasetError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse one entry of a document's ancillary section.
pub(super) fn parse_entry(document: &Path, name: &str, value: &Value) -> DatasetResult<AncillaryEntry> {
    serde_yaml::from_value(value.clone()).map_err(|e| DatasetError::MalformedDocument {
        path: document.to_path_buf(),
        reason: format!("ancillary entry {name:?}: {e}"),
    })
}

/// Render a scalar YAML value as plain text.
pub(super) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
