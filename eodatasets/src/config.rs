//! Packaging configuration.
//!
//! Defaults can be overridden from an INI file, by default
//! `~/.eodatasets/config.ini`:
//!
//! ```ini
//! [packaging]
//! hard_link = true
//! compress_imagery = false
//! gdal_translate = /opt/gdal/bin/gdal_translate
//! ```

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};

const PACKAGING_SECTION: &str = "packaging";

/// Options controlling how files are copied into a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingConfig {
    /// Hard link files instead of copying, where the extension is unchanged.
    pub hard_link: bool,

    /// Losslessly recompress TIFF imagery while copying.
    pub compress_imagery: bool,

    /// The `gdal_translate` executable used for recompression.
    pub gdal_translate: PathBuf,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            hard_link: false,
            compress_imagery: true,
            gdal_translate: PathBuf::from("gdal_translate"),
        }
    }
}

impl PackagingConfig {
    /// Enable or disable hard linking.
    pub fn with_hard_link(mut self, hard_link: bool) -> Self {
        self.hard_link = hard_link;
        self
    }

    /// Enable or disable imagery recompression.
    pub fn with_compress_imagery(mut self, compress: bool) -> Self {
        self.compress_imagery = compress;
        self
    }

    /// Set the `gdal_translate` executable.
    pub fn with_gdal_translate(mut self, path: impl Into<PathBuf>) -> Self {
        self.gdal_translate = path.into();
        self
    }

    /// Load the default config file, if there is one.
    pub fn load() -> DatasetResult<Self> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load overrides from an INI file.
    pub fn load_from(path: &Path) -> DatasetResult<Self> {
        debug!(path = %path.display(), "Loading config");
        let ini = Ini::load_from_file(path)
            .map_err(|e| DatasetError::Config(format!("{}: {e}", path.display())))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> DatasetResult<Self> {
        let mut config = Self::default();
        let Some(section) = ini.section(Some(PACKAGING_SECTION)) else {
            return Ok(config);
        };

        if let Some(value) = section.get("hard_link") {
            config.hard_link = parse_bool("hard_link", value)?;
        }
        if let Some(value) = section.get("compress_imagery") {
            config.compress_imagery = parse_bool("compress_imagery", value)?;
        }
        if let Some(value) = section.get("gdal_translate") {
            config.gdal_translate = PathBuf::from(value.trim());
        }
        Ok(config)
    }
}

/// `~/.eodatasets/config.ini`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".eodatasets").join("config.ini"))
}

fn parse_bool(key: &str, value: &str) -> DatasetResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(DatasetError::Config(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}
