//! Copying source files into a package.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::config::PackagingConfig;
use crate::driver::lower_suffix;
use crate::error::{DatasetError, DatasetResult};

const GDAL_TRANSLATE: &str = "gdal_translate";

/// Copy `source` to `destination` unless it's already there.
///
/// Files with an unchanged extension are hard linked when requested. TIFF
/// images are otherwise recompressed losslessly (LZW) when compression is
/// enabled. Everything else is copied byte for byte.
///
/// Returns every file written: the destination, plus any `.IMD` sidecar
/// written by `gdal_translate`.
pub fn copy_file(
    source: &Path,
    destination: &Path,
    config: &PackagingConfig,
) -> DatasetResult<Vec<PathBuf>> {
    let mut outputs = vec![destination.to_path_buf()];

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }

    let suffix = lower_suffix(destination);

    if destination.exists() {
        info!(path = %destination.display(), "Destination exists");
    } else if config.hard_link && lower_suffix(source) == suffix {
        info!(from = %source.display(), to = %destination.display(), "Hard linking");
        fs::hard_link(source, destination).map_err(|e| DatasetError::io(destination, e))?;
    } else if suffix == ".tif" && config.compress_imagery {
        info!(from = %source.display(), to = %destination.display(), "Copying compressed");
        compress_tif(&config.gdal_translate, source, destination)?;

        let imd = destination.with_extension("IMD");
        if imd.exists() {
            outputs.push(imd);
        }
    } else {
        info!(from = %source.display(), to = %destination.display(), "Copying");
        fs::copy(source, destination).map_err(|e| DatasetError::io(destination, e))?;
    }

    Ok(outputs)
}

fn compress_tif(gdal_translate: &Path, source: &Path, destination: &Path) -> DatasetResult<()> {
    let status = Command::new(gdal_translate)
        .args(["--config", "GDAL_CACHEMAX", "512"])
        .args(["--config", "TILED", "YES"])
        .args(["-co", "COMPRESS=lzw"])
        .args(["-co", "predictor=2"])
        .arg(source)
        .arg(destination)
        .status()
        .map_err(|e| DatasetError::ToolFailed {
            tool: GDAL_TRANSLATE.to_string(),
            reason: format!("could not run {}: {e}", gdal_translate.display()),
        })?;

    if !status.success() {
        return Err(DatasetError::ToolFailed {
            tool: GDAL_TRANSLATE.to_string(),
            reason: format!("{status} compressing {}", source.display()),
        });
    }
    Ok(())
}

/// Total size in bytes of the given files.
pub fn file_size_bytes(paths: &[PathBuf]) -> DatasetResult<u64> {
    paths.iter().try_fold(0, |total, path| {
        let metadata = fs::metadata(path).map_err(|e| DatasetError::io(path, e))?;
        Ok(total + metadata.len())
    })
}
