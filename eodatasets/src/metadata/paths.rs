//! Path rewriting helpers for metadata documents.

use std::path::{Path, PathBuf};

/// Move `path` from under `from` to the same relative location under `to`.
///
/// Paths outside `from` (including relative paths) are returned unchanged.
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use eodatasets::metadata::rebase_path;
///
/// let moved = rebase_path(Path::new("/in"), Path::new("/out"), Path::new("/in/a/b.tif"));
/// assert_eq!(moved, PathBuf::from("/out/a/b.tif"));
/// ```
pub fn rebase_path(from: &Path, to: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rel) if path.is_absolute() => to.join(rel),
        _ => path.to_path_buf(),
    }
}

/// Express `path` relative to `base` when it lies beneath it.
pub fn relativize_path(base: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(base) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolve a relative `path` against `base`; absolute paths pass through.
pub fn absolutize_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebase_path_moves_nested_file() {
        assert_eq!(
            rebase_path(
                Path::new("/tmp/from"),
                Path::new("/tmp/to"),
                Path::new("/tmp/from/something/test.txt")
            ),
            PathBuf::from("/tmp/to/something/test.txt")
        );
    }

    #[test]
    fn test_rebase_path_leaves_outside_paths() {
        assert_eq!(
            rebase_path(
                Path::new("/tmp/from"),
                Path::new("/tmp/to"),
                Path::new("/tmp/other/test.txt")
            ),
            PathBuf::from("/tmp/other/test.txt")
        );
    }

    #[test]
    fn test_rebase_path_leaves_relative_paths() {
        assert_eq!(
            rebase_path(
                Path::new("/tmp/from"),
                Path::new("/tmp/to"),
                Path::new("other.txt")
            ),
            PathBuf::from("other.txt")
        );
    }

    #[test]
    fn test_relativize_then_absolutize() {
        let base = Path::new("/data/LS8_OLITIRS_OTH_P51");
        let abs = base.join("product/scene_B1.TIF");

        let rel = relativize_path(base, &abs);
        assert_eq!(rel, PathBuf::from("product/scene_B1.TIF"));
        assert_eq!(absolutize_path(base, &rel), abs);
    }

    #[test]
    fn test_relativize_outside_base_is_unchanged() {
        let path = Path::new("/elsewhere/parent.yaml");
        assert_eq!(relativize_path(Path::new("/data"), path), path);
    }
}
