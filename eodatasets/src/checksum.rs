//! SHA-256 checksum manifests for packaged datasets.
//!
//! A manifest lists one file per line as `<hex digest>  <relative/path>`,
//! in the order the files were added, with paths relative to the manifest's
//! directory:
//!
//! ```text
//! 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08  product/LC81160740842015089ASA00_B1.TIF
//! 60303ae22b998861bce3b28f33eec1be758a213c86c93c076dbe9f558c11c752  ga-metadata.yaml
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::driver::walk_error;
use crate::error::{DatasetError, DatasetResult};

/// Manifest filename at the root of a packaged dataset.
pub const CHECKSUM_FILE_NAME: &str = "package.sha256";

const READ_CAPACITY: usize = 64 * 1024;

/// Calculate the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn calculate_file_hash(path: &Path) -> DatasetResult<String> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let mut reader = BufReader::with_capacity(READ_CAPACITY, file);

    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| DatasetError::io(path, e))?;
    Ok(hex_digest(hasher))
}

fn hex_digest(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// An incrementally built checksum manifest.
///
/// Files are hashed as they are added, while they are likely still in the
/// filesystem cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageChecksum {
    entries: Vec<(PathBuf, String)>,
}

impl PackageChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a file and append it to the manifest.
    ///
    /// A directory adds every file beneath it, in name order.
    pub fn add_file(&mut self, path: &Path) -> DatasetResult<()> {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| walk_error(path, e))?;
                if entry.file_type().is_file() {
                    self.add_file(entry.path())?;
                }
            }
            return Ok(());
        }

        info!(path = %path.display(), "Checksumming");
        let digest = calculate_file_hash(path)?;
        debug!(path = %path.display(), digest = %digest, "Checksum calculated");
        self.entries.push((path.to_path_buf(), digest));
        Ok(())
    }

    /// Recorded `(path, digest)` pairs, in insertion order.
    pub fn entries(&self) -> &[(PathBuf, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the manifest to `manifest`.
    ///
    /// Paths beneath the manifest's directory are written relative to it.
    pub fn write(&self, manifest: &Path) -> DatasetResult<()> {
        let base = manifest.parent().unwrap_or(Path::new(""));

        let mut content = String::new();
        for (path, digest) in &self.entries {
            let relative = path.strip_prefix(base).unwrap_or(path);
            content.push_str(&format!("{digest}  {}\n", to_manifest_path(relative)));
        }

        fs::write(manifest, content).map_err(|e| DatasetError::io(manifest, e))?;
        debug!(path = %manifest.display(), entries = self.entries.len(), "Wrote checksum manifest");
        Ok(())
    }

    /// Read a manifest. Relative paths are resolved against its directory.
    pub fn read_manifest(manifest: &Path) -> DatasetResult<Self> {
        let content = fs::read_to_string(manifest).map_err(|e| DatasetError::io(manifest, e))?;
        let base = manifest.parent().unwrap_or(Path::new(""));

        let mut entries = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((digest, path)) = line.split_once(char::is_whitespace) else {
                return Err(DatasetError::MalformedDocument {
                    path: manifest.to_path_buf(),
                    reason: format!("line {}: expected `<digest>  <path>`", number + 1),
                });
            };
            entries.push((base.join(path.trim_start()), digest.to_lowercase()));
        }
        Ok(Self { entries })
    }

    /// Re-hash every file listed in `manifest`.
    ///
    /// Every entry is checked; failures are collected rather than returned
    /// as errors.
    pub fn verify(manifest: &Path) -> DatasetResult<VerifyReport> {
        let recorded = Self::read_manifest(manifest)?;

        let mut report = VerifyReport {
            checked: recorded.len(),
            failures: Vec::new(),
        };
        for (path, expected) in recorded.entries {
            let actual = match calculate_file_hash(&path) {
                Ok(actual) => actual,
                Err(DatasetError::Io { source, .. })
                    if source.kind() == io::ErrorKind::NotFound =>
                {
                    warn!(path = %path.display(), "Packaged file is missing");
                    report.failures.push(VerifyFailure::Missing { path });
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Packaged file is unreadable");
                    report.failures.push(VerifyFailure::Unreadable {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if actual != expected {
                warn!(path = %path.display(), "Checksum mismatch");
                report.failures.push(VerifyFailure::Mismatch {
                    path,
                    expected,
                    actual,
                });
            }
        }
        Ok(report)
    }
}

/// A file that failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    Missing {
        path: PathBuf,
    },
    /// Listed and present, but could not be read.
    Unreadable {
        path: PathBuf,
        reason: String,
    },
}

impl VerifyFailure {
    pub fn path(&self) -> &Path {
        match self {
            VerifyFailure::Mismatch { path, .. }
            | VerifyFailure::Missing { path }
            | VerifyFailure::Unreadable { path, .. } => path,
        }
    }
}

/// Outcome of verifying a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of entries in the manifest.
    pub checked: usize,
    pub failures: Vec<VerifyFailure>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render a path with `/` separators.
fn to_manifest_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir => parts.push(String::new()),
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    if parts == [String::new()] {
        return "/".to_string();
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_calculate_file_hash() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        fs::write(&file_path, b"hello world").unwrap();

        assert_eq!(calculate_file_hash(&file_path).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.txt");
        File::create(&file_path).unwrap();

        assert_eq!(
            calculate_file_hash(&file_path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_nonexistent_file() {
        assert!(matches!(
            calculate_file_hash(Path::new("/nonexistent/file.txt")),
            Err(DatasetError::Io { .. })
        ));
    }

    #[test]
    fn test_manifest_keeps_insertion_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("product")).unwrap();
        fs::write(root.join("product/b.tif"), b"hello world").unwrap();
        fs::write(root.join("a.yaml"), b"").unwrap();

        let mut checksums = PackageChecksum::new();
        checksums.add_file(&root.join("product/b.tif")).unwrap();
        checksums.add_file(&root.join("a.yaml")).unwrap();

        let manifest = root.join(CHECKSUM_FILE_NAME);
        checksums.write(&manifest).unwrap();

        let content = fs::read_to_string(&manifest).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{HELLO_WORLD}  product/b.tif"));
        assert!(lines[1].ends_with("  a.yaml"));

        assert_eq!(PackageChecksum::read_manifest(&manifest).unwrap(), checksums);
    }

    #[test]
    fn test_add_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("browse/sub")).unwrap();
        fs::write(temp.path().join("browse/z.jpg"), b"z").unwrap();
        fs::write(temp.path().join("browse/sub/a.jpg"), b"a").unwrap();

        let mut checksums = PackageChecksum::new();
        checksums.add_file(&temp.path().join("browse")).unwrap();

        let paths: Vec<_> = checksums.entries().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            paths,
            vec![
                temp.path().join("browse/sub/a.jpg"),
                temp.path().join("browse/z.jpg"),
            ]
        );
    }

    #[test]
    fn test_verify_reports_every_failure() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for name in ["one", "two", "three"] {
            fs::write(root.join(name), name).unwrap();
        }

        let mut checksums = PackageChecksum::new();
        for name in ["one", "two", "three"] {
            checksums.add_file(&root.join(name)).unwrap();
        }
        let manifest = root.join(CHECKSUM_FILE_NAME);
        checksums.write(&manifest).unwrap();

        assert!(PackageChecksum::verify(&manifest).unwrap().is_ok());

        fs::write(root.join("one"), "changed").unwrap();
        fs::remove_file(root.join("three")).unwrap();

        let report = PackageChecksum::verify(&manifest).unwrap();
        assert_eq!(report.checked, 3);
        assert!(!report.is_ok());
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            &report.failures[0],
            VerifyFailure::Mismatch { path, .. } if path == &root.join("one")
        ));
        assert_eq!(
            report.failures[1],
            VerifyFailure::Missing {
                path: root.join("three")
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_continues_past_unreadable_entry() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("first"), "first").unwrap();
        fs::write(root.join("last"), "last").unwrap();
        // Opening a directory succeeds on unix but reading it fails, even as root.
        fs::create_dir(root.join("middle")).unwrap();

        let digest = |name: &str| calculate_file_hash(&root.join(name)).unwrap();
        let manifest = root.join(CHECKSUM_FILE_NAME);
        fs::write(
            &manifest,
            format!(
                "{}  first\n{}  middle\n{}  last\n",
                digest("first"),
                HELLO_WORLD,
                digest("last")
            ),
        )
        .unwrap();

        let report = PackageChecksum::verify(&manifest).unwrap();
        assert_eq!(report.checked, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            VerifyFailure::Unreadable { path, .. } if path == &root.join("middle")
        ));
    }

    #[test]
    fn test_malformed_manifest() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join(CHECKSUM_FILE_NAME);
        fs::write(&manifest, "deadbeef\n").unwrap();
        assert!(matches!(
            PackageChecksum::read_manifest(&manifest),
            Err(DatasetError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_manifest_path_separators() {
        assert_eq!(to_manifest_path(Path::new("product/a/b.tif")), "product/a/b.tif");
        assert_eq!(to_manifest_path(Path::new("/abs/c.tif")), "/abs/c.tif");
    }
}
