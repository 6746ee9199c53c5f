//! Verify command - re-check the checksums of packages.

use std::path::{Path, PathBuf};

use clap::Args;
use eodatasets::checksum::{PackageChecksum, VerifyFailure, CHECKSUM_FILE_NAME};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Package directories or manifest files
    #[arg(required = true)]
    pub packages: Vec<PathBuf>,
}

/// The manifest of a package directory, or the path itself.
fn manifest_path(package: &Path) -> PathBuf {
    if package.is_dir() {
        package.join(CHECKSUM_FILE_NAME)
    } else {
        package.to_path_buf()
    }
}

/// Run the verify command.
///
/// Every package is checked; the first failing one is reported as the
/// error.
pub fn run(args: VerifyArgs) -> Result<(), CliError> {
    let mut first_failure = None;

    for package in &args.packages {
        let report = PackageChecksum::verify(&manifest_path(package))?;

        for failure in &report.failures {
            match failure {
                VerifyFailure::Mismatch { path, .. } => {
                    println!("MISMATCH {}", path.display())
                }
                VerifyFailure::Missing { path } => println!("MISSING  {}", path.display()),
                VerifyFailure::Unreadable { path, reason } => {
                    println!("UNREADABLE {} ({})", path.display(), reason)
                }
            }
        }
        println!(
            "{}: {}/{} ok",
            package.display(),
            report.checked - report.failures.len(),
            report.checked
        );

        if !report.is_ok() && first_failure.is_none() {
            first_failure = Some(CliError::VerifyFailed {
                package: package.clone(),
                failures: report.failures.len(),
            });
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
