//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use eodatasets::DatasetError;

/// Errors reported by CLI commands. Every error exits with status 1.
#[derive(Debug)]
pub enum CliError {
    /// A library operation failed.
    Dataset(DatasetError),
    /// Invalid configuration or arguments.
    Config(String),
    /// Checksum verification found problems.
    VerifyFailed { package: PathBuf, failures: usize },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Dataset(e) => write!(f, "{}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::VerifyFailed { package, failures } => write!(
                f,
                "{} file(s) failed verification in {}",
                failures,
                package.display()
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DatasetError> for CliError {
    fn from(e: DatasetError) -> Self {
        CliError::Dataset(e)
    }
}
