//! CLI command implementations.

pub mod metadata;
pub mod package;
pub mod verify;

use eodatasets::driver::PACKAGE_DRIVER_KEYS;
use eodatasets::Driver;

/// Parse a package type key for clap.
pub fn parse_driver(key: &str) -> Result<Driver, String> {
    Driver::from_key(key)
        .map_err(|_| format!("expected one of: {}", PACKAGE_DRIVER_KEYS.join(", ")))
}
