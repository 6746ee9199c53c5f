//! eodatasets - Earth-observation dataset packaging
//!
//! This library catalogs and repackages satellite products (raw telemetry,
//! orthorectified imagery, reflectance and pixel-quality products, legacy
//! EODS archives) into a standard on-disk layout:
//!
//! ```text
//! <destination>/<ga_label>/
//! ├── ga-metadata.yaml      structured metadata document
//! ├── package.sha256        checksum manifest
//! ├── product/              copied (and possibly recompressed) files
//! └── additional/           caller-supplied extra files
//! ```
//!
//! # Pipeline
//!
//! 1. Select a [`driver::Driver`] by product-type key (`raw`, `level1`, `nbar`, ...)
//! 2. Populate a fresh [`metadata::DatasetMetadata`] from the source directory
//! 3. Borrow shared fields from the parent dataset ([`lineage`])
//! 4. Generate the canonical dataset label ([`label`])
//! 5. Copy files into place while recording checksums ([`package`], [`checksum`])
//! 6. Write metadata and the checksum manifest, then rename into place ([`run`])

pub mod checksum;
pub mod codes;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod label;
pub mod lineage;
pub mod metadata;
pub mod package;
pub mod provenance;
pub mod run;
pub mod serialise;

pub use driver::{Driver, NbarSubset};
pub use error::{DatasetError, DatasetResult};
pub use metadata::DatasetMetadata;

/// Version of this library, recorded in dataset provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Repository URL, recorded in dataset provenance.
pub const REPO_URL: &str = env!("CARGO_PKG_REPOSITORY");
