//! Provenance of the current process: machine identity and software
//! versions, recorded in the lineage of every dataset it creates.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::metadata::MachineMetadata;

/// Collection name for Rust crates.
pub const RUST_COLLECTION: &str = "rust";

/// Software versions grouped by collection (eg. `rust`, `rpm`).
///
/// A child provenance reports its parent's software as well as its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftwareProvenance {
    parent: Option<Box<SoftwareProvenance>>,
    collections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SoftwareProvenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty provenance that inherits `parent`'s software.
    pub fn with_parent(parent: SoftwareProvenance) -> Self {
        Self {
            parent: Some(Box::new(parent)),
            collections: BTreeMap::new(),
        }
    }

    /// Provenance recording this crate's own version.
    pub fn for_this_crate() -> Self {
        let mut provenance = Self::new();
        provenance.note_software(RUST_COLLECTION, env!("CARGO_PKG_NAME"), crate::VERSION);
        provenance
    }

    pub fn note_software(
        &mut self,
        collection: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) {
        self.collections
            .entry(collection.into())
            .or_default()
            .insert(name.into(), version.into());
    }

    /// Every `(collection, name, version)`: the parent's first, then our
    /// own sorted by collection and name.
    pub fn iter_software(&self) -> Vec<(&str, &str, &str)> {
        let mut software = self
            .parent
            .as_ref()
            .map(|p| p.iter_software())
            .unwrap_or_default();

        for (collection, entries) in &self.collections {
            for (name, version) in entries {
                software.push((collection.as_str(), name.as_str(), version.as_str()));
            }
        }
        software
    }

    /// All software merged into one map. Our own entries win over the
    /// parent's.
    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut map: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (collection, name, version) in self.iter_software() {
            map.entry(collection.to_string())
                .or_default()
                .insert(name.to_string(), version.to_string());
        }
        map
    }
}

/// Identity of the running process, built once and passed to every
/// dataset it initialises.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessContext {
    /// Fully qualified hostname, if it could be determined.
    pub hostname: Option<String>,
    /// Space separated `uname` fields.
    pub uname: Option<String>,
    /// Unique to this process run.
    pub runtime_id: Uuid,
    pub software: SoftwareProvenance,
}

impl ProcessContext {
    /// Capture the current machine.
    pub fn detect() -> Self {
        Self {
            hostname: hostname(),
            uname: uname(),
            runtime_id: Uuid::new_v4(),
            software: SoftwareProvenance::for_this_crate(),
        }
    }

    /// Full machine record for a dataset processed by this process.
    pub fn machine_metadata(&self) -> MachineMetadata {
        MachineMetadata {
            hostname: self.hostname.clone(),
            runtime_id: Some(self.runtime_id),
            uname: self.uname.clone(),
            software: Some(self.software.to_map()),
            ..Default::default()
        }
    }
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    let mut buffer = [0u8; 256];
    // SAFETY: the buffer is valid for its whole length.
    let result = unsafe { libc::gethostname(buffer.as_mut_ptr().cast(), buffer.len()) };
    if result != 0 {
        return None;
    }
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    let name = String::from_utf8_lossy(&buffer[..end]).into_owned();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(unix)]
fn uname() -> Option<String> {
    use std::ffi::CStr;

    // SAFETY: utsname is plain data, and uname fills it on success.
    let mut info: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut info) } != 0 {
        return None;
    }

    let fields = [
        &info.sysname[..],
        &info.nodename[..],
        &info.release[..],
        &info.version[..],
        &info.machine[..],
    ];
    let parts: Vec<String> = fields
        .iter()
        .map(|field| {
            // SAFETY: uname null-terminates each field.
            unsafe { CStr::from_ptr(field.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    Some(parts.join(" "))
}

#[cfg(not(unix))]
fn uname() -> Option<String> {
    None
}
