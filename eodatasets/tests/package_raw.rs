//! End-to-end packaging of a raw Landsat 8 pass.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use eodatasets::checksum::{PackageChecksum, VerifyFailure, CHECKSUM_FILE_NAME};
use eodatasets::config::PackagingConfig;
use eodatasets::extract::Collaborators;
use eodatasets::package::{package_dataset, PackageOutcome};
use eodatasets::provenance::ProcessContext;
use eodatasets::run::{
    init_locally_processed_dataset, package_data_folders, DatasetOrigin, FolderPackaging,
    SourceDatasets, STAGING_PREFIX,
};
use eodatasets::serialise::{read_dataset_metadata, METADATA_FILE_NAME};
use eodatasets::Driver;
use tempfile::TempDir;

const EXPECTED_LABEL: &str =
    "LS8_OLITIRS_STD-MD_P00_LC81160740842015089ASA00_116_074-084_20150330T022553Z20150330T022657";

fn dt(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2015, 3, 30)
        .unwrap()
        .and_hms_milli_opt(h, m, s, ms)
        .unwrap()
}

/// A raw pass as it lands from the ground station.
fn raw_pass(root: &Path) -> PathBuf {
    let folder = root
        .join("input")
        .join("LANDSAT-8.11308")
        .join("LC81160740842015089ASA00");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("480.000.2015089022657325.ASA"), b"later telemetry").unwrap();
    fs::write(folder.join("481.000.2015089022553346.ASA"), b"earlier telemetry").unwrap();
    folder
}

fn uncompressed() -> PackagingConfig {
    PackagingConfig::default().with_compress_imagery(false)
}

#[test]
fn test_package_raw_ls8_pass() {
    let temp = TempDir::new().unwrap();
    let source = raw_pass(temp.path());
    let target = temp.path().join("package");
    let context = ProcessContext::detect();
    let collaborators = Collaborators::new();

    let dataset =
        init_locally_processed_dataset(&source, SourceDatasets::new(), None, &context).unwrap();
    let outcome = package_dataset(
        &Driver::Raw,
        dataset,
        &source,
        &target,
        &[],
        &collaborators,
        &uncompressed(),
    )
    .unwrap();

    let PackageOutcome::Packaged(packaged) = outcome else {
        panic!("expected a new package");
    };
    assert_eq!(packaged.ga_label.as_deref(), Some(EXPECTED_LABEL));
    assert_eq!(packaged.ga_level.as_deref(), Some("P00"));

    let acquisition = packaged.acquisition.as_ref().unwrap();
    assert_eq!(acquisition.aos, Some(dt(2, 25, 53, 346)));
    assert_eq!(acquisition.los, Some(dt(2, 26, 57, 325)));
    assert_eq!(acquisition.platform_orbit, Some(11308));

    assert!(target.join("product/480.000.2015089022657325.ASA").is_file());
    assert!(target.join("product/481.000.2015089022553346.ASA").is_file());
    assert!(target.join(CHECKSUM_FILE_NAME).is_file());

    // The written document reads back with the same identity.
    let written = read_dataset_metadata(&target.join(METADATA_FILE_NAME)).unwrap();
    assert_eq!(written.id, packaged.id);
    assert_eq!(written.ga_label.as_deref(), Some(EXPECTED_LABEL));
    assert_eq!(written.platform_code(), Some("LANDSAT_8"));
}

#[test]
fn test_packaging_twice_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let source = raw_pass(temp.path());
    let target = temp.path().join("package");
    let context = ProcessContext::detect();
    let collaborators = Collaborators::new();

    let package = || {
        let dataset =
            init_locally_processed_dataset(&source, SourceDatasets::new(), None, &context)
                .unwrap();
        package_dataset(
            &Driver::Raw,
            dataset,
            &source,
            &target,
            &[],
            &collaborators,
            &uncompressed(),
        )
        .unwrap()
    };

    assert!(package().is_packaged());
    let manifest = fs::read(target.join(CHECKSUM_FILE_NAME)).unwrap();

    assert_eq!(package(), PackageOutcome::AlreadyPackaged(target.clone()));
    assert_eq!(fs::read(target.join(CHECKSUM_FILE_NAME)).unwrap(), manifest);
}

#[test]
fn test_manifest_detects_a_modified_file() {
    let temp = TempDir::new().unwrap();
    let source = raw_pass(temp.path());
    let target = temp.path().join("package");
    let context = ProcessContext::detect();

    let dataset =
        init_locally_processed_dataset(&source, SourceDatasets::new(), None, &context).unwrap();
    package_dataset(
        &Driver::Raw,
        dataset,
        &source,
        &target,
        &[],
        &Collaborators::new(),
        &uncompressed(),
    )
    .unwrap();

    let manifest = target.join(CHECKSUM_FILE_NAME);
    let report = PackageChecksum::verify(&manifest).unwrap();
    assert!(report.is_ok());
    // Two data files plus the metadata document.
    assert_eq!(report.checked, 3);

    fs::write(
        target.join("product/481.000.2015089022553346.ASA"),
        b"tampered",
    )
    .unwrap();
    let report = PackageChecksum::verify(&manifest).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        VerifyFailure::Mismatch { path, .. } if path.ends_with("481.000.2015089022553346.ASA")
    ));
}

#[test]
fn test_package_folders_renames_into_place() {
    let temp = TempDir::new().unwrap();
    let source = raw_pass(temp.path());
    let destination = temp.path().join("output");
    fs::create_dir_all(&destination).unwrap();

    let config = uncompressed();
    let collaborators = Collaborators::new();
    let context = ProcessContext::detect();
    let job = FolderPackaging {
        driver: Driver::Raw,
        origin: DatasetOrigin::Local,
        source_datasets: SourceDatasets::new(),
        additional_files: Vec::new(),
        collaborators: &collaborators,
        config: &config,
        context: &context,
    };

    let first = package_data_folders(&job, &[source.clone()], &destination).unwrap();
    assert_eq!(first.created, vec![destination.join(EXPECTED_LABEL)]);
    assert!(first.existing.is_empty());
    assert!(destination
        .join(EXPECTED_LABEL)
        .join(METADATA_FILE_NAME)
        .is_file());

    let second = package_data_folders(&job, &[source], &destination).unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.existing, vec![destination.join(EXPECTED_LABEL)]);

    // No staging directories are left behind.
    let leftovers: Vec<_> = fs::read_dir(&destination)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
        .collect();
    assert!(leftovers.is_empty());
}
