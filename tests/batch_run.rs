//! Integration tests for the batch driver: file naming, partial-failure
//! isolation, dry-run previews, and atomic output.

use std::collections::BTreeMap;
use std::fs;

use confgen::batch::{run_batch, BatchOptions, DeviceError, NamingPolicy, Outcome};
use confgen::compose::ComposeOptions;
use confgen::inventory::{parse_inventory, DeviceRecord};
use confgen::section::SectionDefinition;

const SYSTEM: &str = r#"
requires = ["hostname"]
body = '''
set system host-name {hostname}
'''
"#;

fn system_section() -> SectionDefinition {
    SectionDefinition::from_toml_str("system", SYSTEM).unwrap()
}

fn devices(yaml: &str) -> Vec<DeviceRecord> {
    parse_inventory(yaml).unwrap()
}

fn options(dir: &std::path::Path) -> BatchOptions {
    BatchOptions {
        output_dir: dir.to_path_buf(),
        dry_run: false,
        naming: NamingPolicy::default(),
        overrides: BTreeMap::new(),
        compose: ComposeOptions::at("2024-06-01 08:00:00"),
    }
}

#[test]
fn test_one_file_per_device() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("configs");
    let section = system_section();
    let devices = devices(
        r#"
devices:
  - serial: A1
    hostname: sw1
    model: EX4100
  - serial: B2
    hostname: sw2
    model: EX4100
"#,
    );

    let mut preview = Vec::new();
    let result = run_batch(&devices, &[&section], &options(&out), &mut preview).unwrap();

    assert!(result.is_clean());
    assert_eq!(result.succeeded(), 2);
    assert!(out.join("A1.cfg").is_file());
    assert!(out.join("B2.cfg").is_file());

    let text = fs::read_to_string(out.join("A1.cfg")).unwrap();
    assert!(text.contains("# Device   : A1"));
    assert!(text.contains("set system host-name sw1"));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_failed_device_does_not_stop_the_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("configs");
    let section = system_section();
    // sw2 is missing the hostname the section requires
    let devices = devices(
        r#"
devices:
  - serial: A1
    hostname: sw1
    model: EX4100
  - serial: B2
    model: EX4100
  - serial: C3
    hostname: sw3
    model: EX4100
"#,
    );

    let mut preview = Vec::new();
    let result = run_batch(&devices, &[&section], &options(&out), &mut preview).unwrap();

    assert_eq!(result.succeeded(), 2);
    assert_eq!(result.failed(), 1);
    assert!(!result.is_clean());

    let failures: Vec<&str> = result.failures().map(|(serial, _)| serial).collect();
    assert_eq!(failures, vec!["B2"]);
    assert!(matches!(
        result.failures().next().unwrap().1,
        DeviceError::Compose(_)
    ));

    assert!(out.join("A1.cfg").is_file());
    assert!(!out.join("B2.cfg").exists());
    assert!(out.join("C3.cfg").is_file());
}

#[test]
fn test_dry_run_writes_nothing_and_previews_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("configs");
    let section = system_section();
    let devices = devices(
        "devices:\n  - serial: A1\n    hostname: sw1\n    model: EX4100\n",
    );

    let mut opts = options(&out);
    opts.dry_run = true;

    let mut preview = Vec::new();
    let result = run_batch(&devices, &[&section], &opts, &mut preview).unwrap();

    assert!(result.is_clean());
    assert!(matches!(result.reports[0].outcome, Ok(Outcome::Previewed)));
    // Dry run must not even create the output directory
    assert!(!out.exists());

    let text = String::from_utf8(preview).unwrap();
    assert!(text.contains("# Device   : A1"));
    assert!(text.contains("set system host-name sw1"));
}

#[test]
fn test_serial_is_sanitized_in_filenames() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("configs");
    let section = system_section();
    let devices = devices(
        "devices:\n  - serial: FW 35/23#01\n    hostname: sw1\n    model: EX4100\n",
    );

    let mut preview = Vec::new();
    let result = run_batch(&devices, &[&section], &options(&out), &mut preview).unwrap();

    assert!(result.is_clean());
    assert!(out.join("FW_35_23_01.cfg").is_file());
    // The header keeps the raw serial; only the filename is sanitized
    let text = fs::read_to_string(out.join("FW_35_23_01.cfg")).unwrap();
    assert!(text.contains("# Device   : FW 35/23#01"));
}

#[test]
fn test_hostname_serial_naming_policy() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("configs");
    let section = system_section();
    let devices = devices(
        "devices:\n  - serial: A1\n    hostname: sw-core-1\n    model: EX4100\n",
    );

    let mut opts = options(&out);
    opts.naming = NamingPolicy::HostnameSerial;

    let mut preview = Vec::new();
    let result = run_batch(&devices, &[&section], &opts, &mut preview).unwrap();

    assert!(result.is_clean());
    assert!(out.join("sw-core-1_A1_config.txt").is_file());
}

#[test]
fn test_no_temporary_files_are_left_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("configs");
    let section = system_section();
    let devices = devices(
        "devices:\n  - serial: A1\n    hostname: sw1\n    model: EX4100\n",
    );

    let mut preview = Vec::new();
    run_batch(&devices, &[&section], &options(&out), &mut preview).unwrap();

    let names: Vec<String> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["A1.cfg".to_string()]);
}
