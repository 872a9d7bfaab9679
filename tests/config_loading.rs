//! Configuration files on disk

use std::io::Write;

use fluid_cursor::{CursorConfig, CursorError};

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
[window]
title = "Trail"
width = 800
height = 600

[simulation]
dye_resolution = 1024
splat_force = 4000.0
transparent = false
"#
    )
    .expect("write config");

    let config = CursorConfig::load(file.path()).expect("load config");
    assert_eq!(config.window.title, "Trail");
    assert_eq!((config.window.width, config.window.height), (800, 600));
    assert_eq!(config.simulation.dye_resolution, 1024);
    assert_eq!(config.simulation.splat_force, 4000.0);
    assert!(!config.simulation.transparent);
    // untouched keys keep their defaults
    assert_eq!(config.simulation.sim_resolution, 128);
    assert_eq!(config.simulation.density_dissipation, 3.5);
}

#[test]
fn test_empty_file_is_the_default_config() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let config = CursorConfig::load(file.path()).expect("load config");
    assert_eq!(config, CursorConfig::default());
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");

    match CursorConfig::load(&path) {
        Err(CursorError::ConfigIo { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected ConfigIo error, got {other:?}"),
    }
}

#[test]
fn test_invalid_values_in_file_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[simulation]\nsplat_radius = -0.5").expect("write config");

    let error = CursorConfig::load(file.path()).expect_err("negative radius");
    assert!(matches!(error, CursorError::InvalidConfig(_)));
    assert!(!error.is_unsupported_platform());
}

#[test]
fn test_bundled_demo_config_parses() {
    let raw = include_str!("../fluid-cursor.toml");
    let config = CursorConfig::from_toml_str(raw).expect("bundled config");
    assert!(config.simulation.validate().is_ok());
}
