use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use watch_db_exporter::config::Config;
use watch_db_exporter::error::ConfigError;

#[test]
fn test_template_round_trip() {
    let temp_dir = tempdir().unwrap();
    let config_file = temp_dir.path().join("watch-export.toml");

    let config = Config::default();
    config.save(&config_file).unwrap();
    assert!(config_file.exists());

    let loaded = Config::load(&config_file).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml(
        r#"
        [device]
        bridge_program = "/opt/platform-tools/adb"

        [paths]
        output_dir = "exports"
        "#,
    )
    .unwrap();

    assert_eq!(config.device.bridge_program, "/opt/platform-tools/adb");
    assert_eq!(config.device.archive_program, "tar");
    assert_eq!(config.paths.output_dir, PathBuf::from("exports"));
    assert_eq!(config.paths.snapshot, PathBuf::from("sport.db"));
    assert_eq!(config.timestamp_key, "currentTime");
    assert_eq!(config.jobs.len(), 4);
}

#[test]
fn test_custom_jobs_replace_defaults() {
    let config = Config::from_toml(
        r#"
        [[jobs]]
        table = "STEP_DATA_CACHE"
        json_column = "DATA_LIST"
        value_key = "step_value"
        output = "steps.csv"
        value_header = "Steps"
        "#,
    )
    .unwrap();

    assert_eq!(config.jobs.len(), 1);
    assert_eq!(config.jobs[0].table, "STEP_DATA_CACHE");
    assert_eq!(config.output_path(&config.jobs[0]), PathBuf::from("./steps.csv"));
}

#[test]
fn test_invalid_config() {
    let temp_dir = tempdir().unwrap();
    let config_file = temp_dir.path().join("broken.toml");
    fs::write(&config_file, "[device\nbridge_program = ").unwrap();

    assert!(matches!(
        Config::load(&config_file),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_missing_config_file() {
    let result = Config::load(&PathBuf::from("no_such_config.toml"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
