//! Configuration resolution and graceful degradation tests
//!
//! Tests that manipulate INTERVIEW_ROOT_FOLDER or INTERVIEW_CONFIG are marked
//! with #[serial] so they never run in parallel.

use interview_common::config::{
    load_service_config, resolve_config_path, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, ServiceConfig, StorageConfig, CONFIG_PATH_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new().resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_env_var_beats_toml_root() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/interview-env-root");

    let config = ServiceConfig {
        root_folder: Some(PathBuf::from("/tmp/interview-toml-root")),
        ..Default::default()
    };
    let root_folder = RootFolderResolver::new().with_config(&config).resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/interview-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_root_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = ServiceConfig {
        root_folder: Some(PathBuf::from("/tmp/interview-toml-root")),
        ..Default::default()
    };
    let root_folder = RootFolderResolver::new().with_config(&config).resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/interview-toml-root"));
}

#[test]
#[serial]
fn test_config_path_env_override() {
    env::set_var(CONFIG_PATH_ENV, "/etc/interview/alt.toml");
    assert_eq!(
        resolve_config_path(None),
        Some(PathBuf::from("/etc/interview/alt.toml"))
    );

    let cli = PathBuf::from("/opt/cli.toml");
    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));

    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let config = load_service_config(Some(&temp.path().join("absent.toml"))).unwrap();

    assert!(config.root_folder.is_none());
    assert_eq!(config.pipeline.aggregation_threshold, 3);
    assert_eq!(config.gateway.read_timeout_secs, 90);
}

#[test]
fn test_malformed_config_file_is_fatal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "root_folder = [not toml").unwrap();

    let result = load_service_config(Some(&path));
    assert!(result.is_err());
}

#[test]
fn test_config_file_round_trip_values() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        bind_address = "0.0.0.0:8080"
        log_level = "debug"

        [storage]
        storage_dir = "/data/videos"

        [gateway]
        vision_url = "http://vision:5003"
        read_timeout_secs = 120
        "#,
    )
    .unwrap();

    let config = load_service_config(Some(&path)).unwrap();
    assert_eq!(config.bind_address(), "0.0.0.0:8080");
    assert_eq!(config.log_level(), "debug");
    assert_eq!(config.storage.storage_dir, Some(PathBuf::from("/data/videos")));
    assert_eq!(config.gateway.vision_url, "http://vision:5003");
    assert_eq!(config.gateway.read_timeout_secs, 120);
    assert_eq!(config.gateway.connect_timeout_secs, 30);
}

#[test]
fn test_initializer_creates_layout_idempotently() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    let initializer = RootFolderInitializer::new(root.clone(), &StorageConfig::default());

    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.storage_dir().is_dir());
    assert!(initializer.scratch_dir().is_dir());
    assert!(!initializer.database_exists());
}

#[test]
fn test_initializer_fails_when_root_is_a_file() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("occupied");
    std::fs::write(&root, b"not a directory").unwrap();

    let initializer = RootFolderInitializer::new(root, &StorageConfig::default());
    assert!(initializer.ensure_directory_exists().is_err());
}
