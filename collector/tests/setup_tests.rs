//! Setup Integration Tests
//!
//! `collector init` must create the credentials file exactly once and leave
//! an edited file alone on every later run.

use collector::setup::bootstrap;
use collector_common::config::{load_config, TomlConfig, LOCAL_CONFIG_FILE};
use collector_common::credentials::{CredentialsFileStatus, CREDENTIALS_TEMPLATE};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn fresh_root_gets_placeholder_credentials() {
    let dir = TempDir::new().unwrap();

    let report = bootstrap(dir.path(), &TomlConfig::default(), None).unwrap();

    assert_eq!(report.credentials, CredentialsFileStatus::Created);
    let content = std::fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(content, CREDENTIALS_TEMPLATE);
    for var in ["DB_NAME=", "DB_USER=", "DB_PASSWORD=", "DB_HOST="] {
        assert_eq!(content.matches(var).count(), 1, "{} should appear once", var);
    }
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn second_run_leaves_everything_untouched() {
    let dir = TempDir::new().unwrap();
    bootstrap(dir.path(), &TomlConfig::default(), None).unwrap();

    // Given: the user filled in credentials and tuned the config
    let env_path = dir.path().join(".env");
    std::fs::write(&env_path, "DB_NAME=prydz\nDB_USER=eric\nDB_PASSWORD=pw\nDB_HOST=db.local\n").unwrap();
    let config_path = dir.path().join(LOCAL_CONFIG_FILE);
    std::fs::write(&config_path, "[crawl]\nmax_retries = 7\n").unwrap();
    let env_before = std::fs::read(&env_path).unwrap();

    // When: setup runs again
    let report = bootstrap(dir.path(), &TomlConfig::default(), None).unwrap();

    // Then
    assert_eq!(report.credentials, CredentialsFileStatus::AlreadyPresent);
    assert!(report.credentials_ready);
    assert_eq!(report.config_written, None);
    assert_eq!(std::fs::read(&env_path).unwrap(), env_before);
    assert_eq!(load_config(Some(&config_path)).unwrap().crawl.max_retries, 7);
}

#[test]
fn custom_paths_from_config_are_used() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig {
        raw_data_dir: PathBuf::from("data/raw"),
        credentials_file: PathBuf::from("secrets/db.env"),
        ..TomlConfig::default()
    };

    let report = bootstrap(dir.path(), &config, None).unwrap();

    assert_eq!(report.raw_data_dir, dir.path().join("data/raw"));
    assert!(dir.path().join("data/raw/processed_urls.json").is_file());
    assert!(dir.path().join("secrets/db.env").is_file());
    assert!(!dir.path().join(".env").exists());

    // The written config round-trips to the one used
    let written = load_config(report.config_written.as_deref()).unwrap();
    assert_eq!(written, config);
}
