//! Project bootstrap (`collector init`)
//!
//! Prepares a project root for a first run:
//! 1. Raw data directory
//! 2. Credentials file with placeholder `DB_*` values, only when absent
//! 3. A `collector.toml` with the defaults, only when no config file is in use
//!
//! Every step is idempotent; a second run changes nothing.

use crate::error::CollectorResult;
use crate::store::RawDataStore;
use collector_common::config::{write_toml_config, TomlConfig, LOCAL_CONFIG_FILE};
use collector_common::credentials::{ensure_credentials_file, CredentialsFileStatus, DbCredentials};
use std::path::{Path, PathBuf};

/// What `bootstrap` found and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub raw_data_dir: PathBuf,
    pub credentials_file: PathBuf,
    pub credentials: CredentialsFileStatus,
    /// Credentials file holds a complete, non-placeholder set of values
    pub credentials_ready: bool,
    /// Path of the config file written, if one was
    pub config_written: Option<PathBuf>,
}

/// Bootstrap `root` using `config`
///
/// `config_in_use` is the config file that `config` was loaded from; when
/// `None`, a default `collector.toml` is written to the root unless one exists.
pub fn bootstrap(
    root: &Path,
    config: &TomlConfig,
    config_in_use: Option<&Path>,
) -> CollectorResult<BootstrapReport> {
    std::fs::create_dir_all(root)?;

    let raw_data_dir = root.join(&config.raw_data_dir);
    RawDataStore::open(&raw_data_dir)?;
    tracing::info!(path = %raw_data_dir.display(), "Raw data directory ready");

    let credentials_file = root.join(&config.credentials_file);
    let credentials = ensure_credentials_file(&credentials_file)?;
    match credentials {
        CredentialsFileStatus::Created => tracing::info!(
            path = %credentials_file.display(),
            "Created credentials file; fill in DB_NAME, DB_USER, DB_PASSWORD and DB_HOST"
        ),
        CredentialsFileStatus::AlreadyPresent => tracing::info!(
            path = %credentials_file.display(),
            "Credentials file already exists, leaving it untouched"
        ),
    }

    let credentials_ready = match DbCredentials::from_file(&credentials_file) {
        Ok(creds) => !creds.is_placeholder(),
        Err(e) => {
            tracing::debug!(error = %e, "Credentials not usable yet");
            false
        }
    };
    if !credentials_ready {
        tracing::warn!(
            path = %credentials_file.display(),
            "Database credentials are incomplete or still placeholders"
        );
    }

    let config_written = match config_in_use {
        Some(_) => None,
        None => {
            let path = root.join(LOCAL_CONFIG_FILE);
            if path.exists() {
                None
            } else {
                write_toml_config(config, &path)?;
                tracing::info!(path = %path.display(), "Wrote default configuration");
                Some(path)
            }
        }
    };

    Ok(BootstrapReport {
        raw_data_dir,
        credentials_file,
        credentials,
        credentials_ready,
        config_written,
    })
}
