//! Database credentials file (`.env`)
//!
//! The loader reads `DB_NAME`, `DB_USER`, `DB_PASSWORD` and `DB_HOST` from the
//! process environment, which is seeded from a dotenv file in the project
//! root. Setup writes that file with placeholder values the first time and
//! never touches it again.

use crate::{Error, Result};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Variables written to a fresh credentials file, in order
pub const CREDENTIAL_VARS: [&str; 4] = ["DB_NAME", "DB_USER", "DB_PASSWORD", "DB_HOST"];

/// Placeholder contents of a fresh credentials file
pub const CREDENTIALS_TEMPLATE: &str = "\
DB_NAME=your_database_name
DB_USER=your_database_user
DB_PASSWORD=your_database_password
DB_HOST=localhost
";

const PLACEHOLDER_PREFIX: &str = "your_";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;

/// Outcome of [`ensure_credentials_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsFileStatus {
    /// The file did not exist and was written with placeholders
    Created,
    /// The file already existed and was left untouched
    AlreadyPresent,
}

/// Create the credentials file with placeholder values unless it exists
///
/// Uses `create_new`, so an existing file is never opened for writing.
pub fn ensure_credentials_file(path: &Path) -> Result<CredentialsFileStatus> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(CREDENTIALS_TEMPLATE.as_bytes())?;
            file.flush()?;
            info!("Created credentials file with placeholders: {}", path.display());
            Ok(CredentialsFileStatus::Created)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("Credentials file already present: {}", path.display());
            Ok(CredentialsFileStatus::AlreadyPresent)
        }
        Err(e) => Err(e.into()),
    }
}

/// Load a dotenv file into the process environment
///
/// Variables already set in the environment win. Returns the path when the
/// file existed and was applied.
pub fn load_env_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    dotenvy::from_path(path)
        .map_err(|e| Error::Credentials(format!("Read {} failed: {}", path.display(), e)))?;
    Ok(Some(path.to_path_buf()))
}

/// PostgreSQL connection credentials
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl DbCredentials {
    /// Read credentials from the process environment
    ///
    /// `DB_HOST` defaults to `localhost` and `DB_PORT` to 5432.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials straight from a dotenv file, without touching the
    /// process environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| Error::Credentials(format!("Read {} failed: {}", path.display(), e)))?;

        let mut vars = std::collections::HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                Error::Credentials(format!("Parse {} failed: {}", path.display(), e))
            })?;
            vars.insert(key, value);
        }

        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(Error::Credentials(format!("{} is not set", key))),
            }
        };

        let host = lookup("DB_HOST")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("DB_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Credentials(format!("Invalid DB_PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            name: required("DB_NAME")?,
            user: required("DB_USER")?,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            host,
            port,
        })
    }

    /// True while any field still holds a setup placeholder
    pub fn is_placeholder(&self) -> bool {
        [&self.name, &self.user, &self.password]
            .iter()
            .any(|v| v.starts_with(PLACEHOLDER_PREFIX))
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
