//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default, so a missing file is not an error: the collector logs a warning
//! and runs with defaults.
//!
//! # Config file priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`COLLECTOR_CONFIG`)
//! 3. `collector.toml` in the project root
//! 4. `<config dir>/setlist-collector/config.toml`
//! 5. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "COLLECTOR_CONFIG";
/// Environment variable naming the project root
pub const ROOT_ENV_VAR: &str = "COLLECTOR_ROOT";
/// Config file name looked up in the project root
pub const LOCAL_CONFIG_FILE: &str = "collector.toml";

const APP_DIR_NAME: &str = "setlist-collector";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory holding the raw JSON data, relative to the project root
    pub raw_data_dir: PathBuf,

    /// Credentials (dotenv) file, relative to the project root
    pub credentials_file: PathBuf,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Crawl behavior
    pub crawl: CrawlConfig,

    /// Database loader settings
    pub database: DatabaseConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("raw_data"),
            credentials_file: PathBuf::from(".env"),
            logging: LoggingConfig::default(),
            crawl: CrawlConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Crawl configuration for the URL collector and the tracklist spider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Site root, without trailing slash
    pub base_url: String,

    /// Path of the first DJ index page
    pub dj_index_path: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Attempts per page before giving up
    pub max_retries: u32,

    /// Pause between attempts
    pub retry_delay_secs: u64,

    /// HTTP statuses worth another attempt
    pub retry_status_codes: Vec<u16>,

    /// Delay window between index page requests
    pub index_delay_min_ms: u64,
    pub index_delay_max_ms: u64,

    /// Delay window between tracklist page requests
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,

    /// Consecutive index pages without new URLs before the collector stops
    pub max_empty_pages: u32,

    /// Hard cap on index pages walked
    pub max_index_pages: u32,

    /// How long to wait for a CAPTCHA to be solved when not interactive
    pub captcha_pause_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.1001tracklists.com".to_string(),
            dj_index_path: "/dj/ericprydz/index.html".to_string(),
            request_timeout_secs: 60,
            max_retries: 3,
            retry_delay_secs: 5,
            retry_status_codes: vec![500, 502, 503, 504, 400, 403, 404, 408],
            index_delay_min_ms: 500,
            index_delay_max_ms: 2000,
            page_delay_min_ms: 5000,
            page_delay_max_ms: 10000,
            max_empty_pages: 3,
            max_index_pages: 200,
            captcha_pause_secs: 30,
        }
    }
}

impl CrawlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn captcha_pause(&self) -> Duration {
        Duration::from_secs(self.captcha_pause_secs)
    }

    /// Check the delay windows and retry settings
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("crawl.base_url must not be empty".to_string()));
        }
        if self.index_delay_min_ms > self.index_delay_max_ms {
            return Err(Error::Config(format!(
                "crawl.index_delay_min_ms ({}) exceeds crawl.index_delay_max_ms ({})",
                self.index_delay_min_ms, self.index_delay_max_ms
            )));
        }
        if self.page_delay_min_ms > self.page_delay_max_ms {
            return Err(Error::Config(format!(
                "crawl.page_delay_min_ms ({}) exceeds crawl.page_delay_max_ms ({})",
                self.page_delay_min_ms, self.page_delay_max_ms
            )));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("crawl.max_retries must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Database loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL schema holding the tracklist and track tables
    pub schema: String,

    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            schema: "one_thousand_one".to_string(),
            max_connections: 5,
        }
    }
}

/// Resolve the project root: command-line argument, then `COLLECTOR_ROOT`,
/// then the current directory
pub fn resolve_project_root(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    Ok(std::env::current_dir()?)
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no candidate exists; the caller then runs on defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, project_root: &Path) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Project-local file
    let local = project_root.join(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    // Priority 4: Per-user config directory
    let user = default_user_config_path()?;
    if user.exists() {
        Some(user)
    } else {
        None
    }
}

/// Per-user config file location for the platform
pub fn default_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Load configuration from `path`, falling back to defaults
///
/// A missing file produces a warning and defaults. A file that exists but
/// does not parse is an error.
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.crawl.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
