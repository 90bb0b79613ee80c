//! Application configuration structures.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tracking API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch window settings
    #[serde(default)]
    pub window: WindowConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Publish destination settings
    #[serde(default)]
    pub sheets: SheetsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::validation("api.base_url is empty"));
        }
        if self.api.page_size == 0 {
            return Err(AppError::validation("api.page_size must be > 0"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.max_concurrent == 0 {
            return Err(AppError::validation("api.max_concurrent must be > 0"));
        }
        if self.window.lookback_days <= 0 {
            return Err(AppError::validation("window.lookback_days must be > 0"));
        }
        if self.sheets.chunk_size == 0 {
            return Err(AppError::validation("sheets.chunk_size must be > 0"));
        }
        Ok(())
    }
}

/// Tracking API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the tracking API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Client account identifier
    #[serde(default = "defaults::client_id")]
    pub client_id: i64,

    /// Product identifier
    #[serde(default = "defaults::product_id")]
    pub product_id: i64,

    /// Page size for occurrence queries
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent page fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            client_id: defaults::client_id(),
            product_id: defaults::product_id(),
            page_size: defaults::page_size(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Fetch window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Days to look back on a cold start
    #[serde(default = "defaults::lookback_days")]
    pub lookback_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_days: defaults::lookback_days(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the persisted base and run marker
    #[serde(default = "defaults::state_dir")]
    pub state_dir: PathBuf,

    /// Carrier mapping table (TOML)
    #[serde(default = "defaults::mapping_path")]
    pub mapping_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: defaults::state_dir(),
            mapping_path: defaults::mapping_path(),
        }
    }
}

/// Publish destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Destination spreadsheet identifier
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Destination range in A1 notation
    #[serde(default = "defaults::sheet_range")]
    pub range: String,

    /// Rows per append request
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            range: defaults::sheet_range(),
            chunk_size: defaults::chunk_size(),
        }
    }
}

/// Secrets read from the process environment, once, at startup.
///
/// The pipeline itself never touches ambient state; the CLI constructs
/// this value and passes it in.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Tracking API login email
    pub email: String,

    /// Tracking API login password
    pub password: String,

    /// Bearer token for the publish destination, if publishing
    pub sheets_token: Option<String>,
}

impl Credentials {
    /// Read credentials from the environment.
    ///
    /// `TRACKSYNC_EMAIL` and `TRACKSYNC_PASSWORD` are required;
    /// `TRACKSYNC_SHEETS_TOKEN` is only needed when publishing.
    pub fn from_env() -> Result<Self> {
        let email = env::var("TRACKSYNC_EMAIL")
            .map_err(|_| AppError::config("TRACKSYNC_EMAIL is not set"))?;
        let password = env::var("TRACKSYNC_PASSWORD")
            .map_err(|_| AppError::config("TRACKSYNC_PASSWORD is not set"))?;
        let sheets_token = env::var("TRACKSYNC_SHEETS_TOKEN").ok();

        if email.trim().is_empty() {
            return Err(AppError::config("TRACKSYNC_EMAIL is empty"));
        }
        if password.trim().is_empty() {
            return Err(AppError::config("TRACKSYNC_PASSWORD is empty"));
        }

        Ok(Self {
            email,
            password,
            sheets_token,
        })
    }
}

mod defaults {
    use std::path::PathBuf;

    // API defaults
    pub fn base_url() -> String {
        "https://utilities.confirmafacil.com.br".into()
    }
    pub fn client_id() -> i64 {
        206
    }
    pub fn product_id() -> i64 {
        1
    }
    pub fn page_size() -> usize {
        1000
    }
    pub fn timeout() -> u64 {
        120
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; tracksync/1.0)".into()
    }

    // Window defaults
    pub fn lookback_days() -> i64 {
        15
    }

    // Path defaults
    pub fn state_dir() -> PathBuf {
        "state".into()
    }
    pub fn mapping_path() -> PathBuf {
        "data/carriers.toml".into()
    }

    // Sheets defaults
    pub fn sheet_range() -> String {
        "Entregues e Barrados!A2:E".into()
    }
    pub fn chunk_size() -> usize {
        10_000
    }
}
