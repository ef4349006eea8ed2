//! Configuration loading and client settings resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never prevents startup: a warning is
//! logged and the compiled defaults are used.

use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Environment variable overriding the backend base URL
pub const ENV_API_BASE_URL: &str = "FORECAST_API_BASE_URL";

/// Environment variable overriding the poll interval (milliseconds)
pub const ENV_POLL_INTERVAL_MS: &str = "FORECAST_POLL_INTERVAL_MS";

/// Backend base URL used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Job status poll interval used when nothing else is configured
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// HTTP request timeout used when nothing else is configured
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Base URL of the forecasting backend
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Job status poll interval in milliseconds
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// HTTP request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default per-user config file location (`~/.config/forecast-wizard/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("forecast-wizard").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the TOML config, falling back to defaults on any problem
///
/// `explicit` is a path given on the command line; otherwise the default
/// per-user location is tried. A missing default file is silent; a missing
/// explicit file or a parse error logs a warning.
pub fn load_or_default(explicit: Option<&Path>) -> TomlConfig {
    let (path, is_explicit) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return TomlConfig::default(),
        },
    };

    if !path.exists() {
        if is_explicit {
            warn!("Config file not found: {} (using defaults)", path.display());
        }
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} (using defaults)", e);
            TomlConfig::default()
        }
    }
}

/// Fully resolved client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Backend base URL without trailing slash
    pub api_base_url: String,
    /// Fixed delay between job status polls
    pub poll_interval: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Default tracing filter directive
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: default_log_level(),
        }
    }
}

/// Resolves [`ClientSettings`] from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct SettingsResolver {
    cli_api_base_url: Option<String>,
    cli_poll_interval_ms: Option<u64>,
    toml: TomlConfig,
}

impl SettingsResolver {
    pub fn new(toml: TomlConfig) -> Self {
        Self {
            toml,
            ..Default::default()
        }
    }

    /// Base URL given on the command line
    pub fn with_cli_api_base_url(mut self, url: Option<String>) -> Self {
        self.cli_api_base_url = url;
        self
    }

    /// Poll interval given on the command line
    pub fn with_cli_poll_interval_ms(mut self, millis: Option<u64>) -> Self {
        self.cli_poll_interval_ms = millis;
        self
    }

    /// Resolve all settings, validating the result
    pub fn resolve(&self) -> Result<ClientSettings> {
        let api_base_url = self.resolve_api_base_url()?;
        let poll_interval = self.resolve_poll_interval()?;

        let timeout_secs = self
            .toml
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be greater than 0".to_string()));
        }

        Ok(ClientSettings {
            api_base_url,
            poll_interval,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level: self.toml.logging.level.clone(),
        })
    }

    fn resolve_api_base_url(&self) -> Result<String> {
        // Priority 1: Command-line argument
        // Priority 2: Environment variable
        // Priority 3: TOML config file
        // Priority 4: Compiled default
        let raw = self
            .cli_api_base_url
            .clone()
            .or_else(|| std::env::var(ENV_API_BASE_URL).ok())
            .or_else(|| self.toml.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        normalize_base_url(&raw)
    }

    fn resolve_poll_interval(&self) -> Result<Duration> {
        let env_value = match std::env::var(ENV_POLL_INTERVAL_MS) {
            Ok(value) => Some(value.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("{} is not a number ({:?}): {}", ENV_POLL_INTERVAL_MS, value, e))
            })?),
            Err(_) => None,
        };

        let millis = self
            .cli_poll_interval_ms
            .or(env_value)
            .or(self.toml.poll_interval_ms)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        if millis == 0 {
            return Err(Error::Config("Poll interval must be greater than 0".to_string()));
        }

        Ok(millis_to_duration(millis))
    }
}

/// Validate a base URL and strip any trailing slash
///
/// Only absolute http(s) URLs with a host are accepted. The returned string
/// is the parsed URL's serialization (host lower-cased, default port
/// dropped) without trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid API base URL {:?}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "API base URL must use http or https, not {:?}: {:?}",
            url.scheme(),
            raw
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Config(format!("API base URL has no host: {:?}", raw)));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::Config(format!(
            "API base URL must not carry a query or fragment: {:?}",
            raw
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
