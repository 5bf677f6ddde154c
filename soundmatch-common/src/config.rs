//! Configuration loading and service address resolution
//!
//! The similarity service base address is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SOUNDMATCH_SERVICE_URL`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The remaining settings (request timeout, logging) come from the TOML file
//! when present, otherwise from compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Environment variable consulted for the service base address
pub const SERVICE_URL_ENV: &str = "SOUNDMATCH_SERVICE_URL";

/// Compiled default service base address
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Compiled default request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration file as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Similarity service base address
    #[serde(default)]
    pub service_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address without trailing slash, e.g. `http://localhost:5000`
    pub service_url: String,
    pub request_timeout: Duration,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            logging: LoggingConfig::default(),
        }
    }
}

/// Resolves [`ClientConfig`] from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_service_url: Option<String>,
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service address given on the command line
    pub fn with_cli_service_url(mut self, url: Option<String>) -> Self {
        self.cli_service_url = url;
        self
    }

    /// Explicit config file path. When set, the file must exist.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn resolve(&self) -> Result<ClientConfig> {
        let toml_config = self.load_toml()?;

        let service_url = if let Some(url) = &self.cli_service_url {
            debug!("Service URL from command line");
            url.clone()
        } else if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            debug!("Service URL from {}", SERVICE_URL_ENV);
            url
        } else if let Some(url) = &toml_config.service_url {
            debug!("Service URL from TOML config");
            url.clone()
        } else {
            DEFAULT_SERVICE_URL.to_string()
        };

        let request_timeout_secs = toml_config
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let config = ClientConfig {
            service_url: normalize_service_url(&service_url)?,
            request_timeout: Duration::from_secs(request_timeout_secs),
            logging: toml_config.logging,
        };

        info!(service_url = %config.service_url, "Configuration resolved");
        Ok(config)
    }

    fn load_toml(&self) -> Result<TomlConfig> {
        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return load_toml_config(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => load_toml_config(&path),
            Some(path) => {
                warn!(
                    "No config file at {}, using defaults",
                    path.display()
                );
                Ok(TomlConfig::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Platform config file location (`<config_dir>/soundmatch/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("soundmatch").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Serialize a config and write it to `path`, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Validate an http(s) base address and strip trailing slashes
pub fn normalize_service_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("Invalid service URL {}: {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Service URL must use http or https: {}",
            raw
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::Config(format!("Service URL has no host: {}", raw)));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(Error::Config(format!(
            "Service URL must not carry a query or fragment: {}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}
