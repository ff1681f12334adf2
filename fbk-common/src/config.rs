//! Configuration loading and backend URL resolution
//!
//! Base URL priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`FBK_API_URL`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable default config file is not fatal: a warning is
//! logged and compiled defaults are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Backend URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Environment variable carrying the backend URL
pub const API_URL_ENV: &str = "FBK_API_URL";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Reconnect delay used until the server sends its own `retry:` hint
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// `[logging]` table of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// On-disk configuration, every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub reconnect_delay_ms: Option<u64>,
    /// `limit` query parameter for the bulk listing request
    pub list_limit: Option<u32>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash
    pub base_url: String,
    pub request_timeout: Duration,
    pub reconnect_delay: Duration,
    pub list_limit: Option<u32>,
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Configuration for `base_url` with compiled defaults for everything else
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            list_limit: None,
            logging: LoggingConfig::default(),
        })
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_list_limit(mut self, limit: Option<u32>) -> Self {
        self.list_limit = limit;
        self
    }

    /// Join an absolute endpoint path (`/reviews/`) onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Strip whitespace and trailing slashes; require an http(s) scheme
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Err(Error::Config("backend URL is empty".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "backend URL must start with http:// or https://: {}",
            raw
        )));
    }

    Ok(trimmed.to_string())
}

/// Resolves a `ClientConfig` from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_url: Option<String>,
    config_file: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend URL given on the command line
    pub fn with_cli_url(mut self, url: Option<String>) -> Self {
        self.cli_url = url;
        self
    }

    /// Explicit config file; unlike the default location it must be readable
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    pub fn resolve(&self) -> Result<ClientConfig> {
        let toml_config = match &self.config_file {
            Some(path) => load_toml_config(path)?,
            None => match default_config_path() {
                Some(path) => load_toml_config(&path).unwrap_or_else(|e| {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }),
                None => {
                    debug!("No config file found, using compiled defaults");
                    TomlConfig::default()
                }
            },
        };

        let base_url = self.resolve_base_url(&toml_config);
        let mut config = ClientConfig::new(&base_url)?;

        if let Some(secs) = toml_config.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = toml_config.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        config.list_limit = toml_config.list_limit;
        config.logging = toml_config.logging;

        Ok(config)
    }

    fn resolve_base_url(&self, toml_config: &TomlConfig) -> String {
        // Priority 1: Command-line argument
        if let Some(url) = &self.cli_url {
            info!("Backend URL from command line: {}", url);
            return url.clone();
        }

        // Priority 2: Environment variable
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Backend URL from {}: {}", API_URL_ENV, url);
                return url;
            }
        }

        // Priority 3: TOML config file
        if let Some(url) = &toml_config.api_url {
            info!("Backend URL from config file: {}", url);
            return url.clone();
        }

        // Priority 4: Compiled default
        info!("Backend URL defaulted to {}", DEFAULT_API_URL);
        DEFAULT_API_URL.to_string()
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// First existing config file: user config dir, then /etc on Linux
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fbk").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fbk/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_slashes() {
        assert_eq!(
            normalize_base_url("http://api.example.com/").unwrap(),
            "http://api.example.com"
        );
        assert_eq!(
            normalize_base_url(" https://api.example.com/v1// ").unwrap(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn test_normalize_rejects_empty_and_schemeless() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("/").is_err());
        assert!(normalize_base_url("api.example.com").is_err());
    }

    #[test]
    fn test_endpoint_join_has_single_slash() {
        let config = ClientConfig::new("http://localhost:8000/").unwrap();
        assert_eq!(config.endpoint("/reviews/"), "http://localhost:8000/reviews/");
        assert_eq!(
            config.endpoint("reviews/events"),
            "http://localhost:8000/reviews/events"
        );
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(DEFAULT_API_URL).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.list_limit, None);
        assert_eq!(config.logging.level, "info");
    }
}
