//! Configuration for the SwitchBot exporter.
//!
//! Values are layered: the optional JSON5 file first, then command-line
//! flags, then the `SWITCHBOT_OPENTOKEN` / `SWITCHBOT_SECRETKEY` environment
//! variables, which win whenever they are set to a non-empty value.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchbot_client::{Credentials, DEFAULT_BASE_URL};
use thiserror::Error;

/// Environment variable holding the API open token.
pub const ENV_OPEN_TOKEN: &str = "SWITCHBOT_OPENTOKEN";

/// Environment variable holding the API secret key.
pub const ENV_SECRET_KEY: &str = "SWITCHBOT_SECRETKEY";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// SwitchBot API settings.
    #[serde(default)]
    pub switchbot: SwitchBotConfig,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Device label cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SwitchBot API credentials and transport settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SwitchBotConfig {
    /// Open token issued by the SwitchBot app.
    #[serde(default)]
    pub open_token: String,

    /// Secret key issued by the SwitchBot app.
    #[serde(default)]
    pub secret_key: String,

    /// API base URL (default: "https://api.switch-bot.com").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single API request. Unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for SwitchBotConfig {
    fn default() -> Self {
        Self {
            open_token: String::new(),
            secret_key: String::new(),
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl SwitchBotConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.open_token, &self.secret_key)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for SwitchBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchBotConfig")
            .field("open_token", &redact(&self.open_token))
            .field("secret_key", &redact(&self.secret_key))
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "<redacted>" }
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    ///
    /// A bare `:port` binds all interfaces.
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl HttpConfig {
    /// Parse the listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        };
        addr.parse().map_err(|_| {
            ConfigError::Validation(format!("Invalid listen address: {}", self.listen))
        })
    }
}

/// Device label cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Replace the roster on every reload instead of merging into it.
    ///
    /// Off by default: devices removed or renamed upstream keep their
    /// `switchbot_device` series until restart.
    #[serde(default)]
    pub prune_on_reload: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub open_token: Option<String>,
    pub secret_key: Option<String>,
    pub log_level: Option<String>,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    ///
    /// The file is not validated here; credentials may still arrive from
    /// flags or the environment. Call [`validate`](Self::validate) once all
    /// layers are applied.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(content)?)
    }

    /// Apply command-line values on top of the file configuration.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(listen) = overrides.listen {
            self.http.listen = listen;
        }
        if let Some(token) = overrides.open_token {
            self.switchbot.open_token = token;
        }
        if let Some(secret) = overrides.secret_key {
            self.switchbot.secret_key = secret;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Apply credentials from the environment.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`. Empty values are
    /// treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_OPEN_TOKEN).filter(|v| !v.is_empty()) {
            self.switchbot.open_token = token;
        }
        if let Some(secret) = lookup(ENV_SECRET_KEY).filter(|v| !v.is_empty()) {
            self.switchbot.secret_key = secret;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.switchbot.open_token.is_empty() {
            return Err(ConfigError::Validation(format!(
                "switchbot.open-token is required (flag or {})",
                ENV_OPEN_TOKEN
            )));
        }

        if self.switchbot.secret_key.is_empty() {
            return Err(ConfigError::Validation(format!(
                "switchbot.secret-key is required (flag or {})",
                ENV_SECRET_KEY
            )));
        }

        match url::Url::parse(&self.switchbot.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "Invalid base URL: {}",
                    self.switchbot.base_url
                )));
            }
        }

        if self.switchbot.request_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }

        self.http.listen_addr()?;

        Ok(())
    }
}
