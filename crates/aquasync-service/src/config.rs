//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use aquasync_core::{DEFAULT_BASE_URL, FieldMap, GatewayConfig};

/// Environment variable overriding `telemetry.channel_id`.
pub const ENV_CHANNEL_ID: &str = "THINGSPEAK_CHANNEL_ID";
/// Environment variable overriding `telemetry.read_api_key`.
pub const ENV_READ_API_KEY: &str = "THINGSPEAK_READ_API_KEY";
/// Environment variable overriding `telemetry.write_api_key`.
pub const ENV_WRITE_API_KEY: &str = "THINGSPEAK_WRITE_API_KEY";
/// Environment variable overriding the port of `server.bind`.
pub const ENV_PORT: &str = "PORT";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Telemetry service settings.
    pub telemetry: TelemetryConfig,
    /// Cache reconciliation settings.
    pub sync: SyncConfig,
    /// Diagnostics job settings.
    pub diagnostics: DiagnosticsConfig,
}

impl Config {
    /// Read `server.toml` from the user config directory, falling back to
    /// defaults when it does not exist yet.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        match path.try_exists() {
            Ok(true) => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse a TOML config file. Missing sections take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.into(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.into(),
            source,
        })
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ConfigError::Write { path, source }
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(write_err(dir))?;
        }
        std::fs::write(path, text).map_err(write_err(path))
    }

    /// Apply `THINGSPEAK_*` and `PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(channel) = get(ENV_CHANNEL_ID) {
            self.telemetry.channel_id = channel;
        }
        if let Some(key) = get(ENV_READ_API_KEY) {
            self.telemetry.read_api_key = key;
        }
        if let Some(key) = get(ENV_WRITE_API_KEY) {
            self.telemetry.write_api_key = key;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.set_port(port.trim());
        }
    }

    /// Check every section, reporting all problems at once.
    ///
    /// ```
    /// use aquasync_service::Config;
    ///
    /// assert!(Config::default().validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors: Vec<ValidationError> = [
            self.server.validate(),
            self.storage.validate(),
            self.telemetry.validate(),
            self.sync.validate(),
            self.diagnostics.validate(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// [`load`](Self::load) followed by [`validate`](Self::validate).
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate().map(|()| config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Replace the port of the bind address, keeping the host.
    pub fn set_port(&mut self, port: &str) {
        let host = self
            .bind
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.bind = format!("{host}:{port}");
    }

    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{port}': must be a number 1-65535"),
                )),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: aquasync_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }

        errors
    }
}

/// Minimum feed poll interval in seconds.
pub const MIN_FEED_POLL_INTERVAL: u64 = 1;
/// Maximum feed poll interval in seconds (1 hour).
pub const MAX_FEED_POLL_INTERVAL: u64 = 3600;

/// Telemetry service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Base URL of the telemetry service.
    pub base_url: String,
    /// Channel id; empty disables the collector.
    pub channel_id: String,
    /// Key for feed reads (optional on public channels).
    pub read_api_key: String,
    /// Key for actuator writes.
    pub write_api_key: String,
    /// Bound on each gateway call, in seconds.
    pub request_timeout_secs: u64,
    /// Interval between feed reads, in seconds.
    pub poll_interval_secs: u64,
    /// Channel field assignments.
    pub fields: FieldMap,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            channel_id: String::new(),
            read_api_key: String::new(),
            write_api_key: String::new(),
            request_timeout_secs: 10,
            poll_interval_secs: 15,
            fields: FieldMap::default(),
        }
    }
}

impl TelemetryConfig {
    /// Whether a channel is configured.
    pub fn is_configured(&self) -> bool {
        !self.channel_id.trim().is_empty()
    }

    /// Caller-side bound on gateway calls.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Settings for the HTTP gateway and feed.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.channel_id.trim())
            .base_url(self.base_url.clone())
            .read_api_key(self.read_api_key.clone())
            .write_api_key(self.write_api_key.clone())
            .fields(self.fields.clone())
    }

    /// Validate telemetry configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(ValidationError::new(
                "telemetry.base_url",
                format!(
                    "invalid URL '{}': must start with http:// or https://",
                    self.base_url
                ),
            ));
        }

        if self.is_configured() && !self.channel_id.trim().chars().all(|c| c.is_ascii_digit()) {
            errors.push(ValidationError::new(
                "telemetry.channel_id",
                format!("channel id '{}' must be numeric", self.channel_id),
            ));
        }

        if self.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "telemetry.request_timeout_secs",
                "request timeout must be at least 1 second",
            ));
        }

        if self.poll_interval_secs < MIN_FEED_POLL_INTERVAL {
            errors.push(ValidationError::new(
                "telemetry.poll_interval_secs",
                format!(
                    "poll interval {} is too short (minimum {} seconds)",
                    self.poll_interval_secs, MIN_FEED_POLL_INTERVAL
                ),
            ));
        } else if self.poll_interval_secs > MAX_FEED_POLL_INTERVAL {
            errors.push(ValidationError::new(
                "telemetry.poll_interval_secs",
                format!(
                    "poll interval {} is too long (maximum {} seconds / 1 hour)",
                    self.poll_interval_secs, MAX_FEED_POLL_INTERVAL
                ),
            ));
        }

        errors.extend(
            self.fields
                .validate()
                .into_iter()
                .map(|message| ValidationError::new("telemetry.fields", message)),
        );

        errors
    }
}

/// Cache reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between background reconciliation passes.
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.interval_secs == 0 {
            errors.push(ValidationError::new(
                "sync.interval_secs",
                "sync interval must be at least 1 second",
            ));
        }
        errors
    }
}

/// Diagnostics job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Seconds between scheduled diagnostics runs.
    pub interval_secs: u64,
    /// Number of newest readings the gap check inspects.
    pub window: u32,
    /// A gap is flagged when the largest interval exceeds this multiple of
    /// the mean interval.
    pub gap_factor: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            window: 60,
            gap_factor: 3.0,
        }
    }
}

impl DiagnosticsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval_secs == 0 {
            errors.push(ValidationError::new(
                "diagnostics.interval_secs",
                "diagnostics interval must be at least 1 second",
            ));
        }
        if self.window < 2 {
            errors.push(ValidationError::new(
                "diagnostics.window",
                format!(
                    "window {} is too small (need at least 2 readings)",
                    self.window
                ),
            ));
        }
        if !self.gap_factor.is_finite() || self.gap_factor < 1.0 {
            errors.push(ValidationError::new(
                "diagnostics.gap_factor",
                format!("gap factor {} must be a number >= 1.0", self.gap_factor),
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `telemetry.fields`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aquasync")
        .join("server.toml")
}
