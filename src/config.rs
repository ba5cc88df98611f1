use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use grocer_core::{Credentials, RealtimeConfig, ReconnectPolicy, Zone};

pub const DEFAULT_SERVER_URL: &str = "https://www.anylist.com";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Listener socket tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Seconds between heartbeat frames
    pub heartbeat_secs: u64,
    /// First reconnect delay in milliseconds
    pub reconnect_initial_ms: u64,
    /// Upper bound on the reconnect delay in milliseconds
    pub reconnect_max_ms: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_secs: 5,
            reconnect_initial_ms: 1000,
            reconnect_max_ms: 30_000,
        }
    }
}

impl RealtimeSettings {
    pub fn to_realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs.max(1)),
            reconnect: ReconnectPolicy {
                initial_delay: Duration::from_millis(self.reconnect_initial_ms),
                max_delay: Duration::from_millis(
                    self.reconnect_max_ms.max(self.reconnect_initial_ms),
                ),
            },
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Service base URL
    pub server_url: ConfigValue<String>,
    /// Account email
    pub email: Option<ConfigValue<String>>,
    /// Account password, only ever read from the environment
    #[serde(skip)]
    pub password: Option<String>,
    /// Fixed offset for turning instants into calendar days. When unset the
    /// machine's time zone is used, daylight saving included.
    pub timezone_offset_minutes: Option<ConfigValue<i32>>,
    pub realtime: RealtimeSettings,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    server_url: Option<String>,
    email: Option<String>,
    timezone_offset_minutes: Option<i32>,
    realtime: Option<RealtimeSettings>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut server_url =
            ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut email = None;
        let mut timezone_offset_minutes = None;
        let mut realtime = RealtimeSettings::default();
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.server_url {
                server_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(addr) = file_config.email {
                email = Some(ConfigValue::new(addr, ConfigSource::File));
            }
            if let Some(minutes) = file_config.timezone_offset_minutes {
                timezone_offset_minutes = Some(ConfigValue::new(minutes, ConfigSource::File));
            }
            if let Some(settings) = file_config.realtime {
                realtime = settings;
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("GROCER_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(addr) = std::env::var("GROCER_EMAIL") {
            email = Some(ConfigValue::new(addr, ConfigSource::Environment));
        }
        let password = std::env::var("GROCER_PASSWORD").ok();

        if let Some(offset) = &timezone_offset_minutes {
            if offset_from_minutes(offset.value).is_none() {
                return Err(ConfigError::InvalidValue(
                    "timezone_offset_minutes".to_string(),
                    offset.value.to_string(),
                ));
            }
        }

        Ok(Self {
            server_url,
            email,
            password,
            timezone_offset_minutes,
            realtime,
            config_file,
        })
    }

    /// Zone for date queries. The offset override is validated on load.
    pub fn time_zone(&self) -> Zone {
        self.timezone_offset_minutes
            .as_ref()
            .and_then(|offset| offset_from_minutes(offset.value))
            .map_or(Zone::Local, Zone::Fixed)
    }

    /// Credentials from config and environment.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let email = self
            .email
            .as_ref()
            .ok_or(ConfigError::Missing("email (set GROCER_EMAIL)"))?;
        let password = self
            .password
            .as_ref()
            .ok_or(ConfigError::Missing("password (set GROCER_PASSWORD)"))?;
        Ok(Credentials::new(email.value.clone(), password.clone()))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/grocer/
    /// - macOS: ~/Library/Application Support/grocer/
    /// - Windows: %APPDATA%/grocer/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grocer")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
            ConfigError::Missing(what) => write!(f, "Missing {}", what),
        }
    }
}

impl std::error::Error for ConfigError {}
