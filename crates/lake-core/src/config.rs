//! Supervisor configuration: YAML file, environment overrides, defaults.
//!
//! Loading happens once at startup. The file is optional; every key has a
//! default. Each key can be overridden by an environment variable named after
//! the upper-cased key (`indexerURL` → `INDEXERURL`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::duration::{format_duration, parse_duration};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/local.yaml";

pub const DEFAULT_INDEXER_URL: &str = "http://indexer:3030";
pub const DEFAULT_METRIC_NAME: &str = "near_indexer_streaming_current_block_height";
pub const DEFAULT_CONTAINER_NAME: &str = "near-lake-indexer";
pub const DEFAULT_RESTART_COMMAND: &str = "docker restart";
pub const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RESTART_SLEEP: Duration = Duration::from_secs(900);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RESTART_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid duration for {key}: {value:?}")]
    InvalidDuration { key: &'static str, value: String },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// A duration as written in YAML: either a string (`"30s"`) or bare seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    fn resolve(&self, key: &'static str) -> ConfigResult<Duration> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => {
                parse_duration(text).ok_or_else(|| ConfigError::InvalidDuration {
                    key,
                    value: text.clone(),
                })
            }
        }
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationValue::Seconds(secs) => write!(f, "{secs}"),
            DurationValue::Text(text) => f.write_str(text),
        }
    }
}

/// The config file as written: every key optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    #[serde(rename = "indexerURL", skip_serializing_if = "Option::is_none")]
    pub indexer_url: Option<String>,
    #[serde(rename = "queryInterval", skip_serializing_if = "Option::is_none")]
    pub query_interval: Option<DurationValue>,
    #[serde(rename = "stallTimeout", skip_serializing_if = "Option::is_none")]
    pub stall_timeout: Option<DurationValue>,
    #[serde(rename = "restartSleep", skip_serializing_if = "Option::is_none")]
    pub restart_sleep: Option<DurationValue>,
    #[serde(rename = "metricName", skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(rename = "containerName", skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(rename = "fetchTimeout", skip_serializing_if = "Option::is_none")]
    pub fetch_timeout: Option<DurationValue>,
    #[serde(rename = "restartTimeout", skip_serializing_if = "Option::is_none")]
    pub restart_timeout: Option<DurationValue>,
    #[serde(rename = "restartCommand", skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,
}

/// Keys recognised in the file and in the environment.
pub const CONFIG_KEYS: [&str; 9] = [
    "indexerURL",
    "queryInterval",
    "stallTimeout",
    "restartSleep",
    "metricName",
    "containerName",
    "fetchTimeout",
    "restartTimeout",
    "restartCommand",
];

impl RawConfig {
    /// Read a config file. A missing file yields an empty config.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML text. Blank input is an empty config.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Override keys from the environment.
    ///
    /// `lookup` receives the upper-cased key name; production passes
    /// `std::env::var`, tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in CONFIG_KEYS {
            if let Some(value) = lookup(&key.to_ascii_uppercase()) {
                debug!(key, "config key overridden from environment");
                self.set(key, value);
            }
        }
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "indexerURL" => self.indexer_url = Some(value),
            "queryInterval" => self.query_interval = Some(DurationValue::Text(value)),
            "stallTimeout" => self.stall_timeout = Some(DurationValue::Text(value)),
            "restartSleep" => self.restart_sleep = Some(DurationValue::Text(value)),
            "metricName" => self.metric_name = Some(value),
            "containerName" => self.container_name = Some(value),
            "fetchTimeout" => self.fetch_timeout = Some(DurationValue::Text(value)),
            "restartTimeout" => self.restart_timeout = Some(DurationValue::Text(value)),
            "restartCommand" => self.restart_command = Some(value),
            _ => {}
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> ConfigResult<SupervisorConfig> {
        let duration = |value: Option<DurationValue>, key: &'static str, default: Duration| match value {
            Some(v) => v.resolve(key),
            None => Ok(default),
        };

        let restart_command: Vec<String> = self
            .restart_command
            .as_deref()
            .unwrap_or(DEFAULT_RESTART_COMMAND)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let config = SupervisorConfig {
            indexer_url: self
                .indexer_url
                .unwrap_or_else(|| DEFAULT_INDEXER_URL.to_string()),
            metric_name: self
                .metric_name
                .unwrap_or_else(|| DEFAULT_METRIC_NAME.to_string()),
            container_name: self
                .container_name
                .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string()),
            query_interval: duration(self.query_interval, "queryInterval", DEFAULT_QUERY_INTERVAL)?,
            stall_timeout: duration(self.stall_timeout, "stallTimeout", DEFAULT_STALL_TIMEOUT)?,
            restart_sleep: duration(self.restart_sleep, "restartSleep", DEFAULT_RESTART_SLEEP)?,
            fetch_timeout: duration(self.fetch_timeout, "fetchTimeout", DEFAULT_FETCH_TIMEOUT)?,
            restart_timeout: duration(
                self.restart_timeout,
                "restartTimeout",
                DEFAULT_RESTART_TIMEOUT,
            )?,
            restart_command,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Immutable configuration snapshot handed to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Base URL of the indexer's metrics server.
    pub indexer_url: String,
    /// Metric carrying the block height.
    pub metric_name: String,
    /// Container restarted on stall. Empty disables restarts.
    pub container_name: String,
    pub query_interval: Duration,
    /// How long the height may stay flat before a restart.
    pub stall_timeout: Duration,
    /// Cooldown after a successful restart.
    pub restart_sleep: Duration,
    pub fetch_timeout: Duration,
    pub restart_timeout: Duration,
    /// Command prefix; the container name is appended.
    pub restart_command: Vec<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            indexer_url: DEFAULT_INDEXER_URL.to_string(),
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            query_interval: DEFAULT_QUERY_INTERVAL,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            restart_sleep: DEFAULT_RESTART_SLEEP,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            restart_timeout: DEFAULT_RESTART_TIMEOUT,
            restart_command: DEFAULT_RESTART_COMMAND
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl SupervisorConfig {
    /// Load from `path` (missing is fine), then apply process environment.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut raw = RawConfig::from_file(path)?;
        raw.apply_env(|key| std::env::var(key).ok());
        raw.resolve()
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.indexer_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "indexerURL",
                reason: "must not be empty".to_string(),
            });
        }
        if self.metric_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "metricName",
                reason: "must not be empty".to_string(),
            });
        }
        if self.restart_command.is_empty() {
            return Err(ConfigError::Invalid {
                key: "restartCommand",
                reason: "must name a program".to_string(),
            });
        }
        for (key, value) in [
            ("queryInterval", self.query_interval),
            ("stallTimeout", self.stall_timeout),
            ("fetchTimeout", self.fetch_timeout),
            ("restartTimeout", self.restart_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Convert back to the file representation, for display.
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            indexer_url: Some(self.indexer_url.clone()),
            query_interval: Some(DurationValue::Text(format_duration(self.query_interval))),
            stall_timeout: Some(DurationValue::Text(format_duration(self.stall_timeout))),
            restart_sleep: Some(DurationValue::Text(format_duration(self.restart_sleep))),
            metric_name: Some(self.metric_name.clone()),
            container_name: Some(self.container_name.clone()),
            fetch_timeout: Some(DurationValue::Text(format_duration(self.fetch_timeout))),
            restart_timeout: Some(DurationValue::Text(format_duration(self.restart_timeout))),
            restart_command: Some(self.restart_command.join(" ")),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_raw())
    }
}
