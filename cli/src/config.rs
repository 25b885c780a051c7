use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use berth_protocol::{ApiVersion, VersionSet, VersionSetError, DEFAULT_VERSION, KNOWN_VERSIONS};

use crate::engine::DEFAULT_ENDPOINT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "off" | "none" => LogLevel::Off,
            "error" => LogLevel::Error,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    }

    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid probe_timeout {value:?}: {source}")]
    ProbeTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("Invalid version settings: {0}")]
    Versions(#[from] VersionSetError),

    #[error("API version {0} is not one of the versions berth supports")]
    UnsupportedVersion(ApiVersion),
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_probe_timeout() -> String {
    "5s".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub default_version: ApiVersion,
    pub known_versions: Vec<ApiVersion>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub audit: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            default_version: DEFAULT_VERSION,
            known_versions: KNOWN_VERSIONS.to_vec(),
            probe_timeout: default_probe_timeout(),
            log_level: LogLevel::Warn,
            log_to_file: false,
            audit: false,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("berth")
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("berth")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn ensure_dirs() -> std::io::Result<()> {
    fs::create_dir_all(config_dir())
}

impl UserConfig {
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parses a config document, falling back to defaults when it is invalid.
    pub fn parse(content: &str) -> Self {
        toml::from_str(content).unwrap_or_default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let _ = ensure_dirs();
        let path = config_path();
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, content)
    }

    pub fn merge_with_args(&mut self, endpoint: Option<&str>, audit: bool) {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint.to_string();
        }
        if audit {
            self.audit = true;
        }
    }

    pub fn probe_timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.probe_timeout).map_err(|source| {
            ConfigError::ProbeTimeout {
                value: self.probe_timeout.clone(),
                source,
            }
        })
    }

    /// Validates the configured versions against the built-in `KNOWN_VERSIONS`.
    pub fn version_set(&self) -> Result<VersionSet, ConfigError> {
        if let Some(version) = std::iter::once(&self.default_version)
            .chain(&self.known_versions)
            .find(|v| !v.is_known())
        {
            return Err(ConfigError::UnsupportedVersion(*version));
        }

        Ok(VersionSet::new(
            self.known_versions.iter().copied(),
            self.default_version,
        )?)
    }
}
