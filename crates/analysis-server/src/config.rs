//! Configuration file loading for the analysis server.
//!
//! Settings come from `analysis.toml` in the current directory (or a path
//! given on the command line). Every key is optional; a missing file means
//! all defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chess_analysis::service::{DEFAULT_DEPTH, MAX_DEPTH};
use chess_analysis::{AnalysisSettings, EngineOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// The values parse but do not make sense together.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine process settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable. `STOCKFISH_PATH` wins over this; when neither is
    /// set the engine is discovered automatically.
    pub path: Option<PathBuf>,
    /// Upper bound on one engine session, in seconds.
    pub timeout_secs: u64,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            timeout_secs: 30,
            threads: None,
            hash_mb: None,
        }
    }
}

/// Search depth limits.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Depth used when a request does not specify one.
    pub default_depth: u32,
    /// Deepest search a request may ask for.
    pub max_depth: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_DEPTH,
            max_depth: MAX_DEPTH,
        }
    }
}

/// Main server configuration structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Requests slower than this are logged as warnings.
    pub slow_request_ms: u64,
    pub engine: EngineConfig,
    pub analysis: AnalysisConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            slow_request_ms: 100,
            engine: EngineConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from [`Self::config_path()`].
    ///
    /// # Errors
    ///
    /// See [`Self::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads the configuration from `path`, or the defaults if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] if it is not valid TOML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// Currently returns `analysis.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("analysis.toml")
    }

    /// Check that the values are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if analysis.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "analysis.max_depth must be at least 1".to_string(),
            ));
        }
        if analysis.default_depth == 0 || analysis.default_depth > analysis.max_depth {
            return Err(ConfigError::Invalid(format!(
                "analysis.default_depth must be between 1 and {}, got {}",
                analysis.max_depth, analysis.default_depth
            )));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string to bind the listener to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            default_depth: self.analysis.default_depth,
            max_depth: self.analysis.max_depth,
            timeout: Duration::from_secs(self.engine.timeout_secs),
            ..AnalysisSettings::default()
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            threads: self.engine.threads,
            hash_mb: self.engine.hash_mb,
            ..EngineOptions::default()
        }
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}
