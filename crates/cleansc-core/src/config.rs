//! # Configuration System
//!
//! YAML configuration for the deconvolver: solver settings and logging.
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `CLEANSC_CONFIG` environment variable
//! 2. `./cleansc.yaml` (current directory)
//! 3. `<user config dir>/cleansc/config.yaml`
//! 4. `/etc/cleansc/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! solver:
//!   loop_gain: 0.9
//!   max_iterations: 100
//!   inner_max_steps: 50
//!   inner_tolerance: 1.0e-6
//!   coherence_model: auto_spectra
//!   degenerate_policy: converge
//!
//! logging:
//!   level: debug
//!   format: json
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::coherent::CoherenceModel;
use crate::deconvolver::{
    CleanSc, DegeneratePeakPolicy, DEFAULT_LOOP_GAIN, DEFAULT_MAX_ITERATIONS, DEFAULT_PEAK_FLOOR,
};
use crate::observe::LogConfig;
use crate::types::CleanScError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CLEANSC_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read or write configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for CleanScError {
    fn from(err: ConfigError) -> Self {
        CleanScError::Config(err.to_string())
    }
}

/// Deconvolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Fraction of the peak removed per iteration, in (0, 1)
    pub loop_gain: f64,
    /// Outer iteration budget
    pub max_iterations: usize,
    /// Fixed-point steps of the coherent solver
    pub inner_max_steps: usize,
    /// Step-size threshold of the coherent solver
    pub inner_tolerance: f64,
    /// Feedback model of the coherent solver
    pub coherence_model: CoherenceModel,
    /// Peaks at or below `peak_floor × first peak` end the run as converged
    pub peak_floor: f64,
    /// Reaction to a degenerate peak
    pub degenerate_policy: DegeneratePeakPolicy,
    /// Keep per-iteration records in the result
    pub record_history: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            loop_gain: DEFAULT_LOOP_GAIN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            inner_max_steps: 50,
            inner_tolerance: 1e-6,
            coherence_model: CoherenceModel::AutoSpectra,
            peak_floor: DEFAULT_PEAK_FLOOR,
            degenerate_policy: DegeneratePeakPolicy::Converge,
            record_history: false,
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanScConfig {
    /// Configuration version
    pub version: String,
    pub solver: SolverConfig,
    pub logging: LogConfig,
}

impl Default for CleanScConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            solver: SolverConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl CleanScConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the defaults if no file is found. A `CLEANSC_CONFIG` that
    /// points nowhere is an error rather than a silent fallback.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} = {}",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                tracing::debug!("loading config from {}", path.display());
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./cleansc.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "cleansc") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/cleansc/config.yaml"));
        paths
    }

    /// Validate the configuration.
    ///
    /// Applies the same rules as [`CleanSc::validate`], so a file that loads
    /// always builds an engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        CleanSc::from_settings(&self.solver)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            solver: SolverConfig {
                record_history: true,
                ..Default::default()
            },
            logging: LogConfig::development(),
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
