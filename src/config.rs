//! # Processor Configuration
//!
//! Runtime switches for the stream processor and the logging setup.
//!
//! Sources are layered in order, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML/YAML/JSON file
//! 3. `STREAM_DISPATCH__*` environment variables (e.g.
//!    `STREAM_DISPATCH__LEGACY_POSTPROCESSORS=false`)
//!
//! Handler isolation is not configurable: a panicking handler is always
//! recorded as a failure of that handler alone.

use crate::error::{DispatchError, Result};
use crate::logging;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "STREAM_DISPATCH";

/// Output format of the structured log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Deployment environment, drives the default log level
    pub environment: String,
    /// Explicit `EnvFilter` directive; overrides the environment default
    pub log_level: Option<String>,
    pub log_format: LogFormat,
    /// Run the legacy prefix-routed postprocessors before table dispatch
    pub legacy_postprocessors: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            environment: logging::get_environment(),
            log_level: None,
            log_format: LogFormat::default(),
            legacy_postprocessors: true,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading processor configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus `STREAM_DISPATCH__*` environment overrides
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.environment.trim().is_empty() {
            return Err(DispatchError::Configuration(
                "environment must not be empty".to_string(),
            ));
        }
        if let Some(level) = &self.log_level {
            EnvFilter::try_new(level).map_err(|e| {
                DispatchError::Configuration(format!("Invalid log_level `{level}`: {e}"))
            })?;
        }
        Ok(())
    }

    /// The filter directive the logger is installed with
    pub fn effective_log_level(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| logging::get_log_level(&self.environment))
    }

    pub fn with_legacy_postprocessors(mut self, enabled: bool) -> Self {
        self.legacy_postprocessors = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert!(config.legacy_postprocessors);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
environment = "production"
log_format = "json"
legacy_postprocessors = false
"#
        )
        .unwrap();

        let config = ProcessorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.environment, "production");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.legacy_postprocessors);
        // unspecified keys keep their defaults
        assert_eq!(config.log_level, None);
        assert_eq!(config.effective_log_level(), "info");
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            ProcessorConfig::load(Some(&missing)),
            Err(DispatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let empty_env = ProcessorConfig {
            environment: " ".to_string(),
            ..Default::default()
        };
        assert!(empty_env.validate().is_err());

        let bad_level = ProcessorConfig {
            log_level: Some("stream_dispatch=notalevel".to_string()),
            ..Default::default()
        };
        assert!(bad_level.validate().is_err());
    }

    #[test]
    fn test_explicit_log_level_wins() {
        let config = ProcessorConfig {
            environment: "production".to_string(),
            log_level: Some("warn".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_log_level(), "warn");
    }
}
