//! Settings parser for loading engine configuration files.
//!
//! Settings are read from YAML and validated before use.

use crate::error::{AmbarError, ConfigError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::settings::EngineConfig;
use super::validator::ConfigValidator;

/// Parser for engine settings.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new settings parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads and validates settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<EngineConfig> {
        let path = self.resolve(path.as_ref());
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(AmbarError::Config(ConfigError::FileNotFound { path }));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            AmbarError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(&path))
    }

    /// Parses and validates settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or fails validation.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<EngineConfig> {
        debug!("Parsing YAML configuration");

        let config: EngineConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            AmbarError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        ConfigValidator::new().validate(&config)?;

        debug!("Successfully parsed configuration for endpoint: {}", config.client.endpoint);
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> std::path::PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}
