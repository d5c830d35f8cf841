//! Validation of engine settings and desired resource configuration.
//!
//! Catches the problems that would otherwise surface as confusing transport
//! errors on the first remote call, or as a replacement on every pass.

use reqwest::Url;
use tracing::debug;

use crate::error::{AmbarError, ConfigError, Result};

use super::settings::EngineConfig;
use super::spec::{RESERVED_DATA_SOURCE_KEYS, ResourceConfig};

/// Validator for engine settings and desired resource configuration.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates engine settings.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, config: &EngineConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_endpoint(&config.client.endpoint, &mut result);

        if config.client.api_key.trim().is_empty() {
            result.push(
                "client.api_key",
                "Missing Ambar API key. Keys are region specific, use one created for the selected endpoint.",
            );
        }

        if config.client.request_timeout_secs == 0 {
            result.push("client.request_timeout_secs", "Request timeout must be positive");
        }

        if config.polling.interval_secs == 0 {
            result.push("polling.interval_secs", "Poll interval must be positive");
        }

        if config.polling.timeout_secs == Some(0) {
            result.push(
                "polling.timeout_secs",
                "Poll timeout must be positive; omit it to wait without a deadline",
            );
        }

        if let Some(first) = result.errors.first() {
            return Err(AmbarError::Config(ConfigError::validation(
                first.message.clone(),
                first.field.clone(),
            )));
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    /// Validates a desired resource configuration before it is sent.
    ///
    /// A data source config map may not carry the keys the API reserves for
    /// the columns and credentials: the create call would overwrite them and
    /// describe never returns them as config entries.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first reserved key found.
    pub fn validate_resource(&self, config: &ResourceConfig) -> Result<()> {
        let ResourceConfig::DataSource(spec) = config else {
            return Ok(());
        };

        if let Some(key) = RESERVED_DATA_SOURCE_KEYS
            .iter()
            .find(|key| spec.data_source_config.contains_key(**key))
        {
            return Err(AmbarError::Config(ConfigError::validation(
                format!("'{key}' is reserved; set it through its dedicated field instead"),
                format!("data_source_config.{key}"),
            )));
        }

        Ok(())
    }

    fn validate_endpoint(endpoint: &str, result: &mut ValidationResult) {
        if endpoint.trim().is_empty() {
            result.push("client.endpoint", "Missing Ambar API endpoint");
            return;
        }

        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => result.push(
                "client.endpoint",
                format!("Unsupported endpoint scheme '{}'", url.scheme()),
            ),
            Err(e) => result.push("client.endpoint", format!("Invalid endpoint URL: {e}")),
        }
    }
}

impl ValidationResult {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Returns true if no errors were recorded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
