//! Configuration module for the reconciliation engine.
//!
//! This module holds both kinds of configuration the engine consumes:
//! - Desired resource configuration (data sources, filters, destinations)
//! - Engine settings (API endpoint, key, polling), parsed from YAML and validated

mod spec;
mod settings;
mod parser;
mod validator;

pub use spec::{
    Credentials, DataDestinationSpec, DataSourceSpec, FilterSpec, ResourceConfig, ResourceKind,
    RESERVED_DATA_SOURCE_KEYS,
};
pub use settings::{
    ClientConfig, EngineConfig, PollConfig, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use parser::ConfigParser;
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
