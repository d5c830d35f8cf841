//! Desired configuration types for Ambar resources.
//!
//! These structs describe the declared target configuration of a single
//! resource instance. A fresh value is supplied on every reconciliation call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kinds of remote resource managed by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A connection to a customer database.
    DataSource,
    /// A filter over a data source's record sequences.
    Filter,
    /// An HTTP endpoint receiving filtered records.
    DataDestination,
}

/// Username/password pair accepted by the credential update call.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Config map keys the API uses for the columns and credentials.
///
/// They are set from the dedicated `DataSourceSpec` fields on create and
/// cannot appear in `data_source_config`.
pub const RESERVED_DATA_SOURCE_KEYS: [&str; 4] = ["partitioningColumn", "serialColumn", "username", "password"];

/// Desired configuration of a data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSourceSpec {
    /// Storage type, e.g. `postgres`.
    pub data_source_type: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Column used to partition record sequences.
    pub partitioning_column: String,
    /// Column carrying the record serial.
    pub serial_column: String,
    /// Type-specific connection settings.
    #[serde(default)]
    pub data_source_config: BTreeMap<String, String>,
    /// Database username.
    #[serde(default)]
    pub username: String,
    /// Database password.
    #[serde(default)]
    pub password: String,
}

/// Desired configuration of a filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSpec {
    /// Data source the filter reads from.
    pub data_source_id: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Filter expression, plain or base64 encoded.
    pub filter_contents: String,
}

/// Desired configuration of a data destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataDestinationSpec {
    /// Filters whose records are delivered.
    #[serde(default)]
    pub filter_ids: Vec<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Endpoint records are pushed to.
    pub destination_endpoint: String,
    /// Endpoint username.
    #[serde(default)]
    pub username: String,
    /// Endpoint password.
    #[serde(default)]
    pub password: String,
}

/// Desired configuration of any resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "spec")]
pub enum ResourceConfig {
    /// Data source configuration.
    DataSource(DataSourceSpec),
    /// Filter configuration.
    Filter(FilterSpec),
    /// Data destination configuration.
    DataDestination(DataDestinationSpec),
}

impl ResourceKind {
    /// All managed kinds.
    pub const ALL: [Self; 3] = [Self::DataSource, Self::Filter, Self::DataDestination];

    /// Path segment used by the Ambar API for this kind.
    #[must_use]
    pub const fn api_segment(self) -> &'static str {
        match self {
            Self::DataSource => "datasource",
            Self::Filter => "filter",
            Self::DataDestination => "datadestination",
        }
    }

    /// Returns true if this kind accepts credential updates.
    #[must_use]
    pub const fn has_credentials(self) -> bool {
        matches!(self, Self::DataSource | Self::DataDestination)
    }
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl DataSourceSpec {
    /// Creates a data source spec with an empty connection map.
    #[must_use]
    pub fn new(
        data_source_type: impl Into<String>,
        partitioning_column: impl Into<String>,
        serial_column: impl Into<String>,
    ) -> Self {
        Self {
            data_source_type: data_source_type.into(),
            partitioning_column: partitioning_column.into(),
            serial_column: serial_column.into(),
            ..Self::default()
        }
    }

    /// Sets a connection setting.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_source_config.insert(key.into(), value.into());
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl FilterSpec {
    /// Creates a filter spec.
    #[must_use]
    pub fn new(data_source_id: impl Into<String>, filter_contents: impl Into<String>) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            description: None,
            filter_contents: filter_contents.into(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl DataDestinationSpec {
    /// Creates a data destination spec.
    #[must_use]
    pub fn new<I, S>(filter_ids: I, destination_endpoint: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter_ids: filter_ids.into_iter().map(Into::into).collect(),
            destination_endpoint: destination_endpoint.into(),
            ..Self::default()
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ResourceConfig {
    /// Returns the kind of resource this configuration describes.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::DataSource(_) => ResourceKind::DataSource,
            Self::Filter(_) => ResourceKind::Filter,
            Self::DataDestination(_) => ResourceKind::DataDestination,
        }
    }

    /// Returns an empty configuration of the given kind, used for imports.
    #[must_use]
    pub fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::DataSource => Self::DataSource(DataSourceSpec::default()),
            ResourceKind::Filter => Self::Filter(FilterSpec::default()),
            ResourceKind::DataDestination => Self::DataDestination(DataDestinationSpec::default()),
        }
    }

    /// Returns the credentials, for kinds that have them.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match self {
            Self::DataSource(spec) => Some(Credentials::new(&spec.username, &spec.password)),
            Self::DataDestination(spec) => Some(Credentials::new(&spec.username, &spec.password)),
            Self::Filter(_) => None,
        }
    }

    /// Returns a copy with the credentials replaced.
    ///
    /// Filters carry no credentials and are returned unchanged.
    #[must_use]
    pub fn with_credentials(&self, credentials: &Credentials) -> Self {
        let mut config = self.clone();
        match &mut config {
            Self::DataSource(spec) => {
                spec.username.clone_from(&credentials.username);
                spec.password.clone_from(&credentials.password);
            }
            Self::DataDestination(spec) => {
                spec.username.clone_from(&credentials.username);
                spec.password.clone_from(&credentials.password);
            }
            Self::Filter(_) => {}
        }
        config
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DataSource => "DataSource",
            Self::Filter => "Filter",
            Self::DataDestination => "DataDestination",
        };
        write!(f, "{s}")
    }
}

impl From<DataSourceSpec> for ResourceConfig {
    fn from(spec: DataSourceSpec) -> Self {
        Self::DataSource(spec)
    }
}

impl From<FilterSpec> for ResourceConfig {
    fn from(spec: FilterSpec) -> Self {
        Self::Filter(spec)
    }
}

impl From<DataDestinationSpec> for ResourceConfig {
    fn from(spec: DataDestinationSpec) -> Self {
        Self::DataDestination(spec)
    }
}
