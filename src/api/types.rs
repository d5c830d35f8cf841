//! Ambar API types shared by the remote client and the reconciler.
//!
//! Describe responses never carry credentials or filter contents, so the
//! description types below simply have no such fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ResourceKind;
use crate::state::LifecycleState;

/// Result of a successful create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResource {
    /// Identifier assigned by Ambar.
    pub resource_id: String,
    /// Lifecycle state right after creation.
    pub state: LifecycleState,
}

/// A resource as returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    /// Resource identifier.
    pub resource_id: String,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Non-sensitive attributes.
    pub attributes: RemoteAttributes,
}

/// Kind-specific attributes returned by describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAttributes {
    /// Data source attributes.
    DataSource(DataSourceDescription),
    /// Filter attributes.
    Filter(FilterDescription),
    /// Data destination attributes.
    DataDestination(DataDestinationDescription),
}

/// Described data source, without credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceDescription {
    /// Storage type.
    pub data_source_type: String,
    /// Description.
    pub description: Option<String>,
    /// Partitioning column.
    pub partitioning_column: String,
    /// Serial column.
    pub serial_column: String,
    /// Connection settings.
    pub data_source_config: BTreeMap<String, String>,
}

/// Described filter, without its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDescription {
    /// Source data source.
    pub data_source_id: String,
    /// Description.
    pub description: Option<String>,
}

/// Described data destination, without credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDestinationDescription {
    /// Filters delivered to this destination.
    pub filter_ids: Vec<String>,
    /// Description.
    pub description: Option<String>,
    /// Destination endpoint.
    pub destination_endpoint: String,
}

/// In-place attribute changes accepted by the update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeUpdate {
    /// Changed connection settings, restricted to the in-place allow-list.
    DataSource {
        /// New values of the changed settings.
        data_source_config: BTreeMap<String, String>,
    },
    /// Changed destination fields.
    DataDestination {
        /// New endpoint, if it changed.
        destination_endpoint: Option<String>,
        /// New filter list of the same length, if it changed.
        filter_ids: Option<Vec<String>>,
    },
}

impl RemoteAttributes {
    /// Returns the kind of the described resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::DataSource(_) => ResourceKind::DataSource,
            Self::Filter(_) => ResourceKind::Filter,
            Self::DataDestination(_) => ResourceKind::DataDestination,
        }
    }
}

impl AttributeUpdate {
    /// Returns the kind of resource the update targets.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::DataSource { .. } => ResourceKind::DataSource,
            Self::DataDestination { .. } => ResourceKind::DataDestination,
        }
    }

    /// Names of the fields the update touches.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::DataSource { data_source_config } => data_source_config
                .keys()
                .map(|k| format!("data_source_config.{k}"))
                .collect(),
            Self::DataDestination {
                destination_endpoint,
                filter_ids,
            } => {
                let mut fields = Vec::new();
                if destination_endpoint.is_some() {
                    fields.push(String::from("destination_endpoint"));
                }
                if filter_ids.is_some() {
                    fields.push(String::from("filter_ids"));
                }
                fields
            }
        }
    }
}
