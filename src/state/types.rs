//! State types for tracking observed resources.
//!
//! An `ObservedState` is the last snapshot of a remote resource as known to
//! the caller. It is the only thing the diff engine compares against on the
//! next reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ResourceConfig, ResourceKind};

/// Lifecycle state reported by the Ambar API.
///
/// States are compared verbatim and case-sensitively; anything outside the
/// known vocabulary is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    /// Resource is being provisioned.
    Creating,
    /// Resource is usable.
    Ready,
    /// Resource failed to provision and cannot be used.
    Failed,
    /// Resource is being torn down.
    Deleting,
    /// Any other state string reported by the API.
    Other(String),
}

/// Last known snapshot of a remote resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservedState {
    /// Identifier assigned by Ambar at creation.
    pub resource_id: String,
    /// Lifecycle state from the last remote observation.
    pub lifecycle_state: LifecycleState,
    /// Mirrored resource configuration.
    pub config: ResourceConfig,
    /// When this snapshot was taken.
    #[serde(default = "Utc::now")]
    pub synced_at: DateTime<Utc>,
}

impl LifecycleState {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
            Self::Deleting => "DELETING",
            Self::Other(s) => s,
        }
    }

    /// Returns true if the resource can no longer be used and must be replaced.
    #[must_use]
    pub const fn is_unusable(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl ObservedState {
    /// Creates a snapshot stamped with the current time.
    #[must_use]
    pub fn new(
        resource_id: impl Into<String>,
        lifecycle_state: LifecycleState,
        config: ResourceConfig,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            lifecycle_state,
            config,
            synced_at: Utc::now(),
        }
    }

    /// Creates a placeholder snapshot for importing a bare resource id.
    #[must_use]
    pub fn placeholder(kind: ResourceKind, resource_id: impl Into<String>) -> Self {
        Self::new(
            resource_id,
            LifecycleState::Other(String::new()),
            ResourceConfig::empty(kind),
        )
    }

    /// Returns the kind of the observed resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.config.kind()
    }

    /// Returns a copy with a new lifecycle state and a fresh timestamp.
    #[must_use]
    pub fn with_lifecycle_state(&self, lifecycle_state: LifecycleState) -> Self {
        Self::new(self.resource_id.clone(), lifecycle_state, self.config.clone())
    }

    /// Returns a copy with a new configuration and a fresh timestamp.
    #[must_use]
    pub fn with_config(&self, config: ResourceConfig) -> Self {
        Self::new(self.resource_id.clone(), self.lifecycle_state.clone(), config)
    }

    /// Returns true if the resource is ready for use.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lifecycle_state == LifecycleState::Ready
    }
}

impl From<String> for LifecycleState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "CREATING" => Self::Creating,
            "READY" => Self::Ready,
            "FAILED" => Self::Failed,
            "DELETING" => Self::Deleting,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for LifecycleState {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<LifecycleState> for String {
    fn from(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
