//! Error types for the Ambar reconciliation engine.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation: configuration, the remote API, change planning, and the
//! per-resource state machine.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::ResourceKind;
use crate::state::{LifecycleState, ObservedState};

/// The main error type for the reconciliation engine.
#[derive(Debug, Error)]
pub enum AmbarError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Ambar API errors.
    #[error("Ambar API error: {0}")]
    Api(#[from] ApiError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Errors returned by the remote resource API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The remote resource does not exist.
    #[error("{kind} not found: {resource_id}")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Identifier that was looked up.
        resource_id: String,
    },

    /// The API rejected the request.
    #[error("Ambar API request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Transport-level failure.
    #[error("Network error communicating with Ambar: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// The API answered with something we could not interpret.
    #[error("Invalid response from Ambar API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Planning errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Credential changes were combined with changes that force replacement.
    #[error(
        "Conflicting changes on {kind}: credential change ({}) cannot be combined with replacing change ({}); apply them separately",
        .credential_fields.join(", "),
        .replace_fields.join(", ")
    )]
    ConflictingChange {
        /// Kind of the resource being planned.
        kind: ResourceKind,
        /// Credential fields that changed.
        credential_fields: Vec<String>,
        /// Fields that force a replacement.
        replace_fields: Vec<String>,
    },

    /// Desired and observed configurations describe different kinds.
    #[error("Resource kind mismatch: observed {found}, desired {expected}")]
    KindMismatch {
        /// Kind of the desired configuration.
        expected: ResourceKind,
        /// Kind of the observed state.
        found: ResourceKind,
    },
}

/// Reconciler operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create.
    Create,
    /// Read (refresh or import).
    Read,
    /// In-place update.
    Update,
    /// Delete.
    Delete,
}

/// Why a reconciler operation failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// The resource disappeared while it was expected to exist.
    #[error("resource not found")]
    NotFound,

    /// A remote call failed for a reason other than absence.
    #[error("remote call failed: {0}")]
    RemoteFailure(#[source] ApiError),

    /// The resource reached an explicit failure lifecycle state.
    #[error("resource reached terminal state {state}")]
    TerminalFailureState {
        /// The failure state that was observed.
        state: LifecycleState,
    },

    /// The requested changes cannot be applied in a single pass.
    #[error(transparent)]
    ConflictingChange(PlanError),

    /// The poll deadline passed before a terminal state was observed.
    #[error("timed out after {elapsed:?} waiting for a terminal state")]
    PollTimeout {
        /// Time spent polling.
        elapsed: Duration,
    },

    /// The caller cancelled the poll.
    #[error("polling cancelled by client")]
    ClientCancelled,
}

/// A failed reconciler operation, with the context needed to resume it.
#[derive(Debug, Error)]
#[error(
    "{operation} {kind} '{}' failed: {cause}",
    .resource_id.as_deref().unwrap_or("<unassigned>")
)]
pub struct ReconcileError {
    /// Operation that was attempted.
    pub operation: Operation,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Remote identifier, once one has been assigned.
    pub resource_id: Option<String>,
    /// Last snapshot written before the failure.
    pub last_state: Option<Box<ObservedState>>,
    /// Underlying cause.
    #[source]
    pub cause: FailureCause,
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, AmbarError>;

impl AmbarError {
    /// Returns the reconciliation failure, if this is one.
    #[must_use]
    pub const fn as_reconcile(&self) -> Option<&ReconcileError> {
        match self {
            Self::Reconcile(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the last snapshot written before the failure, if any.
    #[must_use]
    pub fn last_state(&self) -> Option<&ObservedState> {
        self.as_reconcile().and_then(ReconcileError::last_state)
    }

    /// Returns true if polling can be resumed later against the same resource.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.as_reconcile().is_some_and(ReconcileError::is_resumable)
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ApiError {
    /// Creates an API request error.
    #[must_use]
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            resource_id: resource_id.into(),
        }
    }

    /// Returns true if the remote resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl ReconcileError {
    /// Creates a failure for an operation on a resource.
    #[must_use]
    pub fn new(operation: Operation, kind: ResourceKind, cause: FailureCause) -> Self {
        Self {
            operation,
            kind,
            resource_id: None,
            last_state: None,
            cause,
        }
    }

    /// Attaches the last written snapshot, taking the resource id from it.
    #[must_use]
    pub fn with_last_state(mut self, state: ObservedState) -> Self {
        self.resource_id = Some(state.resource_id.clone());
        self.last_state = Some(Box::new(state));
        self
    }

    /// Returns the remote identifier, once one has been assigned.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Returns the last snapshot written before the failure, if any.
    #[must_use]
    pub fn last_state(&self) -> Option<&ObservedState> {
        self.last_state.as_deref()
    }

    /// Returns the lifecycle state of the last snapshot, if any.
    #[must_use]
    pub fn last_lifecycle_state(&self) -> Option<&LifecycleState> {
        self.last_state().map(|s| &s.lifecycle_state)
    }

    /// Returns true if polling timed out or was cancelled.
    #[must_use]
    pub const fn is_resumable(&self) -> bool {
        matches!(
            self.cause,
            FailureCause::PollTimeout { .. } | FailureCause::ClientCancelled
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}
