//! Change plan types.
//!
//! A `ChangePlan` classifies what it takes to move a resource from its
//! observed state to the desired configuration: nothing, one or two in-place
//! updates, or a full replacement.

use crate::api::AttributeUpdate;
use crate::config::{Credentials, ResourceKind};

/// Placeholder shown instead of sensitive values.
pub const SENSITIVE_VALUE: &str = "<sensitive>";

/// Classified output of the diff engine.
///
/// `requires_replace` never coexists with either update flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlan {
    /// Kind of the planned resource.
    pub kind: ResourceKind,
    /// The resource must be deleted and recreated.
    pub requires_replace: bool,
    /// Credentials must be updated in place.
    pub requires_credential_update: bool,
    /// Attributes must be updated in place.
    pub requires_attribute_update: bool,
    /// New credentials, when a credential update is required.
    pub credentials: Option<Credentials>,
    /// Attribute deltas, when an attribute update is required.
    pub attribute_update: Option<AttributeUpdate>,
    /// Every detected field change.
    pub changes: Vec<FieldChange>,
}

/// How a single field change can be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Requires replacing the resource.
    Replace,
    /// Applied through the credential update call.
    Credential,
    /// Applied through the attribute update call.
    InPlace,
}

/// A single detected field change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Field that differs.
    pub field: String,
    /// How the change is applied.
    pub class: ChangeClass,
    /// Old value (redacted when sensitive).
    pub old_value: Option<String>,
    /// New value (redacted when sensitive).
    pub new_value: Option<String>,
}

impl ChangePlan {
    /// Creates a plan with no changes.
    #[must_use]
    pub const fn noop(kind: ResourceKind) -> Self {
        Self {
            kind,
            requires_replace: false,
            requires_credential_update: false,
            requires_attribute_update: false,
            credentials: None,
            attribute_update: None,
            changes: Vec::new(),
        }
    }

    /// Creates a replacement plan.
    #[must_use]
    pub const fn replace(kind: ResourceKind, changes: Vec<FieldChange>) -> Self {
        Self {
            kind,
            requires_replace: true,
            requires_credential_update: false,
            requires_attribute_update: false,
            credentials: None,
            attribute_update: None,
            changes,
        }
    }

    /// Creates an in-place plan from optional credential and attribute steps.
    #[must_use]
    pub fn in_place(
        kind: ResourceKind,
        credentials: Option<Credentials>,
        attribute_update: Option<AttributeUpdate>,
        changes: Vec<FieldChange>,
    ) -> Self {
        Self {
            kind,
            requires_replace: false,
            requires_credential_update: credentials.is_some(),
            requires_attribute_update: attribute_update.is_some(),
            credentials,
            attribute_update,
            changes,
        }
    }

    /// Returns true if nothing needs to be done.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        !self.requires_replace && !self.requires_credential_update && !self.requires_attribute_update
    }

    /// Names of the fields forcing replacement.
    #[must_use]
    pub fn replace_fields(&self) -> Vec<&str> {
        self.fields_of(ChangeClass::Replace)
    }

    /// Names of the changed credential fields.
    #[must_use]
    pub fn credential_fields(&self) -> Vec<&str> {
        self.fields_of(ChangeClass::Credential)
    }

    fn fields_of(&self, class: ChangeClass) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|c| c.class == class)
            .map(|c| c.field.as_str())
            .collect()
    }
}

impl FieldChange {
    /// Creates a change with visible values.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        class: ChangeClass,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            class,
            old_value,
            new_value,
        }
    }

    /// Creates a change whose values must not be displayed.
    #[must_use]
    pub fn sensitive(field: impl Into<String>, class: ChangeClass) -> Self {
        Self {
            field: field.into(),
            class,
            old_value: Some(SENSITIVE_VALUE.to_string()),
            new_value: Some(SENSITIVE_VALUE.to_string()),
        }
    }
}

impl std::fmt::Display for ChangeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Replace => "forces replacement",
            Self::Credential => "credential update",
            Self::InPlace => "in-place update",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for FieldChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let old = self.old_value.as_deref().unwrap_or("(none)");
        let new = self.new_value.as_deref().unwrap_or("(none)");
        write!(f, "{}: {old} -> {new} ({})", self.field, self.class)
    }
}

impl std::fmt::Display for ChangePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_noop() {
            return write!(f, "{}: no changes required", self.kind);
        }

        let action = if self.requires_replace {
            "replace"
        } else {
            match (self.requires_credential_update, self.requires_attribute_update) {
                (true, true) => "update credentials and attributes",
                (true, false) => "update credentials",
                _ => "update attributes",
            }
        };

        writeln!(f, "{}: {action}", self.kind)?;
        for change in &self.changes {
            writeln!(f, "  - {change}")?;
        }
        Ok(())
    }
}
