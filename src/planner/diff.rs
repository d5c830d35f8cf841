//! Diff engine for comparing desired configuration against observed state.
//!
//! Every field of every kind falls into one class: immutable (forces
//! replacement), credential (updated through the credential call), or
//! in-place (updated through the attribute call).

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::api::AttributeUpdate;
use crate::config::{DataDestinationSpec, DataSourceSpec, FilterSpec, ResourceConfig};
use crate::error::PlanError;
use crate::state::ObservedState;

use super::plan::{ChangeClass, ChangePlan, FieldChange};

/// Data source connection settings that can change without replacement.
pub const IN_PLACE_DATA_SOURCE_KEYS: [&str; 3] = ["hostname", "hostPort", "tlsTerminationOverrideHost"];

/// Pseudo-field reported when the lifecycle state forces replacement.
pub const LIFECYCLE_STATE_FIELD: &str = "lifecycle_state";

/// Engine for computing change plans.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// Field changes and in-place deltas collected for one resource.
#[derive(Default)]
struct Changes {
    details: Vec<FieldChange>,
    credentials_changed: bool,
    attribute_update: Option<AttributeUpdate>,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the plan that moves `observed` to `desired`.
    ///
    /// Pure: no remote calls are made.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::ConflictingChange` when credential changes are
    /// combined with field changes that force replacement, and
    /// `PlanError::KindMismatch` when the kinds differ.
    pub fn plan(&self, desired: &ResourceConfig, observed: &ObservedState) -> Result<ChangePlan, PlanError> {
        let kind = desired.kind();
        let changes = match (desired, &observed.config) {
            (ResourceConfig::DataSource(d), ResourceConfig::DataSource(o)) => Self::diff_data_source(d, o),
            (ResourceConfig::Filter(d), ResourceConfig::Filter(o)) => Self::diff_filter(d, o),
            (ResourceConfig::DataDestination(d), ResourceConfig::DataDestination(o)) => {
                Self::diff_data_destination(d, o)
            }
            _ => {
                return Err(PlanError::KindMismatch {
                    expected: kind,
                    found: observed.kind(),
                });
            }
        };

        let Changes {
            mut details,
            credentials_changed,
            attribute_update,
        } = changes;

        if observed.lifecycle_state.is_unusable() {
            debug!(
                "{kind} {} is {}, forcing replacement",
                observed.resource_id, observed.lifecycle_state
            );
            details.retain(|c| c.class == ChangeClass::Replace);
            details.push(FieldChange::new(
                LIFECYCLE_STATE_FIELD,
                ChangeClass::Replace,
                Some(observed.lifecycle_state.to_string()),
                None,
            ));
            return Ok(ChangePlan::replace(kind, details));
        }

        let replace_fields: Vec<String> = details
            .iter()
            .filter(|c| c.class == ChangeClass::Replace)
            .map(|c| c.field.clone())
            .collect();

        if credentials_changed && !replace_fields.is_empty() {
            let credential_fields = details
                .iter()
                .filter(|c| c.class == ChangeClass::Credential)
                .map(|c| c.field.clone())
                .collect();
            return Err(PlanError::ConflictingChange {
                kind,
                credential_fields,
                replace_fields,
            });
        }

        if !replace_fields.is_empty() {
            debug!("{kind} {} requires replacement: {}", observed.resource_id, replace_fields.join(", "));
            return Ok(ChangePlan::replace(kind, details));
        }

        if details.is_empty() {
            debug!("{kind} {} is up to date", observed.resource_id);
            return Ok(ChangePlan::noop(kind));
        }

        let credentials = if credentials_changed { desired.credentials() } else { None };
        debug!("{kind} {} can be updated in place", observed.resource_id);
        Ok(ChangePlan::in_place(kind, credentials, attribute_update, details))
    }

    fn diff_data_source(desired: &DataSourceSpec, observed: &DataSourceSpec) -> Changes {
        let mut changes = Changes::default();

        changes.immutable("data_source_type", &observed.data_source_type, &desired.data_source_type);
        changes.immutable_opt("description", observed.description.as_deref(), desired.description.as_deref());
        changes.immutable("partitioning_column", &observed.partitioning_column, &desired.partitioning_column);
        changes.immutable("serial_column", &observed.serial_column, &desired.serial_column);

        let keys: BTreeSet<&String> = observed
            .data_source_config
            .keys()
            .chain(desired.data_source_config.keys())
            .collect();

        let mut delta = BTreeMap::new();
        for key in keys {
            let old = observed.data_source_config.get(key).map(String::as_str);
            let new = desired.data_source_config.get(key).map(String::as_str);
            if old == new {
                continue;
            }

            let field = format!("data_source_config.{key}");
            match new {
                Some(value) if IN_PLACE_DATA_SOURCE_KEYS.contains(&key.as_str()) => {
                    delta.insert(key.clone(), value.to_string());
                    changes.push(field, ChangeClass::InPlace, old, new);
                }
                // Removing a key, even an allow-listed one, cannot be expressed in place.
                _ => changes.push(field, ChangeClass::Replace, old, new),
            }
        }
        if !delta.is_empty() {
            changes.attribute_update = Some(AttributeUpdate::DataSource {
                data_source_config: delta,
            });
        }

        changes.credential("username", &observed.username, &desired.username);
        changes.credential("password", &observed.password, &desired.password);
        changes
    }

    fn diff_filter(desired: &FilterSpec, observed: &FilterSpec) -> Changes {
        let mut changes = Changes::default();

        changes.immutable("data_source_id", &observed.data_source_id, &desired.data_source_id);
        changes.immutable_opt("description", observed.description.as_deref(), desired.description.as_deref());
        if observed.filter_contents != desired.filter_contents {
            changes
                .details
                .push(FieldChange::sensitive("filter_contents", ChangeClass::Replace));
        }
        changes
    }

    fn diff_data_destination(desired: &DataDestinationSpec, observed: &DataDestinationSpec) -> Changes {
        let mut changes = Changes::default();

        changes.immutable_opt("description", observed.description.as_deref(), desired.description.as_deref());

        let mut endpoint = None;
        if observed.destination_endpoint != desired.destination_endpoint {
            endpoint = Some(desired.destination_endpoint.clone());
            changes.push(
                "destination_endpoint",
                ChangeClass::InPlace,
                Some(observed.destination_endpoint.as_str()),
                Some(desired.destination_endpoint.as_str()),
            );
        }

        // Only the cardinality decides: same length is an in-place substitution.
        let mut filter_ids = None;
        if observed.filter_ids != desired.filter_ids {
            let class = if observed.filter_ids.len() == desired.filter_ids.len() {
                filter_ids = Some(desired.filter_ids.clone());
                ChangeClass::InPlace
            } else {
                ChangeClass::Replace
            };
            changes.details.push(FieldChange::new(
                "filter_ids",
                class,
                Some(observed.filter_ids.join(",")),
                Some(desired.filter_ids.join(",")),
            ));
        }

        if endpoint.is_some() || filter_ids.is_some() {
            changes.attribute_update = Some(AttributeUpdate::DataDestination {
                destination_endpoint: endpoint,
                filter_ids,
            });
        }

        changes.credential("username", &observed.username, &desired.username);
        changes.credential("password", &observed.password, &desired.password);
        changes
    }
}

impl Changes {
    fn push(&mut self, field: impl Into<String>, class: ChangeClass, old: Option<&str>, new: Option<&str>) {
        self.details.push(FieldChange::new(
            field,
            class,
            old.map(String::from),
            new.map(String::from),
        ));
    }

    fn immutable(&mut self, field: &str, old: &str, new: &str) {
        if old != new {
            self.push(field, ChangeClass::Replace, Some(old), Some(new));
        }
    }

    fn immutable_opt(&mut self, field: &str, old: Option<&str>, new: Option<&str>) {
        if old != new {
            self.push(field, ChangeClass::Replace, old, new);
        }
    }

    fn credential(&mut self, field: &str, old: &str, new: &str) {
        if old != new {
            self.credentials_changed = true;
            self.details
                .push(FieldChange::sensitive(field, ChangeClass::Credential));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, ResourceKind};
    use crate::state::LifecycleState;

    fn data_source() -> DataSourceSpec {
        DataSourceSpec::new("postgres", "partition", "serial")
            .with_config("hostname", "db.internal")
            .with_config("hostPort", "5432")
            .with_config("databaseName", "orders")
            .with_credentials("postgres", "secret")
    }

    fn destination(filters: &[&str]) -> DataDestinationSpec {
        DataDestinationSpec::new(filters.iter().copied(), "https://hooks.example.com/a")
            .with_credentials("hook", "hook-pw")
    }

    fn observed(config: impl Into<ResourceConfig>) -> ObservedState {
        ObservedState::new("res-1", LifecycleState::Ready, config.into())
    }

    fn plan(desired: impl Into<ResourceConfig>, observed: &ObservedState) -> Result<ChangePlan, PlanError> {
        DiffEngine::new().plan(&desired.into(), observed)
    }

    #[test]
    fn test_identical_configs_are_noop() {
        for config in [
            ResourceConfig::from(data_source()),
            ResourceConfig::from(FilterSpec::new("ds-1", "true")),
            ResourceConfig::from(destination(&["f1", "f2"])),
        ] {
            let result = plan(config.clone(), &observed(config)).expect("plan");
            assert!(result.is_noop());
            assert!(result.changes.is_empty());
        }
    }

    #[test]
    fn test_immutable_change_forces_replace() {
        fn with_data_source(edit: impl FnOnce(&mut DataSourceSpec)) -> (ResourceConfig, ResourceConfig) {
            let mut spec = data_source();
            edit(&mut spec);
            (data_source().into(), spec.into())
        }

        let filter = FilterSpec::new("ds-1", "true");

        let cases: Vec<(&str, (ResourceConfig, ResourceConfig))> = vec![
            ("data_source_type", with_data_source(|s| s.data_source_type = String::from("mysql"))),
            ("description", with_data_source(|s| s.description = Some(String::from("orders")))),
            ("partitioning_column", with_data_source(|s| s.partitioning_column = String::from("tenant"))),
            ("serial_column", with_data_source(|s| s.serial_column = String::from("seq"))),
            (
                "data_source_config.databaseName",
                with_data_source(|s| {
                    s.data_source_config.insert(String::from("databaseName"), String::from("invoices"));
                }),
            ),
            (
                "data_source_id",
                (filter.clone().into(), FilterSpec::new("ds-2", "true").into()),
            ),
            (
                "description",
                (filter.clone().into(), filter.clone().with_description("errors only").into()),
            ),
            (
                "filter_contents",
                (filter.into(), FilterSpec::new("ds-1", "false").into()),
            ),
            (
                "description",
                (
                    destination(&["f1", "f2"]).into(),
                    destination(&["f1", "f2"]).with_description("audit").into(),
                ),
            ),
            (
                "filter_ids",
                (destination(&["f1", "f2"]).into(), destination(&["f1"]).into()),
            ),
        ];

        for (field, (current, desired)) in cases {
            let kind = current.kind();
            let result = plan(desired, &observed(current)).expect("plan");

            assert!(result.requires_replace, "{kind} {field}");
            assert!(!result.requires_credential_update, "{kind} {field}");
            assert!(!result.requires_attribute_update, "{kind} {field}");
            assert_eq!(result.replace_fields(), vec![field], "{kind} {field}");
        }
    }

    #[test]
    fn test_credential_only_change() {
        let desired = data_source().with_credentials("postgres", "rotated");

        let result = plan(desired, &observed(data_source())).expect("plan");

        assert!(!result.requires_replace);
        assert!(result.requires_credential_update);
        assert!(!result.requires_attribute_update);
        assert_eq!(result.credentials, Some(Credentials::new("postgres", "rotated")));
        assert_eq!(result.credential_fields(), vec!["password"]);
    }

    #[test]
    fn test_credential_values_are_redacted() {
        let desired = data_source().with_credentials("postgres", "rotated");

        let result = plan(desired, &observed(data_source())).expect("plan");

        let rendered = result.to_string();
        assert!(!rendered.contains("rotated"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_allow_listed_key_change_is_in_place() {
        let desired = data_source().with_config("hostname", "db2.internal");

        let result = plan(desired, &observed(data_source())).expect("plan");

        assert!(!result.requires_replace);
        assert!(result.requires_attribute_update);
        let Some(AttributeUpdate::DataSource { data_source_config }) = result.attribute_update else {
            panic!("expected a data source update");
        };
        assert_eq!(data_source_config.len(), 1);
        assert_eq!(data_source_config.get("hostname").map(String::as_str), Some("db2.internal"));
    }

    #[test]
    fn test_adding_allow_listed_key_is_in_place() {
        let desired = data_source().with_config("tlsTerminationOverrideHost", "proxy.internal");

        let result = plan(desired, &observed(data_source())).expect("plan");

        assert!(!result.requires_replace);
        assert!(result.requires_attribute_update);
    }

    #[test]
    fn test_removing_allow_listed_key_forces_replace() {
        let mut desired = data_source();
        desired.data_source_config.remove("hostPort");

        let result = plan(desired, &observed(data_source())).expect("plan");

        assert!(result.requires_replace);
        assert_eq!(result.replace_fields(), vec!["data_source_config.hostPort"]);
    }

    #[test]
    fn test_other_config_key_forces_replace() {
        let desired = data_source().with_config("databaseName", "invoices");

        let result = plan(desired, &observed(data_source())).expect("plan");

        assert!(result.requires_replace);
        assert!(result.attribute_update.is_none());
    }

    #[test]
    fn test_credentials_with_replace_is_conflict() {
        let mut desired = data_source().with_credentials("postgres", "rotated");
        desired.partitioning_column = String::from("tenant");

        let err = plan(desired, &observed(data_source())).expect_err("conflict");

        let PlanError::ConflictingChange {
            kind,
            credential_fields,
            replace_fields,
        } = err
        else {
            panic!("expected a conflict");
        };
        assert_eq!(kind, ResourceKind::DataSource);
        assert_eq!(credential_fields, vec!["password"]);
        assert_eq!(replace_fields, vec!["partitioning_column"]);
    }

    #[test]
    fn test_credentials_with_attributes_are_two_steps() {
        let mut desired = destination(&["f1"]).with_credentials("hook", "rotated");
        desired.destination_endpoint = String::from("https://hooks.example.com/b");

        let result = plan(desired, &observed(destination(&["f1"]))).expect("plan");

        assert!(!result.requires_replace);
        assert!(result.requires_credential_update);
        assert!(result.requires_attribute_update);
        assert_eq!(
            result.attribute_update,
            Some(AttributeUpdate::DataDestination {
                destination_endpoint: Some(String::from("https://hooks.example.com/b")),
                filter_ids: None,
            })
        );
    }

    #[test]
    fn test_filter_reorder_is_in_place() {
        let result = plan(destination(&["B", "A"]), &observed(destination(&["A", "B"]))).expect("plan");

        assert!(!result.requires_replace);
        assert!(result.requires_attribute_update);
        assert_eq!(
            result.attribute_update,
            Some(AttributeUpdate::DataDestination {
                destination_endpoint: None,
                filter_ids: Some(vec![String::from("B"), String::from("A")]),
            })
        );
    }

    #[test]
    fn test_filter_substitution_is_in_place() {
        let result = plan(destination(&["A", "C"]), &observed(destination(&["A", "B"]))).expect("plan");

        assert!(!result.requires_replace);
        assert!(result.requires_attribute_update);
    }

    #[test]
    fn test_filter_count_change_forces_replace() {
        let result = plan(destination(&["A"]), &observed(destination(&["A", "B"]))).expect("plan");

        assert!(result.requires_replace);
        assert_eq!(result.replace_fields(), vec!["filter_ids"]);
    }

    #[test]
    fn test_filter_fields_are_immutable() {
        let base = FilterSpec::new("ds-1", "true");

        let contents = plan(FilterSpec::new("ds-1", "false"), &observed(base.clone())).expect("plan");
        let source = plan(FilterSpec::new("ds-2", "true"), &observed(base.clone())).expect("plan");
        let description = plan(base.clone().with_description("x"), &observed(base)).expect("plan");

        assert!(contents.requires_replace);
        assert!(source.requires_replace);
        assert!(description.requires_replace);
        assert!(!contents.to_string().contains("false"));
    }

    #[test]
    fn test_failed_state_forces_replace_without_changes() {
        for config in [
            ResourceConfig::from(data_source()),
            ResourceConfig::from(FilterSpec::new("ds-1", "true")),
            ResourceConfig::from(destination(&["f1"])),
        ] {
            let failed = observed(config.clone()).with_lifecycle_state(LifecycleState::Failed);

            let result = DiffEngine::new().plan(&config, &failed).expect("plan");

            assert!(result.requires_replace);
            assert!(!result.requires_credential_update);
            assert!(!result.requires_attribute_update);
            assert_eq!(result.replace_fields(), vec![LIFECYCLE_STATE_FIELD]);
        }
    }

    #[test]
    fn test_failed_state_drops_in_place_deltas() {
        let failed = observed(data_source()).with_lifecycle_state(LifecycleState::Failed);
        let desired = data_source()
            .with_credentials("postgres", "rotated")
            .with_config("hostname", "db2.internal");

        let result = plan(desired, &failed).expect("plan");

        assert!(result.requires_replace);
        assert!(result.credentials.is_none());
        assert!(result.attribute_update.is_none());
    }

    #[test]
    fn test_kind_mismatch() {
        let err = plan(FilterSpec::new("ds", "x"), &observed(data_source())).expect_err("mismatch");
        assert_eq!(
            err,
            PlanError::KindMismatch {
                expected: ResourceKind::Filter,
                found: ResourceKind::DataSource,
            }
        );
    }
}
