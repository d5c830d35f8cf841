//! Testing utilities for code built on the reconciler.
//!
//! [`InMemoryApi`] implements [`ResourceApi`] without a network. It stores
//! resources in memory, walks each one through a scripted sequence of
//! lifecycle states as it is described, and records every call.
//!
//! ```ignore
//! use ambar_reconcile::testing::InMemoryApi;
//!
//! let api = InMemoryApi::new();
//! api.script_next([LifecycleState::Creating, LifecycleState::Failed]);
//! let err = reconciler.create(&desired, &mut state).await.unwrap_err();
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::api::{
    ApiResult, AttributeUpdate, CreatedResource, DataDestinationDescription, DataSourceDescription,
    FilterDescription, RemoteAttributes, RemoteResource, ResourceApi,
};
use crate::config::{Credentials, ResourceConfig, ResourceKind};
use crate::error::ApiError;
use crate::state::LifecycleState;

/// State reported right after an update call.
pub const UPDATING: &str = "UPDATING";

/// The remote operations `InMemoryApi` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// `create`
    Create,
    /// `describe`
    Describe,
    /// `update_credentials`
    UpdateCredentials,
    /// `update_attributes`
    UpdateAttributes,
    /// `delete`
    Delete,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Operation.
    pub call: Call,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Target resource, if the call had one.
    pub resource_id: Option<String>,
}

/// In-memory implementation of [`ResourceApi`].
#[derive(Debug, Default)]
pub struct InMemoryApi {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    resources: HashMap<String, StoredResource>,
    next_script: Option<VecDeque<LifecycleState>>,
    failures: HashMap<Call, ApiError>,
    calls: Vec<RecordedCall>,
}

#[derive(Debug)]
struct StoredResource {
    config: ResourceConfig,
    state: LifecycleState,
    script: VecDeque<LifecycleState>,
    removing: bool,
}

impl InMemoryApi {
    /// Creates an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing resource.
    pub fn insert(&self, resource_id: impl Into<String>, state: LifecycleState, config: ResourceConfig) {
        self.lock().resources.insert(
            resource_id.into(),
            StoredResource {
                config,
                state,
                script: VecDeque::new(),
                removing: false,
            },
        );
    }

    /// Scripts the states reported by the describe calls that follow the
    /// next mutating call.
    ///
    /// Without a script, create and update settle on `READY` at the first
    /// describe and delete makes the resource disappear. After a delete the
    /// resource disappears once its script is exhausted.
    pub fn script_next(&self, states: impl IntoIterator<Item = LifecycleState>) {
        self.lock().next_script = Some(states.into_iter().collect());
    }

    /// Makes the next call of the given operation fail with `error`.
    pub fn fail_next(&self, call: Call, error: ApiError) {
        self.lock().failures.insert(call, error);
    }

    /// Overrides the current state of a stored resource.
    pub fn set_state(&self, resource_id: &str, state: LifecycleState) {
        if let Some(resource) = self.lock().resources.get_mut(resource_id) {
            resource.state = state;
            resource.script.clear();
        }
    }

    /// Returns the full stored configuration, credentials included.
    #[must_use]
    pub fn stored_config(&self, resource_id: &str) -> Option<ResourceConfig> {
        self.lock().resources.get(resource_id).map(|r| r.config.clone())
    }

    /// Returns true if the resource exists.
    #[must_use]
    pub fn contains(&self, resource_id: &str) -> bool {
        self.lock().resources.contains_key(resource_id)
    }

    /// Returns every recorded call, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Counts the recorded calls of one operation.
    #[must_use]
    pub fn count(&self, call: Call) -> usize {
        self.lock().calls.iter().filter(|c| c.call == call).count()
    }

    /// Counts the recorded calls that change remote state.
    #[must_use]
    pub fn mutating_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.call != Call::Describe)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn record(&mut self, call: Call, kind: ResourceKind, resource_id: Option<&str>) -> ApiResult<()> {
        self.calls.push(RecordedCall {
            call,
            kind,
            resource_id: resource_id.map(String::from),
        });
        self.failures.remove(&call).map_or(Ok(()), Err)
    }

    fn take_script(&mut self, default: &[LifecycleState]) -> VecDeque<LifecycleState> {
        self.next_script
            .take()
            .unwrap_or_else(|| default.iter().cloned().collect())
    }

    fn existing(&mut self, kind: ResourceKind, resource_id: &str) -> ApiResult<&mut StoredResource> {
        match self.resources.get_mut(resource_id) {
            Some(resource) if resource.config.kind() == kind => Ok(resource),
            _ => Err(ApiError::not_found(kind, resource_id)),
        }
    }
}

fn describe_attributes(config: &ResourceConfig) -> RemoteAttributes {
    match config {
        ResourceConfig::DataSource(spec) => RemoteAttributes::DataSource(DataSourceDescription {
            data_source_type: spec.data_source_type.clone(),
            description: spec.description.clone(),
            partitioning_column: spec.partitioning_column.clone(),
            serial_column: spec.serial_column.clone(),
            data_source_config: spec.data_source_config.clone(),
        }),
        ResourceConfig::Filter(spec) => RemoteAttributes::Filter(FilterDescription {
            data_source_id: spec.data_source_id.clone(),
            description: spec.description.clone(),
        }),
        ResourceConfig::DataDestination(spec) => RemoteAttributes::DataDestination(DataDestinationDescription {
            filter_ids: spec.filter_ids.clone(),
            description: spec.description.clone(),
            destination_endpoint: spec.destination_endpoint.clone(),
        }),
    }
}

fn id_prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::DataSource => "ds",
        ResourceKind::Filter => "flt",
        ResourceKind::DataDestination => "dd",
    }
}

#[async_trait]
impl ResourceApi for InMemoryApi {
    async fn create(&self, config: &ResourceConfig) -> ApiResult<CreatedResource> {
        let mut inner = self.lock();
        let kind = config.kind();
        inner.record(Call::Create, kind, None)?;

        let resource_id = format!("{}-{}", id_prefix(kind), Uuid::new_v4());
        let script = inner.take_script(&[LifecycleState::Ready]);
        inner.resources.insert(
            resource_id.clone(),
            StoredResource {
                config: config.clone(),
                state: LifecycleState::Creating,
                script,
                removing: false,
            },
        );

        Ok(CreatedResource {
            resource_id,
            state: LifecycleState::Creating,
        })
    }

    async fn describe(&self, kind: ResourceKind, resource_id: &str) -> ApiResult<RemoteResource> {
        let mut inner = self.lock();
        inner.record(Call::Describe, kind, Some(resource_id))?;

        let resource = inner.existing(kind, resource_id)?;
        if let Some(state) = resource.script.pop_front() {
            resource.state = state;
        } else if resource.removing {
            inner.resources.remove(resource_id);
            return Err(ApiError::not_found(kind, resource_id));
        }

        Ok(RemoteResource {
            resource_id: resource_id.to_string(),
            state: resource.state.clone(),
            attributes: describe_attributes(&resource.config),
        })
    }

    async fn update_credentials(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        credentials: &Credentials,
    ) -> ApiResult<LifecycleState> {
        let mut inner = self.lock();
        inner.record(Call::UpdateCredentials, kind, Some(resource_id))?;
        if !kind.has_credentials() {
            return Err(ApiError::request_failed(400, format!("{kind} has no credentials")));
        }

        let script = inner.take_script(&[LifecycleState::Ready]);
        let resource = inner.existing(kind, resource_id)?;
        resource.config = resource.config.with_credentials(credentials);
        resource.state = LifecycleState::from(UPDATING);
        resource.script = script;
        Ok(resource.state.clone())
    }

    async fn update_attributes(&self, resource_id: &str, update: &AttributeUpdate) -> ApiResult<LifecycleState> {
        let mut inner = self.lock();
        let kind = update.kind();
        inner.record(Call::UpdateAttributes, kind, Some(resource_id))?;

        let script = inner.take_script(&[LifecycleState::Ready]);
        let resource = inner.existing(kind, resource_id)?;
        match (&mut resource.config, update) {
            (ResourceConfig::DataSource(spec), AttributeUpdate::DataSource { data_source_config }) => {
                spec.data_source_config
                    .extend(data_source_config.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            (
                ResourceConfig::DataDestination(spec),
                AttributeUpdate::DataDestination {
                    destination_endpoint,
                    filter_ids,
                },
            ) => {
                if let Some(endpoint) = destination_endpoint {
                    spec.destination_endpoint.clone_from(endpoint);
                }
                if let Some(ids) = filter_ids {
                    spec.filter_ids.clone_from(ids);
                }
            }
            _ => return Err(ApiError::request_failed(400, "update does not match resource kind")),
        }
        resource.state = LifecycleState::from(UPDATING);
        resource.script = script;
        Ok(resource.state.clone())
    }

    async fn delete(&self, kind: ResourceKind, resource_id: &str) -> ApiResult<LifecycleState> {
        let mut inner = self.lock();
        inner.record(Call::Delete, kind, Some(resource_id))?;

        let script = inner.take_script(&[]);
        let resource = inner.existing(kind, resource_id)?;
        resource.state = LifecycleState::Deleting;
        resource.script = script;
        resource.removing = true;
        Ok(LifecycleState::Deleting)
    }
}
