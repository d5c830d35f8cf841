//! Reconciler for driving one remote resource towards its desired state.
//!
//! The reconciler turns a change plan into remote calls, waits for each
//! asynchronous step to settle, and hands a new snapshot to the caller's
//! [`StateWriter`] after every externally visible step. Replacement is never
//! performed here: the caller sequences delete and create itself.

mod data_destination;
mod data_source;
mod filter;

pub use data_destination::DataDestinationResource;
pub use data_source::DataSourceResource;
pub use filter::FilterResource;

use tracing::{error, info, warn};

use crate::api::{RemoteAttributes, ResourceApi};
use crate::config::{ConfigValidator, PollConfig, ResourceConfig, ResourceKind};
use crate::error::{AmbarError, ApiError, FailureCause, Operation, PlanError, ReconcileError, Result};
use crate::planner::{ChangePlan, DiffEngine};
use crate::poller::{PollOutcome, PollTarget, Poller};
use crate::state::{LifecycleState, ObservedState, StateWriter};

/// Result of an update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The resource was updated in place, or already matched.
    Updated(ObservedState),
    /// The change cannot be applied in place; the caller must delete and
    /// recreate the resource. No remote call was made.
    ReplaceRequired(ChangePlan),
}

/// Drives resources of any kind through the Ambar API.
pub struct Reconciler<'a, A: ResourceApi + ?Sized> {
    /// Remote API.
    api: &'a A,
    /// Lifecycle poller.
    poller: Poller,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Desired configuration checks.
    validator: ConfigValidator,
}

impl<'a, A: ResourceApi + ?Sized> Reconciler<'a, A> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(api: &'a A, poller: Poller) -> Self {
        Self {
            api,
            poller,
            diff_engine: DiffEngine::new(),
            validator: ConfigValidator::new(),
        }
    }

    /// Creates a reconciler polling as configured.
    #[must_use]
    pub fn from_config(api: &'a A, config: &PollConfig) -> Self {
        Self::new(api, Poller::from_config(config))
    }

    /// Returns the poller.
    #[must_use]
    pub const fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Computes the change plan without touching the remote.
    ///
    /// # Errors
    ///
    /// Returns a planning error for conflicting changes or mismatched kinds.
    pub fn plan(&self, desired: &ResourceConfig, observed: &ObservedState) -> Result<ChangePlan> {
        Ok(self.diff_engine.plan(desired, observed)?)
    }

    /// Creates a resource and waits for it to become `READY`.
    ///
    /// The snapshot carrying the new resource id is written before polling
    /// starts, so a failed or interrupted create never loses it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any remote call if `desired` is
    /// invalid, and a reconcile error if the create call fails, if the
    /// resource reaches `FAILED`, or if polling fails, times out or is
    /// cancelled.
    pub async fn create<W>(&self, desired: &ResourceConfig, writer: &mut W) -> Result<ObservedState>
    where
        W: StateWriter + ?Sized,
    {
        self.validator.validate_resource(desired)?;

        let kind = desired.kind();
        info!("Creating {kind}");

        let created = self
            .api
            .create(desired)
            .await
            .map_err(|err| ReconcileError::new(Operation::Create, kind, remote_cause(err)))?;

        info!("{kind} created: {} ({})", created.resource_id, created.state);
        let snapshot = ObservedState::new(created.resource_id, created.state, desired.clone());
        writer.write(&snapshot);

        self.settle(Operation::Create, snapshot, writer).await
    }

    /// Refreshes a snapshot from the remote.
    ///
    /// Returns `None` if the resource no longer exists or is being deleted;
    /// the writer is cleared in that case. Fields the describe call never
    /// returns are carried over from `previous`.
    ///
    /// # Errors
    ///
    /// Returns a reconcile error for any describe failure other than absence.
    pub async fn read<W>(&self, previous: &ObservedState, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        let kind = previous.kind();
        let resource_id = previous.resource_id.as_str();

        let resource = match self.api.describe(kind, resource_id).await {
            Ok(resource) => resource,
            Err(err) if err.is_not_found() => {
                warn!("{kind} {resource_id} no longer exists, removing from state");
                writer.clear();
                return Ok(None);
            }
            Err(err) => {
                return Err(ReconcileError::new(Operation::Read, kind, FailureCause::RemoteFailure(err))
                    .with_last_state(previous.clone())
                    .into());
            }
        };

        if resource.state == LifecycleState::Deleting {
            warn!("{kind} {resource_id} is {}, removing from state", resource.state);
            writer.clear();
            return Ok(None);
        }

        let Some(config) = refresh_config(&previous.config, resource.attributes) else {
            let err = ApiError::InvalidResponse {
                message: format!("describe of {kind} {resource_id} returned another resource kind"),
            };
            return Err(ReconcileError::new(Operation::Read, kind, FailureCause::RemoteFailure(err))
                .with_last_state(previous.clone())
                .into());
        };

        let snapshot = ObservedState::new(resource_id, resource.state, config);
        writer.write(&snapshot);
        Ok(Some(snapshot))
    }

    /// Applies in-place changes, or reports that a replacement is needed.
    ///
    /// Credentials are updated first; each step is written back and polled
    /// to `READY` before the next one starts.
    ///
    /// # Errors
    ///
    /// Returns a reconcile error with `ConflictingChange` before any remote
    /// call when the plan is rejected, a configuration error when `desired` is
    /// invalid, a planning error when the kinds differ, and a reconcile error
    /// if an update call or its poll fails.
    pub async fn update<W>(
        &self,
        desired: &ResourceConfig,
        observed: &ObservedState,
        writer: &mut W,
    ) -> Result<UpdateOutcome>
    where
        W: StateWriter + ?Sized,
    {
        self.validator.validate_resource(desired)?;

        let kind = desired.kind();
        let resource_id = observed.resource_id.as_str();

        let plan = match self.diff_engine.plan(desired, observed) {
            Ok(plan) => plan,
            Err(err @ PlanError::ConflictingChange { .. }) => {
                error!("Refusing to update {kind} {resource_id}: {err}");
                return Err(ReconcileError::new(Operation::Update, kind, FailureCause::ConflictingChange(err))
                    .with_last_state(observed.clone())
                    .into());
            }
            Err(err) => return Err(err.into()),
        };

        if plan.requires_replace {
            info!("{kind} {resource_id} must be replaced: {}", plan.replace_fields().join(", "));
            return Ok(UpdateOutcome::ReplaceRequired(plan));
        }
        if plan.is_noop() {
            return Ok(UpdateOutcome::Updated(observed.with_config(desired.clone())));
        }

        let mut current = observed.clone();

        if let Some(credentials) = &plan.credentials {
            info!("Updating credentials of {kind} {resource_id}");
            let state = self
                .api
                .update_credentials(kind, resource_id, credentials)
                .await
                .map_err(|err| {
                    ReconcileError::new(Operation::Update, kind, remote_cause(err)).with_last_state(current.clone())
                })?;

            current = ObservedState::new(resource_id, state, current.config.with_credentials(credentials));
            writer.write(&current);
            current = self.settle(Operation::Update, current, writer).await?;
        }

        if let Some(update) = &plan.attribute_update {
            info!("Updating {} of {kind} {resource_id}", update.fields().join(", "));
            let state = self
                .api
                .update_attributes(resource_id, update)
                .await
                .map_err(|err| {
                    ReconcileError::new(Operation::Update, kind, remote_cause(err)).with_last_state(current.clone())
                })?;

            current = ObservedState::new(resource_id, state, desired.clone());
            writer.write(&current);
            current = self.settle(Operation::Update, current, writer).await?;
        }

        Ok(UpdateOutcome::Updated(current))
    }

    /// Deletes a resource and waits until it is gone.
    ///
    /// A resource that is already absent counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns a reconcile error if the delete call or the poll fails.
    pub async fn delete<W>(&self, observed: &ObservedState, writer: &mut W) -> Result<()>
    where
        W: StateWriter + ?Sized,
    {
        let kind = observed.kind();
        let resource_id = observed.resource_id.as_str();
        info!("Deleting {kind} {resource_id}");

        let state = match self.api.delete(kind, resource_id).await {
            Ok(state) => state,
            Err(err) if err.is_not_found() => {
                warn!("{kind} {resource_id} was already deleted");
                writer.clear();
                return Ok(());
            }
            Err(err) => {
                return Err(ReconcileError::new(Operation::Delete, kind, FailureCause::RemoteFailure(err))
                    .with_last_state(observed.clone())
                    .into());
            }
        };

        let snapshot = observed.with_lifecycle_state(state);
        writer.write(&snapshot);

        match self
            .poller
            .await_terminal(self.api, kind, resource_id, PollTarget::gone())
            .await
        {
            Ok(_) => {
                info!("{kind} {resource_id} deleted");
                writer.clear();
                Ok(())
            }
            Err(cause) => {
                error!("Deleting {kind} {resource_id} failed: {cause}");
                Err(ReconcileError::new(Operation::Delete, kind, cause)
                    .with_last_state(snapshot)
                    .into())
            }
        }
    }

    /// Adopts an existing resource by id.
    ///
    /// Credentials and filter contents cannot be read back and start empty.
    ///
    /// # Errors
    ///
    /// Returns a reconcile error for any describe failure other than absence.
    pub async fn import<W>(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        writer: &mut W,
    ) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        info!("Importing {kind} {resource_id}");
        self.read(&ObservedState::placeholder(kind, resource_id), writer).await
    }

    /// Polls until `snapshot` settles on `READY`, writing the outcome.
    async fn settle<W>(&self, operation: Operation, snapshot: ObservedState, writer: &mut W) -> Result<ObservedState>
    where
        W: StateWriter + ?Sized,
    {
        let kind = snapshot.kind();
        let outcome = self
            .poller
            .await_terminal(self.api, kind, &snapshot.resource_id, PollTarget::ready())
            .await;

        match outcome {
            Ok(PollOutcome::Reached(resource)) => {
                info!("{kind} {} is {}", snapshot.resource_id, resource.state);
                let ready = snapshot.with_lifecycle_state(resource.state);
                writer.write(&ready);
                Ok(ready)
            }
            Ok(PollOutcome::Gone) => Err(ReconcileError::new(operation, kind, FailureCause::NotFound)
                .with_last_state(snapshot)
                .into()),
            Err(FailureCause::TerminalFailureState { state }) => {
                error!("{operation} of {kind} {} ended in {state}", snapshot.resource_id);
                let failed = snapshot.with_lifecycle_state(state.clone());
                writer.write(&failed);
                Err(ReconcileError::new(operation, kind, FailureCause::TerminalFailureState { state })
                    .with_last_state(failed)
                    .into())
            }
            Err(cause) => {
                error!("{operation} of {kind} {} failed: {cause}", snapshot.resource_id);
                Err(ReconcileError::new(operation, kind, cause)
                    .with_last_state(snapshot)
                    .into())
            }
        }
    }
}

/// Checks that a snapshot belongs to the expected kind.
fn ensure_kind(expected: ResourceKind, observed: &ObservedState) -> Result<()> {
    if observed.kind() == expected {
        Ok(())
    } else {
        Err(AmbarError::Plan(PlanError::KindMismatch {
            expected,
            found: observed.kind(),
        }))
    }
}

fn remote_cause(err: ApiError) -> FailureCause {
    if err.is_not_found() {
        FailureCause::NotFound
    } else {
        FailureCause::RemoteFailure(err)
    }
}

/// Merges described attributes with the fields describe never returns.
fn refresh_config(previous: &ResourceConfig, attributes: RemoteAttributes) -> Option<ResourceConfig> {
    match (previous, attributes) {
        (ResourceConfig::DataSource(spec), RemoteAttributes::DataSource(description)) => {
            Some(data_source::refresh(spec, description).into())
        }
        (ResourceConfig::Filter(spec), RemoteAttributes::Filter(description)) => {
            Some(filter::refresh(spec, description).into())
        }
        (ResourceConfig::DataDestination(spec), RemoteAttributes::DataDestination(description)) => {
            Some(data_destination::refresh(spec, description).into())
        }
        _ => None,
    }
}
