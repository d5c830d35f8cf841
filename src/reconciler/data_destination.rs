//! Data destination entry points.

use crate::api::{DataDestinationDescription, ResourceApi};
use crate::config::{DataDestinationSpec, ResourceConfig, ResourceKind};
use crate::error::Result;
use crate::state::{ObservedState, StateWriter};

use super::{Reconciler, UpdateOutcome, ensure_kind};

/// Create/read/update/delete/import for data destinations.
///
/// The endpoint, the credentials and a same-length filter list are updated in
/// place. Adding or removing filters replaces the destination.
pub struct DataDestinationResource<'a, A: ResourceApi + ?Sized> {
    reconciler: Reconciler<'a, A>,
}

impl<'a, A: ResourceApi + ?Sized> DataDestinationResource<'a, A> {
    /// Wraps a reconciler.
    #[must_use]
    pub const fn new(reconciler: Reconciler<'a, A>) -> Self {
        Self { reconciler }
    }

    /// Creates a data destination and waits for it to become `READY`.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::create`].
    pub async fn create<W>(&self, desired: &DataDestinationSpec, writer: &mut W) -> Result<ObservedState>
    where
        W: StateWriter + ?Sized,
    {
        let desired = ResourceConfig::DataDestination(desired.clone());
        self.reconciler.create(&desired, writer).await
    }

    /// Refreshes a data destination snapshot, keeping its credentials.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::read`].
    pub async fn read<W>(&self, previous: &ObservedState, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        ensure_kind(ResourceKind::DataDestination, previous)?;
        self.reconciler.read(previous, writer).await
    }

    /// Updates a data destination in place, or reports that it must be replaced.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::update`].
    pub async fn update<W>(
        &self,
        desired: &DataDestinationSpec,
        observed: &ObservedState,
        writer: &mut W,
    ) -> Result<UpdateOutcome>
    where
        W: StateWriter + ?Sized,
    {
        let desired = ResourceConfig::DataDestination(desired.clone());
        self.reconciler.update(&desired, observed, writer).await
    }

    /// Deletes a data destination and waits until it is gone.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::delete`].
    pub async fn delete<W>(&self, observed: &ObservedState, writer: &mut W) -> Result<()>
    where
        W: StateWriter + ?Sized,
    {
        ensure_kind(ResourceKind::DataDestination, observed)?;
        self.reconciler.delete(observed, writer).await
    }

    /// Adopts an existing data destination. Its credentials start empty.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::import`].
    pub async fn import<W>(&self, resource_id: &str, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        self.reconciler
            .import(ResourceKind::DataDestination, resource_id, writer)
            .await
    }
}

pub(super) fn refresh(
    previous: &DataDestinationSpec,
    description: DataDestinationDescription,
) -> DataDestinationSpec {
    DataDestinationSpec {
        filter_ids: description.filter_ids,
        description: description.description,
        destination_endpoint: description.destination_endpoint,
        username: previous.username.clone(),
        password: previous.password.clone(),
    }
}
