//! Filter entry points.

use crate::api::{FilterDescription, ResourceApi};
use crate::config::{FilterSpec, ResourceConfig, ResourceKind};
use crate::error::Result;
use crate::state::{ObservedState, StateWriter};

use super::{Reconciler, UpdateOutcome, ensure_kind};

/// Create/read/update/delete/import for filters.
///
/// Filters are immutable: any change to an existing filter, including its
/// contents, requires a replacement.
pub struct FilterResource<'a, A: ResourceApi + ?Sized> {
    reconciler: Reconciler<'a, A>,
}

impl<'a, A: ResourceApi + ?Sized> FilterResource<'a, A> {
    /// Wraps a reconciler.
    #[must_use]
    pub const fn new(reconciler: Reconciler<'a, A>) -> Self {
        Self { reconciler }
    }

    /// Creates a filter and waits for it to become `READY`.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::create`].
    pub async fn create<W>(&self, desired: &FilterSpec, writer: &mut W) -> Result<ObservedState>
    where
        W: StateWriter + ?Sized,
    {
        let desired = ResourceConfig::Filter(desired.clone());
        self.reconciler.create(&desired, writer).await
    }

    /// Refreshes a filter snapshot, keeping its contents.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::read`].
    pub async fn read<W>(&self, previous: &ObservedState, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        ensure_kind(ResourceKind::Filter, previous)?;
        self.reconciler.read(previous, writer).await
    }

    /// Returns the no-op outcome or reports that the filter must be replaced.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::update`].
    pub async fn update<W>(
        &self,
        desired: &FilterSpec,
        observed: &ObservedState,
        writer: &mut W,
    ) -> Result<UpdateOutcome>
    where
        W: StateWriter + ?Sized,
    {
        let desired = ResourceConfig::Filter(desired.clone());
        self.reconciler.update(&desired, observed, writer).await
    }

    /// Deletes a filter and waits until it is gone.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::delete`].
    pub async fn delete<W>(&self, observed: &ObservedState, writer: &mut W) -> Result<()>
    where
        W: StateWriter + ?Sized,
    {
        ensure_kind(ResourceKind::Filter, observed)?;
        self.reconciler.delete(observed, writer).await
    }

    /// Adopts an existing filter.
    ///
    /// The contents cannot be read back, so the next update against a
    /// non-empty desired filter reports a replacement.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::import`].
    pub async fn import<W>(&self, resource_id: &str, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        self.reconciler
            .import(ResourceKind::Filter, resource_id, writer)
            .await
    }
}

pub(super) fn refresh(previous: &FilterSpec, description: FilterDescription) -> FilterSpec {
    FilterSpec {
        data_source_id: description.data_source_id,
        description: description.description,
        filter_contents: previous.filter_contents.clone(),
    }
}
