//! Data source entry points.

use crate::api::{DataSourceDescription, ResourceApi};
use crate::config::{DataSourceSpec, ResourceConfig, ResourceKind};
use crate::error::Result;
use crate::state::{ObservedState, StateWriter};

use super::{Reconciler, UpdateOutcome, ensure_kind};

/// Create/read/update/delete/import for data sources.
///
/// Connection settings listed in
/// [`IN_PLACE_DATA_SOURCE_KEYS`](crate::planner::IN_PLACE_DATA_SOURCE_KEYS)
/// and the credentials are updated in place; every other change replaces the
/// data source.
pub struct DataSourceResource<'a, A: ResourceApi + ?Sized> {
    reconciler: Reconciler<'a, A>,
}

impl<'a, A: ResourceApi + ?Sized> DataSourceResource<'a, A> {
    /// Wraps a reconciler.
    #[must_use]
    pub const fn new(reconciler: Reconciler<'a, A>) -> Self {
        Self { reconciler }
    }

    /// Creates a data source and waits for it to become `READY`.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::create`].
    pub async fn create<W>(&self, desired: &DataSourceSpec, writer: &mut W) -> Result<ObservedState>
    where
        W: StateWriter + ?Sized,
    {
        let desired = ResourceConfig::DataSource(desired.clone());
        self.reconciler.create(&desired, writer).await
    }

    /// Refreshes a data source snapshot, keeping its credentials.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::read`].
    pub async fn read<W>(&self, previous: &ObservedState, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        ensure_kind(ResourceKind::DataSource, previous)?;
        self.reconciler.read(previous, writer).await
    }

    /// Updates a data source in place, or reports that it must be replaced.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::update`].
    pub async fn update<W>(
        &self,
        desired: &DataSourceSpec,
        observed: &ObservedState,
        writer: &mut W,
    ) -> Result<UpdateOutcome>
    where
        W: StateWriter + ?Sized,
    {
        let desired = ResourceConfig::DataSource(desired.clone());
        self.reconciler.update(&desired, observed, writer).await
    }

    /// Deletes a data source and waits until it is gone.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::delete`].
    pub async fn delete<W>(&self, observed: &ObservedState, writer: &mut W) -> Result<()>
    where
        W: StateWriter + ?Sized,
    {
        ensure_kind(ResourceKind::DataSource, observed)?;
        self.reconciler.delete(observed, writer).await
    }

    /// Adopts an existing data source. Its credentials start empty.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::import`].
    pub async fn import<W>(&self, resource_id: &str, writer: &mut W) -> Result<Option<ObservedState>>
    where
        W: StateWriter + ?Sized,
    {
        self.reconciler
            .import(ResourceKind::DataSource, resource_id, writer)
            .await
    }
}

/// Takes every described field, keeping the credentials from `previous`.
pub(super) fn refresh(previous: &DataSourceSpec, description: DataSourceDescription) -> DataSourceSpec {
    DataSourceSpec {
        data_source_type: description.data_source_type,
        description: description.description,
        partitioning_column: description.partitioning_column,
        serial_column: description.serial_column,
        data_source_config: description.data_source_config,
        username: previous.username.clone(),
        password: previous.password.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::Poller;
    use crate::state::LifecycleState;
    use crate::testing::InMemoryApi;
    use std::time::Duration;

    fn spec() -> DataSourceSpec {
        DataSourceSpec::new("postgres", "partition", "serial")
            .with_config("hostname", "db.internal")
            .with_config("hostPort", "5432")
            .with_credentials("postgres", "secret")
    }

    #[test]
    fn test_refresh_keeps_credentials() {
        let description = DataSourceDescription {
            data_source_type: String::from("postgres"),
            description: Some(String::from("orders")),
            partitioning_column: String::from("partition"),
            serial_column: String::from("serial"),
            data_source_config: spec().data_source_config,
        };

        let refreshed = refresh(&spec(), description);

        assert_eq!(refreshed.username, "postgres");
        assert_eq!(refreshed.password, "secret");
        assert_eq!(refreshed.description.as_deref(), Some("orders"));
    }

    #[tokio::test]
    async fn test_read_rejects_other_kinds() {
        let api = InMemoryApi::new();
        let resource = DataSourceResource::new(Reconciler::new(&api, Poller::new(Duration::from_millis(1))));
        let filter = ObservedState::new(
            "flt-1",
            LifecycleState::Ready,
            crate::config::FilterSpec::new("ds-1", "true").into(),
        );

        let mut latest: Option<ObservedState> = None;
        let err = resource.read(&filter, &mut latest).await.expect_err("kind mismatch");

        assert!(matches!(err, crate::error::AmbarError::Plan(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_import() {
        let api = InMemoryApi::new();
        let resource = DataSourceResource::new(Reconciler::new(&api, Poller::new(Duration::from_millis(1))));

        let mut latest: Option<ObservedState> = None;
        let created = resource.create(&spec(), &mut latest).await.expect("create");
        assert!(created.is_ready());

        let mut imported_state: Option<ObservedState> = None;
        let imported = resource
            .import(&created.resource_id, &mut imported_state)
            .await
            .expect("import")
            .expect("exists");

        let ResourceConfig::DataSource(imported_spec) = &imported.config else {
            panic!("expected a data source");
        };
        assert_eq!(imported_spec.data_source_config, spec().data_source_config);
        assert!(imported_spec.username.is_empty());
        assert!(imported_spec.password.is_empty());
        assert_eq!(imported_state, Some(imported));
    }
}
