//! Remote resource API contract.
//!
//! The reconciler only talks to Ambar through this trait. `AmbarClient` is
//! the HTTP implementation; `testing::InMemoryApi` is an in-process one.

use async_trait::async_trait;

use crate::config::{Credentials, ResourceConfig, ResourceKind};
use crate::error::ApiError;
use crate::state::LifecycleState;

use super::types::{AttributeUpdate, CreatedResource, RemoteResource};

/// Result type for remote calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Create/describe/update/delete calls against the Ambar API.
///
/// Absence is reported as `ApiError::NotFound`; every other failure is a
/// different `ApiError` variant. Implementations must not retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Creates a resource.
    async fn create(&self, config: &ResourceConfig) -> ApiResult<CreatedResource>;

    /// Describes a resource.
    async fn describe(&self, kind: ResourceKind, resource_id: &str) -> ApiResult<RemoteResource>;

    /// Replaces a resource's credentials.
    async fn update_credentials(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        credentials: &Credentials,
    ) -> ApiResult<LifecycleState>;

    /// Applies in-place attribute changes.
    async fn update_attributes(
        &self,
        resource_id: &str,
        update: &AttributeUpdate,
    ) -> ApiResult<LifecycleState>;

    /// Deletes a resource.
    async fn delete(&self, kind: ResourceKind, resource_id: &str) -> ApiResult<LifecycleState>;
}
