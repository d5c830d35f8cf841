//! Ambar API integration module.
//!
//! This module provides the remote resource contract the reconciler depends
//! on, the types exchanged over it, and the HTTP client implementing it.

mod client;
mod remote;
mod types;

pub use client::{AmbarClient, api_error_message, encode_filter_contents};
#[cfg(test)]
pub use remote::MockResourceApi;
pub use remote::{ApiResult, ResourceApi};
pub use types::{
    AttributeUpdate, CreatedResource, DataDestinationDescription, DataSourceDescription,
    FilterDescription, RemoteAttributes, RemoteResource,
};
