//! Ambar API client implementation.
//!
//! This module provides the HTTP client for the Ambar resource API. Every
//! call is a JSON `POST`; the API key travels in the `x-api-key` header.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::config::{
    ClientConfig, Credentials, DataSourceSpec, RESERVED_DATA_SOURCE_KEYS, ResourceConfig, ResourceKind,
};
use crate::error::{ApiError, Result};
use crate::state::LifecycleState;

use super::remote::{ApiResult, ResourceApi};
use super::types::{
    AttributeUpdate, CreatedResource, DataDestinationDescription, DataSourceDescription,
    FilterDescription, RemoteAttributes, RemoteResource,
};

/// Header carrying the environment API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Connection settings folded into the data source config map on the wire.
const PARTITIONING_COLUMN_KEY: &str = RESERVED_DATA_SOURCE_KEYS[0];
const SERIAL_COLUMN_KEY: &str = RESERVED_DATA_SOURCE_KEYS[1];
const USERNAME_KEY: &str = RESERVED_DATA_SOURCE_KEYS[2];
const PASSWORD_KEY: &str = RESERVED_DATA_SOURCE_KEYS[3];

/// Ambar API client.
#[derive(Debug, Clone)]
pub struct AmbarClient {
    /// HTTP client.
    client: Client,
    /// API base URL.
    base_url: String,
    /// Environment API key.
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceIdRequest<'a> {
    resource_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDataSourceRequest<'a> {
    data_source_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    data_source_config: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFilterRequest<'a> {
    data_source_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    filter_contents: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDataDestinationRequest<'a> {
    filter_ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    destination_endpoint: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCredentialsRequest<'a> {
    resource_id: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDataSourceRequest<'a> {
    resource_id: &'a str,
    data_source_config: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDataDestinationRequest<'a> {
    resource_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_endpoint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_ids: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct StateChangeResponse {
    state: LifecycleState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeDataSourceResponse {
    resource_id: String,
    state: LifecycleState,
    data_source_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    data_source_config: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeFilterResponse {
    resource_id: String,
    state: LifecycleState,
    data_source_id: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeDataDestinationResponse {
    resource_id: String,
    state: LifecycleState,
    #[serde(default)]
    filter_ids: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    destination_endpoint: String,
}

impl AmbarClient {
    /// Creates a new Ambar API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        debug!("Created Ambar client for {}", config.base_url());

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, kind: ResourceKind, action: &str) -> String {
        if action.is_empty() {
            format!("{}/resource/{}", self.base_url, kind.api_segment())
        } else {
            format!("{}/resource/{}/{action}", self.base_url, kind.api_segment())
        }
    }

    /// Executes a single request. There is no retry here: the reconciler
    /// surfaces every failure to its caller.
    async fn post<B, T>(
        &self,
        kind: ResourceKind,
        action: &str,
        resource_id: Option<&str>,
        body: &B,
    ) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(kind, action);
        trace!("POST {url}");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(kind, resource_id.unwrap_or_default()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Ambar API returned {status}: {body}");
            return Err(ApiError::request_failed(
                status.as_u16(),
                api_error_message(&body),
            ));
        }

        response.json().await.map_err(|e| ApiError::InvalidResponse {
            message: format!("Failed to parse response: {e}"),
        })
    }

    async fn create_data_source(&self, spec: &DataSourceSpec) -> ApiResult<CreatedResource> {
        let mut data_source_config: BTreeMap<&str, &str> = spec
            .data_source_config
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        data_source_config.insert(PARTITIONING_COLUMN_KEY, &spec.partitioning_column);
        data_source_config.insert(SERIAL_COLUMN_KEY, &spec.serial_column);
        data_source_config.insert(USERNAME_KEY, &spec.username);
        data_source_config.insert(PASSWORD_KEY, &spec.password);

        let request = CreateDataSourceRequest {
            data_source_type: &spec.data_source_type,
            description: spec.description.as_deref(),
            data_source_config,
        };

        self.post(ResourceKind::DataSource, "", None, &request).await
    }
}

#[async_trait]
impl ResourceApi for AmbarClient {
    async fn create(&self, config: &ResourceConfig) -> ApiResult<CreatedResource> {
        match config {
            ResourceConfig::DataSource(spec) => self.create_data_source(spec).await,
            ResourceConfig::Filter(spec) => {
                let request = CreateFilterRequest {
                    data_source_id: &spec.data_source_id,
                    description: spec.description.as_deref(),
                    filter_contents: encode_filter_contents(&spec.filter_contents),
                };
                self.post(ResourceKind::Filter, "", None, &request).await
            }
            ResourceConfig::DataDestination(spec) => {
                let request = CreateDataDestinationRequest {
                    filter_ids: &spec.filter_ids,
                    description: spec.description.as_deref(),
                    destination_endpoint: &spec.destination_endpoint,
                    username: &spec.username,
                    password: &spec.password,
                };
                self.post(ResourceKind::DataDestination, "", None, &request).await
            }
        }
    }

    async fn describe(&self, kind: ResourceKind, resource_id: &str) -> ApiResult<RemoteResource> {
        let request = ResourceIdRequest { resource_id };

        match kind {
            ResourceKind::DataSource => {
                let mut response: DescribeDataSourceResponse =
                    self.post(kind, "describe", Some(resource_id), &request).await?;

                // Credentials are never part of the described attributes.
                response.data_source_config.remove(USERNAME_KEY);
                response.data_source_config.remove(PASSWORD_KEY);
                let partitioning_column = response
                    .data_source_config
                    .remove(PARTITIONING_COLUMN_KEY)
                    .unwrap_or_default();
                let serial_column = response
                    .data_source_config
                    .remove(SERIAL_COLUMN_KEY)
                    .unwrap_or_default();

                Ok(RemoteResource {
                    resource_id: response.resource_id,
                    state: response.state,
                    attributes: RemoteAttributes::DataSource(DataSourceDescription {
                        data_source_type: response.data_source_type,
                        description: response.description,
                        partitioning_column,
                        serial_column,
                        data_source_config: response.data_source_config,
                    }),
                })
            }
            ResourceKind::Filter => {
                let response: DescribeFilterResponse =
                    self.post(kind, "describe", Some(resource_id), &request).await?;

                Ok(RemoteResource {
                    resource_id: response.resource_id,
                    state: response.state,
                    attributes: RemoteAttributes::Filter(FilterDescription {
                        data_source_id: response.data_source_id,
                        description: response.description,
                    }),
                })
            }
            ResourceKind::DataDestination => {
                let response: DescribeDataDestinationResponse =
                    self.post(kind, "describe", Some(resource_id), &request).await?;

                Ok(RemoteResource {
                    resource_id: response.resource_id,
                    state: response.state,
                    attributes: RemoteAttributes::DataDestination(DataDestinationDescription {
                        filter_ids: response.filter_ids,
                        description: response.description,
                        destination_endpoint: response.destination_endpoint,
                    }),
                })
            }
        }
    }

    async fn update_credentials(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        credentials: &Credentials,
    ) -> ApiResult<LifecycleState> {
        let request = UpdateCredentialsRequest {
            resource_id,
            username: &credentials.username,
            password: &credentials.password,
        };

        let response: StateChangeResponse = self
            .post(kind, "update/credentials", Some(resource_id), &request)
            .await?;
        Ok(response.state)
    }

    async fn update_attributes(
        &self,
        resource_id: &str,
        update: &AttributeUpdate,
    ) -> ApiResult<LifecycleState> {
        let response: StateChangeResponse = match update {
            AttributeUpdate::DataSource { data_source_config } => {
                let request = UpdateDataSourceRequest {
                    resource_id,
                    data_source_config,
                };
                self.post(update.kind(), "update", Some(resource_id), &request)
                    .await?
            }
            AttributeUpdate::DataDestination {
                destination_endpoint,
                filter_ids,
            } => {
                let request = UpdateDataDestinationRequest {
                    resource_id,
                    destination_endpoint: destination_endpoint.as_deref(),
                    filter_ids: filter_ids.as_deref(),
                };
                self.post(update.kind(), "update", Some(resource_id), &request)
                    .await?
            }
        };
        Ok(response.state)
    }

    async fn delete(&self, kind: ResourceKind, resource_id: &str) -> ApiResult<LifecycleState> {
        let request = ResourceIdRequest { resource_id };
        let response: StateChangeResponse =
            self.post(kind, "delete", Some(resource_id), &request).await?;
        Ok(response.state)
    }
}

/// Base64-encodes filter contents unless they already are valid base64.
#[must_use]
pub fn encode_filter_contents(contents: &str) -> String {
    if STANDARD.decode(contents).is_ok() {
        contents.to_string()
    } else {
        STANDARD.encode(contents)
    }
}

/// Extracts the human-readable part of an Ambar error body.
///
/// Error bodies look like `{"errorType":"...","message":"Missing dataSourceType"}`:
/// the text after the last `":` is kept and camelCase field names are
/// rewritten to the snake_case names used in resource configuration.
#[must_use]
pub fn api_error_message(body: &str) -> String {
    let tail = body.rsplit("\":").next().unwrap_or(body);
    let trimmed = tail.trim().trim_matches(|c| matches!(c, '"' | '{' | '}'));
    to_snake_case(trimmed)
}

fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut prev_lower_or_digit = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() && prev_lower_or_digit {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
    }

    out
}
