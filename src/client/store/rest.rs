//! JSON-over-HTTP document store adapter.
//!
//! Maps the [`DocumentStore`] operations onto a plain REST document API:
//!
//! | operation      | request                                   |
//! |----------------|-------------------------------------------|
//! | `create`       | `POST   /{collection}`                    |
//! | `get`          | `GET    /{collection}/{id}`               |
//! | `query`        | `GET    /{collection}?field=value&order_by=field&direction=asc` |
//! | `update`       | `PATCH  /{collection}/{id}`               |
//! | `delete`       | `DELETE /{collection}/{id}`               |
//! | `batch_update` | `POST   /{collection}/batch`              |
//!
//! HTTP statuses and transport failures are translated into
//! [`StoreErrorKind`] here, so nothing above this layer inspects messages.

use super::{DocumentStore, Query, StoreError, StoreErrorKind};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// REST-backed [`DocumentStore`]
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };
        let response = request.send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::new(
            kind_for_status(status),
            format!("{} {}", status, body.trim()),
        ))
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::new(StoreErrorKind::Internal, format!("invalid response body: {}", e)))
    }
}

/// Translate an HTTP status into an error kind
pub fn kind_for_status(status: StatusCode) -> StoreErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => StoreErrorKind::Unauthenticated,
        StatusCode::FORBIDDEN => StoreErrorKind::PermissionDenied,
        StatusCode::NOT_FOUND => StoreErrorKind::NotFound,
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => StoreErrorKind::Conflict,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StoreErrorKind::Timeout,
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => StoreErrorKind::Unavailable,
        s if s.is_server_error() => StoreErrorKind::Internal,
        _ => StoreErrorKind::Validation,
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    let kind = if err.is_timeout() {
        StoreErrorKind::Timeout
    } else if err.is_connect() || err.is_request() {
        StoreErrorKind::Connectivity
    } else {
        StoreErrorKind::Internal
    };
    StoreError::new(kind, err.to_string())
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|(field, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (field.clone(), value)
        })
        .collect();
    if let Some((field, direction)) = &query.order_by {
        params.push(("order_by".to_string(), field.clone()));
        params.push(("direction".to_string(), direction.as_str().to_string()));
    }
    params
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn create(&self, collection: &str, doc: Value) -> Result<Value, StoreError> {
        let response = self
            .send(self.client.post(self.url(collection)).json(&doc))
            .await?;
        Self::json(response).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let request = self.client.get(self.url(&format!("{}/{}", collection, id)));
        match self.send(request).await {
            Ok(response) => Ok(Some(Self::json(response).await?)),
            Err(err) if err.kind == StoreErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let request = self
            .client
            .get(self.url(collection))
            .query(&query_params(query));
        let response = self.send(request).await?;
        Self::json(response).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        let request = self
            .client
            .patch(self.url(&format!("{}/{}", collection, id)))
            .json(&patch);
        let response = self.send(request).await?;
        Self::json(response).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let request = self.client.delete(self.url(&format!("{}/{}", collection, id)));
        self.send(request).await?;
        Ok(())
    }

    async fn batch_update(
        &self,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> Result<Vec<Value>, StoreError> {
        let body = json!({
            "updates": updates
                .into_iter()
                .map(|(id, patch)| json!({ "id": id, "patch": patch }))
                .collect::<Vec<_>>()
        });
        let request = self
            .client
            .post(self.url(&format!("{}/batch", collection)))
            .json(&body);
        let response = self.send(request).await?;
        Self::json(response).await
    }
}
