//! JSON:API transport client.
//!
//! # Design
//! `JsonApiClient` is the sole translation point between a [`Query`] and a
//! concrete request, and the sole point where responses are decoded. It holds
//! an explicit [`ClientConfig`] and a pluggable [`Transport`]; it carries no
//! other state, so every call is independent. `prepare_url` is a pure
//! function — tests can verify URL construction without any I/O. Decoding is
//! applied per call after the round-trip rather than through a transport-wide
//! hook, so nothing mutates shared behavior behind other callers' backs.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::jsonapi;
use crate::query::Query;

const JSONAPI_MIME: &str = "application/vnd.api+json";

/// Which base address a URL is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// The JSON:API root.
    Api,
    /// The bare server root (path translation, sub-request batching).
    Server,
    /// No prefix; yields `path?query` as-is.
    Relative,
}

pub struct JsonApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl JsonApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Compose the full URL for `path` + `query` against the selected base.
    /// Pure and deterministic.
    pub fn prepare_url(&self, path: &str, query: &Query, base: Base) -> String {
        let url = match base {
            Base::Api => format!("{}/{}", self.config.api_base(), path.trim_start_matches('/')),
            Base::Server => format!("{}/{}", self.config.server_base(), path.trim_start_matches('/')),
            Base::Relative => path.to_string(),
        };
        let query_string = query.to_query_string();
        if query_string.is_empty() {
            url
        } else {
            format!("{url}?{query_string}")
        }
    }

    /// Issue a GET and decode the response body.
    pub async fn get(&self, path: &str, query: &Query, base: Base) -> Result<Value, ApiError> {
        let url = self.prepare_url(path, query, base);
        trace!(%url, "GET");
        let response = self
            .transport
            .execute(HttpRequest {
                method: HttpMethod::Get,
                url,
                headers: vec![("Accept".to_string(), JSONAPI_MIME.to_string())],
                body: None,
            })
            .await?;
        decode(response)
    }

    /// Issue a POST with the given body and decode the response body.
    pub async fn post(
        &self,
        path: &str,
        query: &Query,
        body: String,
        base: Base,
    ) -> Result<Value, ApiError> {
        let url = self.prepare_url(path, query, base);
        trace!(%url, "POST");
        let response = self
            .transport
            .execute(HttpRequest {
                method: HttpMethod::Post,
                url,
                headers: vec![
                    ("Accept".to_string(), JSONAPI_MIME.to_string()),
                    ("Content-Type".to_string(), "application/json".to_string()),
                ],
                body: Some(body),
            })
            .await?;
        decode(response)
    }
}

/// Map non-2xx statuses to `ApiError::Http`; pass 2xx bodies through the
/// JSON:API decode step. A body that fails to decode comes back unchanged — a
/// non-JSON body as a plain JSON string — so callers can still inspect it.
fn decode(response: HttpResponse) -> Result<Value, ApiError> {
    if !(200..300).contains(&response.status) {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    let raw = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) => Value::String(response.body),
    };
    Ok(jsonapi::decode_response(raw))
}
