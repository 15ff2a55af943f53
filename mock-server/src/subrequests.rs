//! The sub-request batching endpoint.
//!
//! Accepts an ordered list of descriptors, executes them against the store's
//! own routes honoring `waitFor` ordering, substitutes
//! `{{<requestId>.body@$.<path>}}` placeholders with values extracted from
//! completed responses, and returns the composed responses keyed by request
//! id.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::store::{has_collection, parse_list_query, Store};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequestWire {
    pub request_id: String,
    #[serde(default)]
    pub action: String,
    pub uri: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub wait_for: Vec<String>,
}

pub async fn handle(
    State(store): State<Arc<Store>>,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    let batch: Vec<SubRequestWire> =
        serde_json::from_str(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    let mut completed = Map::new();
    for request in batch {
        for dependency in &request.wait_for {
            if !completed.contains_key(dependency) {
                return Err(StatusCode::BAD_REQUEST);
            }
        }
        let response = match substitute(&request.uri, &completed) {
            Some(uri) => dispatch(&store, &uri)
                .unwrap_or_else(|| json!({ "errors": [{ "status": "404", "detail": uri }] })),
            None => json!({ "errors": [{ "status": "400", "detail": "unresolved placeholder" }] }),
        };
        completed.insert(request.request_id, response);
    }
    Ok(Json(Value::Object(completed)))
}

/// Replace every `{{id.body@$.path}}` token with the value found at `path`
/// in the completed response of `id`. `None` on unknown ids or paths.
fn substitute(uri: &str, completed: &Map<String, Value>) -> Option<String> {
    let mut out = String::new();
    let mut rest = uri;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}")?;
        let token = &after[..end];
        let (request_id, pointer) = token.split_once(".body@$.")?;
        let mut value = completed.get(request_id)?;
        for segment in pointer.split('.') {
            value = value.get(segment)?;
        }
        match value {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Some(out)
}

/// Route a substituted sub-request URI against the store.
fn dispatch(store: &Store, uri: &str) -> Option<Value> {
    let (path, raw_query) = uri.split_once('?').unwrap_or((uri, ""));
    let query = parse_list_query(raw_query);

    if path == "/router/translate-path" {
        return store.translate(query.params.get("path")?);
    }
    let rest = path.strip_prefix("/api/")?;
    match rest.split_once('/') {
        Some((collection, id)) => store.get_one(collection, id, &query),
        None => has_collection(rest).then(|| store.list(rest, &query)),
    }
}
