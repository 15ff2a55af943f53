//! Mock JSON:API content backend.
//!
//! Serves a seeded set of recipes, articles, categories and their image/file/
//! content-type resources under `/api`, plus the two server-root endpoints
//! the client relies on: `GET /router/translate-path` for alias resolution
//! and `POST /subrequests` for dependency-ordered batches with placeholder
//! substitution. Wire shapes are defined independently of the core crate;
//! integration tests catch schema drift.

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use uuid::Uuid;

pub mod store;
mod subrequests;

use store::{has_collection, parse_list_query, Store};

pub fn app() -> Router {
    let store = Arc::new(Store::seed());
    Router::new()
        .route("/api/{collection}", get(list_collection))
        .route("/api/{collection}/{id}", get(get_resource))
        .route("/router/translate-path", get(translate_path))
        .route("/subrequests", post(subrequests::handle))
        .with_state(store)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_collection(
    State(store): State<Arc<Store>>,
    Path(collection): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    if !has_collection(&collection) {
        return Err(StatusCode::NOT_FOUND);
    }
    let query = parse_list_query(raw.as_deref().unwrap_or(""));
    Ok(Json(store.list(&collection, &query)))
}

async fn get_resource(
    State(store): State<Arc<Store>>,
    Path((collection, id)): Path<(String, Uuid)>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    let query = parse_list_query(raw.as_deref().unwrap_or(""));
    store
        .get_one(&collection, &id.to_string(), &query)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn translate_path(
    State(store): State<Arc<Store>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    let query = parse_list_query(raw.as_deref().unwrap_or(""));
    let alias = query.params.get("path").ok_or(StatusCode::BAD_REQUEST)?;
    store.translate(alias).map(Json).ok_or(StatusCode::NOT_FOUND)
}
