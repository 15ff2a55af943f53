//! Client-side data-access layer for a JSON:API content backend.
//!
//! # Overview
//! Translates named content queries (recipes, categories, promoted content,
//! alias lookup) into JSON:API requests and normalizes every response
//! envelope into plain nested objects for presentation code.
//!
//! # Design
//! - [`Query`] is an immutable, declaratively-built specification serialized
//!   with the JSON:API bracketed-parameter convention.
//! - [`JsonApiClient`] is the sole request/response translation point; it is
//!   configured explicitly via [`ClientConfig`] and does I/O through the
//!   pluggable [`Transport`] seam, so tests script transports in memory.
//! - [`ContentApi`] exposes one async operation per content need, including
//!   the concurrent two-source home merge and single-round-trip alias
//!   resolution over the sub-request batching endpoint.

pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod jsonapi;
pub mod query;
pub mod subrequest;

pub use client::{Base, JsonApiClient};
pub use config::ClientConfig;
pub use content::ContentApi;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use query::{Filter, Query, QueryValue};
pub use subrequest::{ResponseRef, SubRequest, SubRequestBatch};
