//! Error types for the JSON:API client.
//!
//! # Design
//! HTTP-level failures keep the raw status and body so callers can inspect
//! what the server actually said; nothing at this layer retries, logs, or
//! translates errors for presentation. Malformed response *bodies* are not an
//! error at all — they degrade to the raw payload in the decode step.

/// Errors returned by `JsonApiClient` and the content facade.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (connection, DNS, TLS, ...).
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    /// A request payload could not be serialized to JSON.
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A sub-request batch failed validation before submission.
    #[error("sub-request batch: {0}")]
    Batch(String),
}
