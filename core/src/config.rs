//! Client configuration.
//!
//! Base addresses are passed in explicitly; the client itself never reads the
//! process environment, so tests can run multiple independently-configured
//! clients side by side. `from_env` exists as an opt-in convenience for
//! binaries that do want environment-driven configuration.

/// Base addresses for the two URL roots a query can target.
///
/// `api_base` is the JSON:API root (typically `<server>/api`); `server_base`
/// is the bare server root used by the path-translation and sub-request
/// batching endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_base: String,
    server_base: String,
}

impl ClientConfig {
    pub fn new(api_base: &str, server_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            server_base: server_base.trim_end_matches('/').to_string(),
        }
    }

    /// Read `SERVER_API_URL` and `SERVER_BASE_URL`. Returns `None` when
    /// either variable is unset.
    pub fn from_env() -> Option<Self> {
        let api = std::env::var("SERVER_API_URL").ok()?;
        let server = std::env::var("SERVER_BASE_URL").ok()?;
        Some(Self::new(&api, &server))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn server_base(&self) -> &str {
        &self.server_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = ClientConfig::new("http://localhost:3000/api/", "http://localhost:3000/");
        assert_eq!(config.api_base(), "http://localhost:3000/api");
        assert_eq!(config.server_base(), "http://localhost:3000");
    }
}
