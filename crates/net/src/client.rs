//! HTTP client with connection pooling
//!
//! Requests are issued exactly once. Retrying is a caller decision, made from
//! `UserFacingError::is_retryable` on the typed failure.

use curie_errors::{Error, NetworkError};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large assets
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("curie/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Shared HTTP client wrapper
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct NetClient {
    client: Client,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: &NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ClientInit(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(&NetConfig::default())
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request cannot be sent or no response
    /// headers arrive. HTTP error statuses are not errors at this level.
    pub async fn get(&self, url: &Url) -> Result<Response, Error> {
        send(self.client.get(url.clone())).await
    }

    /// Execute a POST request with the given headers and an empty body
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request cannot be sent or no response
    /// headers arrive.
    pub async fn post(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Response, Error> {
        let mut request = self.client.post(url.clone());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        send(request).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, Error> {
    request
        .send()
        .await
        .map_err(|e| map_transport_error(e).into())
}

/// Classify a reqwest failure into the transport variants
///
/// The URL is stripped from the message; only its redacted form is kept.
pub(crate) fn map_transport_error(error: reqwest::Error) -> NetworkError {
    let url = error.url().map(redact).unwrap_or_default();
    let error = error.without_url();
    if error.is_timeout() {
        NetworkError::Timeout { url }
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(error.to_string())
    } else {
        NetworkError::Transport {
            message: error.to_string(),
        }
    }
}

/// Render a URL without its query string, which may carry signatures
#[must_use]
pub fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_strips_query() {
        let url = Url::parse("https://cdn.example.com/a.usdz?X-Amz-Signature=abc#frag").unwrap();
        assert_eq!(redact(&url), "https://cdn.example.com/a.usdz");
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(NetClient::with_defaults().is_ok());
    }
}
