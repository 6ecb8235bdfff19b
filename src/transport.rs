//! HTTP transport abstraction for the remote rules-list API.
//!
//! A trait-based seam so the Cloudflare client can be unit tested without
//! network access. The real implementation uses `reqwest`; retry policy, if
//! any, belongs here rather than in the rules-list client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::error::Error;

const TIMEOUT_SECS: u64 = 15;
const MAX_REDIRECTS: usize = 3;

/// Response from an HTTP exchange
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

/// Trait for HTTP exchanges, allowing dependency injection for testing.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one HTTP exchange.
    ///
    /// # Arguments
    /// * `method` - HTTP method name ("GET", "POST", "PUT", "DELETE")
    /// * `url` - Absolute URL including any query string
    /// * `headers` - Header name/value pairs
    /// * `body` - Optional request body
    ///
    /// Fails with a transport error on network failure or a non-2xx HTTP
    /// status; callers only ever see successful responses.
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<String>,
    ) -> Result<HttpResponse, Error>;
}

/// Real implementation of HttpTransport backed by reqwest.
pub struct ReqwestTransport {
    client: Client,
}

/// Reject anything outside the 2xx range.
fn check_status(status: u16) -> Result<(), Error> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(Error::Remote(format!(
            "HTTP request failed with status: {}",
            status
        )))
    }
}

impl ReqwestTransport {
    /// Create a transport with default timeout and redirect settings.
    pub fn new() -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(format!("allowgate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Remote(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<String>,
    ) -> Result<HttpResponse, Error> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::Remote(format!("invalid HTTP method: {}", method)))?;

        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Remote(format!("transport failure: {}", e)))?;

        let status = response.status().as_u16();
        check_status(status)?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::Remote(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}
