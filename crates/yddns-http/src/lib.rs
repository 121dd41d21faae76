// # HTTP Transport
//
// This crate provides the production HttpTransport for the yddns refresh
// engine, built on reqwest.
//
// ## Responsibilities
//
// - WAN echo lookups (plain GET, body returned as text)
// - Refresh requests with method, authentication and User-Agent
//
// ## Non-responsibilities
//
// Status codes are reported, never interpreted. There are no retries; the
// refresh interval is the retry policy.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::USER_AGENT;
use yddns_core::traits::{Auth, HttpRequest, HttpResponse, HttpTransport};
use yddns_core::{Error, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        tracing::trace!("Response {} ({} bytes)", status, body.len());
        Ok(HttpResponse::new(status.as_u16(), body).with_status_line(status.to_string()))
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        Self::read(response).await
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::http(format!("Invalid request method: {}", request.method)))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(USER_AGENT, &request.user_agent);

        builder = match &request.auth {
            Some(Auth::Basic { username, password }) => builder.basic_auth(username, Some(password)),
            Some(Auth::Bearer(token)) => builder.bearer_auth(token),
            None => builder,
        };

        // The URL may carry credentials, so it stays out of error messages
        let response = builder
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e.without_url())))?;

        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new().is_ok());
        assert!(ReqwestTransport::with_timeout(Duration::from_millis(500)).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_method_is_rejected() {
        let transport = ReqwestTransport::new().unwrap();
        let request = HttpRequest {
            method: "NOT A METHOD".to_string(),
            url: "http://127.0.0.1:9/".to_string(),
            auth: None,
            user_agent: "yddns/test".to_string(),
        };

        let err = transport.execute(&request).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
