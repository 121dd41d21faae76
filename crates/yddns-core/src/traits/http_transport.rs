// # HTTP Transport Trait
//
// Defines the seam between the refresh engine and the network.
//
// ## Implementations
//
// - reqwest: `yddns-http` crate
// - Test doubles: `tests/common` in this crate
//
// ## Usage
//
// ```rust,ignore
// use yddns_core::traits::{HttpRequest, HttpTransport};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let transport = /* HttpTransport implementation */;
//
//     // Plain GET, body returned as text
//     let response = transport.get("https://v4.ident.me").await?;
//     println!("{} -> {}", response.status_line, response.body);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Authentication attached to a refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP Basic authentication
    Basic {
        /// User name
        username: String,
        /// Password
        password: String,
    },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

/// A fully built refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method as configured (`GET`, `POST`, ...)
    pub method: String,
    /// Target URL with every placeholder substituted
    pub url: String,
    /// Optional authentication
    pub auth: Option<Auth>,
    /// User-Agent header value
    pub user_agent: String,
}

/// A response with its body already read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Numeric status code
    pub status: u16,
    /// Status line such as `500 Internal Server Error`
    pub status_line: String,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Create a response; the status line is the bare code
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_line: status.to_string(),
            body: body.into(),
        }
    }

    /// Override the status line
    pub fn with_status_line(mut self, status_line: impl Into<String>) -> Self {
        self.status_line = status_line.into();
        self
    }
}

/// Trait for HTTP transport implementations
///
/// Transports execute exactly one request per call and report the response
/// as-is; they never retry, never interpret status codes and never cache.
/// A transport error means no response was obtained at all.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a plain GET request
    ///
    /// # Returns
    ///
    /// - `Ok(HttpResponse)`: Any response, regardless of status
    /// - `Err(Error::Http)`: Connection, TLS or body-read failure
    async fn get(&self, url: &str) -> Result<HttpResponse, crate::Error>;

    /// Execute a refresh request
    ///
    /// # Returns
    ///
    /// - `Ok(HttpResponse)`: Any response, regardless of status
    /// - `Err(Error::Http)`: Connection, TLS or body-read failure
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, crate::Error>;
}
