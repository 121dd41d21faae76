//! WAN IP discovery
//!
//! Asks an external echo service for the caller's public address, once per
//! address family per refresh cycle. The engine calls [`WanIpResolver::clear`]
//! at the start of every cycle so address changes between cycles are seen.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::HttpTransport;

/// IPv4 echo endpoint
pub const IDENT_URL_IPV4: &str = "https://v4.ident.me";

/// IPv6 echo endpoint
pub const IDENT_URL_IPV6: &str = "https://v6.ident.me";

/// Cycle-scoped WAN address lookup
pub struct WanIpResolver {
    transport: Arc<dyn HttpTransport>,
    ip4_url: String,
    ip6_url: String,
    wan_ip4: Mutex<Option<String>>,
    wan_ip6: Mutex<Option<String>>,
}

impl WanIpResolver {
    /// Create a resolver using the default echo endpoints
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_endpoints(transport, IDENT_URL_IPV4, IDENT_URL_IPV6)
    }

    /// Create a resolver using custom echo endpoints
    pub fn with_endpoints(
        transport: Arc<dyn HttpTransport>,
        ip4_url: impl Into<String>,
        ip6_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            ip4_url: ip4_url.into(),
            ip6_url: ip6_url.into(),
            wan_ip4: Mutex::new(None),
            wan_ip6: Mutex::new(None),
        }
    }

    /// Public IPv4 address, fetched at most once per cycle
    pub async fn determine_wan_ip4(&self) -> Result<String> {
        Self::determine(&self.wan_ip4, self.transport.as_ref(), &self.ip4_url).await
    }

    /// Public IPv6 address, fetched at most once per cycle
    pub async fn determine_wan_ip6(&self) -> Result<String> {
        Self::determine(&self.wan_ip6, self.transport.as_ref(), &self.ip6_url).await
    }

    /// Forget both memoized addresses
    pub async fn clear(&self) {
        *self.wan_ip4.lock().await = None;
        *self.wan_ip6.lock().await = None;
    }

    async fn determine(
        memo: &Mutex<Option<String>>,
        transport: &dyn HttpTransport,
        url: &str,
    ) -> Result<String> {
        let mut guard = memo.lock().await;
        if let Some(ip) = guard.as_ref() {
            return Ok(ip.clone());
        }

        // The status code is not inspected: the echo body is the address.
        let response = transport
            .get(url)
            .await
            .map_err(|e| Error::wan_ip(format!("{}: {}", url, e)))?;

        let ip = response.body.trim().to_string();
        debug!("WAN address from {}: {}", url, ip);

        *guard = Some(ip.clone());
        Ok(ip)
    }
}
