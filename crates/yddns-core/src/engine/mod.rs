//! Refresh engine
//!
//! The RefreshEngine is responsible for:
//! - Resolving each domain against its template
//! - Skipping domains whose configuration was refreshed recently
//! - Building the refresh URL and sending the request
//! - Recording the outcome in the cache
//!
//! ## Architecture
//!
//! ```text
//!                            ┌───────────────┐
//!         Domain ──────────▶ │ RefreshEngine │ ──────────▶ outcome / error
//!                            └───────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//! ┌──────────────┐          ┌───────────────┐          ┌───────────────┐
//! │    Cache     │          │  UrlBuilder   │          │ HttpTransport │
//! │ (skip check) │          │ + WAN lookups │          │   (refresh)   │
//! └──────────────┘          └───────────────┘          └───────────────┘
//! ```
//!
//! ## Per-domain flow
//!
//! 1. Resolve the domain (template merge + defaults)
//! 2. Build the refresh URL (WAN lookups happen here)
//! 3. Fingerprint configuration plus URL and look it up in the cache
//! 4. Valid item: store it again (the skip window slides) and report `Skipped`
//! 5. Otherwise send the request and interpret the response
//! 6. Store the item (failures only when `cache_failures` is set)
//!
//! The built URL is part of the fingerprint, so a changed WAN address is
//! sent on the next cycle even inside the skip window.
//!
//! Domains are processed one at a time, in order. A failing domain never
//! stops the cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::{AUTH_METHOD_BASIC, AUTH_METHOD_BEARER, Domain, Template};
use crate::error::{Error, Result};
use crate::template::prepare_domain;
use crate::traits::{Auth, Cache, CacheItem, HttpRequest, HttpResponse, HttpTransport, hashed_key};
use crate::url::UrlBuilder;
use crate::wan_ip::WanIpResolver;

/// Outcome text of a skipped refresh
pub const SKIPPED_MESSAGE: &str = "skipped refresh - configuration not changed";

/// Highest status code treated as success
const MAX_SUCCESS_STATUS: u16 = 204;

/// Engine-wide settings
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Version stamped into the default user agent
    pub app_version: String,

    /// Templates referenced by `:name`
    pub templates: HashMap<String, Template>,

    /// Whether failed refreshes are cached too.
    ///
    /// When set, a failing configuration is retried only after its
    /// modified-expiry window; when unset it is retried every cycle.
    pub cache_failures: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            app_version: String::new(),
            templates: HashMap::new(),
            cache_failures: true,
        }
    }
}

/// Successful result of refreshing one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The provider accepted the request
    Refreshed {
        /// Trimmed response body
        response: String,
    },
    /// Configuration unchanged within the skip window; nothing was sent
    Skipped,
}

impl RefreshOutcome {
    /// Human-readable outcome text
    pub fn message(&self) -> &str {
        match self {
            RefreshOutcome::Refreshed { response } => response,
            RefreshOutcome::Skipped => SKIPPED_MESSAGE,
        }
    }
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one domain within a cycle
#[derive(Debug)]
pub struct DomainReport {
    /// Domain name (or refresh URL when the name is empty)
    pub domain: String,
    /// Outcome or failure
    pub result: Result<RefreshOutcome>,
}

impl DomainReport {
    /// Whether the domain was refreshed or skipped without error
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Cache key of a resolved domain and its built URL: SHA-256 of their JSON form
pub fn fingerprint(domain: &Domain, url: &str) -> Result<String> {
    let canonical = serde_json::to_string(&json!({ "domain": domain, "url": url }))?;
    Ok(hashed_key(&canonical))
}

/// Core refresh engine
///
/// ## Lifecycle
///
/// 1. Create with [`RefreshEngine::new()`]
/// 2. Call [`RefreshEngine::run_cycle()`] once per tick
///
/// Scheduling and shutdown belong to the caller.
pub struct RefreshEngine {
    /// Network access for refresh requests
    transport: Arc<dyn HttpTransport>,

    /// Result cache
    cache: Box<dyn Cache>,

    /// Cycle-scoped WAN lookups
    wan: WanIpResolver,

    /// Templates, version, failure policy
    settings: RefreshSettings,
}

impl RefreshEngine {
    /// Create a new engine using the default WAN echo endpoints
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Box<dyn Cache>,
        settings: RefreshSettings,
    ) -> Self {
        let wan = WanIpResolver::new(transport.clone());
        Self {
            transport,
            cache,
            wan,
            settings,
        }
    }

    /// Replace the WAN resolver (custom echo endpoints)
    pub fn with_wan_resolver(mut self, wan: WanIpResolver) -> Self {
        self.wan = wan;
        self
    }

    /// Engine settings
    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    /// The cycle-scoped WAN resolver
    pub fn wan_resolver(&self) -> &WanIpResolver {
        &self.wan
    }

    /// Run one refresh cycle over `domains`, in order.
    ///
    /// Clears the WAN memo, sweeps expired cache items and reports one
    /// result per domain.
    pub async fn run_cycle(&self, domains: &[Domain]) -> Vec<DomainReport> {
        self.wan.clear().await;

        if let Err(e) = self.cache.delete_expired().await {
            warn!("Cache sweep failed: {}", e);
        }

        let mut reports = Vec::with_capacity(domains.len());
        for domain in domains {
            let mut resolved = domain.clone();
            let result = match prepare_domain(
                &mut resolved,
                &self.settings.templates,
                &self.settings.app_version,
            ) {
                Ok(()) => self.refresh(&resolved).await,
                Err(e) => Err(e),
            };

            let name = resolved.display_name().to_string();
            match &result {
                Ok(outcome) => info!("{}: {}", name, outcome),
                Err(e) => error!("{}: {}", name, e),
            }

            reports.push(DomainReport {
                domain: name,
                result,
            });
        }

        reports
    }

    /// Refresh one resolved domain, honouring the cache.
    ///
    /// Cache failures are logged and never prevent the provider request.
    pub async fn refresh(&self, domain: &Domain) -> Result<RefreshOutcome> {
        let url = self.build_url(domain).await?;
        let key = fingerprint(domain, &url)?;

        let mut item = match self.cache.get(&key).await {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", domain.display_name(), e);
                None
            }
        };

        if let Some(item) = item.as_mut()
            && self.cache.is_valid(item)
        {
            debug!("{} unchanged, skipping refresh", domain.display_name());
            self.store(domain, item).await;
            return Ok(RefreshOutcome::Skipped);
        }

        let result = self.send(domain, url).await;

        if let Some(mut item) = item {
            if result.is_ok() || self.settings.cache_failures {
                item.value = Some(outcome_value(&result));
                self.store(domain, &mut item).await;
            } else {
                debug!("Not caching failed refresh of {}", domain.display_name());
            }
        }

        result
    }

    /// Build and send the refresh request, bypassing the cache
    pub async fn refresh_uncached(&self, domain: &Domain) -> Result<RefreshOutcome> {
        let url = self.build_url(domain).await?;
        self.send(domain, url).await
    }

    async fn build_url(&self, domain: &Domain) -> Result<String> {
        UrlBuilder::new(&self.wan).build_refresh_url(domain).await
    }

    async fn send(&self, domain: &Domain, url: String) -> Result<RefreshOutcome> {
        let request = build_request(domain, url);

        // The built URL may carry credentials; log the pattern only
        debug!(
            "{} {} for {}",
            request.method,
            domain.template.refresh_url,
            domain.display_name()
        );
        let response = self.transport.execute(&request).await?;

        interpret_response(response)
    }

    async fn store(&self, domain: &Domain, item: &mut CacheItem) {
        if let Err(e) = self.cache.set(item).await {
            warn!("Cache update failed for {}: {}", domain.display_name(), e);
        }
    }
}

/// Assemble the HTTP request for a resolved domain
pub fn build_request(domain: &Domain, url: String) -> HttpRequest {
    let auth_method = &domain.template.auth_method;

    let auth = if auth_method.eq_ignore_ascii_case(AUTH_METHOD_BASIC)
        && !domain.username.is_empty()
        && !domain.password.is_empty()
    {
        Some(Auth::Basic {
            username: domain.username.clone(),
            password: domain.password.clone(),
        })
    } else if auth_method.eq_ignore_ascii_case(AUTH_METHOD_BEARER) && !domain.password.is_empty() {
        Some(Auth::Bearer(domain.password.clone()))
    } else {
        None
    };

    HttpRequest {
        method: domain.template.request_method.to_ascii_uppercase(),
        url,
        auth,
        user_agent: domain.template.user_agent.clone(),
    }
}

/// Map a provider response to an outcome
pub fn interpret_response(response: HttpResponse) -> Result<RefreshOutcome> {
    let body = response.body.trim();

    if response.status <= MAX_SUCCESS_STATUS {
        return Ok(RefreshOutcome::Refreshed {
            response: body.to_string(),
        });
    }

    if body.is_empty() {
        Err(Error::rejected(response.status_line))
    } else {
        Err(Error::rejected(body))
    }
}

fn outcome_value(result: &Result<RefreshOutcome>) -> serde_json::Value {
    match result {
        Ok(outcome) => json!({ "status": "refreshed", "message": outcome.message() }),
        Err(e) => json!({ "status": "failed", "message": e.to_string() }),
    }
}
