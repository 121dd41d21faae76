//! Configuration types for the refresh engine
//!
//! This module defines the domain and template records the engine consumes,
//! plus the file-level [`YddnsConfig`] the CLI decodes. Decoding itself
//! (search paths, TOML/JSON) lives in the `yddns` binary; the core only sees
//! already-deserialized values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::cache::{CREATED_EXPIRY_SECS_DEFAULT, CacheSettings, Expiry, MODIFIED_EXPIRY_SECS_DEFAULT};
use crate::engine::RefreshSettings;
use crate::wan_ip::{IDENT_URL_IPV4, IDENT_URL_IPV6};

/// Product name used in the default user agent
pub const APP_NAME: &str = "yddns";

/// Version reported when the caller supplies none
pub const DEFAULT_APP_VERSION: &str = "dev";

pub const AUTH_METHOD_BASIC: &str = "basic";
pub const AUTH_METHOD_BEARER: &str = "bearer";

pub const PROTOCOL_HTTP: &str = "http";
pub const PROTOCOL_HTTPS: &str = "https";

pub const REQUEST_METHOD_GET: &str = "GET";
pub const REQUEST_METHOD_POST: &str = "POST";

pub const DEFAULT_AUTH_METHOD: &str = AUTH_METHOD_BASIC;
pub const DEFAULT_PROTOCOL: &str = PROTOCOL_HTTPS;
pub const DEFAULT_REQUEST_METHOD: &str = REQUEST_METHOD_GET;

/// Default interval between refresh cycles (in seconds)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 600;

/// A `refresh_url` starting with this prefix names a template
pub const TEMPLATE_PREFIX: &str = ":";

pub const SUPPORTED_AUTH_METHODS: &[&str] = &[AUTH_METHOD_BASIC, AUTH_METHOD_BEARER];
pub const SUPPORTED_PROTOCOLS: &[&str] = &[PROTOCOL_HTTP, PROTOCOL_HTTPS];
pub const SUPPORTED_REQUEST_METHODS: &[&str] = &[REQUEST_METHOD_GET, REQUEST_METHOD_POST];

/// Build the `<product>/<version>` user agent
pub fn default_user_agent(app_version: &str) -> String {
    let version = if app_version.is_empty() {
        DEFAULT_APP_VERSION
    } else {
        app_version
    };
    format!("{}/{}", APP_NAME, version)
}

/// Reusable request shape of a DNS provider
///
/// Every attribute is optional in configuration; an empty string means
/// "not set" and is filled by template merging or defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    /// Authentication scheme (`basic` or `bearer`)
    pub auth_method: String,
    /// Provider host, substituted for `<host>`
    pub host: String,
    /// URL scheme, substituted for `<protocol>`
    pub protocol: String,
    /// URL pattern with placeholders, or `:name` to reference a template
    pub refresh_url: String,
    /// HTTP method of the refresh request
    pub request_method: String,
    /// User-Agent header value
    pub user_agent: String,
}

/// One managed DNS record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domain {
    /// Request shape, either inline or a `:name` reference in `refresh_url`
    #[serde(flatten)]
    pub template: Template,
    pub username: String,
    pub password: String,
    /// DNS name of the record, substituted for `<domain>`
    #[serde(rename = "domain")]
    pub domain_name: String,
    /// Static IPv4 address; skips the WAN lookup when set
    pub ip4_address: String,
    /// Static IPv6 address; skips the WAN lookup when set
    pub ip6_address: String,
    /// Interface identifier spliced onto the discovered /64 prefix
    pub ip6_host_id: String,
}

impl Domain {
    /// Create a domain with an inline refresh URL pattern
    pub fn new(domain_name: impl Into<String>, refresh_url: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            template: Template {
                refresh_url: refresh_url.into(),
                ..Template::default()
            },
            ..Self::default()
        }
    }

    /// Set the credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the authentication method
    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.template.auth_method = auth_method.into();
        self
    }

    /// Name used in log lines: the domain name, else the refresh URL
    pub fn display_name(&self) -> &str {
        if self.domain_name.is_empty() {
            &self.template.refresh_url
        } else {
            &self.domain_name
        }
    }

    /// Whether `refresh_url` references a named template
    pub fn requires_template(&self) -> bool {
        self.template.refresh_url.starts_with(TEMPLATE_PREFIX)
    }

    /// Name of the referenced template, if any
    pub fn template_name(&self) -> Option<&str> {
        self.template.refresh_url.strip_prefix(TEMPLATE_PREFIX)
    }

    /// Merge a template into this domain.
    ///
    /// Non-empty domain values win, except `refresh_url`: the domain's value
    /// is only ever a reference, so the template's pattern always replaces it.
    pub fn merge_template(&mut self, template: &Template) {
        let own = &mut self.template;

        own.refresh_url.clear();
        merge_field(&mut own.auth_method, &template.auth_method);
        merge_field(&mut own.host, &template.host);
        merge_field(&mut own.protocol, &template.protocol);
        merge_field(&mut own.refresh_url, &template.refresh_url);
        merge_field(&mut own.request_method, &template.request_method);
        merge_field(&mut own.user_agent, &template.user_agent);
    }

    /// Fill still-empty request attributes with global defaults
    pub fn init_default_values(&mut self, app_version: &str) {
        let own = &mut self.template;

        merge_field(&mut own.auth_method, DEFAULT_AUTH_METHOD);
        merge_field(&mut own.protocol, DEFAULT_PROTOCOL);
        merge_field(&mut own.request_method, DEFAULT_REQUEST_METHOD);
        if own.user_agent.is_empty() {
            own.user_agent = default_user_agent(app_version);
        }
    }
}

fn merge_field(own: &mut String, fallback: &str) {
    if own.is_empty() && !fallback.is_empty() {
        *own = fallback.to_string();
    }
}

/// Configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YddnsConfig {
    /// Seconds between refresh cycles
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Domains to refresh, in order
    #[serde(default)]
    pub domains: Vec<Domain>,

    /// Named templates referenced by `:name`
    #[serde(default)]
    pub templates: HashMap<String, Template>,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// IPv4 address echo endpoint
    #[serde(default = "default_wan_ip4_url")]
    pub wan_ip4_url: String,

    /// IPv6 address echo endpoint
    #[serde(default = "default_wan_ip6_url")]
    pub wan_ip6_url: String,
}

impl YddnsConfig {
    /// Create an empty configuration with defaults
    pub fn new() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            domains: Vec::new(),
            templates: HashMap::new(),
            cache: CacheConfig::default(),
            wan_ip4_url: default_wan_ip4_url(),
            wan_ip6_url: default_wan_ip6_url(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domains.is_empty() {
            return Err(crate::Error::config("No domains configured"));
        }

        if self.refresh_interval == 0 {
            return Err(crate::Error::config("refresh_interval must be > 0"));
        }

        for (index, domain) in self.domains.iter().enumerate() {
            if domain.template.refresh_url.is_empty() {
                return Err(crate::Error::config(format!(
                    "domain #{} ({}) has no refresh_url",
                    index + 1,
                    domain.domain_name
                )));
            }
            validate_template(&domain.template)
                .map_err(|e| crate::Error::config(format!("domain #{}: {}", index + 1, e)))?;
        }

        for (name, template) in &self.templates {
            validate_template(template)
                .map_err(|e| crate::Error::config(format!("template \"{}\": {}", name, e)))?;
        }

        if self.wan_ip4_url.is_empty() || self.wan_ip6_url.is_empty() {
            return Err(crate::Error::config("WAN IP endpoints cannot be empty"));
        }

        Ok(())
    }

    /// Engine settings derived from this configuration
    pub fn refresh_settings(&self, app_version: impl Into<String>) -> RefreshSettings {
        RefreshSettings {
            app_version: app_version.into(),
            templates: self.templates.clone(),
            cache_failures: self.cache.cache_failures,
        }
    }
}

impl Default for YddnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_template(template: &Template) -> Result<(), String> {
    check_supported("auth_method", &template.auth_method, SUPPORTED_AUTH_METHODS)?;
    check_supported("protocol", &template.protocol, SUPPORTED_PROTOCOLS)?;
    check_supported("request_method", &template.request_method, SUPPORTED_REQUEST_METHODS)
}

fn check_supported(field: &str, value: &str, supported: &[&str]) -> Result<(), String> {
    if value.is_empty() || supported.iter().any(|s| s.eq_ignore_ascii_case(value)) {
        return Ok(());
    }
    Err(format!(
        "unsupported {} \"{}\" (supported: {})",
        field,
        value,
        supported.join(", ")
    ))
}

/// Cache section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory; the CLI picks a platform cache dir when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Item lifetime since creation, seconds (`-1` = never)
    #[serde(default = "default_created_expiry")]
    pub created_expiry: Expiry,

    /// Skip window since last modification, seconds (`-1` = never)
    #[serde(default = "default_modified_expiry")]
    pub modified_expiry: Expiry,

    /// Keep items on disk across runs
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Also cache failed refreshes, throttling retries to the skip window
    #[serde(default = "default_true")]
    pub cache_failures: bool,
}

impl CacheConfig {
    /// Resolve into cache settings rooted at `dir` unless one is configured
    pub fn settings(&self, default_dir: impl Into<PathBuf>) -> CacheSettings {
        let dir = self.dir.clone().unwrap_or_else(|| default_dir.into());
        CacheSettings::new(dir, self.created_expiry, self.modified_expiry)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            created_expiry: default_created_expiry(),
            modified_expiry: default_modified_expiry(),
            persist: true,
            cache_failures: true,
        }
    }
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_created_expiry() -> Expiry {
    Expiry::Seconds(CREATED_EXPIRY_SECS_DEFAULT)
}

fn default_modified_expiry() -> Expiry {
    Expiry::Seconds(MODIFIED_EXPIRY_SECS_DEFAULT)
}

fn default_wan_ip4_url() -> String {
    IDENT_URL_IPV4.to_string()
}

fn default_wan_ip6_url() -> String {
    IDENT_URL_IPV6.to_string()
}

fn default_true() -> bool {
    true
}
