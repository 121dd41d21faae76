// # yddns-core
//
// Refresh engine of the yddns dynamic DNS client.
//
// ## Architecture Overview
//
// - **Cache**: File-backed result cache with created/modified expiry
// - **WanIpResolver**: Cycle-scoped public address discovery
// - **Template resolution**: Merges `:name` templates into domains, fills defaults
// - **UrlBuilder**: Placeholder substitution into refresh URL patterns
// - **RefreshEngine**: Orchestrates resolve → URL build → cache check → send → cache update
// - **HttpTransport**: The only path to the network, implemented elsewhere
//
// ## Design Principles
//
// 1. **Library-First**: CLI, config-file discovery and scheduling live in the
//    `yddns` binary; this crate only consumes resolved values
// 2. **Explicit context**: Templates, version and cache settings are passed in,
//    there is no process-wide mutable state
// 3. **Errors as values**: Every failure is returned, nothing aborts

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod template;
pub mod traits;
pub mod url;
pub mod wan_ip;

// Re-export core types for convenience
pub use cache::{FileCache, MemoryCache};
pub use config::{CacheConfig, Domain, Template, YddnsConfig};
pub use engine::{DomainReport, RefreshEngine, RefreshOutcome, RefreshSettings};
pub use error::{Error, Result};
pub use template::{prepare_domain, prepare_domains};
pub use traits::{Cache, CacheItem, CacheSettings, Expiry, HttpTransport};
pub use url::UrlBuilder;
pub use wan_ip::WanIpResolver;
