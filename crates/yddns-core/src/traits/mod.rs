//! Core traits for the refresh engine
//!
//! This module defines the abstract interfaces the engine is wired through.
//!
//! - [`Cache`]: Result cache with created/modified expiry
//! - [`HttpTransport`]: Network access for WAN lookups and refresh requests

pub mod cache;
pub mod http_transport;

pub use cache::{Cache, CacheItem, CacheSettings, Expiry, hashed_key};
pub use http_transport::{Auth, HttpRequest, HttpResponse, HttpTransport};
