// # Cache Trait
//
// Defines the interface of the refresh result cache.
//
// ## Purpose
//
// The cache keeps the engine from re-sending an unchanged configuration on
// every periodic tick. Items are keyed by the fingerprint of a resolved
// domain and carry two independent expiry windows:
//
// - **created-expiry**: total lifetime since creation; enforced by the
//   `delete_expired()` sweep.
// - **modified-expiry**: how long after the last `set()` the item counts as
//   valid; checked by `is_valid()`.
//
// Each window is set per item or falls back to the cache-wide default.
//
// ## Implementations
//
// - File-based: one JSON document per key (`FileCache`)
// - In-memory: `MemoryCache`

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Default item lifetime since creation (one day)
pub const CREATED_EXPIRY_SECS_DEFAULT: u64 = 86_400;

/// Default skip window since last modification (ten minutes)
pub const MODIFIED_EXPIRY_SECS_DEFAULT: u64 = 600;

const EXPIRY_INDEFINITE: i64 = -1;
const EXPIRY_USE_GLOBAL: i64 = -2;

/// An expiry window
///
/// Persisted as an integer number of seconds with two sentinels:
/// `-1` for [`Expiry::Never`] and `-2` for [`Expiry::Global`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Expiry {
    /// Use the cache-wide default
    Global,
    /// Never expires
    Never,
    /// Expires after this many seconds
    Seconds(u64),
}

impl Expiry {
    /// Replace [`Expiry::Global`] with the cache-wide default
    pub fn or_global(self, global: Expiry) -> Expiry {
        match self {
            Expiry::Global => global,
            other => other,
        }
    }

    /// The window as a duration.
    ///
    /// `None` for `Global`, `Never` and windows too large for [`TimeDelta`],
    /// which therefore never elapse.
    pub fn window(self) -> Option<TimeDelta> {
        match self {
            Expiry::Seconds(secs) => i64::try_from(secs).ok().and_then(TimeDelta::try_seconds),
            Expiry::Global | Expiry::Never => None,
        }
    }

    /// Whether at least this window has passed between `since` and `now`.
    ///
    /// `Global` must be resolved first; an unresolved `Global` never elapses.
    pub fn has_elapsed(self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.window()
            .is_some_and(|window| now.signed_duration_since(since) >= window)
    }

    /// Like [`Expiry::has_elapsed`] but strictly more than the window
    pub fn is_exceeded(self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.window()
            .is_some_and(|window| now.signed_duration_since(since) > window)
    }
}

impl From<i64> for Expiry {
    fn from(value: i64) -> Self {
        match value {
            EXPIRY_USE_GLOBAL => Expiry::Global,
            v if v < 0 => Expiry::Never,
            v => Expiry::Seconds(v as u64),
        }
    }
}

impl From<Expiry> for i64 {
    fn from(expiry: Expiry) -> Self {
        match expiry {
            Expiry::Global => EXPIRY_USE_GLOBAL,
            Expiry::Never => EXPIRY_INDEFINITE,
            Expiry::Seconds(secs) => i64::try_from(secs).unwrap_or(i64::MAX),
        }
    }
}

/// A cached record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheItem {
    /// Unhashed key (the domain fingerprint)
    pub key: String,
    /// Opaque payload
    pub value: Option<serde_json::Value>,
    /// First time the item was stored
    pub created: Option<DateTime<Utc>>,
    /// Item lifetime since `created`
    pub created_expiry: Expiry,
    /// Last time the item was stored
    pub modified: Option<DateTime<Utc>>,
    /// Validity window since `modified`
    pub modified_expiry: Expiry,
}

impl CacheItem {
    /// Create an unsaved item that uses the cache-wide expiry defaults
    pub fn new(key: impl Into<String>, value: Option<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value,
            created: None,
            created_expiry: Expiry::Global,
            modified: None,
            modified_expiry: Expiry::Global,
        }
    }

    /// Override both expiry windows for this item
    pub fn with_expiry(mut self, created_expiry: Expiry, modified_expiry: Expiry) -> Self {
        self.created_expiry = created_expiry;
        self.modified_expiry = modified_expiry;
        self
    }

    /// Stamp timestamps the way every `Cache::set` must
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.created.is_none() {
            self.created = Some(now);
        }
        self.modified = Some(now);
    }
}

/// Cache-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory holding one file per item
    pub dir: PathBuf,
    /// Default created-expiry for items using [`Expiry::Global`]
    pub created_expiry: Expiry,
    /// Default modified-expiry for items using [`Expiry::Global`]
    pub modified_expiry: Expiry,
}

impl CacheSettings {
    /// Create settings; a `Global` default falls back to the built-in window
    pub fn new(dir: impl Into<PathBuf>, created_expiry: Expiry, modified_expiry: Expiry) -> Self {
        Self {
            dir: dir.into(),
            created_expiry: created_expiry.or_global(Expiry::Seconds(CREATED_EXPIRY_SECS_DEFAULT)),
            modified_expiry: modified_expiry
                .or_global(Expiry::Seconds(MODIFIED_EXPIRY_SECS_DEFAULT)),
        }
    }

    /// Settings with the built-in default windows
    pub fn with_defaults(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, Expiry::Global, Expiry::Global)
    }

    /// Modified-expiry check shared by all implementations
    pub fn is_valid(&self, item: &CacheItem, now: DateTime<Utc>) -> bool {
        match item.modified {
            Some(modified) => {
                let window = item.modified_expiry.or_global(self.modified_expiry);
                !window.has_elapsed(modified, now)
            }
            None => false,
        }
    }

    /// Created-expiry check shared by all implementations
    pub fn is_expired(&self, item: &CacheItem, now: DateTime<Utc>) -> bool {
        match item.created {
            Some(created) => item
                .created_expiry
                .or_global(self.created_expiry)
                .is_exceeded(created, now),
            None => false,
        }
    }
}

/// Hash a key into a fixed-length storage identifier
pub fn hashed_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Trait for cache implementations
///
/// # Contract
///
/// - `get` on a missing key returns `CacheItem::new(key, None)`, not an error
/// - `set` stamps `modified` (and `created` if unset) before persisting
/// - `delete` on a missing key succeeds
/// - storage failures surface as [`crate::Error::Storage`]
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch the item stored under `key`
    async fn get(&self, key: &str) -> Result<CacheItem, crate::Error>;

    /// Stamp and persist an item
    async fn set(&self, item: &mut CacheItem) -> Result<(), crate::Error>;

    /// Remove the item stored under `key`
    async fn delete(&self, key: &str) -> Result<(), crate::Error>;

    /// Remove every item older than its created-expiry
    async fn delete_expired(&self) -> Result<(), crate::Error>;

    /// Whether an item is still inside its modified-expiry window.
    ///
    /// An item that was never stored is never valid.
    fn is_valid(&self, item: &CacheItem) -> bool;
}
