// # Memory Cache
//
// In-memory implementation of Cache.
//
// ## Purpose
//
// Same expiry semantics as the file cache without touching the disk. Used
// when `cache.persist = false` and throughout the tests.
//
// ## Crash Behavior
//
// - All items are lost on restart
// - The first cycle after a restart sends every domain again

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::cache::{Cache, CacheItem, CacheSettings, hashed_key};

/// In-memory cache implementation
///
/// Items live in a HashMap protected by a RwLock, keyed by the hashed key
/// exactly like the file names of [`super::FileCache`].
#[derive(Debug, Clone)]
pub struct MemoryCache {
    settings: CacheSettings,
    inner: Arc<RwLock<HashMap<String, CacheItem>>>,
}

impl MemoryCache {
    /// Create an empty memory cache
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored items
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Store an item verbatim, without stamping timestamps
    pub async fn insert_raw(&self, item: CacheItem) {
        let mut guard = self.inner.write().await;
        guard.insert(hashed_key(&item.key), item);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CacheSettings::with_defaults(""))
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<CacheItem, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(&hashed_key(key))
            .cloned()
            .unwrap_or_else(|| CacheItem::new(key, None)))
    }

    async fn set(&self, item: &mut CacheItem) -> Result<(), Error> {
        item.touch(Utc::now());
        let mut guard = self.inner.write().await;
        guard.insert(hashed_key(&item.key), item.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(&hashed_key(key));
        Ok(())
    }

    async fn delete_expired(&self) -> Result<(), Error> {
        let now = Utc::now();
        let mut guard = self.inner.write().await;
        guard.retain(|_, item| !self.settings.is_expired(item, now));
        Ok(())
    }

    fn is_valid(&self, item: &CacheItem) -> bool {
        self.settings.is_valid(item, Utc::now())
    }
}
