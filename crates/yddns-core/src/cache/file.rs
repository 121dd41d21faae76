// # File Cache
//
// File-based implementation of Cache.
//
// ## Purpose
//
// Persists refresh results across process restarts so a restarted client
// does not re-send every unchanged configuration immediately.
//
// ## Layout
//
// One document per key, named after the SHA-256 of the key:
//
// ```text
// <cache dir>/
//   3f2a...e1.json
//   9b04...7c.json
// ```
//
// ## File Format
//
// ```json
// {
//   "key": "{\"auth_method\":\"basic\",...}",
//   "value": { "status": "refreshed", "message": "good 1.2.3.4" },
//   "created": "2025-01-09T12:00:00Z",
//   "created_expiry": -2,
//   "modified": "2025-01-09T12:10:00Z",
//   "modified_expiry": -2
// }
// ```
//
// Expiry overrides live in the item, so they survive restarts independently
// of the cache-wide defaults.
//
// ## Crash Safety
//
// Writes go to `<file>.tmp` first and are renamed into place.

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::cache::{Cache, CacheItem, CacheSettings, hashed_key};

const FILE_EXTENSION: &str = "json";

/// File-based cache
///
/// # Example
///
/// ```rust,no_run
/// use yddns_core::cache::FileCache;
/// use yddns_core::traits::{Cache, CacheSettings};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = FileCache::new(CacheSettings::with_defaults("/var/cache/yddns")).await?;
///
///     let mut item = cache.get("fingerprint").await?;
///     assert!(!cache.is_valid(&item));
///
///     cache.set(&mut item).await?;
///     assert!(cache.is_valid(&item));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileCache {
    settings: CacheSettings,
}

impl FileCache {
    /// Create a file cache, creating its directory if needed
    pub async fn new(settings: CacheSettings) -> Result<Self, Error> {
        fs::create_dir_all(&settings.dir).await.map_err(|e| {
            Error::storage(format!(
                "Failed to create cache directory {}: {}",
                settings.dir.display(),
                e
            ))
        })?;

        tracing::debug!("Using cache directory {}", settings.dir.display());
        Ok(Self { settings })
    }

    /// Cache-wide settings
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Path of the document holding `key`
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.settings
            .dir
            .join(format!("{}.{}", hashed_key(key), FILE_EXTENSION))
    }

    /// Read and decode one document
    async fn read_item(path: &Path) -> Result<CacheItem, Error> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::storage(format!("Failed to read cache file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::storage(format!("Failed to parse cache file {}: {}", path.display(), e))
        })
    }

    /// Write one document atomically
    async fn write_item(path: &Path, item: &CacheItem) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(item)
            .map_err(|e| Error::storage(format!("Failed to serialize cache item: {}", e)))?;

        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::storage(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Cache item written: {}", path.display());
        Ok(())
    }

    /// Remove a file, treating "already gone" as success
    async fn remove_file(path: &Path) -> Result<(), Error> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!(
                "Failed to remove cache file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// List every cache document in the directory
    async fn list_files(&self) -> Result<Vec<PathBuf>, Error> {
        let mut entries = fs::read_dir(&self.settings.dir).await.map_err(|e| {
            Error::storage(format!(
                "Failed to list cache directory {}: {}",
                self.settings.dir.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            Error::storage(format!(
                "Failed to list cache directory {}: {}",
                self.settings.dir.display(),
                e
            ))
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == FILE_EXTENSION) {
                files.push(path);
            }
        }

        Ok(files)
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> Result<CacheItem, Error> {
        let path = self.file_path(key);

        match fs::metadata(&path).await {
            Ok(_) => Self::read_item(&path).await,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::trace!("Cache miss: {}", path.display());
                Ok(CacheItem::new(key, None))
            }
            Err(e) => Err(Error::storage(format!(
                "Failed to stat cache file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, item: &mut CacheItem) -> Result<(), Error> {
        item.touch(Utc::now());
        Self::write_item(&self.file_path(&item.key), item).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        Self::remove_file(&self.file_path(key)).await
    }

    async fn delete_expired(&self) -> Result<(), Error> {
        let now = Utc::now();
        let mut errors = Vec::new();
        let mut removed = 0usize;

        for path in self.list_files().await? {
            match Self::read_item(&path).await {
                Ok(item) if self.settings.is_expired(&item, now) => {
                    match Self::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => errors.push(e.to_string()),
                    }
                }
                Ok(_) => {}
                Err(e) => errors.push(e.to_string()),
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {} expired cache item(s)", removed);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::storage(errors.join("; ")))
        }
    }

    fn is_valid(&self, item: &CacheItem) -> bool {
        self.settings.is_valid(item, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::cache::Expiry;
    use tempfile::tempdir;

    async fn cache_in(dir: &Path) -> FileCache {
        FileCache::new(CacheSettings::with_defaults(dir)).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_empty_item() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path()).await;

        let item = cache.get("nothing here").await.unwrap();
        assert_eq!(item, CacheItem::new("nothing here", None));
        assert!(!cache.is_valid(&item));
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path()).await;

        let mut item = CacheItem::new("key", Some(serde_json::json!({"status": "refreshed"})))
            .with_expiry(Expiry::Never, Expiry::Seconds(30));
        cache.set(&mut item).await.unwrap();

        let loaded = cache.get("key").await.unwrap();
        assert_eq!(loaded, item);
        assert!(loaded.created.is_some());
        assert_eq!(loaded.created, loaded.modified);

        // Survives a new instance with different defaults
        let other = FileCache::new(CacheSettings::new(dir.path(), Expiry::Seconds(1), Expiry::Seconds(1)))
            .await
            .unwrap();
        let reloaded = other.get("key").await.unwrap();
        assert_eq!(reloaded.created_expiry, Expiry::Never);
        assert_eq!(reloaded.modified_expiry, Expiry::Seconds(30));
    }

    #[tokio::test]
    async fn test_set_preserves_created_and_refreshes_modified() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path()).await;

        let mut item = CacheItem::new("key", None);
        cache.set(&mut item).await.unwrap();
        let created = item.created;
        let first_modified = item.modified;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.set(&mut item).await.unwrap();

        assert_eq!(item.created, created);
        assert!(item.modified > first_modified);
    }

    #[tokio::test]
    async fn test_file_name_is_hashed_key() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path()).await;

        let key = "a key/with:characters that are not file-name safe".repeat(20);
        let mut item = CacheItem::new(key.clone(), None);
        cache.set(&mut item).await.unwrap();

        let expected = dir.path().join(format!("{}.json", hashed_key(&key)));
        assert!(expected.exists());
        assert!(!PathBuf::from(format!("{}.tmp", expected.display())).exists());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path()).await;

        let mut item = CacheItem::new("key", None);
        cache.set(&mut item).await.unwrap();

        cache.delete("key").await.unwrap();
        assert!(!cache.file_path("key").exists());
        cache.delete("key").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_expired_respects_created_expiry() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(CacheSettings::new(dir.path(), Expiry::Seconds(60), Expiry::Global))
            .await
            .unwrap();

        let old = Utc::now() - chrono::Duration::seconds(3600);

        // Expired by the global default
        let mut stale = CacheItem::new("stale", None);
        stale.touch(old);
        FileCache::write_item(&cache.file_path("stale"), &stale).await.unwrap();

        // Same age but never expires
        let mut pinned = CacheItem::new("pinned", None).with_expiry(Expiry::Never, Expiry::Global);
        pinned.touch(old);
        FileCache::write_item(&cache.file_path("pinned"), &pinned).await.unwrap();

        // Fresh item
        let mut fresh = CacheItem::new("fresh", None);
        cache.set(&mut fresh).await.unwrap();

        cache.delete_expired().await.unwrap();

        assert!(!cache.file_path("stale").exists());
        assert!(cache.file_path("pinned").exists());
        assert!(cache.file_path("fresh").exists());
    }

    #[tokio::test]
    async fn test_delete_expired_reports_corrupt_files_but_continues() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(CacheSettings::new(dir.path(), Expiry::Seconds(60), Expiry::Global))
            .await
            .unwrap();

        let mut stale = CacheItem::new("stale", None);
        stale.touch(Utc::now() - chrono::Duration::seconds(3600));
        FileCache::write_item(&cache.file_path("stale"), &stale).await.unwrap();

        fs::write(dir.path().join("garbage.json"), b"not json").await.unwrap();

        let err = cache.delete_expired().await.unwrap_err();
        assert!(err.is_storage());
        assert!(!cache.file_path("stale").exists());
    }

    #[tokio::test]
    async fn test_corrupt_item_is_storage_error() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path()).await;

        fs::write(cache.file_path("key"), b"{ broken").await.unwrap();

        let err = cache.get("key").await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_is_valid_within_modified_window() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(CacheSettings::new(dir.path(), Expiry::Global, Expiry::Seconds(600)))
            .await
            .unwrap();

        let mut item = CacheItem::new("key", None);
        assert!(!cache.is_valid(&item));

        cache.set(&mut item).await.unwrap();
        assert!(cache.is_valid(&item));
        assert_eq!(cache.is_valid(&item), cache.is_valid(&item));

        item.modified = Some(Utc::now() - chrono::Duration::seconds(601));
        assert!(!cache.is_valid(&item));
    }
}
