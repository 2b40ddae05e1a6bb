//! Local filesystem store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{CacheStore, Document, validate_key};
use crate::error::StoreError;

/// On-disk representation of a cache entry
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    value: Document,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Local filesystem store
///
/// Stores one JSON file per key in a sharded directory structure:
/// `<base_path>/<first 2 chars>/<key>.json`. Entries survive process restarts,
/// which is what the fallback store relies on.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new filesystem store, creating the directory if needed
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = base_path.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).await?;

        info!("Initialized file cache store at {:?}", base_path);

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a key
    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;

        let shard = key.get(..2).unwrap_or("__");
        Ok(self.base_path.join(shard).join(format!("{}.json", key)))
    }

    async fn read_entry(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let path = self.entry_path(key)?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let entry: StoredEntry = serde_json::from_slice(&data)?;
        if entry.is_expired(Utc::now()) {
            debug!("Removing expired cache file {:?}", path);
            if let Err(e) = fs::remove_file(&path).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to remove expired cache file {:?}: {}", path, e);
            }
            return Ok(None);
        }

        Ok(Some(entry))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.read_entry(key).await?.map(|entry| entry.value))
    }

    async fn set(
        &self,
        key: &str,
        value: &Document,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;

        // A TTL past the representable range never expires
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        let data = serde_json::to_vec(&StoredEntry {
            expires_at,
            value: value.clone(),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using a uniquely named temp file
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, &data).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Io(e));
        }

        debug!("Wrote cache file {:?} ({} bytes)", path, data.len());
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read_entry(key).await?.is_some())
    }
}
