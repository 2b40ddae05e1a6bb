//! Tag-scoped access to the primary cache

use remote_config_store::{CacheStore, Document, StoreError};
use std::time::Duration;
use tracing::debug;

use crate::resource::cache_tags;

/// A client's view of the primary cache
///
/// When the backend can tag entries, every read and write goes through a
/// view scoped to the client's tags so the client can later be flushed in
/// bulk. Other backends are used as they are.
pub enum ScopedCache<'a> {
    Tagged(Box<dyn CacheStore>),
    Plain(&'a dyn CacheStore),
}

impl<'a> ScopedCache<'a> {
    /// Scope `store` to `client_id`, probing it for tag support
    pub fn for_client(store: &'a dyn CacheStore, client_id: &str) -> Self {
        match store.as_taggable() {
            Some(taggable) => ScopedCache::Tagged(taggable.with_tags(&cache_tags(client_id))),
            None => ScopedCache::Plain(store),
        }
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self, ScopedCache::Tagged(_))
    }

    fn store(&self) -> &dyn CacheStore {
        match self {
            ScopedCache::Tagged(store) => store.as_ref(),
            ScopedCache::Plain(store) => *store,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        self.store().get(key).await
    }

    pub async fn set(
        &self,
        key: &str,
        value: &Document,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.store().set(key, value, ttl).await
    }

    pub async fn has(&self, key: &str) -> Result<bool, StoreError> {
        self.store().has(key).await
    }

    /// Flush every entry tagged for `client_id`.
    ///
    /// Returns `None` when the backend has no tag support.
    pub async fn flush_client(
        store: &dyn CacheStore,
        client_id: &str,
    ) -> Result<Option<u64>, StoreError> {
        let Some(taggable) = store.as_taggable() else {
            debug!("Cache backend has no tag support, nothing flushed for {}", client_id);
            return Ok(None);
        };

        let flushed = taggable.flush_tags(&cache_tags(client_id)).await?;
        Ok(Some(flushed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_config_store::{FileStore, MemoryStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_taggable_backend_is_scoped() {
        let store = MemoryStore::new();

        let billing = ScopedCache::for_client(&store, "billing");
        assert!(billing.is_tagged());
        billing.set("key", &json!({"a": 1}), None).await.unwrap();

        assert!(billing.has("key").await.unwrap());
        assert!(store.get("key").await.unwrap().is_none());

        let search = ScopedCache::for_client(&store, "search");
        assert!(search.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plain_backend_is_untagged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();

        let scoped = ScopedCache::for_client(&store, "billing");
        assert!(!scoped.is_tagged());
        scoped.set("key", &json!(1), None).await.unwrap();

        assert_eq!(store.get("key").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_flush_client() {
        let store = MemoryStore::new();
        ScopedCache::for_client(&store, "billing")
            .set("k1", &json!(1), None)
            .await
            .unwrap();
        ScopedCache::for_client(&store, "search")
            .set("k2", &json!(2), None)
            .await
            .unwrap();

        let flushed = ScopedCache::flush_client(&store, "billing").await.unwrap();
        assert_eq!(flushed, Some(1));
        assert!(
            !ScopedCache::for_client(&store, "billing")
                .has("k1")
                .await
                .unwrap()
        );
        assert!(
            ScopedCache::for_client(&store, "search")
                .has("k2")
                .await
                .unwrap()
        );

        let dir = tempfile::tempdir().unwrap();
        let plain = FileStore::new(dir.path()).await.unwrap();
        assert_eq!(
            ScopedCache::flush_client(&plain, "billing").await.unwrap(),
            None
        );
    }
}
