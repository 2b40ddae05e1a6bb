//! In-memory store with tag support

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::backend::{CacheStore, Document, TaggableStore};
use crate::error::StoreError;

struct Entry {
    value: Document,
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local cache store
///
/// Cloning is cheap and every clone shares the same entries. Tagged views
/// keep their entries under a namespace derived from the tag set, so plain
/// reads never see them and a tag flush drops them all at once.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, tagged ones included
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, key: &str) -> Option<Document> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        debug!("Dropping expired entry: {}", key);
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    fn write(&self, key: String, value: &Document, ttl: Option<Duration>, tags: Vec<String>) {
        let entry = Entry {
            value: value.clone(),
            // A TTL past the clock's range never expires
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
            tags,
        };
        self.entries.write().insert(key, entry);
    }
}

/// Namespace for entries written under a tag set, independent of tag order
fn tagged_key(tags: &[String], key: &str) -> String {
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    format!("tags[{}]:{}", sorted.join("|"), key)
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.read(key))
    }

    async fn set(
        &self,
        key: &str,
        value: &Document,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.write(key.to_string(), value, ttl, Vec::new());
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.read(key).is_some())
    }

    fn as_taggable(&self) -> Option<&dyn TaggableStore> {
        Some(self)
    }
}

#[async_trait]
impl TaggableStore for MemoryStore {
    fn with_tags(&self, tags: &[String]) -> Box<dyn CacheStore> {
        Box::new(TaggedMemoryStore {
            store: self.clone(),
            tags: tags.to_vec(),
        })
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<u64, StoreError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(t)));
        let flushed = (before - entries.len()) as u64;

        debug!("Flushed {} entries for tags {:?}", flushed, tags);
        Ok(flushed)
    }
}

/// Tag-scoped view over a [`MemoryStore`]
struct TaggedMemoryStore {
    store: MemoryStore,
    tags: Vec<String>,
}

#[async_trait]
impl CacheStore for TaggedMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.store.read(&tagged_key(&self.tags, key)))
    }

    async fn set(
        &self,
        key: &str,
        value: &Document,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.store
            .write(tagged_key(&self.tags, key), value, ttl, self.tags.clone());
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.store.read(&tagged_key(&self.tags, key)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        assert!(store.get("key").await.unwrap().is_none());

        store.set("key", &json!({"a": 1}), None).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), Some(json!({"a": 1})));
        assert!(store.has("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let store = MemoryStore::new();
        store
            .set("key", &json!("v"), Some(Duration::ZERO))
            .await
            .unwrap();

        assert!(!store.has("key").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let store = MemoryStore::new();
        store
            .set("key", &json!("v"), Some(Duration::from_secs(i64::MAX as u64)))
            .await
            .unwrap();

        assert_eq!(store.get("key").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_tagged_view_is_isolated_from_plain_reads() {
        let store = MemoryStore::new();
        let taggable = store.as_taggable().unwrap();
        let scoped = taggable.with_tags(&tags(&["billing", "billing-remoteconfig"]));

        scoped.set("key", &json!(true), None).await.unwrap();

        assert_eq!(scoped.get("key").await.unwrap(), Some(json!(true)));
        assert!(store.get("key").await.unwrap().is_none());

        // Same tags in a different order address the same namespace
        let reordered = taggable.with_tags(&tags(&["billing-remoteconfig", "billing"]));
        assert!(reordered.has("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_tags_only_removes_tagged_entries() {
        let store = MemoryStore::new();
        let taggable = store.as_taggable().unwrap();

        let billing = taggable.with_tags(&tags(&["billing", "billing-remoteconfig"]));
        let search = taggable.with_tags(&tags(&["search", "search-remoteconfig"]));
        billing.set("k1", &json!(1), None).await.unwrap();
        search.set("k2", &json!(2), None).await.unwrap();
        store.set("k3", &json!(3), None).await.unwrap();

        let flushed = taggable.flush_tags(&tags(&["billing"])).await.unwrap();
        assert_eq!(flushed, 1);

        assert!(!billing.has("k1").await.unwrap());
        assert!(search.has("k2").await.unwrap());
        assert!(store.has("k3").await.unwrap());
        assert_eq!(store.len(), 2);
    }
}
