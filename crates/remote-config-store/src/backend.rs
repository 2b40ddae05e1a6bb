//! Cache store traits

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// JSON document held by a cache store
pub type Document = serde_json::Value;

/// Cache store trait
///
/// Implementations hold JSON documents under string keys. A `ttl` of `None`
/// keeps the entry until it is overwritten; a zero TTL expires it immediately.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a document, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Store a document
    async fn set(&self, key: &str, value: &Document, ttl: Option<Duration>)
    -> Result<(), StoreError>;

    /// Check if a live entry exists
    async fn has(&self, key: &str) -> Result<bool, StoreError>;

    /// Tag capability of this backend, if it has one
    fn as_taggable(&self) -> Option<&dyn TaggableStore> {
        None
    }
}

/// Backends that can scope entries under tags and flush them in bulk
#[async_trait]
pub trait TaggableStore: Send + Sync {
    /// A view of the store whose reads and writes are scoped to `tags`
    fn with_tags(&self, tags: &[String]) -> Box<dyn CacheStore>;

    /// Remove every entry written under any of `tags`, returning the count
    async fn flush_tags(&self, tags: &[String]) -> Result<u64, StoreError>;
}

/// Validate a cache key.
///
/// Keys end up in file names, so only ASCII alphanumerics, `-` and `_` are
/// accepted.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("empty key".to_string()));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("9b74c9897bac770ffc029102a200c5de").is_ok());
        assert!(validate_key("RC_CACHE-key").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b").is_err());
    }
}
