//! Resource paths, cache keys and cache tags

use sha2::{Digest, Sha256};
use std::time::Duration;

/// Lifetime of fallback store entries (one week)
pub const FALLBACK_TTL: Duration = Duration::from_secs(604_800);

/// Namespace directory of the default fallback file store
pub const FALLBACK_NAMESPACE: &str = "RC_CACHE_FALLBACK";

/// Path of a client's config document on the remote service
pub fn build_uri(application: &str, client: &str, environment: &str) -> String {
    format!("/api/v1/configs/{}/{}/{}", application, client, environment)
}

/// Cache key of a resource path: hex SHA-256 of the path
pub fn build_cache_key(uri: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    hex::encode(hasher.finalize())
}

/// Tags a client's primary cache entries are scoped under
pub fn cache_tags(client: &str) -> Vec<String> {
    vec![client.to_string(), format!("{}-remoteconfig", client)]
}
