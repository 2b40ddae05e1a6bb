//! Remote config client
//!
//! [`RemoteConfig`] answers config reads from the primary cache when it can,
//! fetches from the remote service when it must, and falls back to the last
//! known good document when the service is unreachable. Which caches are
//! written and when a connection failure is fatal is decided by the
//! configured [`ReadPolicy`] and [`FailurePolicy`].

use parking_lot::RwLock;
use remote_config_http::{ConfigFetcher, ConfigHttpClient, FetchError, HttpClientConfig};
use remote_config_store::{CacheStore, Document, FileStore, StoreError};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::ScopedCache;
use crate::config::Credentials;
use crate::document::{is_empty_document, lookup};
use crate::error::CoreError;
use crate::policy::{FailurePolicy, ReadPolicy};
use crate::report::{ErrorReporter, NoopReporter, report_context};
use crate::resource::{FALLBACK_NAMESPACE, FALLBACK_TTL, build_cache_key, build_uri};

/// Counters of how reads were answered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub primary_hits: u64,
    pub primary_misses: u64,
    pub cache_failures: u64,
    pub network_fetches: u64,
    pub stale_served: u64,
}

/// Outcome of a network fetch
enum Fetched {
    /// Fresh from the remote service
    Fresh(Document),
    /// Served from the fallback store after a connection failure
    Stale(Document),
}

/// Builder for [`RemoteConfig`]
///
/// Collaborators left unset are created on first use: file stores under the
/// credentials' cache directories and an HTTP client for the credentials'
/// host.
pub struct RemoteConfigBuilder {
    credentials: Credentials,
    read_policy: ReadPolicy,
    failure_policy: FailurePolicy,
    cache: Option<Arc<dyn CacheStore>>,
    fallback: Option<Arc<dyn CacheStore>>,
    fetcher: Option<Arc<dyn ConfigFetcher>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl RemoteConfigBuilder {
    pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Primary cache store
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fallback store for last known good documents
    pub fn fallback_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.fallback = Some(cache);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ConfigFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Result<RemoteConfig, CoreError> {
        self.credentials.validate()?;

        info!(
            "Initializing remote config client for {}/{} at {} (read: {}, failure: {})",
            self.credentials.application,
            self.credentials.environment,
            self.credentials.host,
            self.read_policy.as_str(),
            self.failure_policy.as_str()
        );

        Ok(RemoteConfig {
            credentials: self.credentials,
            read_policy: self.read_policy,
            failure_policy: self.failure_policy,
            cache: OnceCell::new_with(self.cache),
            fallback: OnceCell::new_with(self.fallback),
            fetcher: OnceCell::new_with(self.fetcher),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(NoopReporter)),
            stats: RwLock::new(ClientStats::default()),
        })
    }
}

/// Client for the remote config service
pub struct RemoteConfig {
    credentials: Credentials,
    read_policy: ReadPolicy,
    failure_policy: FailurePolicy,
    cache: OnceCell<Arc<dyn CacheStore>>,
    fallback: OnceCell<Arc<dyn CacheStore>>,
    fetcher: OnceCell<Arc<dyn ConfigFetcher>>,
    reporter: Arc<dyn ErrorReporter>,
    stats: RwLock<ClientStats>,
}

impl RemoteConfig {
    pub fn builder(credentials: Credentials) -> RemoteConfigBuilder {
        RemoteConfigBuilder {
            credentials,
            read_policy: ReadPolicy::default(),
            failure_policy: FailurePolicy::default(),
            cache: None,
            fallback: None,
            fetcher: None,
            reporter: None,
        }
    }

    /// Client with default collaborators and policies
    pub fn new(credentials: Credentials) -> Result<Self, CoreError> {
        Self::builder(credentials).build()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.read().clone()
    }

    /// Get a client's config, or the value at a dotted `path` inside it.
    ///
    /// A path missing from the document yields `Ok(None)`. Cache failures
    /// never fail the call; network failures do unless a stale document can
    /// be served.
    pub async fn get_client_config(
        &self,
        client_id: &str,
        path: Option<&str>,
    ) -> Result<Option<Value>, CoreError> {
        let document = self.get_document(client_id).await?;

        Ok(match path {
            None => Some(document),
            Some(path) => lookup(&document, path).cloned(),
        })
    }

    /// [`Self::get_client_config`] bounded by a caller deadline
    pub async fn get_client_config_with_deadline(
        &self,
        client_id: &str,
        path: Option<&str>,
        deadline: Duration,
    ) -> Result<Option<Value>, CoreError> {
        tokio::time::timeout(deadline, self.get_client_config(client_id, path))
            .await
            .map_err(|_| CoreError::DeadlineExceeded(deadline))?
    }

    /// Get a client's whole config document
    pub async fn get_document(&self, client_id: &str) -> Result<Document, CoreError> {
        validate_client_id(client_id)?;

        let uri = self.uri(client_id);
        let key = build_cache_key(&uri);

        let (cached, primary_usable) = match self.read_primary(client_id, &key).await {
            Ok(cached) => (cached, true),
            Err(e) => {
                self.record_cache_failure();
                warn!("Could not read primary cache for {}: {}", client_id, e);
                self.reporter.report(
                    "Could not read from primary cache",
                    &report_context([
                        ("client", json!(client_id)),
                        ("error_message", json!(e.to_string())),
                        ("uri", json!(uri)),
                    ]),
                );
                (None, false)
            }
        };

        if let Some(document) = cached {
            debug!("Primary cache hit for {}", uri);
            self.record(|s| s.primary_hits += 1);
            metrics::counter!("remote_config_primary_hits_total").increment(1);

            if self.read_policy == ReadPolicy::MirrorFallback {
                self.mirror_to_fallback(client_id, &key, &document).await;
            }
            return Ok(document);
        }

        debug!("Primary cache miss for {}", uri);
        self.record(|s| s.primary_misses += 1);
        metrics::counter!("remote_config_primary_misses_total").increment(1);

        match self.fetch_remote(client_id, &uri, &key).await? {
            Fetched::Fresh(document) => {
                if primary_usable {
                    self.write_primary(client_id, &key, &document).await;
                }
                Ok(document)
            }
            Fetched::Stale(document) => Ok(document),
        }
    }

    /// Push a document into the primary cache without going through the
    /// read path. With `can_expire` false the entry never expires.
    pub async fn update_cache_data(
        &self,
        client_id: &str,
        document: &Document,
        can_expire: bool,
    ) -> Result<(), CoreError> {
        validate_client_id(client_id)?;

        let key = build_cache_key(&self.uri(client_id));
        let ttl = if can_expire {
            self.credentials.cache_lifetime
        } else {
            None
        };

        let cache = self.cache().await?;
        ScopedCache::for_client(cache.as_ref(), client_id)
            .set(&key, document, ttl)
            .await?;

        debug!("Updated cached config for {}", client_id);
        Ok(())
    }

    /// Drop every primary cache entry of a client.
    ///
    /// Returns `false` when the primary backend cannot flush by tag.
    pub async fn invalidate_client(&self, client_id: &str) -> Result<bool, CoreError> {
        validate_client_id(client_id)?;

        let cache = self.cache().await?;
        match ScopedCache::flush_client(cache.as_ref(), client_id).await? {
            Some(flushed) => {
                info!("Invalidated {} cached entries for {}", flushed, client_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn uri(&self, client_id: &str) -> String {
        build_uri(
            &self.credentials.application,
            client_id,
            &self.credentials.environment,
        )
    }

    /// Whether documents are kept in the fallback store at all
    fn uses_fallback(&self) -> bool {
        self.read_policy == ReadPolicy::MirrorFallback
            || self.failure_policy == FailurePolicy::ServeStale
    }

    async fn read_primary(
        &self,
        client_id: &str,
        key: &str,
    ) -> Result<Option<Document>, StoreError> {
        let cache = self.cache().await?;
        ScopedCache::for_client(cache.as_ref(), client_id)
            .get(key)
            .await
    }

    async fn write_primary(&self, client_id: &str, key: &str, document: &Document) {
        let result = match self.cache().await {
            Ok(cache) => {
                ScopedCache::for_client(cache.as_ref(), client_id)
                    .set(key, document, self.credentials.cache_lifetime)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.cache_failure("Could not write to primary cache", client_id, key, &e);
        }
    }

    /// Copy a primary hit into the fallback store unless it already holds it
    async fn mirror_to_fallback(&self, client_id: &str, key: &str, document: &Document) {
        let fallback = match self.fallback_cache().await {
            Ok(fallback) => fallback,
            Err(e) => {
                self.cache_failure("Could not open fallback cache", client_id, key, &e);
                return;
            }
        };

        match fallback.has(key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Mirroring cached config for {} into fallback cache", client_id);
                if let Err(e) = fallback.set(key, document, Some(FALLBACK_TTL)).await {
                    self.cache_failure("Could not write to fallback cache", client_id, key, &e);
                }
            }
            Err(e) => self.cache_failure("Could not read from fallback cache", client_id, key, &e),
        }
    }

    async fn read_fallback(&self, client_id: &str, key: &str) -> Option<Document> {
        let result = match self.fallback_cache().await {
            Ok(fallback) => fallback.get(key).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            self.cache_failure("Could not read from fallback cache", client_id, key, &e);
            None
        })
    }

    async fn write_fallback(&self, client_id: &str, key: &str, document: &Document) {
        let result = match self.fallback_cache().await {
            Ok(fallback) => fallback.set(key, document, Some(FALLBACK_TTL)).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.cache_failure("Could not write to fallback cache", client_id, key, &e);
        }
    }

    /// Fetch from the remote service, substituting the fallback document on
    /// connection failures when the failure policy allows it
    async fn fetch_remote(
        &self,
        client_id: &str,
        uri: &str,
        key: &str,
    ) -> Result<Fetched, CoreError> {
        let fetcher = self.fetcher().await?;

        // Read before the attempt so an outage still finds the last good copy
        let stale = match self.failure_policy {
            FailurePolicy::ServeStale => self.read_fallback(client_id, key).await,
            FailurePolicy::Propagate => None,
        };

        self.record(|s| s.network_fetches += 1);
        metrics::counter!("remote_config_network_fetches_total").increment(1);

        let error = match fetcher.fetch(uri).await {
            Ok(document) => {
                info!("Fetched config for {} from remote service", client_id);
                if self.uses_fallback() {
                    self.write_fallback(client_id, key, &document).await;
                }
                return Ok(Fetched::Fresh(document));
            }
            Err(e) => e,
        };

        if error.is_connection() {
            warn!("Could not reach remote config service for {}: {}", uri, error);
            self.reporter.report(
                "Could not get data from remote config API",
                &report_context([
                    ("current_cache", stale.clone().unwrap_or(Value::Null)),
                    ("error_message", json!(error.to_string())),
                    ("path", json!(uri)),
                    ("timeout", json!(fetcher.timeout().as_secs())),
                ]),
            );

            return match stale {
                Some(document) if !is_empty_document(&document) => {
                    info!("Serving stale config for {} from fallback cache", client_id);
                    self.record(|s| s.stale_served += 1);
                    metrics::counter!("remote_config_stale_served_total").increment(1);
                    self.write_fallback(client_id, key, &document).await;
                    Ok(Fetched::Stale(document))
                }
                _ => Err(CoreError::Connection(error)),
            };
        }

        warn!("Remote config request for {} failed: {}", uri, error);
        self.reporter.report(
            "Remote config API request failed",
            &report_context([
                ("client", json!(client_id)),
                ("error_message", json!(error.to_string())),
                ("path", json!(uri)),
            ]),
        );

        Err(match error {
            FetchError::NotFound(_) => CoreError::Remote {
                status: 404,
                message: format!(
                    "Client '{}' is not valid for application '{}' in environment '{}'",
                    client_id, self.credentials.application, self.credentials.environment
                ),
            },
            FetchError::Remote { status, message } => CoreError::Remote { status, message },
            FetchError::Parse(e) => CoreError::Parse(e.to_string()),
            other => CoreError::Fetch(other),
        })
    }

    fn cache_failure(&self, message: &str, client_id: &str, key: &str, error: &StoreError) {
        self.record_cache_failure();
        warn!("{} for {}: {}", message, client_id, error);
        self.reporter.report(
            message,
            &report_context([
                ("client", json!(client_id)),
                ("cache_key", json!(key)),
                ("error_message", json!(error.to_string())),
            ]),
        );
    }

    fn record_cache_failure(&self) {
        self.record(|s| s.cache_failures += 1);
        metrics::counter!("remote_config_cache_failures_total").increment(1);
    }

    fn record(&self, update: impl FnOnce(&mut ClientStats)) {
        update(&mut self.stats.write());
    }

    async fn cache(&self) -> Result<Arc<dyn CacheStore>, StoreError> {
        self.cache
            .get_or_try_init(|| async {
                let dir = self
                    .credentials
                    .cache_directory
                    .clone()
                    .unwrap_or_else(|| default_cache_root().join("primary"));
                let store: Arc<dyn CacheStore> = Arc::new(FileStore::new(dir).await?);
                Ok::<_, StoreError>(store)
            })
            .await
            .cloned()
    }

    async fn fallback_cache(&self) -> Result<Arc<dyn CacheStore>, StoreError> {
        self.fallback
            .get_or_try_init(|| async {
                let dir = self
                    .credentials
                    .cache_fallback_directory
                    .clone()
                    .unwrap_or_else(default_cache_root)
                    .join(FALLBACK_NAMESPACE);
                let store: Arc<dyn CacheStore> = Arc::new(FileStore::new(dir).await?);
                Ok::<_, StoreError>(store)
            })
            .await
            .cloned()
    }

    async fn fetcher(&self) -> Result<Arc<dyn ConfigFetcher>, CoreError> {
        self.fetcher
            .get_or_try_init(|| async {
                let client = ConfigHttpClient::new(HttpClientConfig {
                    host: self.credentials.host.clone(),
                    username: self.credentials.username.clone(),
                    password: self.credentials.password.clone(),
                    skip_tls_verify: false,
                })
                .map_err(CoreError::Fetch)?;
                let fetcher: Arc<dyn ConfigFetcher> = Arc::new(client);
                Ok::<_, CoreError>(fetcher)
            })
            .await
            .cloned()
    }
}

fn validate_client_id(client_id: &str) -> Result<(), CoreError> {
    if client_id.trim().is_empty() || client_id.contains('/') {
        return Err(CoreError::InvalidClientId(client_id.to_string()));
    }
    Ok(())
}

fn default_cache_root() -> PathBuf {
    std::env::temp_dir().join("remote-config")
}
