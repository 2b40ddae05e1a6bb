//! Remote Config Client Core
//!
//! This crate provides the read path of the remote config client:
//! primary cache lookup, fallback cache mirroring, the network fetch and
//! the policies deciding between them.

pub mod cache;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod policy;
pub mod report;
pub mod resource;

pub use cache::ScopedCache;
pub use client::{ClientStats, RemoteConfig, RemoteConfigBuilder};
pub use config::Credentials;
pub use document::lookup;
pub use error::CoreError;
pub use policy::{FailurePolicy, ReadPolicy};
pub use report::{ErrorReporter, NoopReporter, ReportContext, TracingReporter};
pub use resource::{FALLBACK_TTL, build_cache_key, build_uri, cache_tags};

pub use remote_config_http::{ConfigFetcher, ConfigHttpClient, FetchError, REQUEST_TIMEOUT};
pub use remote_config_store::{CacheStore, Document, FileStore, MemoryStore, TaggableStore};
