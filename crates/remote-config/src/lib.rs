//! Remote Config - client for a remote configuration service
//!
//! Loads client settings, wires the default collaborators and hands back a
//! ready [`RemoteConfig`]. The read path itself lives in
//! `remote-config-core`.

mod logging;
mod provider;
mod settings;

pub use logging::init_logging;
pub use provider::{build_client, build_client_with_cache, client_from_file};
pub use settings::{LoggingSettings, Settings};

pub use remote_config_core::{
    CacheStore, ClientStats, CoreError, Credentials, Document, ErrorReporter, FailurePolicy,
    FileStore, MemoryStore, ReadPolicy, RemoteConfig, RemoteConfigBuilder, TracingReporter,
};
