//! Settings loading

use anyhow::{Context, Result};
use remote_config_core::{Credentials, FailurePolicy, ReadPolicy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Prefix of environment variables overriding file settings
const ENV_PREFIX: &str = "REMOTE_CONFIG";

/// Client settings
///
/// Read from an optional file and `REMOTE_CONFIG_*` environment variables,
/// the latter taking precedence. Nested keys use `__`, e.g.
/// `REMOTE_CONFIG_LOGGING__LEVEL`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub application: String,
    pub environment: String,
    /// Primary cache lifetime in seconds, `-1` never expires
    #[serde(default = "default_cache_life_time")]
    pub cache_life_time: i64,
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
    #[serde(default)]
    pub cache_fallback_directory: Option<PathBuf>,
    #[serde(default, deserialize_with = "from_name")]
    pub read_policy: ReadPolicy,
    #[serde(default, deserialize_with = "from_name")]
    pub failure_policy: FailurePolicy,
    /// Forward failure reports to `tracing`
    #[serde(default = "default_report_errors")]
    pub report_errors: bool,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Policies are accepted in any case, with `_` or `-` separators
fn from_name<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let name = String::deserialize(deserializer)?;
    name.parse().map_err(serde::de::Error::custom)
}

fn default_cache_life_time() -> i64 {
    -1
}

fn default_report_errors() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    /// Load settings from a file (format chosen by extension) and the
    /// environment. A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(path.as_ref(), environment())
    }

    fn load_with_env(path: &Path, env: config::Environment) -> Result<Self> {
        if !path.exists() {
            info!("Settings file not found at {:?}, using environment only", path);
        }

        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read settings from {:?}", path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;

        info!(
            "Loaded remote config settings for {}/{}",
            settings.application, settings.environment
        );
        Ok(settings)
    }

    /// Client credentials described by these settings
    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::new(
            self.host.clone(),
            self.username.clone(),
            self.password.clone(),
            self.application.clone(),
            self.environment.clone(),
        )
        .with_cache_lifetime_secs(self.cache_life_time);

        if let Some(dir) = &self.cache_directory {
            credentials = credentials.with_cache_directory(dir);
        }
        if let Some(dir) = &self.cache_fallback_directory {
            credentials = credentials.with_cache_fallback_directory(dir);
        }

        credentials
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("cache_life_time", &self.cache_life_time)
            .field("cache_directory", &self.cache_directory)
            .field("cache_fallback_directory", &self.cache_fallback_directory)
            .field("read_policy", &self.read_policy)
            .field("failure_policy", &self.failure_policy)
            .field("report_errors", &self.report_errors)
            .field("logging", &self.logging)
            .finish()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
