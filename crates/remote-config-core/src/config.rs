//! Client credentials

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Scheme prepended to hosts given without one
const DEFAULT_SCHEME: &str = "http://";

/// Connection and caching parameters of a client
///
/// Built once and handed to [`crate::RemoteConfig::builder`]; the client keeps
/// its own copy and never changes it.
#[derive(Clone)]
pub struct Credentials {
    /// Base URL of the remote config service, always with a scheme
    pub host: String,
    pub username: String,
    pub password: String,
    pub application: String,
    pub environment: String,
    /// Lifetime of primary cache entries, `None` keeps them indefinitely
    pub cache_lifetime: Option<Duration>,
    /// Directory of the default primary file store
    pub cache_directory: Option<PathBuf>,
    /// Directory of the default fallback file store
    pub cache_fallback_directory: Option<PathBuf>,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        application: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            host: add_scheme(&host.into()),
            username: username.into(),
            password: password.into(),
            application: application.into(),
            environment: environment.into(),
            cache_lifetime: None,
            cache_directory: None,
            cache_fallback_directory: None,
        }
    }

    /// Set the primary cache lifetime in seconds; zero or negative never expires
    pub fn with_cache_lifetime_secs(mut self, secs: i64) -> Self {
        self.cache_lifetime = lifetime_from_secs(secs);
        self
    }

    pub fn with_cache_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(dir.into());
        self
    }

    pub fn with_cache_fallback_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_fallback_directory = Some(dir.into());
        self
    }

    /// Check that every field needed to build request URLs is usable
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("username", &self.username),
            ("application", &self.application),
            ("environment", &self.environment),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidCredentials(format!("{} is empty", field)));
            }
        }

        let url = url::Url::parse(&self.host).map_err(|e| {
            CoreError::InvalidCredentials(format!("invalid host '{}': {}", self.host, e))
        })?;
        if url.host_str().is_none() {
            return Err(CoreError::InvalidCredentials(format!(
                "host '{}' has no host name",
                self.host
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("cache_lifetime", &self.cache_lifetime)
            .field("cache_directory", &self.cache_directory)
            .field("cache_fallback_directory", &self.cache_fallback_directory)
            .finish()
    }
}

/// Prefix `http://` unless the host already names a scheme
pub fn add_scheme(host: &str) -> String {
    let host = host.trim();
    if host.contains("://") {
        host.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, host)
    }
}

/// Convert a lifetime in seconds, where `-1` (or any value up to zero)
/// means entries never expire
pub fn lifetime_from_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(host: &str) -> Credentials {
        Credentials::new(host, "u", "p", "app", "prod")
    }

    #[test]
    fn test_add_scheme() {
        assert_eq!(add_scheme("cfg.example.com"), "http://cfg.example.com");
        assert_eq!(add_scheme("localhost:8080"), "http://localhost:8080");
        assert_eq!(add_scheme("https://cfg.example.com"), "https://cfg.example.com");
        assert_eq!(add_scheme("http://remote-config"), "http://remote-config");
    }

    #[test]
    fn test_lifetime_from_secs() {
        assert_eq!(lifetime_from_secs(-1), None);
        assert_eq!(lifetime_from_secs(0), None);
        assert_eq!(lifetime_from_secs(300), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_defaults() {
        let creds = credentials("cfg.example.com");
        assert_eq!(creds.host, "http://cfg.example.com");
        assert_eq!(creds.cache_lifetime, None);
        assert!(creds.cache_directory.is_none());
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut creds = credentials("cfg.example.com");
        creds.application = " ".to_string();
        assert!(matches!(
            creds.validate(),
            Err(CoreError::InvalidCredentials(_))
        ));

        let creds = Credentials::new("cfg.example.com", "", "p", "app", "prod");
        assert!(creds.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        assert!(credentials("http://").validate().is_err());
        assert!(credentials("http://exa mple.com").validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("cfg.example.com", "u", "hunter2", "app", "prod");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
