//! Client wiring

use anyhow::{Context, Result};
use remote_config_core::{CacheStore, RemoteConfig, RemoteConfigBuilder, TracingReporter};
use std::path::Path;
use std::sync::Arc;

use crate::settings::Settings;

fn builder(settings: &Settings) -> RemoteConfigBuilder {
    let builder = RemoteConfig::builder(settings.credentials())
        .read_policy(settings.read_policy)
        .failure_policy(settings.failure_policy);

    if settings.report_errors {
        builder.reporter(Arc::new(TracingReporter))
    } else {
        builder
    }
}

/// Build a client with default file-backed caches
pub fn build_client(settings: &Settings) -> Result<RemoteConfig> {
    builder(settings)
        .build()
        .context("Failed to build remote config client")
}

/// Build a client whose primary cache is supplied by the host application
pub fn build_client_with_cache(
    settings: &Settings,
    cache: Arc<dyn CacheStore>,
) -> Result<RemoteConfig> {
    builder(settings)
        .cache(cache)
        .build()
        .context("Failed to build remote config client")
}

/// Load settings from `path` and the environment, then build a client
pub fn client_from_file(path: impl AsRef<Path>) -> Result<RemoteConfig> {
    let settings = Settings::load(path)?;
    build_client(&settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LoggingSettings;
    use remote_config_core::{CoreError, FailurePolicy, MemoryStore, ReadPolicy};
    use serde_json::json;
    use std::path::PathBuf;

    const BILLING_PATH: &str = "/api/v1/configs/app/billing/prod";

    fn settings(host: &str, primary: PathBuf, fallback: PathBuf) -> Settings {
        Settings {
            host: host.to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            application: "app".to_string(),
            environment: "prod".to_string(),
            cache_life_time: -1,
            cache_directory: Some(primary),
            cache_fallback_directory: Some(fallback),
            read_policy: ReadPolicy::default(),
            failure_policy: FailurePolicy::default(),
            report_errors: false,
            logging: LoggingSettings::default(),
        }
    }

    #[test]
    fn test_build_client_applies_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(
            "cfg.example.com",
            dir.path().join("primary"),
            dir.path().join("fallback"),
        );
        settings.read_policy = ReadPolicy::ReadThrough;
        settings.failure_policy = FailurePolicy::Propagate;
        settings.report_errors = true;

        let client = build_client(&settings).unwrap();
        assert_eq!(client.read_policy(), ReadPolicy::ReadThrough);
        assert_eq!(client.failure_policy(), FailurePolicy::Propagate);
        assert_eq!(client.credentials().host, "http://cfg.example.com");
    }

    #[test]
    fn test_build_client_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(
            "cfg.example.com",
            dir.path().join("primary"),
            dir.path().join("fallback"),
        );
        settings.username = String::new();

        assert!(build_client(&settings).is_err());
    }

    #[test]
    fn test_client_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote-config.toml");
        std::fs::write(
            &path,
            r#"
host = "cfg.example.com"
username = "u"
password = "p"
application = "app"
environment = "prod"
read_policy = "read-through"
"#,
        )
        .unwrap();

        let client = client_from_file(&path).unwrap();
        assert_eq!(client.read_policy(), ReadPolicy::ReadThrough);
        assert_eq!(client.credentials().application, "app");
    }

    #[tokio::test]
    async fn test_fetch_then_serve_stale_when_service_is_down() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", BILLING_PATH)
            .match_header("authorization", "Basic dTpw")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sentry": {"dsn": "https://key@sentry.io/1"}, "limits": [10, 20]}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("fallback");

        let online = build_client(&settings(
            &server.url(),
            dir.path().join("primary"),
            fallback.clone(),
        ))
        .unwrap();

        assert_eq!(
            online
                .get_client_config("billing", Some("sentry.dsn"))
                .await
                .unwrap(),
            Some(json!("https://key@sentry.io/1"))
        );
        // Served from the primary cache
        assert_eq!(
            online
                .get_client_config("billing", Some("limits.1"))
                .await
                .unwrap(),
            Some(json!(20))
        );
        mock.assert_async().await;

        // Nothing listens on port 1; the fallback written above is the only source
        let offline = build_client(&settings(
            "http://127.0.0.1:1",
            dir.path().join("other-primary"),
            fallback,
        ))
        .unwrap();

        assert_eq!(
            offline
                .get_client_config("billing", Some("limits.0"))
                .await
                .unwrap(),
            Some(json!(10))
        );
        assert_eq!(offline.stats().stale_served, 1);
    }

    #[tokio::test]
    async fn test_service_down_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let client = build_client(&settings(
            "http://127.0.0.1:1",
            dir.path().join("primary"),
            dir.path().join("fallback"),
        ))
        .unwrap();

        let err = client.get_client_config("billing", None).await.unwrap_err();
        assert!(matches!(err, CoreError::Connection(_)));
    }

    #[tokio::test]
    async fn test_host_supplied_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", BILLING_PATH)
            .with_status(200)
            .with_body(r#"{"feature": true}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = MemoryStore::new();
        let client = build_client_with_cache(
            &settings(&server.url(), dir.path().join("unused"), dir.path().join("fallback")),
            Arc::new(cache.clone()),
        )
        .unwrap();

        assert_eq!(
            client.get_client_config("billing", Some("feature")).await.unwrap(),
            Some(json!(true))
        );
        assert_eq!(cache.len(), 1);
        assert!(!dir.path().join("unused").exists());

        assert!(client.invalidate_client("billing").await.unwrap());
        assert!(cache.is_empty());
        mock.assert_async().await;
    }
}
