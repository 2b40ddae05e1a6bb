//! Remote config service client

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::FetchError;

/// Connect, read and total timeout for config requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Source of config documents
///
/// `uri` is the resource path relative to the service host, e.g.
/// `/api/v1/configs/{application}/{client}/{environment}`.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Fetch and decode the document at `uri`
    async fn fetch(&self, uri: &str) -> Result<Value, FetchError>;

    /// Upper bound of a single fetch
    fn timeout(&self) -> Duration {
        REQUEST_TIMEOUT
    }
}

/// HTTP client configuration
#[derive(Clone)]
pub struct HttpClientConfig {
    /// Base URL of the remote config service, including the scheme
    pub host: String,
    /// Username for basic authentication
    pub username: String,
    /// Password for basic authentication
    pub password: String,
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
}

impl fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish()
    }
}

/// Remote config API client
pub struct ConfigHttpClient {
    config: HttpClientConfig,
    client: Client,
}

impl ConfigHttpClient {
    /// Create a new client
    pub fn new(mut config: HttpClientConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .read_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT);

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(FetchError::Http)?;

        config.host = config.host.trim_end_matches('/').to_string();

        info!("Created remote config client for {}", config.host);

        Ok(Self { config, client })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }
}

#[async_trait]
impl ConfigFetcher for ConfigHttpClient {
    async fn fetch(&self, uri: &str) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.config.host, uri);

        debug!("Fetching config: {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(uri.to_string()));
        }

        if !status.is_success() {
            return Err(FetchError::Remote {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(FetchError::from_transport)?;

        Ok(serde_json::from_slice(&body)?)
    }
}
