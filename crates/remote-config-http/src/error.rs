//! Fetch error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Config not found: {0}")]
    NotFound(String),

    #[error("Remote config service returned error: {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Sort a transport error into connection failures and everything else
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            FetchError::Connection(err)
        } else {
            FetchError::Http(err)
        }
    }

    /// Whether the remote service could not be reached at all
    pub fn is_connection(&self) -> bool {
        matches!(self, FetchError::Connection(_))
    }
}
