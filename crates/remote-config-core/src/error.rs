//! Core error types

use remote_config_http::FetchError;
use remote_config_store::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid client id: {0:?}")]
    InvalidClientId(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] StoreError),

    #[error("Could not reach remote config service: {0}")]
    Connection(#[source] FetchError),

    #[error("Remote config service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid config document: {0}")]
    Parse(String),

    #[error("Fetch error: {0}")]
    Fetch(#[source] FetchError),

    #[error("Config request exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}
