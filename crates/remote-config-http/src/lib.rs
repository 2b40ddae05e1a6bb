//! Remote Config HTTP Fetcher
//!
//! This crate provides the client for communicating with the remote
//! configuration service, handling authentication, timeouts and
//! decoding of config documents.

pub mod client;
pub mod error;

pub use client::{ConfigFetcher, ConfigHttpClient, HttpClientConfig, REQUEST_TIMEOUT};
pub use error::FetchError;
