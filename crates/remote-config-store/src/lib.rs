//! Remote Config Cache Stores
//!
//! This crate provides the cache store abstraction used by the remote
//! config client, with an in-memory tag-capable backend and a local
//! filesystem backend.

pub mod backend;
pub mod error;
pub mod local;
pub mod memory;

pub use backend::{CacheStore, Document, TaggableStore};
pub use error::StoreError;
pub use local::FileStore;
pub use memory::MemoryStore;
