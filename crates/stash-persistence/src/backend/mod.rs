//! # Backends
//!
//! The two interchangeable storage implementations behind `CacheStore`.
//! Both are addressed by `StorageId` and exchange values as JSON.

pub mod file;
#[cfg(feature = "redis")]
pub mod network;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use stash_domain::StorageId;
use std::fmt;

use crate::error::Result;

pub use file::{FileBackend, ShardedPath};
#[cfg(feature = "redis")]
pub use network::NetworkBackend;

/// Which backend a store resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Network,
    File,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::File => "file",
        })
    }
}

/// Storage contract shared by every backend
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Stored value, or `None` if absent or expired
    async fn get(&self, id: &StorageId) -> Result<Option<Value>>;

    /// Store `value` until `expires_at`, replacing any previous entry
    async fn set(&self, id: &StorageId, value: &Value, expires_at: DateTime<Utc>) -> Result<bool>;

    /// `true` if an entry existed and was removed
    async fn delete(&self, id: &StorageId) -> Result<bool>;

    fn kind(&self) -> BackendKind;
}
