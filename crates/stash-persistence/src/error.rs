//! Cache store error types

use std::path::PathBuf;

use stash_domain::DomainError;
use thiserror::Error;

/// Cache store errors
///
/// A miss is never an error; it is reported as `Outcome::Miss`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("No storage backend available: every backend is disabled or unreachable")]
    NoBackendAvailable,

    #[error("Cannot create cache directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache directory not writable: {}", path.display())]
    DirectoryNotWritable { path: PathBuf },

    #[error("Network cache error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CacheError {
    /// Whether the error means no cache can be used at all for this process
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::NoBackendAvailable)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
