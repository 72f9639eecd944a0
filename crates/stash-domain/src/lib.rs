//! # Stash - Domain Model
//!
//! Core types shared by the persistence layer and the CLI: namespaced
//! storage identifiers, the on-disk entry envelope, expiry expressions and
//! the tagged read/write/delete operation passed to `CacheStore::access`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod expiry;

pub use expiry::{DEFAULT_EXPIRY, DayAnchor, ExpirySpec, RelativeTerm, TimeUnit};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Separator placed between the namespace and the caller's key
pub const NAMESPACE_SEPARATOR: char = '.';

/// Namespace-qualified form of a cache key, used for every backend lookup.
///
/// Two applications sharing one cache server (or one cache directory) only
/// collide if they also share a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(String);

impl StorageId {
    pub fn new(namespace: &str, key: &str) -> Self {
        Self(format!("{namespace}{NAMESPACE_SEPARATOR}{key}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ENTRY ENVELOPE
// =============================================================================

/// Current envelope format version
pub const ENVELOPE_VERSION: u32 = 1;

/// A stored value together with the id it was written under and its
/// absolute expiry.
///
/// Overwritten wholesale on every write; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: u32,
    pub key: String,
    pub data: serde_json::Value,
    /// Unix timestamp in seconds
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn new(id: &StorageId, data: serde_json::Value, expires_at: DateTime<Utc>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            key: id.as_str().to_string(),
            data,
            expires_at: expires_at.timestamp(),
        }
    }

    /// An entry whose expiry equals the current second is already stale.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    #[must_use]
    pub fn belongs_to(&self, id: &StorageId) -> bool {
        self.key == id.as_str()
    }

    /// Reject envelopes written by a format this build does not understand
    pub fn check_version(&self) -> Result<(), DomainError> {
        if self.version == ENVELOPE_VERSION {
            Ok(())
        } else {
            Err(DomainError::UnsupportedEnvelopeVersion {
                found: self.version,
                expected: ENVELOPE_VERSION,
            })
        }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// What a single `access` call should do with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp<T> {
    Read,
    Write(T),
    Delete,
}

impl<T> CacheOp<T> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write(_) => "write",
            Self::Delete => "delete",
        }
    }
}

/// Result of an `access` call.
///
/// A miss is an ordinary outcome, distinct from any stored value
/// (including `0`, `""` and `false`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Hit(T),
    Miss,
    /// Whether the backend accepted the write
    Written(bool),
    /// `true` only if an entry existed and was removed
    Deleted(bool),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn into_hit(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    /// Boolean view matching memcache-style callers: hits, accepted writes
    /// and actual removals are `true`.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        match self {
            Self::Hit(_) => true,
            Self::Miss => false,
            Self::Written(ok) | Self::Deleted(ok) => *ok,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid expiry expression: {0}")]
    InvalidExpiry(String),

    #[error("Unsupported envelope version {found} (expected {expected})")]
    UnsupportedEnvelopeVersion { found: u32, expected: u32 },
}
