//! # Stash Persistence Library
//!
//! Namespaced key-value cache with one entry point, `CacheStore::access`,
//! over two interchangeable backends:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CacheStore::access(key, op, expiry)            │
//! │        (namespacing, expiry resolution, op dispatch)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                  resolved once per store
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     Redis Backend       │   │        File Backend          │
//! │  (preferred if enabled  │   │  <root>/ab/cd/abcd…ef JSON   │
//! │   and reachable)        │   │  envelopes, lazy expiry      │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `redis`: Enable the Redis network backend (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stash_domain::{CacheOp, ExpirySpec, Outcome};
//! use stash_persistence::{CacheStore, StoreConfig};
//!
//! let store = CacheStore::new(StoreConfig::file_only("/tmp/cache"));
//! let year: ExpirySpec = "+1 year".parse()?;
//!
//! store.access("user:42", CacheOp::Write(user), &year).await?;
//! if let Outcome::Hit(user) = store.access::<User>("user:42", CacheOp::Read, &year).await? {
//!     // ...
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use backend::{BackendKind, CacheBackend, FileBackend, ShardedPath};
#[cfg(feature = "redis")]
pub use backend::NetworkBackend;
pub use config::{FileConfig, NetworkConfig, StoreConfig};
pub use error::{CacheError, Result};
pub use store::{CacheStore, SharedCacheStore, shared_store};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
