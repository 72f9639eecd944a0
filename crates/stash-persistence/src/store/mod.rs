//! # Cache Store
//!
//! Single entry point over whichever backend the configuration allows.
//! The backend is resolved on first use and reused for the lifetime of the
//! store; a failed network connection is never retried.

mod resolve;

use serde::Serialize;
use serde::de::DeserializeOwned;
use stash_domain::{CacheOp, ExpirySpec, Outcome, StorageId};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::backend::{BackendKind, CacheBackend};
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};

/// Namespaced key-value cache
pub struct CacheStore {
    config: StoreConfig,
    backend: OnceCell<Option<Arc<dyn CacheBackend>>>,
}

impl CacheStore {
    /// Create a store; no connection is attempted until the first access.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            backend: OnceCell::new(),
        }
    }

    /// Create a store bound to an already constructed backend
    pub fn with_backend(config: StoreConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend: OnceCell::new_with(Some(Some(backend))),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn storage_id(&self, key: &str) -> StorageId {
        StorageId::new(&self.config.namespace, key)
    }

    /// Whether backend selection has already run
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.backend.initialized()
    }

    async fn backend(&self) -> Result<&Arc<dyn CacheBackend>> {
        self.backend
            .get_or_init(|| resolve::resolve_backend(&self.config))
            .await
            .as_ref()
            .ok_or(CacheError::NoBackendAvailable)
    }

    /// Backend this store resolved to, resolving it if needed
    pub async fn backend_kind(&self) -> Result<BackendKind> {
        Ok(self.backend().await?.kind())
    }

    /// Read, write or delete `key`.
    ///
    /// `expiry` is only consulted for writes, where it is resolved once
    /// against the current time.
    pub async fn access<T>(&self, key: &str, op: CacheOp<T>, expiry: &ExpirySpec) -> Result<Outcome<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let backend = self.backend().await?;
        let id = self.storage_id(key);

        tracing::debug!(
            backend = %backend.kind(),
            op = op.name(),
            key,
            storage_id = %id,
            "Cache access"
        );

        match op {
            CacheOp::Read => match backend.get(&id).await? {
                Some(value) => Ok(Outcome::Hit(serde_json::from_value(value)?)),
                None => Ok(Outcome::Miss),
            },
            CacheOp::Write(value) => {
                let expires_at = expiry.resolve_now()?;
                let value = serde_json::to_value(&value)?;
                let ok = backend.set(&id, &value, expires_at).await?;
                Ok(Outcome::Written(ok))
            }
            CacheOp::Delete => Ok(Outcome::Deleted(backend.delete(&id).await?)),
        }
    }

    /// Stored value for `key`, or `None` on a miss
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let outcome = self.access(key, CacheOp::Read, &ExpirySpec::default()).await?;
        Ok(outcome.into_hit())
    }

    /// Store `value` for the default lifetime of one year
    pub async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<bool> {
        self.set_with_expiry(key, value, &ExpirySpec::default()).await
    }

    pub async fn set_with_expiry<T: Serialize>(
        &self,
        key: &str,
        value: T,
        expiry: &ExpirySpec,
    ) -> Result<bool> {
        let value = serde_json::to_value(&value)?;
        let outcome = self.access(key, CacheOp::Write(value), expiry).await?;
        Ok(outcome.succeeded())
    }

    /// `true` if an entry existed and was removed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let outcome = self
            .access::<serde_json::Value>(key, CacheOp::Delete, &ExpirySpec::default())
            .await?;
        Ok(outcome.succeeded())
    }
}

/// Shared cache store wrapper
pub type SharedCacheStore = Arc<CacheStore>;

/// Create a shared cache store
pub fn shared_store(store: CacheStore) -> SharedCacheStore {
    Arc::new(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
    }

    fn file_store() -> (TempDir, CacheStore) {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(StoreConfig::file_only(dir.path()).with_namespace("test"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_user_scenario() {
        let (_dir, store) = file_store();
        let ann = User {
            name: "Ann".to_string(),
        };
        let year: ExpirySpec = "+1 year".parse().unwrap();

        let written = store
            .access("user:42", CacheOp::Write(ann.clone()), &year)
            .await
            .unwrap();
        assert_eq!(written, Outcome::Written(true));

        let read = store
            .access::<User>("user:42", CacheOp::Read, &year)
            .await
            .unwrap();
        assert_eq!(read, Outcome::Hit(ann));

        let deleted = store
            .access::<User>("user:42", CacheOp::Delete, &year)
            .await
            .unwrap();
        assert_eq!(deleted, Outcome::Deleted(true));

        let read = store
            .access::<User>("user:42", CacheOp::Read, &year)
            .await
            .unwrap();
        assert!(read.is_miss());
    }

    #[tokio::test]
    async fn test_falsy_values_are_not_misses() {
        let (_dir, store) = file_store();

        assert!(store.set("zero", 0).await.unwrap());
        assert!(store.set("empty", String::new()).await.unwrap());
        assert!(store.set("no", false).await.unwrap());

        assert_eq!(store.get::<i32>("zero").await.unwrap(), Some(0));
        assert_eq!(store.get::<String>("empty").await.unwrap(), Some(String::new()));
        assert_eq!(store.get::<bool>("no").await.unwrap(), Some(false));
        assert_eq!(store.get::<bool>("never-written").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_past_expiry_is_a_miss_and_evicts() {
        let (dir, store) = file_store();
        let past: ExpirySpec = "-1 day".parse().unwrap();

        assert!(store.set_with_expiry("old", "value", &past).await.unwrap());

        let path = crate::backend::ShardedPath::resolve(dir.path(), &store.storage_id("old"));
        assert!(path.file().exists());

        assert_eq!(store.get::<String>("old").await.unwrap(), None);
        assert!(!path.file().exists());
    }

    #[tokio::test]
    async fn test_numeric_expiry_in_the_past() {
        let (_dir, store) = file_store();
        let expiry = ExpirySpec::from(Utc::now().timestamp() - 60);

        store.set_with_expiry("k", 1, &expiry).await.unwrap();
        assert_eq!(store.get::<i32>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = file_store();

        assert!(!store.delete("missing").await.unwrap());
        store.set("present", 1).await.unwrap();
        assert!(store.delete("present").await.unwrap());
        assert!(!store.delete("present").await.unwrap());
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let a = CacheStore::new(StoreConfig::file_only(dir.path()).with_namespace("app-a"));
        let b = CacheStore::new(StoreConfig::file_only(dir.path()).with_namespace("app-b"));

        a.set("shared", "from a").await.unwrap();
        assert_eq!(b.get::<String>("shared").await.unwrap(), None);
        assert_eq!(a.get::<String>("shared").await.unwrap().as_deref(), Some("from a"));
    }

    #[tokio::test]
    async fn test_no_backend_is_fatal_and_resolved_once() {
        let mut config = StoreConfig::default();
        config.file.enabled = false;
        let store = CacheStore::new(config);
        assert!(!store.is_resolved());

        let err = store.get::<i32>("k").await.unwrap_err();
        assert!(err.is_fatal());
        assert!(store.is_resolved());

        assert!(matches!(
            store.delete("k").await,
            Err(CacheError::NoBackendAvailable)
        ));
    }

    #[tokio::test]
    async fn test_invalid_expiry_rejects_write_only() {
        let (_dir, store) = file_store();
        let bogus = ExpirySpec::Timestamp(i64::MAX);

        assert!(matches!(
            store.access("k", CacheOp::Write(1), &bogus).await,
            Err(CacheError::Domain(_))
        ));
        assert!(store.access::<i32>("k", CacheOp::Read, &bogus).await.unwrap().is_miss());
    }

    /// In-memory backend recording the ids and expiries it receives
    #[derive(Default)]
    struct RecordingBackend {
        entries: Mutex<HashMap<String, (Value, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl CacheBackend for RecordingBackend {
        async fn get(&self, id: &StorageId) -> Result<Option<Value>> {
            let entries = self.entries.lock().unwrap();
            Ok(entries.get(id.as_str()).map(|(value, _)| value.clone()))
        }

        async fn set(&self, id: &StorageId, value: &Value, expires_at: DateTime<Utc>) -> Result<bool> {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(id.as_str().to_string(), (value.clone(), expires_at));
            Ok(true)
        }

        async fn delete(&self, id: &StorageId) -> Result<bool> {
            Ok(self.entries.lock().unwrap().remove(id.as_str()).is_some())
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Network
        }
    }

    #[tokio::test]
    async fn test_dispatch_uses_namespaced_ids_and_absolute_expiry() {
        let backend = Arc::new(RecordingBackend::default());
        let store = CacheStore::with_backend(
            StoreConfig::default().with_namespace("ns"),
            backend.clone(),
        );
        assert_eq!(store.backend_kind().await.unwrap(), BackendKind::Network);

        store
            .set_with_expiry("k", json!({"a": 1}), &ExpirySpec::Timestamp(2_000_000_000))
            .await
            .unwrap();

        let entries = backend.entries.lock().unwrap();
        let (value, expires_at) = entries.get("ns.k").unwrap();
        assert_eq!(value, &json!({"a": 1}));
        assert_eq!(expires_at.timestamp(), 2_000_000_000);
    }

    #[tokio::test]
    async fn test_shared_store_across_tasks() {
        let (_dir, store) = file_store();
        let store = shared_store(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.set(&format!("task:{i}"), i).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        assert_eq!(store.get::<i32>("task:7").await.unwrap(), Some(7));
        assert_eq!(store.backend_kind().await.unwrap(), BackendKind::File);
    }
}
