//! # Redis Backend
//!
//! Thin adapter over a Redis connection manager. Expiry and miss semantics
//! are the server's own; nothing is retried.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use stash_domain::StorageId;

use super::{BackendKind, CacheBackend};
use crate::config::NetworkConfig;
use crate::error::{CacheError, Result};

/// Redis-backed cache storage
#[derive(Clone)]
pub struct NetworkBackend {
    conn: ConnectionManager,
    endpoint: String,
}

impl NetworkBackend {
    /// Connect to the configured server and confirm it answers `PING`.
    ///
    /// The whole attempt is bounded by `config.connect_timeout`.
    pub async fn connect(config: &NetworkConfig) -> Result<Self> {
        let client = Client::open(config.url())?;

        let attempt = async {
            let mut conn = ConnectionManager::new(client).await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, CacheError>(conn)
        };

        let conn = tokio::time::timeout(config.connect_timeout, attempt)
            .await
            .map_err(|_| {
                CacheError::Network(format!(
                    "connection to {} timed out after {:?}",
                    config.endpoint(),
                    config.connect_timeout
                ))
            })??;

        Ok(Self {
            conn,
            endpoint: config.endpoint(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CacheBackend for NetworkBackend {
    async fn get(&self, id: &StorageId) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(id.as_str()).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &StorageId, value: &Value, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(value)?;

        // EXAT rejects non-positive timestamps; anything in the past expires immediately
        let reply: Option<String> = redis::cmd("SET")
            .arg(id.as_str())
            .arg(json)
            .arg("EXAT")
            .arg(expires_at.timestamp().max(1))
            .query_async(&mut conn)
            .await?;

        Ok(reply.as_deref() == Some("OK"))
    }

    async fn delete(&self, id: &StorageId) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(id.as_str()).await?;
        Ok(deleted > 0)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Network
    }
}
