//! Backend selection policy.

use std::sync::Arc;

use crate::backend::{CacheBackend, FileBackend};
use crate::config::StoreConfig;

/// Pick the backend for a store:
///
/// 1. network, if enabled and a connection plus `PING` succeeds
/// 2. file, if enabled
/// 3. none
///
/// Called at most once per store.
pub(crate) async fn resolve_backend(config: &StoreConfig) -> Option<Arc<dyn CacheBackend>> {
    if config.network.enabled {
        if let Some(backend) = connect_network(config).await {
            return Some(backend);
        }
    }

    if config.file.enabled {
        tracing::info!(root = %config.file.root.display(), "Using file cache backend");
        return Some(Arc::new(FileBackend::new(&config.file.root)));
    }

    tracing::error!(
        network_enabled = config.network.enabled,
        file_enabled = config.file.enabled,
        "No storage engines left to try"
    );
    None
}

#[cfg(feature = "redis")]
async fn connect_network(config: &StoreConfig) -> Option<Arc<dyn CacheBackend>> {
    use crate::backend::NetworkBackend;

    let endpoint = config.network.endpoint();
    match NetworkBackend::connect(&config.network).await {
        Ok(backend) => {
            tracing::info!(%endpoint, "Using network cache backend");
            Some(Arc::new(backend))
        }
        Err(e) => {
            tracing::warn!(%endpoint, error = %e, "Network cache unavailable");
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_network(_config: &StoreConfig) -> Option<Arc<dyn CacheBackend>> {
    tracing::warn!("Network cache enabled but this build has no Redis support");
    None
}
