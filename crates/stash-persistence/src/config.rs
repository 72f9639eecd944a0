//! # Store Configuration
//!
//! Explicit configuration handed to `CacheStore::new`. Nothing here is read
//! from the environment; see the CLI for that.

use std::path::PathBuf;
use std::time::Duration;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "my-cache-namespace";

/// Directory used for the file backend when none is configured
pub const DEFAULT_CACHE_DIR: &str = "/tmp/cache";

/// Network (Redis) backend configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Upper bound on the one-time connection attempt
    pub connect_timeout: Duration,
}

impl NetworkConfig {
    /// Connection URL understood by the Redis client
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 6379,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Filesystem backend configuration
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub enabled: bool,
    pub root: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// Cache store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefix separating this application's keys from others sharing a backend
    pub namespace: String,
    pub network: NetworkConfig,
    pub file: FileConfig,
}

impl StoreConfig {
    /// File backend only, rooted at `root`
    pub fn file_only(root: impl Into<PathBuf>) -> Self {
        Self {
            file: FileConfig {
                enabled: true,
                root: root.into(),
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            network: NetworkConfig::default(),
            file: FileConfig::default(),
        }
    }
}
