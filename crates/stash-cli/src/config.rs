//! # CLI Configuration
//!
//! Environment-based configuration, overridable from the command line.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use stash_persistence::StoreConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache store configuration
    pub store: StoreConfig,

    /// Logging level, used when `RUST_LOG` is unset
    pub log_level: String,

    /// Logging format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str, default: bool| {
            var(name)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"))
                .unwrap_or(default)
        };

        let mut store = StoreConfig::default();

        if let Some(namespace) = var("STASH_NAMESPACE") {
            store.namespace = namespace;
        }

        store.file.enabled = flag("STASH_USE_FILE", store.file.enabled);
        if let Some(dir) = var("STASH_DIR") {
            store.file.root = PathBuf::from(dir);
        }

        store.network.enabled = flag("STASH_USE_NETWORK", store.network.enabled);
        if let Some(host) = var("STASH_HOST") {
            store.network.host = host;
        }
        store.network.port = var("STASH_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(store.network.port);
        store.network.connect_timeout = var("STASH_CONNECT_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .map_or(store.network.connect_timeout, Duration::from_millis);

        Self {
            store,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
