//! # Stash CLI
//!
//! Read, write and delete cache entries from the shell against the same
//! store an application would use.
//!
//! ```text
//! stash set user:42 '{"name":"Ann"}' --expires "+1 year"
//! stash get user:42
//! stash delete user:42
//! stash path user:42
//! ```
//!
//! `get` prints the stored JSON and exits with status 1 on a miss. `set`
//! and `delete` print `true` or `false`.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use stash_domain::{CacheOp, DEFAULT_EXPIRY, ExpirySpec, Outcome};
use stash_persistence::{CacheStore, ShardedPath};

pub use config::{Config, LogFormat};
pub use error::{CliError, CliResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "stash", version, about = "Namespaced key-value cache")]
pub struct Cli {
    /// Key namespace [env: STASH_NAMESPACE]
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// File backend root directory [env: STASH_DIR]
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Redis host [env: STASH_HOST]
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Redis port [env: STASH_PORT]
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Try the Redis backend before the file backend
    #[arg(long, global = true, conflicts_with = "no_network")]
    pub network: bool,

    /// Disable the Redis backend [env: STASH_USE_NETWORK]
    #[arg(long, global = true)]
    pub no_network: bool,

    /// Enable the file backend
    #[arg(long, global = true, conflicts_with = "no_file")]
    pub file: bool,

    /// Disable the file backend [env: STASH_USE_FILE]
    #[arg(long, global = true)]
    pub no_file: bool,

    /// Log format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the value stored under a key
    Get { key: String },

    /// Store a value; arguments that are not valid JSON are stored as strings
    Set {
        key: String,
        value: String,
        /// Relative expression, date, or Unix timestamp
        #[arg(long, default_value = DEFAULT_EXPIRY)]
        expires: String,
    },

    /// Remove a key
    Delete { key: String },

    /// Print the file backend path for a key
    Path { key: String },

    /// Print which backend the store resolves to
    Backend,
}

impl Cli {
    /// Apply command-line overrides on top of environment configuration
    pub fn apply(&self, config: &mut Config) {
        let store = &mut config.store;

        if let Some(namespace) = &self.namespace {
            store.namespace.clone_from(namespace);
        }
        if let Some(dir) = &self.dir {
            store.file.root.clone_from(dir);
        }
        if let Some(host) = &self.host {
            store.network.host.clone_from(host);
        }
        if let Some(port) = self.port {
            store.network.port = port;
        }
        if self.network {
            store.network.enabled = true;
        }
        if self.no_network {
            store.network.enabled = false;
        }
        if self.file {
            store.file.enabled = true;
        }
        if self.no_file {
            store.file.enabled = false;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }
}

/// What a command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Value(Value),
    Miss,
    Flag(bool),
    Text(String),
}

impl Response {
    /// Line to print on stdout, if any
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Value(value) => Some(value.to_string()),
            Self::Miss => None,
            Self::Flag(flag) => Some(flag.to_string()),
            Self::Text(text) => Some(text.clone()),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Miss => ExitCode::from(1),
            _ => ExitCode::SUCCESS,
        }
    }
}

/// Parse a command-line value: JSON if it parses, otherwise a plain string
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Run one command against `store`
pub async fn execute(store: &CacheStore, command: &Command) -> CliResult<Response> {
    let response = match command {
        Command::Get { key } => {
            let outcome = store
                .access::<Value>(key, CacheOp::Read, &ExpirySpec::default())
                .await?;
            match outcome {
                Outcome::Hit(value) => Response::Value(value),
                _ => Response::Miss,
            }
        }
        Command::Set {
            key,
            value,
            expires,
        } => {
            let expiry: ExpirySpec = expires.parse()?;
            let outcome = store
                .access(key, CacheOp::Write(parse_value(value)), &expiry)
                .await?;
            Response::Flag(outcome.succeeded())
        }
        Command::Delete { key } => {
            let outcome = store
                .access::<Value>(key, CacheOp::Delete, &ExpirySpec::default())
                .await?;
            Response::Flag(outcome.succeeded())
        }
        Command::Path { key } => {
            let path = ShardedPath::resolve(&store.config().file.root, &store.storage_id(key));
            Response::Text(path.file().display().to_string())
        }
        Command::Backend => Response::Text(store.backend_kind().await?.to_string()),
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stash_persistence::StoreConfig;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn store() -> (TempDir, CacheStore) {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(StoreConfig::file_only(dir.path()).with_namespace("cli"));
        (dir, store)
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("0"), json!(0));
        assert_eq!(parse_value("false"), json!(false));
        assert_eq!(parse_value(r#"{"name":"Ann"}"#), json!({"name": "Ann"}));
        assert_eq!(parse_value("hello world"), json!("hello world"));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "stash", "--namespace", "ops", "--network", "--no-file", "--port", "7000", "get", "k",
        ]);
        let mut config = Config::from_vars(|_| None);
        cli.apply(&mut config);

        assert_eq!(config.store.namespace, "ops");
        assert!(config.store.network.enabled);
        assert!(!config.store.file.enabled);
        assert_eq!(config.store.network.port, 7000);
        assert!(matches!(cli.command, Command::Get { ref key } if key == "k"));
    }

    #[test]
    fn test_cli_disables_backends_enabled_by_environment() {
        let cli = Cli::parse_from(["stash", "--no-network", "--file", "backend"]);
        let mut config = Config::from_vars(|name| match name {
            "STASH_USE_NETWORK" => Some("true".to_string()),
            "STASH_USE_FILE" => Some("false".to_string()),
            _ => None,
        });
        assert!(config.store.network.enabled);
        assert!(!config.store.file.enabled);

        cli.apply(&mut config);
        assert!(!config.store.network.enabled);
        assert!(config.store.file.enabled);
    }

    #[test]
    fn test_conflicting_backend_flags_are_rejected() {
        assert!(Cli::try_parse_from(["stash", "--network", "--no-network", "backend"]).is_err());
        assert!(Cli::try_parse_from(["stash", "--file", "--no-file", "backend"]).is_err());
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let (_dir, store) = store();

        let set = Command::Set {
            key: "user:42".to_string(),
            value: r#"{"name":"Ann"}"#.to_string(),
            expires: DEFAULT_EXPIRY.to_string(),
        };
        assert_eq!(assert_ok!(execute(&store, &set).await), Response::Flag(true));

        let get = Command::Get {
            key: "user:42".to_string(),
        };
        assert_eq!(
            assert_ok!(execute(&store, &get).await),
            Response::Value(json!({"name": "Ann"}))
        );

        let delete = Command::Delete {
            key: "user:42".to_string(),
        };
        assert_eq!(assert_ok!(execute(&store, &delete).await), Response::Flag(true));
        assert_eq!(assert_ok!(execute(&store, &delete).await), Response::Flag(false));

        let miss = assert_ok!(execute(&store, &get).await);
        assert_eq!(miss, Response::Miss);
        assert_eq!(miss.render(), None);
    }

    #[tokio::test]
    async fn test_bad_expiry_is_rejected() {
        let (_dir, store) = store();
        let set = Command::Set {
            key: "k".to_string(),
            value: "1".to_string(),
            expires: "whenever".to_string(),
        };

        assert!(matches!(execute(&store, &set).await, Err(CliError::Domain(_))));
    }

    #[tokio::test]
    async fn test_path_and_backend() {
        let (dir, store) = store();

        let Response::Text(path) = assert_ok!(
            execute(&store, &Command::Path { key: "k".to_string() }).await
        ) else {
            panic!("expected a path");
        };
        assert!(path.starts_with(dir.path().to_str().unwrap()));

        assert_eq!(
            assert_ok!(execute(&store, &Command::Backend).await),
            Response::Text("file".to_string())
        );
    }
}
