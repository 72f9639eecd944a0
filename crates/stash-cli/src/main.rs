//! # Stash CLI
//!
//! Binary entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stash_cli::{Cli, Config, LogFormat, execute};
use stash_persistence::CacheStore;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    cli.apply(&mut config);

    init_tracing(&config);

    tracing::debug!(
        version = stash_cli::VERSION,
        namespace = %config.store.namespace,
        network = config.store.network.enabled,
        file = config.store.file.enabled,
        "Starting stash"
    );

    let store = CacheStore::new(config.store);

    match execute(&store, &cli.command).await {
        Ok(response) => {
            if let Some(line) = response.render() {
                println!("{line}");
            }
            Ok(response.exit_code())
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("stash: {e}");
            Ok(e.exit_code())
        }
    }
}

/// Logs go to stderr so stdout carries only command output
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
