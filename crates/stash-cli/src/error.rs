//! # CLI Error Types

use std::process::ExitCode;

use stash_domain::DomainError;
use stash_persistence::CacheError;
use thiserror::Error;

/// CLI-level errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CliError {
    /// Process exit code for this error
    ///
    /// `1` is reserved for a cache miss.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Cache(e) if e.is_fatal() => ExitCode::from(3),
            Self::Domain(_) => ExitCode::from(64),
            Self::Cache(_) => ExitCode::from(2),
        }
    }
}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;
