//! CLI error types

use std::path::PathBuf;
use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No resolver given: pass --resolver or set OLANG_RESOLVER")]
    MissingResolver,

    #[error("Resolver not found: {}", .0.display())]
    ResolverNotFound(PathBuf),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
