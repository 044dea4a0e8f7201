//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations of the scan's preconditions.
///
/// Everything that goes wrong below the scan root (unreadable files,
/// unresolvable references) is recovered locally and never surfaces here.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("scan root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid base package '{value}': {reason}")]
    InvalidBasePackage { value: String, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
