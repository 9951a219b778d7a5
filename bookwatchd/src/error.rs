//! Daemon error types.

use bookwatch_connectors::LookupFailure;
use bookwatch_domain::DomainError;
use bookwatch_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Venue lookup error
    #[error("Venue error: {0}")]
    Lookup(#[from] LookupFailure),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Work finished after stop was requested; its result was discarded
    #[error("Result discarded after stop")]
    ShutdownRace,

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
