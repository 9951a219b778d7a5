//! Source port definitions.
//!
//! Ports define what the core needs from the venue; adapters implement them
//! for a concrete transport (REST, stub).

use async_trait::async_trait;
use bookwatch_domain::{OrderBookSnapshot, PositionId};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Failure to obtain data from an external source.
///
/// Always recoverable: for status lookups it only means "no update this
/// tick" for one position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    /// Transport-level failure (connect, reset, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// No answer within the allotted time
    #[error("Request timed out")]
    Timeout,

    /// Non-2xx HTTP response
    #[error("Unexpected HTTP status {0}")]
    BadStatus(u16),

    /// Body could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Body decoded but carried no usable status field
    #[error("Response has no status for position {0}")]
    MissingStatus(PositionId),
}

/// Raw status text as reported by the venue, before normalization.
pub type StatusReport = String;

// =============================================================================
// Ports
// =============================================================================

/// Port for full order book snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current book, both sides.
    async fn fetch_snapshot(&self) -> Result<OrderBookSnapshot, LookupFailure>;
}

/// Port for per-position status reports.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Look up the raw status text the venue reports for `id`.
    ///
    /// The text is returned as received; callers normalize it.
    async fn lookup_status(&self, id: PositionId) -> Result<StatusReport, LookupFailure>;
}
