//! Storage layer errors

use bookwatch_domain::PositionId;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A position with this id is already tracked
    #[error("Duplicate position: {0}")]
    Duplicate(PositionId),
}
