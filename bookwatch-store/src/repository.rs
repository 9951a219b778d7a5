//! Repository trait definitions (Ports)
//!
//! The position list is the only shared mutable resource. Implementations
//! must make each operation atomic with respect to the others.

use async_trait::async_trait;
use bookwatch_domain::{Position, PositionId, StatusUpdate, TickId};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Outcome of one tick's merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Positions whose status changed
    pub changed: usize,
    /// Updates refused because a newer tick already wrote that id
    pub stale: usize,
}

/// Ordered, id-unique position list
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Append a newly submitted position at the end of the list.
    ///
    /// Fails with `StoreError::Duplicate` if the id is already tracked.
    async fn append(&self, position: Position) -> Result<(), StoreError>;

    /// Copy of the whole list in insertion order.
    async fn snapshot(&self) -> Vec<Position>;

    /// Find a position by id
    async fn find_by_id(&self, id: PositionId) -> Option<Position>;

    /// Merge one tick's status updates into the current list by id.
    ///
    /// Updates from a tick older than the last one applied to the same id
    /// are refused, so a slow tick can never regress a newer status.
    ///
    /// `shutdown` is checked while the write lock is held. Once it is
    /// cancelled nothing is written and `None` is returned.
    async fn merge_statuses(
        &self,
        tick: TickId,
        updates: &[StatusUpdate],
        shutdown: &CancellationToken,
    ) -> Option<MergeReport>;

    /// Number of tracked positions
    async fn len(&self) -> usize;

    /// True when no positions are tracked
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
