//! In-memory position book
//!
//! Thread-safe using a single async RwLock around the list and its
//! per-id tick bookkeeping.

use std::collections::HashMap;

use async_trait::async_trait;
use bookwatch_domain::{Position, PositionId, StatusUpdate, TickId};
use bookwatch_engine::apply_status_updates;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::repository::{MergeReport, PositionRepository};

#[derive(Debug, Default)]
struct Inner {
    positions: Vec<Position>,
    /// Last tick whose update was merged, per id
    applied_ticks: HashMap<PositionId, TickId>,
}

impl Inner {
    fn contains(&self, id: PositionId) -> bool {
        self.positions.iter().any(|p| p.id == id)
    }
}

/// Lock-guarded, ordered position list.
#[derive(Debug, Default)]
pub struct PositionBook {
    inner: RwLock<Inner>,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a book seeded from an externally loaded list.
    ///
    /// Fails on the first duplicated id.
    pub fn seeded(positions: Vec<Position>) -> Result<Self, StoreError> {
        let mut inner = Inner::default();
        for position in positions {
            if inner.contains(position.id) {
                return Err(StoreError::Duplicate(position.id));
            }
            inner.positions.push(position);
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }
}

#[async_trait]
impl PositionRepository for PositionBook {
    async fn append(&self, position: Position) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.contains(position.id) {
            warn!(position_id = %position.id, "Rejected duplicate position");
            return Err(StoreError::Duplicate(position.id));
        }
        debug!(position_id = %position.id, side = %position.side, "Position appended");
        inner.positions.push(position);
        Ok(())
    }

    async fn snapshot(&self) -> Vec<Position> {
        self.inner.read().await.positions.clone()
    }

    async fn find_by_id(&self, id: PositionId) -> Option<Position> {
        self.inner
            .read()
            .await
            .positions
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    async fn merge_statuses(
        &self,
        tick: TickId,
        updates: &[StatusUpdate],
        shutdown: &CancellationToken,
    ) -> Option<MergeReport> {
        let mut inner = self.inner.write().await;
        if shutdown.is_cancelled() {
            debug!(tick, "Discarding merge requested after shutdown");
            return None;
        }

        let (fresh, stale): (Vec<StatusUpdate>, Vec<StatusUpdate>) =
            updates.iter().cloned().partition(|u| {
                inner
                    .applied_ticks
                    .get(&u.id)
                    .map_or(true, |&applied| applied <= tick)
            });

        for update in &stale {
            debug!(position_id = %update.id, tick, "Refused status from older tick");
        }

        let changed = apply_status_updates(&mut inner.positions, &fresh);

        for update in &fresh {
            if inner.contains(update.id) {
                inner.applied_ticks.insert(update.id, tick);
            }
        }

        Some(MergeReport {
            changed,
            stale: stale.len(),
        })
    }

    async fn len(&self) -> usize {
        self.inner.read().await.positions.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bookwatch_domain::{OrderSide, PositionStatus, Price, Quantity};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn position(id: u64) -> Position {
        Position::new(
            PositionId::new(id),
            OrderSide::Sell,
            Price::new(dec!(12.5)).unwrap(),
            Quantity::new(dec!(4)).unwrap(),
            Utc::now(),
        )
    }

    fn update(id: u64, raw: &str) -> StatusUpdate {
        StatusUpdate::new(PositionId::new(id), PositionStatus::from_report(raw).unwrap())
    }

    async fn merge(book: &PositionBook, tick: TickId, updates: &[StatusUpdate]) -> MergeReport {
        book.merge_statuses(tick, updates, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_append_preserves_order_and_rejects_duplicates() {
        let book = PositionBook::new();
        book.append(position(3)).await.unwrap();
        book.append(position(1)).await.unwrap();

        let err = book.append(position(3)).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate(PositionId::new(3)));

        let ids: Vec<u64> = book.snapshot().await.iter().map(|p| p.id.as_u64()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_seeded_rejects_duplicates() {
        assert!(PositionBook::seeded(vec![position(1), position(2)]).is_ok());
        assert!(matches!(
            PositionBook::seeded(vec![position(1), position(1)]),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_merge_keeps_positions_added_after_snapshot() {
        let book = PositionBook::new();
        book.append(position(1)).await.unwrap();

        let snapshot = book.snapshot().await;
        book.append(position(2)).await.unwrap();

        let updates: Vec<StatusUpdate> = snapshot.iter().map(|p| update(p.id.as_u64(), "Filled")).collect();
        let report = merge(&book, 1, &updates).await;
        assert_eq!(report.changed, 1);

        let current = book.snapshot().await;
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].status.as_str(), "Filled");
        assert_eq!(current[1].id, PositionId::new(2));
        assert!(current[1].status.is_new());
    }

    #[tokio::test]
    async fn test_older_tick_cannot_regress_newer_status() {
        let book = PositionBook::new();
        book.append(position(5)).await.unwrap();

        merge(&book, 2, &[update(5, "Filled")]).await;
        let report = merge(&book, 1, &[update(5, "New")]).await;

        assert_eq!(report.stale, 1);
        assert_eq!(report.changed, 0);
        let current = book.find_by_id(PositionId::new(5)).await.unwrap();
        assert_eq!(current.status.as_str(), "Filled");
    }

    #[tokio::test]
    async fn test_ticks_merged_in_order_reflect_latest() {
        let book = PositionBook::new();
        book.append(position(5)).await.unwrap();

        merge(&book, 1, &[update(5, "Partial")]).await;
        merge(&book, 2, &[update(5, "Filled")]).await;

        let current = book.find_by_id(PositionId::new(5)).await.unwrap();
        assert_eq!(current.status.as_str(), "Filled");
    }

    #[tokio::test]
    async fn test_merge_for_unknown_id_is_ignored() {
        let book = PositionBook::new();
        book.append(position(1)).await.unwrap();

        let report = merge(&book, 1, &[update(42, "Filled")]).await;
        assert_eq!(report, MergeReport::default());
        assert_eq!(book.len().await, 1);
        assert!(book.find_by_id(PositionId::new(42)).await.is_none());
    }

    #[tokio::test]
    async fn test_merge_after_shutdown_writes_nothing() {
        let book = PositionBook::new();
        book.append(position(1)).await.unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let report = book.merge_statuses(1, &[update(1, "Filled")], &shutdown).await;
        assert!(report.is_none());
        assert!(book.find_by_id(PositionId::new(1)).await.unwrap().status.is_new());

        // The refused tick leaves no bookkeeping behind
        assert_eq!(merge(&book, 1, &[update(1, "Filled")]).await.changed, 1);
    }
}
