//! Stub venue for testing.
//!
//! Serves a settable book and per-position status reports without any
//! network traffic. Failures and slow answers can be injected per position.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use bookwatch_domain::{OrderBookSnapshot, PositionId};

use crate::ports::{LookupFailure, SnapshotSource, StatusSource};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// In-memory venue.
///
/// Positions without a configured status answer like the real venue does
/// for unknown orders: no status field.
#[derive(Debug, Default)]
pub struct StubVenue {
    /// Book served by `fetch_snapshot`
    book: RwLock<OrderBookSnapshot>,
    /// Raw status text per position
    statuses: RwLock<HashMap<PositionId, String>>,
    /// Failures returned instead of a status
    failures: RwLock<HashMap<PositionId, LookupFailure>>,
    /// Artificial latency per position
    delays: RwLock<HashMap<PositionId, Duration>>,
    /// Failure returned by the next snapshot fetch only
    fail_next_snapshot: RwLock<Option<LookupFailure>>,
    /// Number of status lookups served
    lookups: AtomicUsize,
}

impl StubVenue {
    /// Create an empty stub venue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the book.
    pub fn set_book(&self, book: OrderBookSnapshot) {
        *write(&self.book) = book;
    }

    /// Set the raw status text reported for a position.
    pub fn set_status(&self, id: PositionId, status: impl Into<String>) {
        write(&self.statuses).insert(id, status.into());
    }

    /// Make every lookup for `id` fail with `failure`.
    pub fn fail_lookup(&self, id: PositionId, failure: LookupFailure) {
        write(&self.failures).insert(id, failure);
    }

    /// Delay every lookup for `id` by `delay`.
    pub fn delay_lookup(&self, id: PositionId, delay: Duration) {
        write(&self.delays).insert(id, delay);
    }

    /// Remove injected failures and delays for `id`.
    pub fn clear_faults(&self, id: PositionId) {
        write(&self.failures).remove(&id);
        write(&self.delays).remove(&id);
    }

    /// Configure the next snapshot fetch to fail.
    pub fn fail_next_snapshot(&self, failure: LookupFailure) {
        *write(&self.fail_next_snapshot) = Some(failure);
    }

    /// Number of status lookups served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for StubVenue {
    async fn fetch_snapshot(&self) -> Result<OrderBookSnapshot, LookupFailure> {
        if let Some(failure) = write(&self.fail_next_snapshot).take() {
            return Err(failure);
        }
        Ok(read(&self.book).clone())
    }
}

#[async_trait]
impl StatusSource for StubVenue {
    async fn lookup_status(&self, id: PositionId) -> Result<String, LookupFailure> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let delay = read(&self.delays).get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = read(&self.failures).get(&id).cloned() {
            return Err(failure);
        }

        read(&self.statuses)
            .get(&id)
            .cloned()
            .ok_or(LookupFailure::MissingStatus(id))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bookwatch_domain::OrderBookLevel;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_stub_serves_configured_book() {
        let venue = StubVenue::new();
        venue.set_book(OrderBookSnapshot::from_pairs(&[(dec!(10), dec!(1))], &[]));

        let book = venue.fetch_snapshot().await.unwrap();
        assert_eq!(book.bids, vec![OrderBookLevel::bid(dec!(10), dec!(1))]);
    }

    #[tokio::test]
    async fn test_fail_next_snapshot_is_one_shot() {
        let venue = StubVenue::new();
        venue.fail_next_snapshot(LookupFailure::BadStatus(503));

        assert_eq!(venue.fetch_snapshot().await, Err(LookupFailure::BadStatus(503)));
        assert!(venue.fetch_snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn test_status_lookup_and_failures() {
        let venue = StubVenue::new();
        let id = PositionId::new(4);
        venue.set_status(id, "Partially filled");

        assert_eq!(venue.lookup_status(id).await.unwrap(), "Partially filled");
        assert_eq!(
            venue.lookup_status(PositionId::new(99)).await,
            Err(LookupFailure::MissingStatus(PositionId::new(99)))
        );

        venue.fail_lookup(id, LookupFailure::Network("reset".into()));
        assert!(venue.lookup_status(id).await.is_err());

        venue.clear_faults(id);
        assert!(venue.lookup_status(id).await.is_ok());
        assert_eq!(venue.lookup_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_lookup_waits() {
        let venue = StubVenue::new();
        let id = PositionId::new(1);
        venue.set_status(id, "New");
        venue.delay_lookup(id, Duration::from_secs(3));

        let started = tokio::time::Instant::now();
        venue.lookup_status(id).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
