//! Position Reconciler: keeps the position book in step with the venue.
//!
//! Once per tick the reconciler snapshots the book, issues one status lookup
//! per position concurrently, and merges every successful answer back into
//! the *current* book by id.
//!
//! # Guarantees
//!
//! - A slow or failing lookup only costs its own position an update for
//!   that tick; every lookup is bounded by `lookup_timeout < interval`.
//! - Positions appended while a tick is in flight are left untouched.
//! - Each merge carries its tick number, so an older tick never overwrites
//!   a newer status.
//! - Once [`PositionReconciler::stop`] is requested, nothing is written to
//!   the book; lookups still in flight are abandoned and their results
//!   dropped, and a merge still waiting for the book's lock is refused.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bookwatch_connectors::{LookupFailure, StatusSource};
use bookwatch_domain::{Position, PositionId, PositionStatus, StatusUpdate, TickId};
use bookwatch_engine::merge_status_updates;
use bookwatch_store::{MergeReport, PositionRepository};

use crate::config::ReconcilerConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{DaemonEvent, EventBus};

// =============================================================================
// Position Reconciler
// =============================================================================

/// Supervised background loop polling the venue for position statuses.
pub struct PositionReconciler {
    /// Position book (shared with the API)
    book: Arc<dyn PositionRepository>,
    /// Venue status source
    source: Arc<dyn StatusSource>,
    /// Event bus for publishing tick summaries
    event_bus: Arc<EventBus>,
    /// Cadence and lookup bound
    config: ReconcilerConfig,
    /// Last tick number handed out
    last_tick: AtomicU64,
    /// Shutdown token
    shutdown_token: CancellationToken,
    /// Loop task, present while started
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PositionReconciler {
    /// Create a new reconciler. Nothing runs until [`start`](Self::start).
    pub fn new(
        book: Arc<dyn PositionRepository>,
        source: Arc<dyn StatusSource>,
        event_bus: Arc<EventBus>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            book,
            source,
            event_bus,
            config,
            last_tick: AtomicU64::new(0),
            shutdown_token: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Reconcile a list of positions in one pass.
    ///
    /// Looks up every position, then returns the list with each answered
    /// status applied. Failed lookups leave their position as it was. If the
    /// reconciler is stopped meanwhile, the list is returned unchanged.
    pub async fn reconcile(&self, positions: Vec<Position>) -> Vec<Position> {
        match self.collect_updates(&positions).await {
            Ok(updates) => merge_status_updates(positions, &updates),
            Err(_) => positions,
        }
    }

    /// Run a single tick against the shared book.
    ///
    /// # Errors
    /// Returns `DaemonError::ShutdownRace` if the reconciler was stopped
    /// before the tick could merge; nothing is written in that case.
    pub async fn run_tick(&self) -> DaemonResult<MergeReport> {
        if self.shutdown_token.is_cancelled() {
            return Err(DaemonError::ShutdownRace);
        }

        let tick = self.last_tick.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.book.snapshot().await;
        if snapshot.is_empty() {
            debug!(tick, "No positions to reconcile");
            return Ok(MergeReport::default());
        }

        let updates = self.collect_updates(&snapshot).await?;

        // Checked again under the book's write lock
        let report = self
            .book
            .merge_statuses(tick, &updates, &self.shutdown_token)
            .await
            .ok_or(DaemonError::ShutdownRace)?;
        debug!(
            tick,
            tracked = snapshot.len(),
            answered = updates.len(),
            changed = report.changed,
            stale = report.stale,
            "Reconciliation tick merged"
        );

        if report.changed > 0 {
            self.event_bus.send(DaemonEvent::PositionsReconciled {
                tick,
                changed: report.changed,
                stale: report.stale,
                timestamp: Utc::now(),
            });
        }

        Ok(report)
    }

    /// Fan out one bounded lookup per position and collect the answers.
    async fn collect_updates(&self, positions: &[Position]) -> DaemonResult<Vec<StatusUpdate>> {
        let mut lookups = JoinSet::new();
        for position in positions {
            let id = position.id;
            let source = Arc::clone(&self.source);
            let limit = self.config.lookup_timeout();
            lookups.spawn(async move {
                let result = match timeout(limit, source.lookup_status(id)).await {
                    Ok(result) => result,
                    Err(_) => Err(LookupFailure::Timeout),
                };
                (id, result)
            });
        }

        let mut updates = Vec::with_capacity(positions.len());
        loop {
            tokio::select! {
                biased;

                // Dropping the JoinSet aborts the remaining lookups
                _ = self.shutdown_token.cancelled() => {
                    debug!("Discarding in-flight lookups after stop");
                    return Err(DaemonError::ShutdownRace);
                }

                joined = lookups.join_next() => match joined {
                    None => break,
                    Some(Ok((id, Ok(raw)))) => {
                        if let Some(update) = Self::to_update(id, &raw) {
                            updates.push(update);
                        }
                    }
                    Some(Ok((id, Err(failure)))) => {
                        warn!(position_id = %id, error = %failure, "Status lookup failed, skipping this tick");
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Status lookup task failed");
                    }
                },
            }
        }

        Ok(updates)
    }

    /// Keep only the first token of a raw status report.
    fn to_update(id: PositionId, raw: &str) -> Option<StatusUpdate> {
        match PositionStatus::from_report(raw) {
            Some(status) => Some(StatusUpdate::new(id, status)),
            None => {
                warn!(position_id = %id, "Status report was blank, skipping this tick");
                None
            }
        }
    }

    /// Start the reconciliation loop in the background.
    ///
    /// The first tick runs immediately. Calling `start` on a running
    /// reconciler does nothing; a stopped reconciler cannot be restarted.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            warn!("Position reconciler already started");
            return;
        }

        let reconciler = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            reconciler.run_loop().await;
        }));
    }

    async fn run_loop(&self) {
        info!(
            interval_ms = self.config.interval().as_millis() as u64,
            lookup_timeout_ms = self.config.lookup_timeout().as_millis() as u64,
            "Position reconciler started"
        );

        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("Position reconciler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_tick().await {
                        Ok(_) => {}
                        Err(DaemonError::ShutdownRace) => {
                            debug!("Tick abandoned by shutdown");
                        }
                        Err(e) => {
                            error!(error = %e, "Reconciliation tick failed");
                        }
                    }
                }
            }
        }

        info!("Position reconciler stopped");
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// Once this returns no further write reaches the book.
    pub async fn stop(&self) {
        info!("Shutting down position reconciler");
        self.shutdown_token.cancel();

        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Position reconciler task ended abnormally");
            }
        }
    }

    /// Whether `stop` has been requested.
    pub fn is_stopped(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> TickId {
        self.last_tick.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================
