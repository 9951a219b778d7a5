//! Depth feed: polls order book snapshots and publishes depth curves.
//!
//! Every poll runs the stateful aggregator; consumers only hear about the
//! curves when they materially change.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bookwatch_connectors::SnapshotSource;
use bookwatch_engine::{DepthAggregator, DepthUpdate};

use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{DaemonEvent, EventBus};

/// Background loop feeding the depth aggregator.
pub struct DepthFeed {
    source: Arc<dyn SnapshotSource>,
    aggregator: Arc<DepthAggregator>,
    event_bus: Arc<EventBus>,
    poll_interval: Duration,
    shutdown_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DepthFeed {
    /// Create a new feed. Nothing runs until [`start`](Self::start).
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        aggregator: Arc<DepthAggregator>,
        event_bus: Arc<EventBus>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            aggregator,
            event_bus,
            poll_interval,
            shutdown_token: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Fetch one snapshot and aggregate it.
    ///
    /// Publishes `DaemonEvent::DepthUpdated` when the curves changed.
    ///
    /// # Errors
    /// Fetch failures and rejected snapshots are returned; the previously
    /// published curves stay current.
    pub async fn poll_once(&self) -> DaemonResult<DepthUpdate> {
        let snapshot = tokio::select! {
            biased;
            _ = self.shutdown_token.cancelled() => return Err(DaemonError::ShutdownRace),
            fetched = self.source.fetch_snapshot() => fetched?,
        };

        let update = self.aggregator.apply(&snapshot)?;
        if update.changed {
            debug!(
                bid_levels = update.curves.bids.len(),
                ask_levels = update.curves.asks.len(),
                "Depth curves changed"
            );
            self.event_bus
                .send(DaemonEvent::DepthUpdated(Arc::clone(&update.curves)));
        }
        Ok(update)
    }

    /// Start polling in the background. The first poll runs immediately.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            warn!("Depth feed already started");
            return;
        }

        let feed = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            feed.run_loop().await;
        }));
    }

    async fn run_loop(&self) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Depth feed started"
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("Depth feed received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(_) | Err(DaemonError::ShutdownRace) => {}
                        Err(DaemonError::Domain(e)) => {
                            warn!(error = %e, "Rejected order book snapshot");
                        }
                        Err(e) => {
                            warn!(error = %e, "Order book fetch failed");
                        }
                    }
                }
            }
        }

        info!("Depth feed stopped");
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(&self) {
        info!("Shutting down depth feed");
        self.shutdown_token.cancel();

        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Depth feed task ended abnormally");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
