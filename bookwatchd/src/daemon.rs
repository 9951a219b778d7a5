//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Depth Feed (order book → depth curves)
//! - Position Reconciler (venue status → position book)
//! - Event Bus (internal communication)
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize components (stub venue in `test`, REST client otherwise)
//! 3. Start API server
//! 4. Start depth feed and reconciler
//! 5. Log events until shutdown is requested
//! 6. Stop both loops, waiting for in-flight work to be discarded
//! 7. Drain the API server

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bookwatch_connectors::{SnapshotSource, StatusSource, StubVenue, VenueRestClient};
use bookwatch_engine::DepthAggregator;
use bookwatch_store::{PositionBook, PositionRepository};

use crate::api::{create_router, ApiState};
use crate::config::{Config, Environment};
use crate::depth_feed::DepthFeed;
use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{DaemonEvent, EventBus};
use crate::reconciler::PositionReconciler;

// =============================================================================
// Daemon
// =============================================================================

/// The main Bookwatch daemon.
pub struct Daemon {
    /// Configuration
    config: Config,
    /// Position book
    book: Arc<dyn PositionRepository>,
    /// Stateful depth aggregator
    aggregator: Arc<DepthAggregator>,
    /// Event bus
    event_bus: Arc<EventBus>,
    /// Depth feed loop
    depth_feed: Arc<DepthFeed>,
    /// Reconciler loop
    reconciler: Arc<PositionReconciler>,
    /// Stops the API server
    api_shutdown: CancellationToken,
    /// API server task, present while serving
    api_task: Mutex<Option<JoinHandle<()>>>,
}

impl Daemon {
    /// Create a daemon whose venue is chosen by the configured environment.
    pub fn from_config(config: Config) -> Self {
        match config.environment {
            Environment::Test => {
                let venue = Arc::new(StubVenue::new());
                Self::new(config, venue.clone(), venue)
            }
            Environment::Development | Environment::Production => {
                let venue = Arc::new(VenueRestClient::new(config.venue.base_url.clone()));
                Self::new(config, venue.clone(), venue)
            }
        }
    }

    /// Create a daemon around the given venue sources.
    pub fn new(
        config: Config,
        snapshots: Arc<dyn SnapshotSource>,
        statuses: Arc<dyn StatusSource>,
    ) -> Self {
        let book: Arc<dyn PositionRepository> = Arc::new(PositionBook::new());
        let aggregator = Arc::new(DepthAggregator::new());
        let event_bus = Arc::new(EventBus::new(1000));

        let depth_feed = Arc::new(DepthFeed::new(
            snapshots,
            aggregator.clone(),
            event_bus.clone(),
            config.depth.poll_interval,
        ));
        let reconciler = Arc::new(PositionReconciler::new(
            book.clone(),
            statuses,
            event_bus.clone(),
            config.reconciler,
        ));

        Self {
            config,
            book,
            aggregator,
            event_bus,
            depth_feed,
            reconciler,
            api_shutdown: CancellationToken::new(),
            api_task: Mutex::new(None),
        }
    }

    /// Position book shared by the API and the reconciler.
    pub fn book(&self) -> Arc<dyn PositionRepository> {
        self.book.clone()
    }

    /// Run the daemon until SIGINT.
    pub async fn run(self) -> DaemonResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Run the daemon until `shutdown` resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Bookwatch daemon"
        );

        // Subscribe before the loops start so no event is missed
        let mut event_receiver = self.event_bus.subscribe();

        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        self.depth_feed.start();
        self.reconciler.start();

        tokio::pin!(shutdown);
        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event_result) = event_receiver.recv() => {
                    match event_result {
                        Ok(event) => {
                            if let Err(DaemonError::Shutdown) = self.handle_event(event) {
                                break;
                            }
                        }
                        Err(lag_msg) => {
                            warn!(%lag_msg, "Event receiver lagged");
                        }
                    }
                }

                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Start the API server.
    async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            book: self.book.clone(),
            aggregator: self.aggregator.clone(),
            event_bus: self.event_bus.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Config(format!("Failed to get local address: {}", e)))?;

        let shutdown = self.api_shutdown.clone();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "API server error");
            }
        });
        *self.api_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        Ok(local_addr)
    }

    /// Handle an event from the event bus.
    fn handle_event(&self, event: DaemonEvent) -> DaemonResult<()> {
        match event {
            DaemonEvent::DepthUpdated(curves) => {
                debug!(
                    best_bid = ?curves.best_bid(),
                    best_ask = ?curves.best_ask(),
                    "Depth updated"
                );
            }

            DaemonEvent::PositionAdded { position_id, .. } => {
                info!(%position_id, "Tracking new position");
            }

            DaemonEvent::PositionsReconciled { tick, changed, stale, .. } => {
                info!(tick, changed, stale, "Position statuses updated");
            }

            DaemonEvent::Shutdown => {
                info!("Shutdown event received");
                return Err(DaemonError::Shutdown);
            }
        }

        Ok(())
    }

    /// Graceful shutdown: both loops are fully stopped on return.
    async fn shutdown(&self) {
        info!("Initiating graceful shutdown");

        self.depth_feed.stop().await;
        self.reconciler.stop().await;
        self.event_bus.send(DaemonEvent::Shutdown);

        self.api_shutdown.cancel();
        let api_task = self.api_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = api_task {
            if let Err(e) = task.await {
                error!(error = %e, "API server task ended abnormally");
            }
        }

        let tracked = self.book.len().await;
        info!(tracked_positions = tracked, "Shutdown complete");
    }
}

// =============================================================================
// Tests
// =============================================================================
