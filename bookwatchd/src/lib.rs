//! Bookwatch Daemon Library
//!
//! Runtime orchestrator for the depth aggregator and the position reconciler.
//!
//! # Architecture
//!
//! ```text
//! Venue ──/book──────→ Depth Feed ──→ DepthAggregator ──→ Event Bus / API
//!   │
//!   └──/report/{id}──→ Position Reconciler ──merge──→ Position Book ←── API
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Depth Feed**: Polls snapshots and publishes changed depth curves
//! - **Position Reconciler**: Per-tick concurrent status lookups merged by id
//! - **Event Bus**: Internal communication
//! - **API**: HTTP endpoints for dashboards and order entry
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use bookwatchd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::from_config(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod depth_feed;
pub mod error;
pub mod event_bus;
pub mod reconciler;

// Re-exports for convenience
pub use config::{ApiConfig, Config, DepthFeedConfig, Environment, ReconcilerConfig, VenueConfig};
pub use daemon::Daemon;
pub use depth_feed::DepthFeed;
pub use error::{DaemonError, DaemonResult};
pub use event_bus::{DaemonEvent, EventBus, EventReceiver};
pub use reconciler::PositionReconciler;
