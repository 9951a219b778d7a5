//! Bookwatch Daemon
//!
//! Polls a trading venue for its order book and for the status of locally
//! submitted orders, and serves the results over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p bookwatchd
//!
//! # Start against the in-memory venue
//! BOOKWATCH_ENV=test BOOKWATCH_API_PORT=8081 cargo run -p bookwatchd
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKWATCH_ENV`: Environment (test, development, production)
//! - `BOOKWATCH_API_HOST`: API host (default: 0.0.0.0)
//! - `BOOKWATCH_API_PORT`: API port (default: 8080)
//! - `BOOKWATCH_VENUE_URL`: Venue base URL (default: http://localhost:3000)
//! - `BOOKWATCH_DEPTH_POLL_MS`: Order book poll interval (default: 5000)
//! - `BOOKWATCH_RECONCILE_INTERVAL_MS`: Reconcile tick interval (default: 10000)
//! - `BOOKWATCH_LOOKUP_TIMEOUT_MS`: Per-lookup timeout, below the tick interval (default: 5000)

use bookwatchd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("bookwatchd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        venue_url = %config.venue.base_url,
        "Bookwatch Daemon"
    );

    let daemon = Daemon::from_config(config);
    daemon.run().await?;

    Ok(())
}
