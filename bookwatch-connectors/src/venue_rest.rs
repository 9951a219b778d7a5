//! Venue REST API client.
//!
//! Polls the venue's public HTTP endpoints:
//! - `GET /book` for the resting order book
//! - `GET /report/{id}` for the status of a submitted order
//!
//! The venue answers unknown orders with HTTP 200 and an `error` field, so a
//! missing `status` field is reported as `LookupFailure::MissingStatus`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::debug;

use bookwatch_domain::{BookSide, OrderBookLevel, OrderBookSnapshot, PositionId};

use crate::ports::{LookupFailure, SnapshotSource, StatusSource};

// =============================================================================
// Constants
// =============================================================================

/// Default venue base URL
pub const DEFAULT_VENUE_URL: &str = "http://localhost:3000";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
enum WireSide {
    Buy,
    Sell,
}

impl From<WireSide> for BookSide {
    fn from(side: WireSide) -> Self {
        match side {
            WireSide::Buy => BookSide::Bid,
            WireSide::Sell => BookSide::Ask,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    #[allow(dead_code)]
    id: u64,
    side: WireSide,
    quantity: Decimal,
    price: Decimal,
}

impl From<WireOrder> for OrderBookLevel {
    fn from(order: WireOrder) -> Self {
        OrderBookLevel::new(order.price, order.quantity, order.side.into())
    }
}

#[derive(Debug, Deserialize)]
struct WireBook {
    bids: Vec<WireOrder>,
    asks: Vec<WireOrder>,
}

#[derive(Debug, Deserialize)]
struct WireReport {
    status: Option<String>,
    error: Option<String>,
}

fn decode_book(body: &str) -> Result<OrderBookSnapshot, LookupFailure> {
    let book: WireBook =
        serde_json::from_str(body).map_err(|e| LookupFailure::Malformed(e.to_string()))?;

    Ok(OrderBookSnapshot::new(
        book.bids.into_iter().map(Into::into).collect(),
        book.asks.into_iter().map(Into::into).collect(),
    ))
}

fn decode_report(id: PositionId, body: &str) -> Result<String, LookupFailure> {
    let report: WireReport =
        serde_json::from_str(body).map_err(|e| LookupFailure::Malformed(e.to_string()))?;

    match report.status {
        Some(status) if !status.trim().is_empty() => Ok(status),
        _ => {
            if let Some(error) = report.error {
                debug!(position_id = %id, %error, "Venue reported error for order");
            }
            Err(LookupFailure::MissingStatus(id))
        }
    }
}

// =============================================================================
// Venue REST Client
// =============================================================================

/// HTTP client for the venue's polling API.
#[derive(Debug, Clone)]
pub struct VenueRestClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
}

impl VenueRestClient {
    /// Create a new client for the venue at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a GET request and return the body of a 2xx response.
    async fn get(&self, endpoint: &str) -> Result<String, LookupFailure> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| LookupFailure::Timeout)?
        .map_err(|e| {
            if e.is_timeout() {
                LookupFailure::Timeout
            } else {
                LookupFailure::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupFailure::BadStatus(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| LookupFailure::Malformed(e.to_string()))
    }

    /// Fetch the resting order book.
    pub async fn get_book(&self) -> Result<OrderBookSnapshot, LookupFailure> {
        let body = self.get("/book").await?;
        decode_book(&body)
    }

    /// Fetch the raw status report for one order.
    pub async fn get_report(&self, id: PositionId) -> Result<String, LookupFailure> {
        let body = self.get(&format!("/report/{}", id)).await?;
        decode_report(id, &body)
    }
}

impl Default for VenueRestClient {
    fn default() -> Self {
        Self::new(DEFAULT_VENUE_URL)
    }
}

#[async_trait]
impl SnapshotSource for VenueRestClient {
    async fn fetch_snapshot(&self) -> Result<OrderBookSnapshot, LookupFailure> {
        self.get_book().await
    }
}

#[async_trait]
impl StatusSource for VenueRestClient {
    async fn lookup_status(&self, id: PositionId) -> Result<String, LookupFailure> {
        self.get_report(id).await
    }
}

// =============================================================================
// Tests
// =============================================================================
