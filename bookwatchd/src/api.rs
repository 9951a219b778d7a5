//! HTTP API for the Bookwatch daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Current depth curves
//! - Position list, lookup and submission

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use bookwatch_domain::{DepthCurvePair, OrderSide, Position, PositionId, Price, Quantity};
use bookwatch_engine::DepthAggregator;
use bookwatch_store::{PositionRepository, StoreError};

use crate::event_bus::{DaemonEvent, EventBus};

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState {
    /// Position book shared with the reconciler
    pub book: Arc<dyn PositionRepository>,
    /// Depth aggregator fed by the depth feed
    pub aggregator: Arc<DepthAggregator>,
    /// Event bus for announcing new positions
    pub event_bus: Arc<EventBus>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the server answers
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Depth curves plus top-of-book summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepthResponse {
    /// Cumulative bid and ask curves
    #[serde(flatten)]
    pub curves: DepthCurvePair,
    /// Highest bid price
    pub best_bid: Option<Decimal>,
    /// Lowest ask price
    pub best_ask: Option<Decimal>,
    /// Best ask minus best bid
    pub spread: Option<Decimal>,
}

/// Position list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionsResponse {
    /// Number of tracked positions
    pub count: usize,
    /// Positions in insertion order
    pub positions: Vec<Position>,
}

/// Request to track a newly submitted position.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Venue-assigned order id
    pub id: u64,
    /// Buy or sell
    pub side: OrderSide,
    /// Limit price, must be positive
    pub price: Decimal,
    /// Order quantity, must be positive
    pub quantity: Decimal,
    /// Submission time; defaults to now
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into() }))
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
///
/// CORS is permissive since the dashboard is served from another origin.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/depth", get(depth_handler))
        .route("/positions", get(list_positions_handler).post(submit_handler))
        .route("/positions/:id", get(get_position_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current depth curves; empty before the first accepted snapshot.
async fn depth_handler(State(state): State<Arc<ApiState>>) -> Json<DepthResponse> {
    let curves = state
        .aggregator
        .current()
        .map(|c| (*c).clone())
        .unwrap_or_default();

    Json(DepthResponse {
        best_bid: curves.best_bid(),
        best_ask: curves.best_ask(),
        spread: curves.spread(),
        curves,
    })
}

/// All tracked positions in insertion order.
async fn list_positions_handler(State(state): State<Arc<ApiState>>) -> Json<PositionsResponse> {
    let positions = state.book.snapshot().await;
    Json(PositionsResponse {
        count: positions.len(),
        positions,
    })
}

/// Get a single position.
async fn get_position_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<u64>,
) -> Result<Json<Position>, ApiError> {
    let id = PositionId::new(id);
    state
        .book
        .find_by_id(id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Position not found: {}", id)))
}

/// Track a newly submitted position with status `"New"`.
async fn submit_handler(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<Position>), ApiError> {
    let price = Price::new(req.price)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let quantity = Quantity::new(req.quantity)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let position = Position::new(
        PositionId::new(req.id),
        req.side,
        price,
        quantity,
        req.submitted_at.unwrap_or_else(Utc::now),
    );

    state.book.append(position.clone()).await.map_err(|e| match e {
        StoreError::Duplicate(_) => api_error(StatusCode::CONFLICT, e.to_string()),
    })?;

    info!(position_id = %position.id, side = %position.side, "Position submitted");
    state.event_bus.send(DaemonEvent::PositionAdded {
        position_id: position.id,
        timestamp: Utc::now(),
    });

    Ok((StatusCode::CREATED, Json(position)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::http::Request;
    use bookwatch_domain::OrderBookSnapshot;
    use bookwatch_store::PositionBook;
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;

    fn create_test_state() -> Arc<ApiState> {
        Arc::new(ApiState {
            book: Arc::new(PositionBook::new()),
            aggregator: Arc::new(DepthAggregator::new()),
            event_bus: Arc::new(EventBus::new(16)),
        })
    }

    async fn send(state: &Arc<ApiState>, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    fn decode<T: DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let (status, body) = send(&state, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = decode(&body);
        assert_eq!(health.status, "healthy");
    }

    #[tokio::test]
    async fn test_depth_empty_before_first_snapshot() {
        let state = create_test_state();
        let (status, body) = send(&state, get("/depth")).await;

        assert_eq!(status, StatusCode::OK);
        let depth: DepthResponse = decode(&body);
        assert!(depth.curves.is_empty());
        assert_eq!(depth.spread, None);
    }

    #[tokio::test]
    async fn test_depth_reports_current_curves() {
        let state = create_test_state();
        state
            .aggregator
            .apply(&OrderBookSnapshot::from_pairs(
                &[(dec!(10), dec!(5)), (dec!(9), dec!(2))],
                &[(dec!(11), dec!(4))],
            ))
            .unwrap();

        let (_, body) = send(&state, get("/depth")).await;
        let depth: DepthResponse = decode(&body);

        assert_eq!(depth.curves.bids.len(), 2);
        assert_eq!(depth.best_bid, Some(dec!(10)));
        assert_eq!(depth.best_ask, Some(dec!(11)));
        assert_eq!(depth.spread, Some(dec!(1)));
    }

    #[tokio::test]
    async fn test_submit_then_list_and_get() {
        let state = create_test_state();
        let mut events = state.event_bus.subscribe();

        let (status, body) = send(
            &state,
            post_json("/positions", json!({"id": 7, "side": "Buy", "price": "101.5", "quantity": "3"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Position = decode(&body);
        assert!(created.status.is_new());
        assert!(matches!(
            events.try_recv(),
            Some(Ok(DaemonEvent::PositionAdded { .. }))
        ));

        send(
            &state,
            post_json("/positions", json!({"id": 2, "side": "Sell", "price": 99, "quantity": 1})),
        )
        .await;

        let (_, body) = send(&state, get("/positions")).await;
        let list: PositionsResponse = decode(&body);
        let ids: Vec<u64> = list.positions.iter().map(|p| p.id.as_u64()).collect();
        assert_eq!(ids, vec![7, 2]);

        let (status, body) = send(&state, get("/positions/7")).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Position = decode(&body);
        assert_eq!(fetched.price.as_decimal(), dec!(101.5));
    }

    #[tokio::test]
    async fn test_submit_duplicate_conflicts() {
        let state = create_test_state();
        let request = json!({"id": 3, "side": "Buy", "price": "1", "quantity": "1"});

        let (status, _) = send(&state, post_json("/positions", request.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&state, post_json("/positions", request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(state.book.len().await, 1);
    }

    #[tokio::test]
    async fn test_submit_non_positive_values_rejected() {
        let state = create_test_state();

        let (status, _) = send(
            &state,
            post_json("/positions", json!({"id": 1, "side": "Buy", "price": "0", "quantity": "1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            post_json("/positions", json!({"id": 1, "side": "Sell", "price": "5", "quantity": "-2"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = decode(&body);
        assert!(error.error.contains("quantity"));
        assert!(state.book.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_position_not_found() {
        let state = create_test_state();
        let (status, _) = send(&state, get("/positions/404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
