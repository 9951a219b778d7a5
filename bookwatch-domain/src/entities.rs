//! Domain Entities for Bookwatch
//!
//! Positions are locally tracked records of submitted orders. Every field
//! except `status` is fixed at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{DomainError, OrderSide, Price, Quantity};

/// Sequence number of a reconciliation tick.
pub type TickId = u64;

// =============================================================================
// PositionId
// =============================================================================

/// Venue-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(u64);

impl PositionId {
    /// Wrap a raw venue id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PositionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// PositionStatus
// =============================================================================

/// Last-known lifecycle status of a position.
///
/// The text is opaque and owned by the venue; only the first
/// whitespace-delimited token of a report is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PositionStatus(String);

impl PositionStatus {
    /// Status every position starts with.
    pub const NEW: &'static str = "New";

    /// Initial status of a freshly submitted position.
    pub fn new_order() -> Self {
        Self(Self::NEW.to_string())
    }

    /// Normalize a raw venue status report to its first token.
    ///
    /// `"Filled at 10:03"` becomes `"Filled"`. Returns `None` when the report
    /// holds no token at all.
    pub fn from_report(raw: &str) -> Option<Self> {
        raw.split_whitespace().next().map(|token| Self(token.to_string()))
    }

    /// Status text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True while the venue has not reported anything beyond submission.
    pub fn is_new(&self) -> bool {
        self.0 == Self::NEW
    }
}

impl TryFrom<String> for PositionStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_report(&value)
            .ok_or_else(|| DomainError::InvalidStatus("Status must not be empty".to_string()))
    }
}

impl From<PositionStatus> for String {
    fn from(status: PositionStatus) -> Self {
        status.0
    }
}

impl Default for PositionStatus {
    fn default() -> Self {
        Self::new_order()
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Position
// =============================================================================

/// A submitted order tracked locally together with its last-known status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Venue-assigned id, unique within a position list
    pub id: PositionId,
    /// Buy or sell
    pub side: OrderSide,
    /// Limit price
    pub price: Price,
    /// Order quantity
    pub quantity: Quantity,
    /// When the order was submitted
    pub submitted_at: DateTime<Utc>,
    /// Last-known status token
    #[serde(default)]
    pub status: PositionStatus,
}

impl Position {
    /// Create a freshly submitted position with status `"New"`.
    pub fn new(
        id: PositionId,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            side,
            price,
            quantity,
            submitted_at,
            status: PositionStatus::new_order(),
        }
    }

    /// Copy of this position carrying a different status; all other fields
    /// are unchanged.
    pub fn with_status(&self, status: PositionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

// =============================================================================
// StatusUpdate
// =============================================================================

/// A status observed for one position during one reconciliation tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Position the status belongs to
    pub id: PositionId,
    /// Normalized status token
    pub status: PositionStatus,
}

impl StatusUpdate {
    /// Create a new update.
    pub fn new(id: PositionId, status: PositionStatus) -> Self {
        Self { id, status }
    }
}

// =============================================================================
// Tests
// =============================================================================
