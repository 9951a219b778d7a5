//! Bookwatch Domain Layer
//!
//! Pure domain types with zero I/O dependencies: order book levels, depth
//! curves and locally tracked positions.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod market_data;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{Position, PositionId, PositionStatus, StatusUpdate, TickId};
pub use market_data::{DepthCurvePair, DepthPoint, OrderBookLevel, OrderBookSnapshot};
pub use value_objects::{BookSide, DomainError, OrderSide, Price, Quantity};
