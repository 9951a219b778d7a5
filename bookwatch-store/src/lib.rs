//! Bookwatch Storage Layer
//!
//! Holds the canonical, ordered position list shared between order
//! submission and the reconciler.
//!
//! # Architecture
//!
//! - **Repository trait**: the storage interface (port)
//! - **PositionBook**: lock-guarded in-memory implementation
//!
//! Durable persistence belongs to the surrounding system; it can seed the
//! book on start and read snapshots back out.
//!
//! # Usage
//!
//! ```rust
//! use bookwatch_domain::{OrderSide, Position, PositionId, Price, Quantity};
//! use bookwatch_store::{PositionBook, PositionRepository};
//! use rust_decimal_macros::dec;
//!
//! #[tokio::main]
//! async fn main() {
//!     let book = PositionBook::new();
//!
//!     let position = Position::new(
//!         PositionId::new(1),
//!         OrderSide::Buy,
//!         Price::new(dec!(10)).unwrap(),
//!         Quantity::new(dec!(2)).unwrap(),
//!         chrono::Utc::now(),
//!     );
//!     book.append(position).await.unwrap();
//!
//!     assert_eq!(book.snapshot().await.len(), 1);
//! }
//! ```

#![warn(clippy::all)]

mod error;
mod memory;
mod repository;

pub use error::StoreError;
pub use memory::PositionBook;
pub use repository::{MergeReport, PositionRepository};
