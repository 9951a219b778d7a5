//! Bookwatch Engine Layer
//!
//! Pure logic, deterministic, no I/O:
//! - **Depth**: raw order book snapshot → cumulative depth curves with change
//!   detection
//! - **Merge**: folding per-tick status updates into a position list by id

#![warn(clippy::all)]

pub mod depth;
pub mod merge;

pub use depth::{aggregate, aggregate_side, DepthAggregator, DepthUpdate};
pub use merge::{apply_status_updates, merge_status_updates};
