//! Bookwatch Venue Connectors
//!
//! Ports for the two external sources the core consumes (order book
//! snapshots and per-order status reports) plus their adapters:
//!
//! - **VenueRestClient**: the venue's HTTP polling API
//! - **StubVenue**: in-memory venue for tests and the `test` environment

#![warn(clippy::all)]

pub mod ports;
pub mod stub;
pub mod venue_rest;

pub use ports::{LookupFailure, SnapshotSource, StatusReport, StatusSource};
pub use stub::StubVenue;
pub use venue_rest::VenueRestClient;
