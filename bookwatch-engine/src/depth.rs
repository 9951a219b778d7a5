//! Depth aggregation.
//!
//! Turns a full order book snapshot into two cumulative depth curves:
//!
//! ```text
//! levels ──► drop empty slots ──► group by price ──► sort best-first ──► running total
//! ```
//!
//! The result is compared structurally against the previously emitted curves
//! so downstream consumers can skip redundant redraws. When nothing changed
//! the *previous* `Arc` is handed back, so identity-based memoization keeps
//! working.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bookwatch_domain::{
    BookSide, DepthCurvePair, DepthPoint, DomainError, OrderBookLevel, OrderBookSnapshot,
};
use rust_decimal::Decimal;
use tracing::debug;

// =============================================================================
// Depth Update
// =============================================================================

/// Outcome of aggregating one snapshot.
#[derive(Debug, Clone)]
pub struct DepthUpdate {
    /// Curves to publish; the previous instance when `changed` is false
    pub curves: Arc<DepthCurvePair>,
    /// Whether `curves` differs from the previous emission
    pub changed: bool,
}

// =============================================================================
// Pure aggregation
// =============================================================================

/// Aggregate a snapshot and compare it against `previous`.
///
/// # Errors
/// Returns `DomainError::Validation` for a negative price or quantity and for
/// a live level listed on the wrong side. A cumulative quantity beyond the
/// decimal range is rejected the same way.
pub fn aggregate(
    snapshot: &OrderBookSnapshot,
    previous: Option<&Arc<DepthCurvePair>>,
) -> Result<DepthUpdate, DomainError> {
    let next = DepthCurvePair::new(
        aggregate_side(&snapshot.bids, BookSide::Bid)?,
        aggregate_side(&snapshot.asks, BookSide::Ask)?,
    );

    match previous {
        Some(prev) if **prev == next => Ok(DepthUpdate {
            curves: Arc::clone(prev),
            changed: false,
        }),
        _ => Ok(DepthUpdate {
            curves: Arc::new(next),
            changed: true,
        }),
    }
}

/// Build the cumulative curve for one side of the book.
///
/// Bids come out best (highest) price first, asks best (lowest) price first.
pub fn aggregate_side(
    levels: &[OrderBookLevel],
    side: BookSide,
) -> Result<Vec<DepthPoint>, DomainError> {
    let mut grouped: BTreeMap<Decimal, Decimal> = BTreeMap::new();

    for level in levels {
        validate_level(level, side)?;
        if level.is_empty_slot() {
            continue;
        }
        let slot = grouped.entry(level.price.normalize()).or_insert(Decimal::ZERO);
        *slot = checked_sum(*slot, level.quantity, level.price, side)?;
    }

    let mut running = Decimal::ZERO;
    let mut accumulate = |(price, quantity): (Decimal, Decimal)| -> Result<DepthPoint, DomainError> {
        running = checked_sum(running, quantity, price, side)?;
        Ok(DepthPoint::new(price, running))
    };

    let curve = match side {
        BookSide::Bid => grouped
            .into_iter()
            .rev()
            .map(&mut accumulate)
            .collect::<Result<Vec<_>, DomainError>>()?,
        BookSide::Ask => grouped
            .into_iter()
            .map(&mut accumulate)
            .collect::<Result<Vec<_>, DomainError>>()?,
    };

    debug!(%side, input_levels = levels.len(), points = curve.len(), "Depth side aggregated");

    Ok(curve)
}

fn checked_sum(
    total: Decimal,
    quantity: Decimal,
    price: Decimal,
    side: BookSide,
) -> Result<Decimal, DomainError> {
    total.checked_add(quantity).ok_or_else(|| {
        DomainError::Validation(format!(
            "Cumulative quantity overflow at price {} on {} side",
            price, side
        ))
    })
}

fn validate_level(level: &OrderBookLevel, side: BookSide) -> Result<(), DomainError> {
    if level.quantity.is_sign_negative() && !level.quantity.is_zero() {
        return Err(DomainError::Validation(format!(
            "Negative quantity {} at price {} on {} side",
            level.quantity, level.price, side
        )));
    }
    if level.price.is_sign_negative() && !level.price.is_zero() {
        return Err(DomainError::Validation(format!(
            "Negative price {} on {} side",
            level.price, side
        )));
    }
    // Cleared slots are padded with a default side, so only live levels are checked
    if !level.is_empty_slot() && level.side != side {
        return Err(DomainError::Validation(format!(
            "{} level at price {} listed on {} side",
            level.side, level.price, side
        )));
    }
    Ok(())
}

// =============================================================================
// Stateful aggregator
// =============================================================================

/// Holds the last emitted curve pair for change detection.
///
/// Single writer: each call replaces the stored pair under one lock, so only
/// the most recent snapshot's result is ever kept.
#[derive(Debug, Default)]
pub struct DepthAggregator {
    current: Mutex<Option<Arc<DepthCurvePair>>>,
}

impl DepthAggregator {
    /// Create an aggregator with no previous emission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate a snapshot against the stored curves and store the result.
    ///
    /// A rejected snapshot leaves the stored curves untouched.
    pub fn apply(&self, snapshot: &OrderBookSnapshot) -> Result<DepthUpdate, DomainError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let update = aggregate(snapshot, current.as_ref())?;
        if update.changed {
            *current = Some(Arc::clone(&update.curves));
        }
        Ok(update)
    }

    /// Last emitted curves, if any snapshot was accepted yet.
    pub fn current(&self) -> Option<Arc<DepthCurvePair>> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
