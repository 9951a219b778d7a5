//! Market Data Types
//!
//! Raw order book snapshots as delivered by the venue, and the cumulative
//! depth curves derived from them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::BookSide;

// =============================================================================
// Order Book Level
// =============================================================================

/// A single resting price/quantity entry from a full book snapshot.
///
/// Values are kept raw: cleared slots arrive as zero price or zero quantity
/// and are discarded during aggregation, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// Limit price of the level
    pub price: Decimal,
    /// Resting quantity at that price
    pub quantity: Decimal,
    /// Book side the level rests on
    pub side: BookSide,
}

impl OrderBookLevel {
    /// Create a new level.
    pub fn new(price: Decimal, quantity: Decimal, side: BookSide) -> Self {
        Self { price, quantity, side }
    }

    /// Shorthand for a bid level.
    pub fn bid(price: Decimal, quantity: Decimal) -> Self {
        Self::new(price, quantity, BookSide::Bid)
    }

    /// Shorthand for an ask level.
    pub fn ask(price: Decimal, quantity: Decimal) -> Self {
        Self::new(price, quantity, BookSide::Ask)
    }

    /// True for cleared book slots that carry no real liquidity.
    pub fn is_empty_slot(&self) -> bool {
        self.price.is_zero() || self.quantity.is_zero()
    }
}

// =============================================================================
// Order Book Snapshot
// =============================================================================

/// Full snapshot of both sides of the book, in venue order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels
    pub bids: Vec<OrderBookLevel>,
    /// Ask levels
    pub asks: Vec<OrderBookLevel>,
}

impl OrderBookSnapshot {
    /// Create a new order book snapshot.
    pub fn new(bids: Vec<OrderBookLevel>, asks: Vec<OrderBookLevel>) -> Self {
        Self { bids, asks }
    }

    /// Build a snapshot from `(price, quantity)` pairs.
    pub fn from_pairs(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> Self {
        Self {
            bids: bids.iter().map(|&(p, q)| OrderBookLevel::bid(p, q)).collect(),
            asks: asks.iter().map(|&(p, q)| OrderBookLevel::ask(p, q)).collect(),
        }
    }

    /// Levels for one side.
    pub fn side(&self, side: BookSide) -> &[OrderBookLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }
}

// =============================================================================
// Depth Curves
// =============================================================================

/// One step of a cumulative depth curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthPoint {
    /// Distinct price level
    pub price: Decimal,
    /// Total quantity available at this price or better
    pub cumulative_quantity: Decimal,
}

impl DepthPoint {
    /// Create a new depth point.
    pub fn new(price: Decimal, cumulative_quantity: Decimal) -> Self {
        Self { price, cumulative_quantity }
    }
}

/// Bid and ask depth curves computed from a single snapshot.
///
/// Bids are ordered by descending price, asks by ascending price; in both the
/// cumulative quantity never decreases. Equality is exact decimal equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthCurvePair {
    /// Bid curve, best bid first
    pub bids: Vec<DepthPoint>,
    /// Ask curve, best ask first
    pub asks: Vec<DepthPoint>,
}

impl DepthCurvePair {
    /// Create a new curve pair.
    pub fn new(bids: Vec<DepthPoint>, asks: Vec<DepthPoint>) -> Self {
        Self { bids, asks }
    }

    /// Curve for one side.
    pub fn side(&self, side: BookSide) -> &[DepthPoint] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|p| p.price)
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|p| p.price)
    }

    /// Best ask - best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total resting quantity on one side (last point of its curve).
    pub fn total_depth(&self, side: BookSide) -> Decimal {
        self.side(side)
            .last()
            .map(|p| p.cumulative_quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// True when neither side has any liquidity.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_slot_detection() {
        assert!(OrderBookLevel::bid(dec!(0), dec!(5)).is_empty_slot());
        assert!(OrderBookLevel::ask(dec!(10), dec!(0)).is_empty_slot());
        assert!(!OrderBookLevel::ask(dec!(10), dec!(1)).is_empty_slot());
    }

    #[test]
    fn test_curve_pair_best_prices() {
        let curves = DepthCurvePair::new(
            vec![DepthPoint::new(dec!(10), dec!(8)), DepthPoint::new(dec!(9), dec!(10))],
            vec![DepthPoint::new(dec!(11), dec!(4)), DepthPoint::new(dec!(12), dec!(5))],
        );

        assert_eq!(curves.best_bid(), Some(dec!(10)));
        assert_eq!(curves.best_ask(), Some(dec!(11)));
        assert_eq!(curves.spread(), Some(dec!(1)));
        assert_eq!(curves.total_depth(BookSide::Bid), dec!(10));
        assert_eq!(curves.total_depth(BookSide::Ask), dec!(5));
    }

    #[test]
    fn test_curve_equality_is_exact_decimal() {
        // 10.0 and 10.00 are the same decimal value
        let a = DepthCurvePair::new(vec![DepthPoint::new(dec!(10.0), dec!(1))], vec![]);
        let b = DepthCurvePair::new(vec![DepthPoint::new(dec!(10.00), dec!(1.0))], vec![]);
        assert_eq!(a, b);

        let c = DepthCurvePair::new(vec![DepthPoint::new(dec!(10.0000001), dec!(1))], vec![]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_curves() {
        let curves = DepthCurvePair::default();
        assert!(curves.is_empty());
        assert_eq!(curves.spread(), None);
        assert_eq!(curves.total_depth(BookSide::Ask), dec!(0));
    }
}
