//! Id-keyed status merge.
//!
//! Folds the statuses observed during one reconciliation tick back into a
//! position list. The list is mutated in place: order is preserved, nothing
//! is appended or removed, and only the `status` field is ever touched.

use std::collections::HashMap;

use bookwatch_domain::{Position, PositionId, PositionStatus, StatusUpdate};

/// Apply `updates` to `positions` in place.
///
/// Ids with no update keep their current status. Updates for ids not present
/// in `positions` are ignored. When one id appears more than once in
/// `updates`, the last entry wins.
///
/// Returns the number of positions whose status actually changed.
pub fn apply_status_updates(positions: &mut [Position], updates: &[StatusUpdate]) -> usize {
    if updates.is_empty() {
        return 0;
    }

    let latest: HashMap<PositionId, &PositionStatus> =
        updates.iter().map(|u| (u.id, &u.status)).collect();

    let mut changed = 0;
    for position in positions.iter_mut() {
        if let Some(status) = latest.get(&position.id) {
            if position.status != **status {
                *position = position.with_status((*status).clone());
                changed += 1;
            }
        }
    }
    changed
}

/// Owned variant of [`apply_status_updates`]: list in, merged list out.
pub fn merge_status_updates(mut positions: Vec<Position>, updates: &[StatusUpdate]) -> Vec<Position> {
    apply_status_updates(&mut positions, updates);
    positions
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bookwatch_domain::{OrderSide, Price, Quantity};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn position(id: u64) -> Position {
        Position::new(
            PositionId::new(id),
            OrderSide::Buy,
            Price::new(dec!(10)).unwrap(),
            Quantity::new(dec!(1)).unwrap(),
            Utc::now(),
        )
    }

    fn update(id: u64, raw: &str) -> StatusUpdate {
        StatusUpdate::new(PositionId::new(id), PositionStatus::from_report(raw).unwrap())
    }

    #[test]
    fn test_update_overwrites_status_only() {
        let before = vec![position(7)];
        let after = merge_status_updates(before.clone(), &[update(7, "Filled at 14:02")]);

        assert_eq!(after.len(), 1);
        assert_eq!(after[0].status.as_str(), "Filled");
        assert_eq!(after[0].price, before[0].price);
        assert_eq!(after[0].submitted_at, before[0].submitted_at);
    }

    #[test]
    fn test_missing_updates_leave_positions_untouched() {
        let before = vec![position(1), position(9), position(3)];
        let after = merge_status_updates(before.clone(), &[update(1, "Filled")]);

        assert_eq!(after[1], before[1]);
        assert_eq!(after[2], before[2]);
    }

    #[test]
    fn test_order_is_preserved_and_nothing_appended() {
        let before = vec![position(5), position(2), position(8)];
        let after = merge_status_updates(
            before,
            &[update(8, "Filled"), update(5, "Filled"), update(99, "Filled")],
        );

        let ids: Vec<u64> = after.iter().map(|p| p.id.as_u64()).collect();
        assert_eq!(ids, vec![5, 2, 8]);
    }

    #[test]
    fn test_change_count_ignores_same_status() {
        let mut positions = vec![position(1), position(2)];
        let changed = apply_status_updates(&mut positions, &[update(1, "New"), update(2, "Filled")]);
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_last_update_for_same_id_wins() {
        let mut positions = vec![position(4)];
        apply_status_updates(&mut positions, &[update(4, "Partial"), update(4, "Filled")]);
        assert_eq!(positions[0].status.as_str(), "Filled");
    }
}
