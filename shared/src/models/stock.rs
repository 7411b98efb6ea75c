//! Pure stock arithmetic
//!
//! On-hand quantities are discrete units and never go below zero. The
//! ledger service applies these functions inside its row lock; keeping
//! them here makes the invariants testable without a database.

use rust_decimal::Decimal;

/// Apply a signed delta to an on-hand quantity. `None` when the result
/// would be negative.
pub fn apply_stock_delta(current: i64, delta: i64) -> Option<i64> {
    let next = current.checked_add(delta)?;
    if next < 0 {
        None
    } else {
        Some(next)
    }
}

/// Whether a stock level breaches its alert rule
pub fn threshold_breached(quantity: i64, min_qty: i64) -> bool {
    quantity <= min_qty
}

/// Threshold to alert on: an explicit rule wins, otherwise the stock
/// level's own critical level. `None` disables the check.
pub fn effective_threshold(rule_min: Option<i64>, critical_level: Option<i64>) -> Option<i64> {
    rule_min.or(critical_level)
}

/// Weighted average of the existing average cost and an incoming batch.
/// `None` when no unit cost is known or nothing is on hand afterwards.
pub fn weighted_average_cost(
    current_average: Option<Decimal>,
    current_qty: i64,
    unit_cost: Option<Decimal>,
    incoming_qty: i64,
) -> Option<Decimal> {
    let unit_cost = unit_cost?;
    let total_qty = current_qty + incoming_qty;
    if total_qty <= 0 {
        return None;
    }
    let current_value = current_average.unwrap_or(unit_cost) * Decimal::from(current_qty);
    let incoming_value = unit_cost * Decimal::from(incoming_qty);
    Some((current_value + incoming_value) / Decimal::from(total_qty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_application_never_goes_negative() {
        assert_eq!(apply_stock_delta(10, -10), Some(0));
        assert_eq!(apply_stock_delta(10, -11), None);
        assert_eq!(apply_stock_delta(0, 5), Some(5));
    }

    #[test]
    fn breach_includes_the_boundary() {
        assert!(threshold_breached(10, 10));
        assert!(threshold_breached(9, 10));
        assert!(!threshold_breached(11, 10));
    }

    #[test]
    fn rule_overrides_critical_level() {
        assert_eq!(effective_threshold(Some(5), Some(8)), Some(5));
        assert_eq!(effective_threshold(None, Some(8)), Some(8));
        assert_eq!(effective_threshold(Some(5), None), Some(5));
        assert_eq!(effective_threshold(None, None), None);
    }
}
