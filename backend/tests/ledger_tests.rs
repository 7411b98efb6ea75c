//! Stock ledger arithmetic tests

use rust_decimal::Decimal;
use shared::{apply_stock_delta, validate_quantity, weighted_average_cost};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

mod unit_tests {
    use super::*;

    #[test]
    fn deltas_cannot_drive_stock_negative() {
        assert_eq!(apply_stock_delta(100, -100), Some(0));
        assert_eq!(apply_stock_delta(100, -101), None);
        assert_eq!(apply_stock_delta(0, -1), None);
    }

    #[test]
    fn positive_deltas_always_apply() {
        assert_eq!(apply_stock_delta(0, 50), Some(50));
        assert_eq!(apply_stock_delta(25, 25), Some(50));
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        assert_eq!(apply_stock_delta(42, 0), Some(42));
    }

    #[test]
    fn document_line_quantities_are_strictly_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn average_cost_is_quantity_weighted() {
        // 100 units at 20, receiving 50 at 30 -> 3500 / 150
        let avg = weighted_average_cost(Some(dec("20")), 100, Some(dec("30")), 50).unwrap();
        assert_eq!(avg, dec("3500") / dec("150"));
    }

    #[test]
    fn first_receipt_sets_average_to_unit_cost() {
        let avg = weighted_average_cost(None, 0, Some(dec("12.50")), 10).unwrap();
        assert_eq!(avg, dec("12.50"));
    }

    #[test]
    fn no_unit_cost_leaves_the_average_untouched() {
        assert!(weighted_average_cost(Some(dec("20")), 10, None, 5).is_none());
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn result_is_never_negative(current in 0i64..1_000_000, delta in -1_000_000i64..1_000_000) {
            if let Some(next) = apply_stock_delta(current, delta) {
                prop_assert!(next >= 0);
                prop_assert_eq!(next, current + delta);
            } else {
                prop_assert!(current + delta < 0);
            }
        }

        #[test]
        fn opposite_deltas_round_trip(current in 0i64..1_000_000, delta in 0i64..1_000_000) {
            let up = apply_stock_delta(current, delta).unwrap();
            prop_assert_eq!(apply_stock_delta(up, -delta), Some(current));
        }

        #[test]
        fn absolute_set_delta_reconstructs_the_target(
            current in 0i64..1_000_000,
            target in 0i64..1_000_000,
        ) {
            // A count correction is an absolute write whose audit delta is
            // target - current; applying that delta must land on the target
            let delta = target - current;
            prop_assert_eq!(apply_stock_delta(current, delta), Some(target));
        }

        #[test]
        fn average_cost_stays_between_the_inputs(
            avg_cents in 1i64..1_000_000,
            qty in 1i64..10_000,
            cost_cents in 1i64..1_000_000,
            incoming in 1i64..10_000,
        ) {
            let current = Decimal::new(avg_cents, 2);
            let unit = Decimal::new(cost_cents, 2);
            let blended = weighted_average_cost(Some(current), qty, Some(unit), incoming).unwrap();
            prop_assert!(blended >= current.min(unit));
            prop_assert!(blended <= current.max(unit));
        }
    }
}
