//! Threshold breach predicate tests

use shared::{apply_stock_delta, effective_threshold, threshold_breached};

mod unit_tests {
    use super::*;

    #[test]
    fn breach_fires_at_and_below_the_minimum() {
        assert!(threshold_breached(10, 10));
        assert!(threshold_breached(0, 10));
        assert!(!threshold_breached(11, 10));
    }

    #[test]
    fn zero_minimum_only_fires_on_empty_stock() {
        assert!(threshold_breached(0, 0));
        assert!(!threshold_breached(1, 0));
    }

    #[test]
    fn every_breaching_mutation_fires_without_dedup() {
        // Two consecutive sales below the minimum both trigger; the check
        // is per mutation, not per crossing
        let min = 10;
        let after_first = apply_stock_delta(12, -4).unwrap();
        let after_second = apply_stock_delta(after_first, -3).unwrap();
        assert!(threshold_breached(after_first, min));
        assert!(threshold_breached(after_second, min));
    }

    #[test]
    fn critical_level_backs_up_a_missing_rule() {
        // A stock level with only a critical level still alerts
        assert_eq!(effective_threshold(None, Some(7)), Some(7));
        assert!(threshold_breached(7, effective_threshold(None, Some(7)).unwrap()));
        // An explicit rule overrides the critical level entirely
        assert_eq!(effective_threshold(Some(3), Some(7)), Some(3));
        // Neither configured disables the check
        assert_eq!(effective_threshold(None, None), None);
    }

    #[test]
    fn restock_above_the_minimum_clears_the_breach() {
        let min = 10;
        let low = 4;
        assert!(threshold_breached(low, min));
        let restocked = apply_stock_delta(low, 20).unwrap();
        assert!(!threshold_breached(restocked, min));
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn no_false_positives_above_the_minimum(min in 0i64..10_000, excess in 1i64..10_000) {
            prop_assert!(!threshold_breached(min + excess, min));
        }

        #[test]
        fn no_false_negatives_at_or_below(min in 0i64..10_000, deficit in 0i64..10_000) {
            let qty = (min - deficit).max(0);
            prop_assert!(threshold_breached(qty, min));
        }

        #[test]
        fn threshold_prefers_the_rule(rule in proptest::option::of(0i64..10_000), crit in proptest::option::of(0i64..10_000)) {
            let expected = match (rule, crit) {
                (Some(r), _) => Some(r),
                (None, c) => c,
            };
            prop_assert_eq!(effective_threshold(rule, crit), expected);
        }

        #[test]
        fn breach_is_monotone_in_quantity(min in 0i64..10_000, a in 0i64..10_000, b in 0i64..10_000) {
            // If the larger quantity breaches, the smaller one must too
            let (lo, hi) = (a.min(b), a.max(b));
            if threshold_breached(hi, min) {
                prop_assert!(threshold_breached(lo, min));
            }
        }
    }
}
