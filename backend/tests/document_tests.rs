//! Document totals and numbering tests

use rust_decimal::Decimal;
use shared::{format_document_number, recompute_totals, LineAmounts};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

mod unit_tests {
    use super::*;

    #[test]
    fn totals_are_derived_from_lines_only() {
        let lines = [
            LineAmounts {
                quantity: 3,
                unit_price: dec("199.99"),
                tax_rate_percent: dec("7"),
            },
            LineAmounts {
                quantity: 1,
                unit_price: dec("49.50"),
                tax_rate_percent: Decimal::ZERO,
            },
        ];
        let totals = recompute_totals(&lines, dec("25"));

        assert_eq!(totals.subtotal, dec("649.47"));
        assert_eq!(totals.tax_total, dec("41.9979"));
        assert_eq!(totals.shipping, dec("25"));
        assert_eq!(totals.total, dec("716.4679"));
    }

    #[test]
    fn zero_tax_line_contributes_no_tax() {
        let line = LineAmounts {
            quantity: 10,
            unit_price: dec("5"),
            tax_rate_percent: Decimal::ZERO,
        };
        assert_eq!(line.tax(), Decimal::ZERO);
        assert_eq!(line.total(), line.subtotal());
    }

    #[test]
    fn shipping_only_affects_the_grand_total() {
        let lines = [LineAmounts {
            quantity: 1,
            unit_price: dec("100"),
            tax_rate_percent: Decimal::ZERO,
        }];
        let without = recompute_totals(&lines, Decimal::ZERO);
        let with = recompute_totals(&lines, dec("30"));
        assert_eq!(without.subtotal, with.subtotal);
        assert_eq!(without.tax_total, with.tax_total);
        assert_eq!(with.total - without.total, dec("30"));
    }

    #[test]
    fn document_numbers_carry_prefix_and_year() {
        assert_eq!(format_document_number("PO", 2025, 12), "PO-2025-0012");
        assert_eq!(format_document_number("TRF", 2026, 1), "TRF-2026-0001");
        // Sequences past four digits widen rather than truncate
        assert_eq!(format_document_number("ADJ", 2025, 123456), "ADJ-2025-123456");
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn line() -> impl Strategy<Value = LineAmounts> {
        (1i64..1_000, money(), 0u32..30).prop_map(|(quantity, unit_price, tax)| LineAmounts {
            quantity,
            unit_price,
            tax_rate_percent: Decimal::from(tax),
        })
    }

    proptest! {
        #[test]
        fn totals_are_never_negative(lines in prop::collection::vec(line(), 0..8), shipping in money()) {
            let totals = recompute_totals(&lines, shipping);
            prop_assert!(totals.subtotal >= Decimal::ZERO);
            prop_assert!(totals.tax_total >= Decimal::ZERO);
            prop_assert!(totals.total >= totals.subtotal);
        }

        #[test]
        fn grand_total_is_the_sum_of_parts(lines in prop::collection::vec(line(), 0..8), shipping in money()) {
            let totals = recompute_totals(&lines, shipping);
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax_total + totals.shipping);
        }

        #[test]
        fn concatenated_documents_sum_their_subtotals(
            a in prop::collection::vec(line(), 0..5),
            b in prop::collection::vec(line(), 0..5),
        ) {
            let separate = recompute_totals(&a, Decimal::ZERO).subtotal
                + recompute_totals(&b, Decimal::ZERO).subtotal;
            let mut merged = a;
            merged.extend(b);
            prop_assert_eq!(recompute_totals(&merged, Decimal::ZERO).subtotal, separate);
        }

        #[test]
        fn document_numbers_round_trip_the_sequence(seq in 1i32..100_000) {
            let number = format_document_number("INV", 2025, seq);
            let parsed: i32 = number.rsplit('-').next().unwrap().parse().unwrap();
            prop_assert_eq!(parsed, seq);
        }
    }
}
