//! Payment aggregation and invoice status resolution tests

use rust_decimal::Decimal;
use shared::{resolve_invoice_status, InvoiceStatus};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

mod unit_tests {
    use super::*;

    #[test]
    fn status_follows_the_approved_sum() {
        let total = dec("1000");
        assert_eq!(
            resolve_invoice_status(total, Decimal::ZERO),
            InvoiceStatus::Unpaid
        );
        assert_eq!(
            resolve_invoice_status(total, dec("0.01")),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(
            resolve_invoice_status(total, dec("999.99")),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(
            resolve_invoice_status(total, dec("1000")),
            InvoiceStatus::FullyPaid
        );
    }

    #[test]
    fn overpayment_still_resolves_to_fully_paid() {
        assert_eq!(
            resolve_invoice_status(dec("500"), dec("650")),
            InvoiceStatus::FullyPaid
        );
    }

    #[test]
    fn rejected_payments_do_not_count() {
        // The resolver only sees the approved sum; rejecting a payment
        // simply shrinks the input
        let total = dec("300");
        let after_rejection = dec("100");
        assert_eq!(
            resolve_invoice_status(total, after_rejection),
            InvoiceStatus::PartiallyPaid
        );
    }

    #[test]
    fn zero_total_invoice_is_paid_by_anything() {
        assert_eq!(
            resolve_invoice_status(Decimal::ZERO, dec("0.01")),
            InvoiceStatus::FullyPaid
        );
        assert_eq!(
            resolve_invoice_status(Decimal::ZERO, Decimal::ZERO),
            InvoiceStatus::Unpaid
        );
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(total in money(), paid in money()) {
            prop_assert_eq!(
                resolve_invoice_status(total, paid),
                resolve_invoice_status(total, paid)
            );
        }

        #[test]
        fn fully_paid_iff_sum_covers_total(total in money(), paid in money()) {
            let status = resolve_invoice_status(total, paid);
            prop_assert_eq!(status == InvoiceStatus::FullyPaid, paid >= total);
        }

        #[test]
        fn adding_an_approved_payment_never_reduces_progress(
            total in money(),
            paid in money(),
            extra in money(),
        ) {
            let before = resolve_invoice_status(total, paid);
            let after = resolve_invoice_status(total, paid + extra);
            let rank = |s: InvoiceStatus| match s {
                InvoiceStatus::Unpaid => 0,
                InvoiceStatus::PartiallyPaid => 1,
                InvoiceStatus::FullyPaid => 2,
                _ => unreachable!("resolver only yields payment states"),
            };
            prop_assert!(rank(after) >= rank(before));
        }
    }
}
