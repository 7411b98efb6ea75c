//! Document workflow state machine tests

use shared::{
    resolve_fulfilment, AdjustmentStatus, DocumentStatus, Fulfilment, GoodsReceiptStatus,
    InvoiceStatus, PaymentStatus, PurchaseOrderStatus, TransferStatus,
};

mod unit_tests {
    use super::*;

    #[test]
    fn goods_receipt_happy_path() {
        use GoodsReceiptStatus::*;
        assert!(Pending.ensure_transition(PartiallyReceived).is_ok());
        assert!(PartiallyReceived.ensure_transition(FullyReceived).is_ok());
        assert!(FullyReceived.ensure_transition(InWarehouse).is_ok());
        assert!(InWarehouse.is_terminal());
    }

    #[test]
    fn goods_receipt_can_complete_in_one_step() {
        use GoodsReceiptStatus::*;
        // A single receive covering every line jumps straight to fully received
        assert!(Pending.ensure_transition(FullyReceived).is_ok());
    }

    #[test]
    fn goods_receipt_cancel_only_while_untouched() {
        use GoodsReceiptStatus::*;
        assert!(Pending.ensure_transition(Cancelled).is_ok());
        assert!(PartiallyReceived.ensure_transition(Cancelled).is_err());
        assert!(FullyReceived.ensure_transition(Cancelled).is_err());
        assert!(InWarehouse.ensure_transition(Cancelled).is_err());
    }

    #[test]
    fn purchase_order_requires_approval_before_receiving() {
        use PurchaseOrderStatus::*;
        assert!(Pending.ensure_transition(PartiallyReceived).is_err());
        assert!(Pending.ensure_transition(Approved).is_ok());
        assert!(Approved.ensure_transition(PartiallyReceived).is_ok());
        assert!(Approved.ensure_transition(FullyReceived).is_ok());
    }

    #[test]
    fn invoice_must_be_issued_before_payment() {
        use InvoiceStatus::*;
        assert!(Draft.ensure_transition(PartiallyPaid).is_err());
        assert!(Draft.ensure_transition(FullyPaid).is_err());
        assert!(Draft.ensure_transition(Unpaid).is_ok());
    }

    #[test]
    fn invoice_cancellation_window() {
        use InvoiceStatus::*;
        assert!(Draft.ensure_transition(Cancelled).is_ok());
        assert!(Unpaid.ensure_transition(Cancelled).is_ok());
        assert!(PartiallyPaid.ensure_transition(Cancelled).is_err());
        assert!(FullyPaid.ensure_transition(Cancelled).is_err());
    }

    #[test]
    fn transfer_rejection_and_cancellation() {
        use TransferStatus::*;
        assert!(Pending.ensure_transition(Rejected).is_ok());
        assert!(Approved.ensure_transition(Rejected).is_err());
        assert!(Pending.ensure_transition(Cancelled).is_ok());
        assert!(Approved.ensure_transition(Cancelled).is_ok());
        assert!(PartiallyTransferred.ensure_transition(Cancelled).is_err());
    }

    #[test]
    fn adjustment_is_decided_once() {
        use AdjustmentStatus::*;
        assert!(Pending.ensure_transition(Approved).is_ok());
        assert!(Approved.ensure_transition(Rejected).is_err());
        assert!(Approved.ensure_transition(Approved).is_err());
        assert!(Rejected.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn terminal_replay_reports_the_offending_pair() {
        let err = TransferStatus::FullyTransferred
            .ensure_transition(TransferStatus::FullyTransferred)
            .unwrap_err();
        assert_eq!(err.document_type, "stock_transfer");
        assert_eq!(err.from, "fully_transferred");
        assert_eq!(err.to, "fully_transferred");
    }

    #[test]
    fn fulfilment_boundaries() {
        assert_eq!(resolve_fulfilment(10, 0), Fulfilment::NotStarted);
        assert_eq!(resolve_fulfilment(10, 1), Fulfilment::Partial);
        assert_eq!(resolve_fulfilment(10, 9), Fulfilment::Partial);
        assert_eq!(resolve_fulfilment(10, 10), Fulfilment::Complete);
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    const RECEIPT_STATUSES: [GoodsReceiptStatus; 5] = [
        GoodsReceiptStatus::Pending,
        GoodsReceiptStatus::PartiallyReceived,
        GoodsReceiptStatus::FullyReceived,
        GoodsReceiptStatus::InWarehouse,
        GoodsReceiptStatus::Cancelled,
    ];

    const TRANSFER_STATUSES: [TransferStatus; 6] = [
        TransferStatus::Pending,
        TransferStatus::Approved,
        TransferStatus::PartiallyTransferred,
        TransferStatus::FullyTransferred,
        TransferStatus::Rejected,
        TransferStatus::Cancelled,
    ];

    const PAYMENT_STATUSES: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Approved,
        PaymentStatus::Rejected,
    ];

    proptest! {
        #[test]
        fn no_status_transitions_to_itself(idx in 0usize..5) {
            let s = RECEIPT_STATUSES[idx];
            prop_assert!(!s.can_transition(s));
        }

        #[test]
        fn transfer_adjacency_matches_ensure(from in 0usize..6, to in 0usize..6) {
            let (from, to) = (TRANSFER_STATUSES[from], TRANSFER_STATUSES[to]);
            prop_assert_eq!(from.can_transition(to), from.ensure_transition(to).is_ok());
        }

        #[test]
        fn decided_payments_never_move(from in 1usize..3, to in 0usize..3) {
            // Approved and rejected payments are immutable
            let (from, to) = (PAYMENT_STATUSES[from], PAYMENT_STATUSES[to]);
            prop_assert!(from.ensure_transition(to).is_err());
        }

        #[test]
        fn fulfilment_is_complete_iff_quantity_met(
            expected in 1i64..10_000,
            completed in 0i64..10_000,
        ) {
            let f = resolve_fulfilment(expected, completed);
            prop_assert_eq!(f == Fulfilment::Complete, completed >= expected);
            prop_assert_eq!(f == Fulfilment::NotStarted, completed == 0);
        }
    }
}
