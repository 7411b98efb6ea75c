//! Serial unit lifecycle and validation tests

use shared::{validate_serial_count, validate_serial_number, SerialState};

mod unit_tests {
    use super::*;

    #[test]
    fn lifecycle_is_consume_once() {
        use SerialState::*;
        assert!(Available.may_become(Sold));
        assert!(Available.may_become(Transferred));
        assert!(Available.may_become(Reserved));
        // Consuming twice is impossible from either consumed state
        assert!(!Sold.may_become(Sold));
        assert!(!Sold.may_become(Transferred));
        assert!(!Transferred.may_become(Sold));
    }

    #[test]
    fn reservation_is_reversible() {
        use SerialState::*;
        assert!(Reserved.may_become(Available));
        assert!(Reserved.may_become(Sold));
        assert!(!Available.may_become(Available));
    }

    #[test]
    fn invoice_hold_reserves_then_sells_or_releases() {
        use SerialState::*;
        // Issuing an invoice holds the pinned unit, cancelling returns it,
        // full payment sells it
        assert!(Available.may_become(Reserved));
        assert!(Reserved.may_become(Available));
        assert!(Reserved.may_become(Sold));
        // A sold unit can never go back on hold
        assert!(!Sold.may_become(Reserved));
        assert!(!Transferred.may_become(Reserved));
    }

    #[test]
    fn consumable_matches_live_states() {
        assert!(SerialState::Available.is_consumable());
        assert!(SerialState::Reserved.is_consumable());
        assert!(!SerialState::Sold.is_consumable());
        assert!(!SerialState::Transferred.is_consumable());
    }

    #[test]
    fn serial_numbers_reject_whitespace_and_symbols() {
        assert!(validate_serial_number("ABC-123_x").is_ok());
        assert!(validate_serial_number("ABC 123").is_err());
        assert!(validate_serial_number("ABC#123").is_err());
        assert!(validate_serial_number("").is_err());
    }

    #[test]
    fn tracked_lines_need_one_serial_per_unit() {
        assert!(validate_serial_count(5, 5).is_ok());
        assert!(validate_serial_count(5, 4).is_err());
        assert!(validate_serial_count(5, 6).is_err());
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    const STATES: [SerialState; 4] = [
        SerialState::Available,
        SerialState::Reserved,
        SerialState::Sold,
        SerialState::Transferred,
    ];

    proptest! {
        #[test]
        fn consumed_states_accept_nothing(from in 2usize..4, to in 0usize..4) {
            prop_assert!(!STATES[from].may_become(STATES[to]));
        }

        #[test]
        fn transitions_never_target_the_current_state(idx in 0usize..4) {
            let s = STATES[idx];
            prop_assert!(!s.may_become(s));
        }

        #[test]
        fn state_strings_round_trip(idx in 0usize..4) {
            let s = STATES[idx];
            prop_assert_eq!(SerialState::parse(s.as_str()), Some(s));
        }

        #[test]
        fn valid_charset_always_passes(serial in "[A-Za-z0-9_-]{1,64}") {
            prop_assert!(validate_serial_number(&serial).is_ok());
        }

        #[test]
        fn overlong_serials_always_fail(serial in "[A-Za-z0-9]{65,80}") {
            prop_assert!(validate_serial_number(&serial).is_err());
        }
    }
}
