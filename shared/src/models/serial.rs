//! Serial-unit lifecycle
//!
//! A serialized unit moves Available → {Reserved, Sold, Transferred}
//! exactly once per consuming document line. Reserved units may be
//! released back to Available; Sold and Transferred are final.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// State of an individually tracked unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialState {
    Available,
    Reserved,
    Sold,
    Transferred,
}

impl SerialState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialState::Available => "available",
            SerialState::Reserved => "reserved",
            SerialState::Sold => "sold",
            SerialState::Transferred => "transferred",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SerialState::Available),
            "reserved" => Some(SerialState::Reserved),
            "sold" => Some(SerialState::Sold),
            "transferred" => Some(SerialState::Transferred),
            _ => None,
        }
    }

    /// Whether a unit in this state can still be consumed
    pub fn is_consumable(&self) -> bool {
        matches!(self, SerialState::Available | SerialState::Reserved)
    }

    /// Legal state changes for `reserve_or_consume`
    pub fn may_become(&self, target: SerialState) -> bool {
        match self {
            SerialState::Available => matches!(
                target,
                SerialState::Reserved | SerialState::Sold | SerialState::Transferred
            ),
            SerialState::Reserved => matches!(
                target,
                SerialState::Available | SerialState::Sold | SerialState::Transferred
            ),
            SerialState::Sold | SerialState::Transferred => false,
        }
    }
}

/// Serial unit attributes supplied when goods are received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialUnitSpec {
    pub serial_number: String,
    pub batch_number: Option<String>,
    pub manufactured_at: Option<NaiveDate>,
    pub expired_at: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_can_be_consumed() {
        assert!(SerialState::Available.may_become(SerialState::Sold));
        assert!(SerialState::Available.may_become(SerialState::Transferred));
        assert!(SerialState::Available.may_become(SerialState::Reserved));
    }

    #[test]
    fn consumed_units_are_final() {
        for consumed in [SerialState::Sold, SerialState::Transferred] {
            assert!(!consumed.may_become(SerialState::Available));
            assert!(!consumed.may_become(SerialState::Sold));
            assert!(!consumed.may_become(SerialState::Transferred));
            assert!(!consumed.is_consumable());
        }
    }

    #[test]
    fn reserved_can_be_released_or_consumed() {
        assert!(SerialState::Reserved.may_become(SerialState::Available));
        assert!(SerialState::Reserved.may_become(SerialState::Sold));
        assert!(SerialState::Reserved.is_consumable());
    }

    #[test]
    fn state_strings_round_trip() {
        for s in [
            SerialState::Available,
            SerialState::Reserved,
            SerialState::Sold,
            SerialState::Transferred,
        ] {
            assert_eq!(SerialState::parse(s.as_str()), Some(s));
        }
        assert_eq!(SerialState::parse("broken"), None);
    }
}
