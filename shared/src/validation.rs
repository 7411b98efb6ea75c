//! Validation utilities for the Warehouse Inventory Management System

use rust_decimal::Decimal;

/// Validate a serial number: 1–64 characters, alphanumeric plus `-`/`_`
pub fn validate_serial_number(serial: &str) -> Result<(), &'static str> {
    if serial.is_empty() {
        return Err("Serial number must not be empty");
    }
    if serial.len() > 64 {
        return Err("Serial number must be at most 64 characters");
    }
    if !serial
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Serial number must be alphanumeric with dashes or underscores");
    }
    Ok(())
}

/// Validate a document line quantity
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a monetary amount is not negative
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate that a document carries at least one line
pub fn validate_has_lines(line_count: usize) -> Result<(), &'static str> {
    if line_count == 0 {
        return Err("Document must have at least one line");
    }
    Ok(())
}

/// Validate a warehouse code: 2–10 uppercase alphanumeric
pub fn validate_warehouse_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Warehouse code must be at least 2 characters");
    }
    if code.len() > 10 {
        return Err("Warehouse code must be at most 10 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err("Warehouse code must be uppercase alphanumeric only");
    }
    Ok(())
}

/// Validate that supplied serials match the line quantity for
/// serial-tracked products
pub fn validate_serial_count(quantity: i64, serial_count: usize) -> Result<(), &'static str> {
    if serial_count as i64 != quantity {
        return Err("Serial count must match line quantity");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_numbers_allow_dashes() {
        assert!(validate_serial_number("SN-2025_0001").is_ok());
        assert!(validate_serial_number("").is_err());
        assert!(validate_serial_number("bad serial").is_err());
        assert!(validate_serial_number(&"X".repeat(65)).is_err());
    }

    #[test]
    fn quantities_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn amounts_reject_negatives_only() {
        assert!(validate_amount(Decimal::ZERO).is_ok());
        assert!(validate_amount(Decimal::new(1999, 2)).is_ok());
        assert!(validate_amount(Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn warehouse_codes_are_uppercase() {
        assert!(validate_warehouse_code("BKK01").is_ok());
        assert!(validate_warehouse_code("b").is_err());
        assert!(validate_warehouse_code("bkk01").is_err());
    }

    #[test]
    fn serial_count_must_match_quantity() {
        assert!(validate_serial_count(3, 3).is_ok());
        assert!(validate_serial_count(3, 2).is_err());
        assert!(validate_serial_count(0, 0).is_ok());
    }
}
