//! Monetary document math
//!
//! Totals are always recomputed server-side from lines; client-submitted
//! totals are never trusted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Amount components of a single document line
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineAmounts {
    pub quantity: i64,
    pub unit_price: Decimal,
    /// Tax rate as a percentage, e.g. 7 for 7%
    pub tax_rate_percent: Decimal,
}

impl LineAmounts {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn tax(&self) -> Decimal {
        self.subtotal() * self.tax_rate_percent / Decimal::from(100)
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax()
    }
}

/// Header totals derived from lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Recompute header totals from line amounts plus a shipping charge
pub fn recompute_totals(lines: &[LineAmounts], shipping: Decimal) -> DocumentTotals {
    let subtotal: Decimal = lines.iter().map(LineAmounts::subtotal).sum();
    let tax_total: Decimal = lines.iter().map(LineAmounts::tax).sum();
    DocumentTotals {
        subtotal,
        tax_total,
        shipping,
        total: subtotal + tax_total + shipping,
    }
}

/// Line payload accepted when creating priced documents
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentLineInput {
    pub warehouse_product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate_percent: Decimal,
    /// Serial numbers pinned to this line, for serial-tracked products
    #[serde(default)]
    pub serial_numbers: Vec<String>,
}

impl DocumentLineInput {
    pub fn amounts(&self) -> LineAmounts {
        LineAmounts {
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate_percent: self.tax_rate_percent,
        }
    }
}

/// Format a human-readable document number, e.g. `INV-2025-0042`
pub fn format_document_number(prefix: &str, year: i32, sequence: i32) -> String {
    format!("{}-{}-{:04}", prefix, year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn line_totals_include_tax() {
        let line = LineAmounts {
            quantity: 4,
            unit_price: dec("25.00"),
            tax_rate_percent: dec("7"),
        };
        assert_eq!(line.subtotal(), dec("100.00"));
        assert_eq!(line.tax(), dec("7.0000"));
        assert_eq!(line.total(), dec("107.0000"));
    }

    #[test]
    fn header_totals_sum_lines_and_shipping() {
        let lines = [
            LineAmounts {
                quantity: 2,
                unit_price: dec("100"),
                tax_rate_percent: Decimal::ZERO,
            },
            LineAmounts {
                quantity: 1,
                unit_price: dec("50"),
                tax_rate_percent: dec("10"),
            },
        ];
        let totals = recompute_totals(&lines, dec("15"));
        assert_eq!(totals.subtotal, dec("250"));
        assert_eq!(totals.tax_total, dec("5.0"));
        assert_eq!(totals.total, dec("270.0"));
    }

    #[test]
    fn empty_document_totals_are_zero() {
        let totals = recompute_totals(&[], Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn document_numbers_are_zero_padded() {
        assert_eq!(format_document_number("GRN", 2025, 7), "GRN-2025-0007");
        assert_eq!(format_document_number("INV", 2025, 1234), "INV-2025-1234");
    }
}
