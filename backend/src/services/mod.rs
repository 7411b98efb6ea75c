//! Business logic services for the Warehouse Inventory Management System

pub mod adjustment;
pub mod alerts;
pub mod goods_receipt;
pub mod invoice;
pub mod ledger;
pub mod notification;
pub mod purchase_order;
pub mod serial;
pub mod transfer;
pub mod warehouse;

pub use adjustment::StockAdjustmentService;
pub use alerts::ThresholdAlertService;
pub use goods_receipt::GoodsReceiptService;
pub use invoice::InvoiceService;
pub use ledger::StockLedgerService;
pub use notification::NotificationService;
pub use purchase_order::PurchaseOrderService;
pub use serial::SerialRegistryService;
pub use transfer::StockTransferService;
pub use warehouse::WarehouseService;

use chrono::{Datelike, Utc};
use shared::format_document_number;
use sqlx::{Postgres, Transaction};

use crate::error::AppResult;

/// Allocate the next human-readable document number inside the caller's
/// transaction, e.g. `GRN-2025-0001`
pub(crate) async fn next_document_number(
    tx: &mut Transaction<'_, Postgres>,
    prefix: &str,
) -> AppResult<String> {
    let year = Utc::now().year();

    let sequence: i32 = sqlx::query_scalar("SELECT get_next_document_sequence($1, $2)")
        .bind(prefix)
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;

    Ok(format_document_number(prefix, year, sequence))
}

/// SQL for a document's line totals (planned vs completed quantity).
/// Postgres widens SUM over BIGINT to NUMERIC, so both sums are cast
/// back to BIGINT to decode as `(i64, i64)`.
pub(crate) fn line_totals_query(table: &str, planned: &str, completed: &str, parent: &str) -> String {
    format!(
        "SELECT COALESCE(SUM({planned}), 0)::BIGINT, COALESCE(SUM({completed}), 0)::BIGINT \
         FROM {table} WHERE {parent} = $1"
    )
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn line_totals_casts_sums_to_bigint() {
        let sql = line_totals_query(
            "goods_receipt_lines",
            "expected_qty",
            "received_qty",
            "goods_receipt_id",
        );
        assert_eq!(sql.matches("::BIGINT").count(), 2);
        assert!(sql.contains("COALESCE(SUM(expected_qty), 0)::BIGINT"));
        assert!(sql.contains("COALESCE(SUM(received_qty), 0)::BIGINT"));
        assert!(sql.ends_with("FROM goods_receipt_lines WHERE goods_receipt_id = $1"));
    }
}
