//! Stock ledger service
//!
//! Sole writer of on-hand quantities. Every mutation locks the stock
//! level row (`SELECT ... FOR UPDATE`) so concurrent transitions against
//! the same warehouse-product serialize instead of losing updates, and
//! every mutation leaves an audit row in `stock_movements`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    apply_stock_delta, weighted_average_cost, Pagination, PaginatedResponse, PaginationMeta,
};

/// Stock ledger service enforcing non-negative on-hand quantities
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
}

/// Why a quantity changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    GoodsReceipt,
    Sale,
    TransferOut,
    TransferIn,
    CountCorrection,
    Return,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::GoodsReceipt => "goods_receipt",
            MovementReason::Sale => "sale",
            MovementReason::TransferOut => "transfer_out",
            MovementReason::TransferIn => "transfer_in",
            MovementReason::CountCorrection => "count_correction",
            MovementReason::Return => "return",
        }
    }
}

/// On-hand stock for a product in one warehouse
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLevel {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub qty: i64,
    pub last_cost: Option<Decimal>,
    pub average_cost: Option<Decimal>,
    pub critical_level_qty: Option<i64>,
    pub has_serials: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit record of one ledger mutation
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub warehouse_product_id: Uuid,
    pub delta: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub reference_line_id: Option<Uuid>,
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a ledger mutation, fed to the threshold check after commit
#[derive(Debug, Clone, Copy)]
pub struct LedgerUpdate {
    pub warehouse_product_id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub delta: i64,
    pub has_serials: bool,
    pub average_cost: Option<Decimal>,
}

/// Locked stock level row during a mutation
#[derive(Debug, FromRow)]
struct LockedLevel {
    warehouse_id: Uuid,
    product_id: Uuid,
    qty: i64,
    average_cost: Option<Decimal>,
    has_serials: bool,
}

impl StockLedgerService {
    /// Create a new StockLedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply a signed quantity delta inside the caller's transaction.
    ///
    /// Negative deltas that would push the quantity below zero fail with
    /// `InsufficientStock` and leave the row untouched. A positive delta
    /// with a unit cost refreshes last cost and the weighted average.
    pub async fn apply_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        delta: i64,
        reason: MovementReason,
        reference_line_id: Option<Uuid>,
        unit_cost: Option<Decimal>,
    ) -> AppResult<LedgerUpdate> {
        let level = self.lock_level(tx, warehouse_product_id).await?;

        let new_qty = apply_stock_delta(level.qty, delta).ok_or_else(|| {
            AppError::InsufficientStock(format!(
                "warehouse product {} has {} on hand, cannot remove {}",
                warehouse_product_id, level.qty, -delta
            ))
        })?;

        let new_average = if delta > 0 {
            weighted_average_cost(level.average_cost, level.qty, unit_cost, delta)
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE warehouse_products
            SET qty = $1,
                last_cost = COALESCE($2, last_cost),
                average_cost = COALESCE($3, average_cost),
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(new_qty)
        .bind(if delta > 0 { unit_cost } else { None })
        .bind(new_average)
        .bind(warehouse_product_id)
        .execute(&mut **tx)
        .await?;

        self.record_movement(
            tx,
            warehouse_product_id,
            delta,
            new_qty,
            reason,
            reference_line_id,
            unit_cost,
        )
        .await?;

        Ok(LedgerUpdate {
            warehouse_product_id,
            warehouse_id: level.warehouse_id,
            product_id: level.product_id,
            quantity: new_qty,
            delta,
            has_serials: level.has_serials,
            average_cost: new_average.or(level.average_cost),
        })
    }

    /// Write an absolute quantity (count correction). The delta is
    /// recomputed against the current quantity for the audit trail even
    /// though the write itself is absolute.
    pub async fn set_absolute(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        new_qty: i64,
        reason: MovementReason,
        reference_line_id: Option<Uuid>,
    ) -> AppResult<LedgerUpdate> {
        if new_qty < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
            });
        }

        let level = self.lock_level(tx, warehouse_product_id).await?;
        let delta = new_qty - level.qty;

        sqlx::query("UPDATE warehouse_products SET qty = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_qty)
            .bind(warehouse_product_id)
            .execute(&mut **tx)
            .await?;

        self.record_movement(
            tx,
            warehouse_product_id,
            delta,
            new_qty,
            reason,
            reference_line_id,
            None,
        )
        .await?;

        Ok(LedgerUpdate {
            warehouse_product_id,
            warehouse_id: level.warehouse_id,
            product_id: level.product_id,
            quantity: new_qty,
            delta,
            has_serials: level.has_serials,
            average_cost: level.average_cost,
        })
    }

    /// Standalone delta outside any document flow (e.g. customer return)
    pub async fn adjust(
        &self,
        warehouse_product_id: Uuid,
        delta: i64,
        reason: MovementReason,
    ) -> AppResult<LedgerUpdate> {
        let mut tx = self.db.begin().await?;
        let update = self
            .apply_delta(&mut tx, warehouse_product_id, delta, reason, None, None)
            .await?;
        tx.commit().await?;
        Ok(update)
    }

    /// Get the stock level for a warehouse-product
    pub async fn get_level(&self, warehouse_product_id: Uuid) -> AppResult<StockLevel> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT id, warehouse_id, product_id, qty, last_cost, average_cost,
                   critical_level_qty, has_serials, archived_at, created_at, updated_at
            FROM warehouse_products
            WHERE id = $1
            "#,
        )
        .bind(warehouse_product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock level".to_string()))?;

        Ok(level)
    }

    /// List active stock levels in a warehouse
    pub async fn list_levels(&self, warehouse_id: Uuid) -> AppResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT id, warehouse_id, product_id, qty, last_cost, average_cost,
                   critical_level_qty, has_serials, archived_at, created_at, updated_at
            FROM warehouse_products
            WHERE warehouse_id = $1 AND archived_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(levels)
    }

    /// Movement history for a warehouse-product, newest first
    pub async fn list_movements(
        &self,
        warehouse_product_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_movements WHERE warehouse_product_id = $1",
        )
        .bind(warehouse_product_id)
        .fetch_one(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, warehouse_product_id, delta, quantity_after, reason,
                   reference_line_id, unit_cost, created_at
            FROM stock_movements
            WHERE warehouse_product_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(warehouse_product_id)
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: movements,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Lock the stock level row for the duration of the transaction
    async fn lock_level(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
    ) -> AppResult<LockedLevel> {
        let level = sqlx::query_as::<_, LockedLevel>(
            r#"
            SELECT warehouse_id, product_id, qty, average_cost, has_serials
            FROM warehouse_products
            WHERE id = $1 AND archived_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(warehouse_product_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock level".to_string()))?;

        Ok(level)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_movement(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        delta: i64,
        quantity_after: i64,
        reason: MovementReason,
        reference_line_id: Option<Uuid>,
        unit_cost: Option<Decimal>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (warehouse_product_id, delta, quantity_after, reason,
                                         reference_line_id, unit_cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(warehouse_product_id)
        .bind(delta)
        .bind(quantity_after)
        .bind(reason.as_str())
        .bind(reference_line_id)
        .bind(unit_cost)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

