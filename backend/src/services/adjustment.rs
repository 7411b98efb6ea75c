//! Stock adjustments
//!
//! An adjustment records counted quantities against a warehouse. Approval
//! is the event that rewrites the ledger: each line becomes an absolute
//! count correction, with the pre-correction quantity captured on the
//! line for the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerUpdate, MovementReason, StockLedgerService};
use crate::services::next_document_number;
use shared::{
    validate_has_lines, AdjustmentStatus, DocumentStatus, Pagination, PaginatedResponse,
    PaginationMeta,
};

/// Stock adjustment service
#[derive(Clone)]
pub struct StockAdjustmentService {
    db: PgPool,
    ledger: StockLedgerService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub number: String,
    pub warehouse_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockAdjustmentLine {
    pub id: Uuid,
    pub stock_adjustment_id: Uuid,
    pub warehouse_product_id: Uuid,
    pub counted_qty: i64,
    /// Quantity on hand at the moment of approval; null until approved
    pub previous_qty: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StockAdjustmentDetail {
    #[serde(flatten)]
    pub adjustment: StockAdjustment,
    pub lines: Vec<StockAdjustmentLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentRequest {
    pub warehouse_id: Uuid,
    pub notes: Option<String>,
    pub lines: Vec<CreateAdjustmentLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentLine {
    pub warehouse_product_id: Uuid,
    pub counted_qty: i64,
}

/// Result of approving an adjustment; updates feed the threshold check
pub struct AdjustmentOutcome {
    pub adjustment: StockAdjustmentDetail,
    pub updates: Vec<LedgerUpdate>,
}

impl StockAdjustmentService {
    /// Create a new StockAdjustmentService instance
    pub fn new(db: PgPool) -> Self {
        let ledger = StockLedgerService::new(db.clone());
        Self { db, ledger }
    }

    /// Record a count in pending status. Nothing changes until approval.
    pub async fn create(
        &self,
        req: CreateAdjustmentRequest,
        created_by: Uuid,
    ) -> AppResult<StockAdjustmentDetail> {
        validate_has_lines(req.lines.len())?;
        for line in &req.lines {
            if line.counted_qty < 0 {
                return Err(AppError::Validation {
                    field: "counted_qty".to_string(),
                    message: "Counted quantity cannot be negative".to_string(),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        for line in &req.lines {
            let warehouse_id: Uuid = sqlx::query_scalar(
                "SELECT warehouse_id FROM warehouse_products WHERE id = $1 AND archived_at IS NULL",
            )
            .bind(line.warehouse_product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock level".to_string()))?;

            if warehouse_id != req.warehouse_id {
                return Err(AppError::Validation {
                    field: "warehouse_product_id".to_string(),
                    message: "Line stock level does not belong to the adjusted warehouse"
                        .to_string(),
                });
            }
        }

        let number = next_document_number(&mut tx, "ADJ").await?;

        let adjustment = sqlx::query_as::<_, StockAdjustment>(
            r#"
            INSERT INTO stock_adjustments (number, warehouse_id, status, notes, created_by)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING id, number, warehouse_id, status, notes, created_by, approved_by,
                      created_at, updated_at
            "#,
        )
        .bind(&number)
        .bind(req.warehouse_id)
        .bind(&req.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let row = sqlx::query_as::<_, StockAdjustmentLine>(
                r#"
                INSERT INTO stock_adjustment_lines (stock_adjustment_id, warehouse_product_id,
                                                    counted_qty)
                VALUES ($1, $2, $3)
                RETURNING id, stock_adjustment_id, warehouse_product_id, counted_qty,
                          previous_qty
                "#,
            )
            .bind(adjustment.id)
            .bind(line.warehouse_product_id)
            .bind(line.counted_qty)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(row);
        }

        tx.commit().await?;
        Ok(StockAdjustmentDetail { adjustment, lines })
    }

    /// Approve the count: every line becomes an absolute correction on
    /// the ledger, atomically with the status change.
    pub async fn approve(&self, id: Uuid, approved_by: Uuid) -> AppResult<AdjustmentOutcome> {
        let mut tx = self.db.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM stock_adjustments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock adjustment".to_string()))?;

        parse_status(&status)?.ensure_transition(AdjustmentStatus::Approved)?;

        let lines = sqlx::query_as::<_, StockAdjustmentLine>(
            r#"
            SELECT id, stock_adjustment_id, warehouse_product_id, counted_qty, previous_qty
            FROM stock_adjustment_lines
            WHERE stock_adjustment_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let mut updates = Vec::with_capacity(lines.len());
        for line in &lines {
            let update = self
                .ledger
                .set_absolute(
                    &mut tx,
                    line.warehouse_product_id,
                    line.counted_qty,
                    MovementReason::CountCorrection,
                    Some(line.id),
                )
                .await?;

            sqlx::query("UPDATE stock_adjustment_lines SET previous_qty = $1 WHERE id = $2")
                .bind(update.quantity - update.delta)
                .bind(line.id)
                .execute(&mut *tx)
                .await?;

            updates.push(update);
        }

        sqlx::query(
            r#"
            UPDATE stock_adjustments
            SET status = 'approved', approved_by = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(approved_by)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let adjustment = self.get(id).await?;
        Ok(AdjustmentOutcome {
            adjustment,
            updates,
        })
    }

    pub async fn reject(&self, id: Uuid, decided_by: Uuid) -> AppResult<StockAdjustment> {
        self.transition(id, AdjustmentStatus::Rejected, Some(decided_by))
            .await
    }

    pub async fn cancel(&self, id: Uuid) -> AppResult<StockAdjustment> {
        self.transition(id, AdjustmentStatus::Cancelled, None).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockAdjustmentDetail> {
        let adjustment = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT id, number, warehouse_id, status, notes, created_by, approved_by,
                   created_at, updated_at
            FROM stock_adjustments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock adjustment".to_string()))?;

        let lines = sqlx::query_as::<_, StockAdjustmentLine>(
            r#"
            SELECT id, stock_adjustment_id, warehouse_product_id, counted_qty, previous_qty
            FROM stock_adjustment_lines
            WHERE stock_adjustment_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(StockAdjustmentDetail { adjustment, lines })
    }

    pub async fn list(
        &self,
        status: Option<AdjustmentStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockAdjustment>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_adjustments WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.db)
        .await?;

        let adjustments = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT id, number, warehouse_id, status, notes, created_by, approved_by,
                   created_at, updated_at
            FROM stock_adjustments
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: adjustments,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    async fn transition(
        &self,
        id: Uuid,
        target: AdjustmentStatus,
        decided_by: Option<Uuid>,
    ) -> AppResult<StockAdjustment> {
        let mut tx = self.db.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM stock_adjustments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock adjustment".to_string()))?;

        parse_status(&status)?.ensure_transition(target)?;

        let adjustment = sqlx::query_as::<_, StockAdjustment>(
            r#"
            UPDATE stock_adjustments
            SET status = $1, approved_by = COALESCE($2, approved_by), updated_at = NOW()
            WHERE id = $3
            RETURNING id, number, warehouse_id, status, notes, created_by, approved_by,
                      created_at, updated_at
            "#,
        )
        .bind(target.as_str())
        .bind(decided_by)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(adjustment)
    }
}

fn parse_status(s: &str) -> AppResult<AdjustmentStatus> {
    AdjustmentStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("corrupt stock adjustment status '{}'", s)))
}
