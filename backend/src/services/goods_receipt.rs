//! Goods receipts
//!
//! Receiving a line is the event that lands stock: the positive ledger
//! delta, serial registration and purchase order progress all commit in
//! one transaction with the line update. Header status is recomputed
//! from the line quantities, never incremented. The terminal
//! `in_warehouse` step is a put-away confirmation with no stock effect.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerUpdate, MovementReason, StockLedgerService};
use crate::services::next_document_number;
use crate::services::purchase_order::PurchaseOrderService;
use crate::services::serial::SerialRegistryService;
use shared::{
    resolve_fulfilment, validate_has_lines, validate_quantity, validate_serial_count,
    DocumentStatus, Fulfilment, GoodsReceiptStatus, Pagination, PaginatedResponse,
    PaginationMeta, SerialUnitSpec,
};

/// Goods receipt service
#[derive(Clone)]
pub struct GoodsReceiptService {
    db: PgPool,
    ledger: StockLedgerService,
    serials: SerialRegistryService,
    purchase_orders: PurchaseOrderService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoodsReceipt {
    pub id: Uuid,
    pub number: String,
    pub supplier_name: String,
    pub purchase_order_id: Option<Uuid>,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoodsReceiptLine {
    pub id: Uuid,
    pub goods_receipt_id: Uuid,
    pub warehouse_product_id: Uuid,
    pub purchase_order_line_id: Option<Uuid>,
    pub expected_qty: i64,
    pub received_qty: i64,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct GoodsReceiptDetail {
    #[serde(flatten)]
    pub receipt: GoodsReceipt,
    pub lines: Vec<GoodsReceiptLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoodsReceiptRequest {
    pub supplier_name: String,
    pub purchase_order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub lines: Vec<CreateGoodsReceiptLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoodsReceiptLine {
    pub warehouse_product_id: Uuid,
    pub purchase_order_line_id: Option<Uuid>,
    pub expected_qty: i64,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveLineRequest {
    pub quantity: i64,
    #[serde(default)]
    pub serial_units: Vec<SerialUnitSpec>,
}

/// Result of receiving a line; the ledger update feeds the post-commit
/// threshold check
pub struct ReceiveOutcome {
    pub receipt: GoodsReceiptDetail,
    pub update: LedgerUpdate,
}

impl GoodsReceiptService {
    /// Create a new GoodsReceiptService instance
    pub fn new(db: PgPool) -> Self {
        let ledger = StockLedgerService::new(db.clone());
        let serials = SerialRegistryService::new(db.clone());
        let purchase_orders = PurchaseOrderService::new(db.clone());
        Self {
            db,
            ledger,
            serials,
            purchase_orders,
        }
    }

    /// Create a goods receipt in pending status. Expected quantities come
    /// from the request; nothing lands in stock until lines are received.
    pub async fn create(
        &self,
        req: CreateGoodsReceiptRequest,
        created_by: Uuid,
    ) -> AppResult<GoodsReceiptDetail> {
        if req.supplier_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "supplier_name".to_string(),
                message: "Supplier name is required".to_string(),
            });
        }
        validate_has_lines(req.lines.len())?;
        for line in &req.lines {
            validate_quantity(line.expected_qty)?;
            if let Some(cost) = line.unit_cost {
                if cost < Decimal::ZERO {
                    return Err(AppError::Validation {
                        field: "unit_cost".to_string(),
                        message: "Unit cost cannot be negative".to_string(),
                    });
                }
            }
        }

        let mut tx = self.db.begin().await?;
        let number = next_document_number(&mut tx, "GRN").await?;

        let receipt = sqlx::query_as::<_, GoodsReceipt>(
            r#"
            INSERT INTO goods_receipts (number, supplier_name, purchase_order_id, status,
                                        notes, created_by)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            RETURNING id, number, supplier_name, purchase_order_id, status, notes,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(&number)
        .bind(req.supplier_name.trim())
        .bind(req.purchase_order_id)
        .bind(&req.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let row = sqlx::query_as::<_, GoodsReceiptLine>(
                r#"
                INSERT INTO goods_receipt_lines (goods_receipt_id, warehouse_product_id,
                                                 purchase_order_line_id, expected_qty,
                                                 received_qty, unit_cost)
                VALUES ($1, $2, $3, $4, 0, $5)
                RETURNING id, goods_receipt_id, warehouse_product_id, purchase_order_line_id,
                          expected_qty, received_qty, unit_cost
                "#,
            )
            .bind(receipt.id)
            .bind(line.warehouse_product_id)
            .bind(line.purchase_order_line_id)
            .bind(line.expected_qty)
            .bind(line.unit_cost)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(row);
        }

        tx.commit().await?;
        Ok(GoodsReceiptDetail { receipt, lines })
    }

    /// Receive quantity against a line. Applies the positive ledger delta,
    /// registers serial units for tracked products, pushes purchase order
    /// progress and recomputes the header status, all atomically.
    pub async fn receive_line(
        &self,
        receipt_id: Uuid,
        line_id: Uuid,
        req: ReceiveLineRequest,
    ) -> AppResult<ReceiveOutcome> {
        validate_quantity(req.quantity)?;

        let mut tx = self.db.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM goods_receipts WHERE id = $1 FOR UPDATE")
                .bind(receipt_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Goods receipt".to_string()))?;
        let current = parse_status(&status)?;

        if !matches!(
            current,
            GoodsReceiptStatus::Pending | GoodsReceiptStatus::PartiallyReceived
        ) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot receive against a goods receipt in status '{}'",
                current.as_str()
            )));
        }

        let line = sqlx::query_as::<_, GoodsReceiptLine>(
            r#"
            SELECT id, goods_receipt_id, warehouse_product_id, purchase_order_line_id,
                   expected_qty, received_qty, unit_cost
            FROM goods_receipt_lines
            WHERE id = $1 AND goods_receipt_id = $2
            FOR UPDATE
            "#,
        )
        .bind(line_id)
        .bind(receipt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Goods receipt line".to_string()))?;

        if line.received_qty + req.quantity > line.expected_qty {
            return Err(AppError::ValidationError(format!(
                "Receiving {} would exceed the expected quantity of {}",
                line.received_qty + req.quantity,
                line.expected_qty
            )));
        }

        let update = self
            .ledger
            .apply_delta(
                &mut tx,
                line.warehouse_product_id,
                req.quantity,
                MovementReason::GoodsReceipt,
                Some(line.id),
                line.unit_cost,
            )
            .await?;

        if update.has_serials {
            validate_serial_count(req.quantity, req.serial_units.len())?;
            self.serials
                .register_units(
                    &mut tx,
                    line.warehouse_product_id,
                    &req.serial_units,
                    Some(line.id),
                )
                .await?;
        } else if !req.serial_units.is_empty() {
            return Err(AppError::Validation {
                field: "serial_units".to_string(),
                message: "This product is not serial-tracked".to_string(),
            });
        }

        sqlx::query("UPDATE goods_receipt_lines SET received_qty = received_qty + $1 WHERE id = $2")
            .bind(req.quantity)
            .bind(line.id)
            .execute(&mut *tx)
            .await?;

        if let Some(po_line_id) = line.purchase_order_line_id {
            self.purchase_orders
                .record_receipt_progress(&mut tx, po_line_id, req.quantity)
                .await?;
        }

        let totals = super::line_totals_query(
            "goods_receipt_lines",
            "expected_qty",
            "received_qty",
            "goods_receipt_id",
        );
        let (expected, received): (i64, i64) = sqlx::query_as(&totals)
            .bind(receipt_id)
            .fetch_one(&mut *tx)
            .await?;

        let target = match resolve_fulfilment(expected, received) {
            Fulfilment::Partial => GoodsReceiptStatus::PartiallyReceived,
            Fulfilment::Complete => GoodsReceiptStatus::FullyReceived,
            Fulfilment::NotStarted => {
                return Err(AppError::Internal(
                    "received a line but nothing is received".to_string(),
                ))
            }
        };

        if target != current {
            current.ensure_transition(target)?;
            sqlx::query("UPDATE goods_receipts SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(target.as_str())
                .bind(receipt_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let receipt = self.get(receipt_id).await?;
        Ok(ReceiveOutcome { receipt, update })
    }

    /// Confirm put-away of a fully received shipment. Pure status change.
    pub async fn put_away(&self, id: Uuid) -> AppResult<GoodsReceipt> {
        self.transition(id, GoodsReceiptStatus::InWarehouse).await
    }

    /// Cancel a receipt before anything has been received
    pub async fn cancel(&self, id: Uuid) -> AppResult<GoodsReceipt> {
        self.transition(id, GoodsReceiptStatus::Cancelled).await
    }

    async fn transition(&self, id: Uuid, target: GoodsReceiptStatus) -> AppResult<GoodsReceipt> {
        let mut tx = self.db.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM goods_receipts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Goods receipt".to_string()))?;

        parse_status(&status)?.ensure_transition(target)?;

        let receipt = sqlx::query_as::<_, GoodsReceipt>(
            r#"
            UPDATE goods_receipts
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, number, supplier_name, purchase_order_id, status, notes,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(target.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(receipt)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<GoodsReceiptDetail> {
        let receipt = sqlx::query_as::<_, GoodsReceipt>(
            r#"
            SELECT id, number, supplier_name, purchase_order_id, status, notes,
                   created_by, created_at, updated_at
            FROM goods_receipts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Goods receipt".to_string()))?;

        let lines = sqlx::query_as::<_, GoodsReceiptLine>(
            r#"
            SELECT id, goods_receipt_id, warehouse_product_id, purchase_order_line_id,
                   expected_qty, received_qty, unit_cost
            FROM goods_receipt_lines
            WHERE goods_receipt_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(GoodsReceiptDetail { receipt, lines })
    }

    pub async fn list(
        &self,
        status: Option<GoodsReceiptStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<GoodsReceipt>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM goods_receipts WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.db)
        .await?;

        let receipts = sqlx::query_as::<_, GoodsReceipt>(
            r#"
            SELECT id, number, supplier_name, purchase_order_id, status, notes,
                   created_by, created_at, updated_at
            FROM goods_receipts
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
            data: receipts,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }
}

fn parse_status(s: &str) -> AppResult<GoodsReceiptStatus> {
    GoodsReceiptStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("corrupt goods receipt status '{}'", s)))
}
