//! Purchase orders
//!
//! A purchase order prices expected inbound stock; it never touches the
//! ledger itself. Receipt progress is pushed in by goods receipt lines
//! that reference purchase order lines, and the header status follows
//! the aggregated received quantities.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::next_document_number;
use shared::{
    recompute_totals, resolve_fulfilment, validate_amount, validate_has_lines, validate_quantity,
    DocumentLineInput, DocumentStatus, Fulfilment, Pagination, PaginatedResponse, PaginationMeta,
    PurchaseOrderStatus,
};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub number: String,
    pub supplier_name: String,
    pub status: String,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub shipping: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub warehouse_product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub tax_rate_percent: Decimal,
    pub line_total: Decimal,
    pub received_qty: i64,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub lines: Vec<PurchaseOrderLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_name: String,
    #[serde(default)]
    pub shipping: Decimal,
    pub notes: Option<String>,
    pub lines: Vec<DocumentLineInput>,
}

impl PurchaseOrderService {
    /// Create a new PurchaseOrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a purchase order in pending status. Totals are recomputed
    /// from the lines; any client-sent totals are ignored.
    pub async fn create(
        &self,
        req: CreatePurchaseOrderRequest,
        created_by: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        if req.supplier_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "supplier_name".to_string(),
                message: "Supplier name is required".to_string(),
            });
        }
        validate_has_lines(req.lines.len())?;
        for line in &req.lines {
            validate_quantity(line.quantity)?;
            if line.unit_price < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "unit_price".to_string(),
                    message: "Unit price cannot be negative".to_string(),
                });
            }
            // Serials are attached when goods are received, not ordered
            if !line.serial_numbers.is_empty() {
                return Err(AppError::Validation {
                    field: "serial_numbers".to_string(),
                    message: "Purchase order lines do not carry serial numbers".to_string(),
                });
            }
        }
        validate_amount(req.shipping)?;

        let amounts: Vec<_> = req.lines.iter().map(DocumentLineInput::amounts).collect();
        let totals = recompute_totals(&amounts, req.shipping);

        let mut tx = self.db.begin().await?;
        let number = next_document_number(&mut tx, "PO").await?;

        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            INSERT INTO purchase_orders (number, supplier_name, status, subtotal, tax_total,
                                         shipping, total_amount, notes, created_by)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8)
            RETURNING id, number, supplier_name, status, subtotal, tax_total, shipping,
                      total_amount, notes, created_by, approved_by, created_at, updated_at
            "#,
        )
        .bind(&number)
        .bind(req.supplier_name.trim())
        .bind(totals.subtotal)
        .bind(totals.tax_total)
        .bind(totals.shipping)
        .bind(totals.total)
        .bind(&req.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let row = sqlx::query_as::<_, PurchaseOrderLine>(
                r#"
                INSERT INTO purchase_order_lines (purchase_order_id, warehouse_product_id,
                                                  quantity, unit_price, tax_rate_percent,
                                                  line_total, received_qty)
                VALUES ($1, $2, $3, $4, $5, $6, 0)
                RETURNING id, purchase_order_id, warehouse_product_id, quantity, unit_price,
                          tax_rate_percent, line_total, received_qty
                "#,
            )
            .bind(order.id)
            .bind(line.warehouse_product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.tax_rate_percent)
            .bind(line.amounts().total())
            .fetch_one(&mut *tx)
            .await?;
            lines.push(row);
        }

        tx.commit().await?;
        Ok(PurchaseOrderDetail { order, lines })
    }

    pub async fn approve(&self, id: Uuid, approved_by: Uuid) -> AppResult<PurchaseOrder> {
        self.transition(id, PurchaseOrderStatus::Approved, Some(approved_by))
            .await
    }

    pub async fn cancel(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        self.transition(id, PurchaseOrderStatus::Cancelled, None).await
    }

    async fn transition(
        &self,
        id: Uuid,
        target: PurchaseOrderStatus,
        approved_by: Option<Uuid>,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM purchase_orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let current = parse_status(&current)?;
        current.ensure_transition(target)?;

        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = $1, approved_by = COALESCE($2, approved_by), updated_at = NOW()
            WHERE id = $3
            RETURNING id, number, supplier_name, status, subtotal, tax_total, shipping,
                      total_amount, notes, created_by, approved_by, created_at, updated_at
            "#,
        )
        .bind(target.as_str())
        .bind(approved_by)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Record received quantity against an order line, inside the goods
    /// receipt transaction. Recomputes the header status from all lines.
    pub(crate) async fn record_receipt_progress(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        purchase_order_line_id: Uuid,
        quantity: i64,
    ) -> AppResult<()> {
        let line = sqlx::query_as::<_, PurchaseOrderLine>(
            r#"
            SELECT id, purchase_order_id, warehouse_product_id, quantity, unit_price,
                   tax_rate_percent, line_total, received_qty
            FROM purchase_order_lines
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(purchase_order_line_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order line".to_string()))?;

        if line.received_qty + quantity > line.quantity {
            return Err(AppError::ValidationError(format!(
                "Receiving {} would exceed the ordered quantity of {}",
                line.received_qty + quantity,
                line.quantity
            )));
        }

        sqlx::query(
            "UPDATE purchase_order_lines SET received_qty = received_qty + $1 WHERE id = $2",
        )
        .bind(quantity)
        .bind(purchase_order_line_id)
        .execute(&mut **tx)
        .await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM purchase_orders WHERE id = $1 FOR UPDATE")
                .bind(line.purchase_order_id)
                .fetch_one(&mut **tx)
                .await?;
        let current = parse_status(&current)?;

        let totals = super::line_totals_query(
            "purchase_order_lines",
            "quantity",
            "received_qty",
            "purchase_order_id",
        );
        let (expected, received): (i64, i64) = sqlx::query_as(&totals)
            .bind(line.purchase_order_id)
            .fetch_one(&mut **tx)
            .await?;

        let target = match resolve_fulfilment(expected, received) {
            Fulfilment::NotStarted => return Ok(()),
            Fulfilment::Partial => PurchaseOrderStatus::PartiallyReceived,
            Fulfilment::Complete => PurchaseOrderStatus::FullyReceived,
        };

        if target != current {
            current.ensure_transition(target)?;
            sqlx::query("UPDATE purchase_orders SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(target.as_str())
                .bind(line.purchase_order_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT id, number, supplier_name, status, subtotal, tax_total, shipping,
                   total_amount, notes, created_by, approved_by, created_at, updated_at
            FROM purchase_orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let lines = sqlx::query_as::<_, PurchaseOrderLine>(
            r#"
            SELECT id, purchase_order_id, warehouse_product_id, quantity, unit_price,
                   tax_rate_percent, line_total, received_qty
            FROM purchase_order_lines
            WHERE purchase_order_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseOrderDetail { order, lines })
    }

    pub async fn list(
        &self,
        status: Option<PurchaseOrderStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseOrder>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_orders WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.db)
        .await?;

        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT id, number, supplier_name, status, subtotal, tax_total, shipping,
                   total_amount, notes, created_by, approved_by, created_at, updated_at
            FROM purchase_orders
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
            data: orders,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }
}

fn parse_status(s: &str) -> AppResult<PurchaseOrderStatus> {
    PurchaseOrderStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("corrupt purchase order status '{}'", s)))
}
