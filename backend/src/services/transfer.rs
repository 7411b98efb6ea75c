//! Stock transfers between warehouses
//!
//! Executing a transfer line moves quantity out of the source stock level
//! and into the destination in one transaction, carrying the source
//! average cost across. Serial units are consumed at the source as
//! transferred and re-registered as fresh available units under the
//! destination stock level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerUpdate, MovementReason, StockLedgerService};
use crate::services::next_document_number;
use crate::services::serial::SerialRegistryService;
use shared::{
    resolve_fulfilment, validate_has_lines, validate_quantity, validate_serial_count,
    DocumentStatus, Fulfilment, Pagination, PaginatedResponse, PaginationMeta, SerialState,
    TransferStatus,
};

/// Stock transfer service
#[derive(Clone)]
pub struct StockTransferService {
    db: PgPool,
    ledger: StockLedgerService,
    serials: SerialRegistryService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockTransfer {
    pub id: Uuid,
    pub number: String,
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockTransferLine {
    pub id: Uuid,
    pub stock_transfer_id: Uuid,
    pub warehouse_product_id: Uuid,
    pub quantity: i64,
    pub transferred_qty: i64,
}

#[derive(Debug, Serialize)]
pub struct StockTransferDetail {
    #[serde(flatten)]
    pub transfer: StockTransfer,
    pub lines: Vec<StockTransferLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
    pub notes: Option<String>,
    pub lines: Vec<CreateTransferLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferLine {
    pub warehouse_product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteLineRequest {
    pub quantity: i64,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
}

/// Result of executing a line; both sides feed the threshold check
pub struct TransferOutcome {
    pub transfer: StockTransferDetail,
    pub source_update: LedgerUpdate,
    pub dest_update: LedgerUpdate,
}

impl StockTransferService {
    /// Create a new StockTransferService instance
    pub fn new(db: PgPool) -> Self {
        let ledger = StockLedgerService::new(db.clone());
        let serials = SerialRegistryService::new(db.clone());
        Self {
            db,
            ledger,
            serials,
        }
    }

    /// Create a transfer in pending status. Lines reference source stock
    /// levels; nothing moves until execution.
    pub async fn create(
        &self,
        req: CreateTransferRequest,
        created_by: Uuid,
    ) -> AppResult<StockTransferDetail> {
        if req.source_warehouse_id == req.dest_warehouse_id {
            return Err(AppError::Validation {
                field: "dest_warehouse_id".to_string(),
                message: "Source and destination warehouses must differ".to_string(),
            });
        }
        validate_has_lines(req.lines.len())?;
        for line in &req.lines {
            validate_quantity(line.quantity)?;
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

            if warehouse_id != req.source_warehouse_id {
                return Err(AppError::Validation {
                    field: "warehouse_product_id".to_string(),
                    message: "Line stock level does not belong to the source warehouse"
                        .to_string(),
                });
            }
        }

        let number = next_document_number(&mut tx, "TRF").await?;

        let transfer = sqlx::query_as::<_, StockTransfer>(
            r#"
            INSERT INTO stock_transfers (number, source_warehouse_id, dest_warehouse_id,
                                         status, notes, created_by)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            RETURNING id, number, source_warehouse_id, dest_warehouse_id, status, notes,
                      created_by, approved_by, created_at, updated_at
            "#,
        )
        .bind(&number)
        .bind(req.source_warehouse_id)
        .bind(req.dest_warehouse_id)
        .bind(&req.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let row = sqlx::query_as::<_, StockTransferLine>(
                r#"
                INSERT INTO stock_transfer_lines (stock_transfer_id, warehouse_product_id,
                                                  quantity, transferred_qty)
                VALUES ($1, $2, $3, 0)
                RETURNING id, stock_transfer_id, warehouse_product_id, quantity, transferred_qty
                "#,
            )
            .bind(transfer.id)
            .bind(line.warehouse_product_id)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(row);
        }

        tx.commit().await?;
        Ok(StockTransferDetail { transfer, lines })
    }

    pub async fn approve(&self, id: Uuid, approved_by: Uuid) -> AppResult<StockTransfer> {
        self.transition(id, TransferStatus::Approved, Some(approved_by))
            .await
    }

    pub async fn reject(&self, id: Uuid, decided_by: Uuid) -> AppResult<StockTransfer> {
        self.transition(id, TransferStatus::Rejected, Some(decided_by))
            .await
    }

    pub async fn cancel(&self, id: Uuid) -> AppResult<StockTransfer> {
        self.transition(id, TransferStatus::Cancelled, None).await
    }

    /// Move quantity for one line: deduct the source, land it at the
    /// destination, carry the average cost, flip and re-register serials.
    pub async fn execute_line(
        &self,
        transfer_id: Uuid,
        line_id: Uuid,
        req: ExecuteLineRequest,
    ) -> AppResult<TransferOutcome> {
        validate_quantity(req.quantity)?;

        let mut tx = self.db.begin().await?;

        let transfer = sqlx::query_as::<_, StockTransfer>(
            r#"
            SELECT id, number, source_warehouse_id, dest_warehouse_id, status, notes,
                   created_by, approved_by, created_at, updated_at
            FROM stock_transfers
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(transfer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        let current = parse_status(&transfer.status)?;
        if !matches!(
            current,
            TransferStatus::Approved | TransferStatus::PartiallyTransferred
        ) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot execute a transfer in status '{}'",
                current.as_str()
            )));
        }

        let line = sqlx::query_as::<_, StockTransferLine>(
            r#"
            SELECT id, stock_transfer_id, warehouse_product_id, quantity, transferred_qty
            FROM stock_transfer_lines
            WHERE id = $1 AND stock_transfer_id = $2
            FOR UPDATE
            "#,
        )
        .bind(line_id)
        .bind(transfer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transfer line".to_string()))?;

        if line.transferred_qty + req.quantity > line.quantity {
            return Err(AppError::ValidationError(format!(
                "Transferring {} would exceed the planned quantity of {}",
                line.transferred_qty + req.quantity,
                line.quantity
            )));
        }

        let source_update = self
            .ledger
            .apply_delta(
                &mut tx,
                line.warehouse_product_id,
                -req.quantity,
                MovementReason::TransferOut,
                Some(line.id),
                None,
            )
            .await?;

        let dest_wp_id = self
            .dest_stock_level(
                &mut tx,
                transfer.dest_warehouse_id,
                source_update.product_id,
                source_update.has_serials,
            )
            .await?;

        let dest_update = self
            .ledger
            .apply_delta(
                &mut tx,
                dest_wp_id,
                req.quantity,
                MovementReason::TransferIn,
                Some(line.id),
                source_update.average_cost,
            )
            .await?;

        if source_update.has_serials {
            validate_serial_count(req.quantity, req.serial_numbers.len())?;
            let specs = self
                .serials
                .consume_batch(
                    &mut tx,
                    line.warehouse_product_id,
                    &req.serial_numbers,
                    SerialState::Transferred,
                    line.id,
                )
                .await?;
            self.serials
                .register_units(&mut tx, dest_wp_id, &specs, Some(line.id))
                .await?;

            for serial in &req.serial_numbers {
                sqlx::query(
                    r#"
                    INSERT INTO stock_transfer_serials (transfer_line_id, serial_number)
                    VALUES ($1, $2)
                    "#,
                )
                .bind(line.id)
                .bind(serial)
                .execute(&mut *tx)
                .await?;
            }
        } else if !req.serial_numbers.is_empty() {
            return Err(AppError::Validation {
                field: "serial_numbers".to_string(),
                message: "This product is not serial-tracked".to_string(),
            });
        }

        sqlx::query(
            "UPDATE stock_transfer_lines SET transferred_qty = transferred_qty + $1 WHERE id = $2",
        )
        .bind(req.quantity)
        .bind(line.id)
        .execute(&mut *tx)
        .await?;

        let totals = super::line_totals_query(
            "stock_transfer_lines",
            "quantity",
            "transferred_qty",
            "stock_transfer_id",
        );
        let (planned, transferred): (i64, i64) = sqlx::query_as(&totals)
            .bind(transfer_id)
            .fetch_one(&mut *tx)
            .await?;

        let target = match resolve_fulfilment(planned, transferred) {
            Fulfilment::Partial => TransferStatus::PartiallyTransferred,
            Fulfilment::Complete => TransferStatus::FullyTransferred,
            Fulfilment::NotStarted => {
                return Err(AppError::Internal(
                    "executed a line but nothing is transferred".to_string(),
                ))
            }
        };

        if target != current {
            current.ensure_transition(target)?;
            sqlx::query("UPDATE stock_transfers SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(target.as_str())
                .bind(transfer_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let transfer = self.get(transfer_id).await?;
        Ok(TransferOutcome {
            transfer,
            source_update,
            dest_update,
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockTransferDetail> {
        let transfer = sqlx::query_as::<_, StockTransfer>(
            r#"
            SELECT id, number, source_warehouse_id, dest_warehouse_id, status, notes,
                   created_by, approved_by, created_at, updated_at
            FROM stock_transfers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        let lines = sqlx::query_as::<_, StockTransferLine>(
            r#"
            SELECT id, stock_transfer_id, warehouse_product_id, quantity, transferred_qty
            FROM stock_transfer_lines
            WHERE stock_transfer_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(StockTransferDetail { transfer, lines })
    }

    pub async fn list(
        &self,
        status: Option<TransferStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockTransfer>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_transfers WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.db)
        .await?;

        let transfers = sqlx::query_as::<_, StockTransfer>(
            r#"
            SELECT id, number, source_warehouse_id, dest_warehouse_id, status, notes,
                   created_by, approved_by, created_at, updated_at
            FROM stock_transfers
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
            data: transfers,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Find or create the destination stock level for the product,
    /// locking it so concurrent executions serialize.
    async fn dest_stock_level(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        dest_warehouse_id: Uuid,
        product_id: Uuid,
        has_serials: bool,
    ) -> AppResult<Uuid> {
        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM warehouse_products
            WHERE warehouse_id = $1 AND product_id = $2 AND archived_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(dest_warehouse_id)
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO warehouse_products (warehouse_id, product_id, qty, has_serials)
            VALUES ($1, $2, 0, $3)
            RETURNING id
            "#,
        )
        .bind(dest_warehouse_id)
        .bind(product_id)
        .bind(has_serials)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    async fn transition(
        &self,
        id: Uuid,
        target: TransferStatus,
        decided_by: Option<Uuid>,
    ) -> AppResult<StockTransfer> {
        let mut tx = self.db.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM stock_transfers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        parse_status(&status)?.ensure_transition(target)?;

        let transfer = sqlx::query_as::<_, StockTransfer>(
            r#"
            UPDATE stock_transfers
            SET status = $1, approved_by = COALESCE($2, approved_by), updated_at = NOW()
            WHERE id = $3
            RETURNING id, number, source_warehouse_id, dest_warehouse_id, status, notes,
                      created_by, approved_by, created_at, updated_at
            "#,
        )
        .bind(target.as_str())
        .bind(decided_by)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(transfer)
    }
}

fn parse_status(s: &str) -> AppResult<TransferStatus> {
    TransferStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("corrupt stock transfer status '{}'", s)))
}
