//! Invoices and payments
//!
//! Invoice status is never incremented: every payment decision re-derives
//! it from the sum of approved payments, so replays and concurrent
//! approvals converge on the same answer. Issuing reserves the pinned
//! serial units; crossing into fully paid is the single event that deducts
//! stock and marks them sold, in the same transaction as the payment
//! approval. Cancelling an issued invoice releases the reservations.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerUpdate, MovementReason, StockLedgerService};
use crate::services::next_document_number;
use crate::services::serial::SerialRegistryService;
use shared::{
    recompute_totals, resolve_invoice_status, validate_amount, validate_has_lines,
    validate_quantity, validate_serial_count, DocumentLineInput, DocumentStatus, InvoiceStatus,
    Pagination, PaginatedResponse, PaginationMeta, PaymentStatus, SerialState,
};

/// Invoice service
#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
    ledger: StockLedgerService,
    serials: SerialRegistryService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub customer_name: String,
    pub is_credit: bool,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub shipping: Decimal,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Overdue is derived at read time, never stored
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.status.as_str(), "unpaid" | "partially_paid")
            && self.due_date.is_some_and(|due| due < today)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub warehouse_product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub tax_rate_percent: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoicePayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub is_overdue: bool,
    pub lines: Vec<InvoiceLine>,
    pub payments: Vec<InvoicePayment>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub customer_name: String,
    #[serde(default)]
    pub is_credit: bool,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub shipping: Decimal,
    pub lines: Vec<DocumentLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct AddPaymentRequest {
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Result of a payment decision; ledger updates are present only when
/// the invoice crossed into fully paid
pub struct PaymentOutcome {
    pub invoice: InvoiceDetail,
    pub updates: Vec<LedgerUpdate>,
}

#[derive(Debug, FromRow)]
struct SerialPin {
    invoice_line_id: Uuid,
    warehouse_product_id: Uuid,
    serial_number: String,
}

impl InvoiceService {
    /// Create a new InvoiceService instance
    pub fn new(db: PgPool) -> Self {
        let ledger = StockLedgerService::new(db.clone());
        let serials = SerialRegistryService::new(db.clone());
        Self {
            db,
            ledger,
            serials,
        }
    }

    /// Create a draft invoice. Totals are recomputed from the lines; for
    /// serial-tracked products the pinned serials must match the quantity.
    pub async fn create(&self, req: CreateInvoiceRequest, created_by: Uuid) -> AppResult<InvoiceDetail> {
        if req.customer_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "customer_name".to_string(),
                message: "Customer name is required".to_string(),
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
        }
        validate_amount(req.shipping)?;

        let amounts: Vec<_> = req.lines.iter().map(DocumentLineInput::amounts).collect();
        let totals = recompute_totals(&amounts, req.shipping);

        let mut tx = self.db.begin().await?;
        let number = next_document_number(&mut tx, "INV").await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (number, customer_name, is_credit, due_date, status,
                                  subtotal, tax_total, shipping, total_amount, created_by)
            VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9)
            RETURNING id, number, customer_name, is_credit, due_date, status, subtotal,
                      tax_total, shipping, total_amount, created_by, created_at, updated_at
            "#,
        )
        .bind(&number)
        .bind(req.customer_name.trim())
        .bind(req.is_credit)
        .bind(req.due_date)
        .bind(totals.subtotal)
        .bind(totals.tax_total)
        .bind(totals.shipping)
        .bind(totals.total)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for line in &req.lines {
            let tracked: bool = sqlx::query_scalar(
                "SELECT has_serials FROM warehouse_products WHERE id = $1 AND archived_at IS NULL",
            )
            .bind(line.warehouse_product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock level".to_string()))?;

            if tracked {
                validate_serial_count(line.quantity, line.serial_numbers.len())?;
            } else if !line.serial_numbers.is_empty() {
                return Err(AppError::Validation {
                    field: "serial_numbers".to_string(),
                    message: "This product is not serial-tracked".to_string(),
                });
            }

            let line_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO invoice_lines (invoice_id, warehouse_product_id, quantity,
                                           unit_price, tax_rate_percent, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(invoice.id)
            .bind(line.warehouse_product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.tax_rate_percent)
            .bind(line.amounts().total())
            .fetch_one(&mut *tx)
            .await?;

            for serial in &line.serial_numbers {
                sqlx::query(
                    r#"
                    INSERT INTO invoice_line_serials (invoice_line_id, serial_number)
                    VALUES ($1, $2)
                    "#,
                )
                .bind(line_id)
                .bind(serial)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        self.get(invoice.id).await
    }

    /// Issue a draft invoice, opening it for payments. The pinned serial
    /// units move to reserved so no other document can consume them while
    /// the invoice is open.
    pub async fn issue(&self, id: Uuid) -> AppResult<InvoiceDetail> {
        let mut tx = self.db.begin().await?;
        let invoice = self.lock_invoice(&mut tx, id).await?;
        parse_status(&invoice.status)?.ensure_transition(InvoiceStatus::Unpaid)?;

        for pin in self.pins(&mut tx, id).await? {
            self.serials
                .reserve_or_consume(
                    &mut tx,
                    pin.warehouse_product_id,
                    &pin.serial_number,
                    SerialState::Reserved,
                    Some(pin.invoice_line_id),
                )
                .await?;
        }

        sqlx::query("UPDATE invoices SET status = 'unpaid', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.get(id).await
    }

    /// Cancel an invoice; refused once any payment has been approved.
    /// Serials reserved at issue go back to available.
    pub async fn cancel(&self, id: Uuid) -> AppResult<InvoiceDetail> {
        let mut tx = self.db.begin().await?;
        let invoice = self.lock_invoice(&mut tx, id).await?;
        let current = parse_status(&invoice.status)?;
        current.ensure_transition(InvoiceStatus::Cancelled)?;

        let approved_sum = self.approved_sum(&mut tx, id).await?;
        if approved_sum > Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Cannot cancel an invoice with approved payments".to_string(),
            ));
        }

        if current == InvoiceStatus::Unpaid {
            for pin in self.pins(&mut tx, id).await? {
                self.serials
                    .release(&mut tx, pin.warehouse_product_id, &pin.serial_number)
                    .await?;
            }
        }

        sqlx::query("UPDATE invoices SET status = 'cancelled', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.get(id).await
    }

    /// Record a pending payment against an issued invoice. Cash invoices
    /// must be settled in one payment covering the outstanding balance.
    pub async fn add_payment(
        &self,
        invoice_id: Uuid,
        req: AddPaymentRequest,
        created_by: Uuid,
    ) -> AppResult<InvoicePayment> {
        if req.amount <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Payment amount must be positive".to_string(),
            });
        }
        if req.method.trim().is_empty() {
            return Err(AppError::Validation {
                field: "method".to_string(),
                message: "Payment method is required".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let invoice = self.lock_invoice(&mut tx, invoice_id).await?;
        let current = parse_status(&invoice.status)?;

        if !matches!(current, InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot add a payment to an invoice in status '{}'",
                current.as_str()
            )));
        }

        if !invoice.is_credit {
            let outstanding = invoice.total_amount - self.approved_sum(&mut tx, invoice_id).await?;
            if req.amount != outstanding {
                return Err(AppError::Validation {
                    field: "amount".to_string(),
                    message: format!(
                        "Cash invoices are settled in full; expected {}",
                        outstanding
                    ),
                });
            }
        }

        let payment = sqlx::query_as::<_, InvoicePayment>(
            r#"
            INSERT INTO invoice_payments (invoice_id, amount, method, reference, status,
                                          paid_at, created_by)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING id, invoice_id, amount, method, reference, status, paid_at,
                      created_by, approved_by, created_at, updated_at
            "#,
        )
        .bind(invoice_id)
        .bind(req.amount)
        .bind(req.method.trim())
        .bind(&req.reference)
        .bind(req.paid_at)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    /// Approve a pending payment and re-derive the invoice status from the
    /// approved sum. Crossing into fully paid deducts stock and consumes
    /// pinned serials atomically with the approval.
    pub async fn approve_payment(
        &self,
        invoice_id: Uuid,
        payment_id: Uuid,
        approved_by: Uuid,
    ) -> AppResult<PaymentOutcome> {
        let mut tx = self.db.begin().await?;
        let invoice = self.lock_invoice(&mut tx, invoice_id).await?;
        let current = parse_status(&invoice.status)?;

        self.decide_payment(&mut tx, invoice_id, payment_id, PaymentStatus::Approved, approved_by)
            .await?;

        let approved_sum = self.approved_sum(&mut tx, invoice_id).await?;
        let target = resolve_invoice_status(invoice.total_amount, approved_sum);

        let mut updates = Vec::new();
        if target != current {
            current.ensure_transition(target)?;
            sqlx::query("UPDATE invoices SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(target.as_str())
                .bind(invoice_id)
                .execute(&mut *tx)
                .await?;

            if target == InvoiceStatus::FullyPaid {
                updates = self.fulfil(&mut tx, invoice_id).await?;
            }
        }

        tx.commit().await?;
        let invoice = self.get(invoice_id).await?;
        Ok(PaymentOutcome { invoice, updates })
    }

    /// Reject a pending payment. The status is re-derived anyway so the
    /// header reflects the remaining approved sum.
    pub async fn reject_payment(
        &self,
        invoice_id: Uuid,
        payment_id: Uuid,
        decided_by: Uuid,
    ) -> AppResult<PaymentOutcome> {
        let mut tx = self.db.begin().await?;
        let invoice = self.lock_invoice(&mut tx, invoice_id).await?;
        let current = parse_status(&invoice.status)?;

        self.decide_payment(&mut tx, invoice_id, payment_id, PaymentStatus::Rejected, decided_by)
            .await?;

        let approved_sum = self.approved_sum(&mut tx, invoice_id).await?;
        let target = resolve_invoice_status(invoice.total_amount, approved_sum);
        if target != current && current.can_transition(target) {
            sqlx::query("UPDATE invoices SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(target.as_str())
                .bind(invoice_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        let invoice = self.get(invoice_id).await?;
        Ok(PaymentOutcome {
            invoice,
            updates: Vec::new(),
        })
    }

    /// Delete a payment that is still pending
    pub async fn delete_payment(&self, invoice_id: Uuid, payment_id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM invoice_payments
            WHERE id = $1 AND invoice_id = $2 AND status = 'pending'
            "#,
        )
        .bind(payment_id)
        .bind(invoice_id)
        .execute(&self.db)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::ValidationError(
                "Only pending payments can be deleted".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<InvoiceDetail> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, customer_name, is_credit, due_date, status, subtotal,
                   tax_total, shipping, total_amount, created_by, created_at, updated_at
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, warehouse_product_id, quantity, unit_price,
                   tax_rate_percent, line_total
            FROM invoice_lines
            WHERE invoice_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        let payments = sqlx::query_as::<_, InvoicePayment>(
            r#"
            SELECT id, invoice_id, amount, method, reference, status, paid_at,
                   created_by, approved_by, created_at, updated_at
            FROM invoice_payments
            WHERE invoice_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        let is_overdue = invoice.is_overdue(Utc::now().date_naive());
        Ok(InvoiceDetail {
            invoice,
            is_overdue,
            lines,
            payments,
        })
    }

    pub async fn list(
        &self,
        status: Option<InvoiceStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Invoice>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.db)
        .await?;

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, customer_name, is_credit, due_date, status, subtotal,
                   tax_total, shipping, total_amount, created_by, created_at, updated_at
            FROM invoices
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
            data: invoices,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Deduct stock and consume pinned serials for every line
    async fn fulfil(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> AppResult<Vec<LedgerUpdate>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, warehouse_product_id, quantity, unit_price,
                   tax_rate_percent, line_total
            FROM invoice_lines
            WHERE invoice_id = $1
            ORDER BY id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut **tx)
        .await?;

        let pins = self.pins(tx, invoice_id).await?;

        let mut updates = Vec::with_capacity(lines.len());
        for line in &lines {
            let update = self
                .ledger
                .apply_delta(
                    tx,
                    line.warehouse_product_id,
                    -line.quantity,
                    MovementReason::Sale,
                    Some(line.id),
                    None,
                )
                .await?;
            updates.push(update);

            let line_serials: Vec<String> = pins
                .iter()
                .filter(|p| p.invoice_line_id == line.id)
                .map(|p| p.serial_number.clone())
                .collect();
            if !line_serials.is_empty() {
                self.serials
                    .consume_batch(
                        tx,
                        line.warehouse_product_id,
                        &line_serials,
                        SerialState::Sold,
                        line.id,
                    )
                    .await?;
            }
        }

        Ok(updates)
    }

    /// Serial numbers pinned at creation, joined back to their lines
    async fn pins(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> AppResult<Vec<SerialPin>> {
        let pins = sqlx::query_as::<_, SerialPin>(
            r#"
            SELECT s.invoice_line_id, l.warehouse_product_id, s.serial_number
            FROM invoice_line_serials s
            JOIN invoice_lines l ON l.id = s.invoice_line_id
            WHERE l.invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(pins)
    }

    async fn decide_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
        payment_id: Uuid,
        target: PaymentStatus,
        decided_by: Uuid,
    ) -> AppResult<()> {
        let status: String = sqlx::query_scalar(
            r#"
            SELECT status FROM invoice_payments
            WHERE id = $1 AND invoice_id = $2
            FOR UPDATE
            "#,
        )
        .bind(payment_id)
        .bind(invoice_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

        let current = PaymentStatus::parse(&status)
            .ok_or_else(|| AppError::Internal(format!("corrupt payment status '{}'", status)))?;
        current.ensure_transition(target)?;

        sqlx::query(
            r#"
            UPDATE invoice_payments
            SET status = $1, approved_by = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(target.as_str())
        .bind(decided_by)
        .bind(payment_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn approved_sum(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> AppResult<Decimal> {
        let sum: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM invoice_payments
            WHERE invoice_id = $1 AND status = 'approved'
            "#,
        )
        .bind(invoice_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(sum)
    }

    async fn lock_invoice(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Invoice> {
        sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, customer_name, is_credit, due_date, status, subtotal,
                   tax_total, shipping, total_amount, created_by, created_at, updated_at
            FROM invoices
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))
    }
}

fn parse_status(s: &str) -> AppResult<InvoiceStatus> {
    InvoiceStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("corrupt invoice status '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn invoice(status: &str, due: Option<&str>) -> Invoice {
        Invoice {
            id: Uuid::nil(),
            number: "INV-2025-0001".to_string(),
            customer_name: "Acme".to_string(),
            is_credit: true,
            due_date: due.map(|d| NaiveDate::from_str(d).unwrap()),
            status: status.to_string(),
            subtotal: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            created_by: Uuid::nil(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn overdue_requires_open_balance_and_past_due_date() {
        let today = NaiveDate::from_str("2025-06-15").unwrap();
        assert!(invoice("unpaid", Some("2025-06-01")).is_overdue(today));
        assert!(invoice("partially_paid", Some("2025-06-01")).is_overdue(today));
        assert!(!invoice("unpaid", Some("2025-06-15")).is_overdue(today));
        assert!(!invoice("fully_paid", Some("2025-06-01")).is_overdue(today));
        assert!(!invoice("draft", Some("2025-06-01")).is_overdue(today));
        assert!(!invoice("unpaid", None).is_overdue(today));
    }
}
