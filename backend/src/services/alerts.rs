//! Threshold alerting
//!
//! Alert rules pair a warehouse-product with a minimum quantity. After a
//! ledger mutation commits, `check_and_notify` compares the resulting
//! quantity against the rule and notifies every administrator on breach.
//! When no rule exists the stock level's own critical level serves as the
//! threshold. The check runs outside the ledger transaction and any
//! failure here is logged and swallowed; stock movements never roll back
//! because an alert could not be raised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::LedgerUpdate;
use crate::services::notification::NotificationService;
use shared::{effective_threshold, threshold_breached};

/// Threshold alerting service
#[derive(Clone)]
pub struct ThresholdAlertService {
    db: PgPool,
    notifications: NotificationService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlertRule {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub min_qty: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertAlertRuleRequest {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub min_qty: i64,
}

#[derive(Debug, FromRow)]
struct BreachContext {
    product_name: String,
    warehouse_code: String,
}

impl ThresholdAlertService {
    /// Create a new ThresholdAlertService instance
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Create or update the rule for a warehouse-product pair
    pub async fn upsert_rule(&self, req: UpsertAlertRuleRequest) -> AppResult<AlertRule> {
        if req.min_qty < 0 {
            return Err(AppError::Validation {
                field: "min_qty".to_string(),
                message: "Minimum quantity cannot be negative".to_string(),
            });
        }

        let rule = sqlx::query_as::<_, AlertRule>(
            r#"
            INSERT INTO stock_alert_rules (warehouse_id, product_id, min_qty)
            VALUES ($1, $2, $3)
            ON CONFLICT (warehouse_id, product_id)
            DO UPDATE SET min_qty = EXCLUDED.min_qty, updated_at = NOW()
            RETURNING id, warehouse_id, product_id, min_qty, created_at, updated_at
            "#,
        )
        .bind(req.warehouse_id)
        .bind(req.product_id)
        .bind(req.min_qty)
        .fetch_one(&self.db)
        .await?;

        Ok(rule)
    }

    pub async fn get_rule(&self, id: Uuid) -> AppResult<AlertRule> {
        sqlx::query_as::<_, AlertRule>(
            r#"
            SELECT id, warehouse_id, product_id, min_qty, created_at, updated_at
            FROM stock_alert_rules
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert rule".to_string()))
    }

    pub async fn list_rules(&self, warehouse_id: Option<Uuid>) -> AppResult<Vec<AlertRule>> {
        let rules = sqlx::query_as::<_, AlertRule>(
            r#"
            SELECT id, warehouse_id, product_id, min_qty, created_at, updated_at
            FROM stock_alert_rules
            WHERE ($1::UUID IS NULL OR warehouse_id = $1)
            ORDER BY created_at
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rules)
    }

    pub async fn delete_rule(&self, id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM stock_alert_rules WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert rule".to_string()));
        }
        Ok(())
    }

    /// Run the threshold check for a committed ledger update. Never fails:
    /// alerting problems are logged and the caller's response is unaffected.
    pub async fn check_and_notify(&self, update: &LedgerUpdate) {
        if let Err(e) = self.try_check(update).await {
            tracing::warn!(
                warehouse_product_id = %update.warehouse_product_id,
                "Threshold check failed: {}",
                e
            );
        }
    }

    async fn try_check(&self, update: &LedgerUpdate) -> AppResult<()> {
        let rule_min: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT min_qty FROM stock_alert_rules
            WHERE warehouse_id = $1 AND product_id = $2
            "#,
        )
        .bind(update.warehouse_id)
        .bind(update.product_id)
        .fetch_optional(&self.db)
        .await?;

        let critical_level: Option<i64> = sqlx::query_scalar(
            "SELECT critical_level_qty FROM warehouse_products WHERE id = $1",
        )
        .bind(update.warehouse_product_id)
        .fetch_optional(&self.db)
        .await?
        .flatten();

        let Some(min_qty) = effective_threshold(rule_min, critical_level) else {
            tracing::debug!(
                warehouse_product_id = %update.warehouse_product_id,
                "No alert rule or critical level configured, skipping threshold check"
            );
            return Ok(());
        };

        if !threshold_breached(update.quantity, min_qty) {
            return Ok(());
        }

        let context = sqlx::query_as::<_, BreachContext>(
            r#"
            SELECT p.name AS product_name, w.code AS warehouse_code
            FROM products p, warehouses w
            WHERE p.id = $1 AND w.id = $2
            "#,
        )
        .bind(update.product_id)
        .bind(update.warehouse_id)
        .fetch_one(&self.db)
        .await?;

        let admin_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin'")
            .fetch_all(&self.db)
            .await?;

        tracing::info!(
            warehouse_product_id = %update.warehouse_product_id,
            quantity = update.quantity,
            min_qty,
            "Stock threshold breached, notifying {} administrator(s)",
            admin_ids.len()
        );

        for admin_id in admin_ids {
            self.notifications
                .notify_low_stock(
                    admin_id,
                    &context.product_name,
                    &context.warehouse_code,
                    update.quantity,
                    min_qty,
                    update.warehouse_product_id,
                )
                .await?;
        }

        Ok(())
    }
}
