//! In-app notifications
//!
//! Notifications are advisory: they are written on a best-effort basis by
//! the alerting path and never participate in ledger transactions. An
//! optional webhook mirrors each notification to an external channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{Pagination, PaginatedResponse, PaginationMeta};

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    webhook: Option<WebhookClient>,
}

/// Notification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    LowStock,
    DocumentStatus,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LowStock => "low_stock",
            NotificationType::DocumentStatus => "document_status",
            NotificationType::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db, webhook: None }
    }

    /// Attach an outbound webhook mirror
    pub fn with_webhook(mut self, webhook: WebhookClient) -> Self {
        self.webhook = Some(webhook);
        self
    }

    /// Create a notification for a user and mirror it to the webhook if
    /// one is configured. Webhook failures are logged, never propagated.
    pub async fn create(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        entity_type: Option<&str>,
        entity_id: Option<Uuid>,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message,
                                       entity_type, entity_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, notification_type, title, message, entity_type,
                      entity_id, is_read, is_dismissed, created_at, read_at
            "#,
        )
        .bind(user_id)
        .bind(notification_type.as_str())
        .bind(title)
        .bind(message)
        .bind(entity_type)
        .bind(entity_id)
        .fetch_one(&self.db)
        .await?;

        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.send(title, message).await {
                tracing::warn!("Webhook delivery failed: {}", e);
            }
        }

        Ok(notification)
    }

    /// Low-stock alert notification for one user
    pub async fn notify_low_stock(
        &self,
        user_id: Uuid,
        product_name: &str,
        warehouse_code: &str,
        quantity: i64,
        min_qty: i64,
        warehouse_product_id: Uuid,
    ) -> AppResult<Notification> {
        let title = format!("Low stock: {}", product_name);
        let message = format!(
            "{} in warehouse {} is down to {} (threshold {})",
            product_name, warehouse_code, quantity, min_qty
        );
        self.create(
            user_id,
            NotificationType::LowStock,
            &title,
            &message,
            Some("warehouse_product"),
            Some(warehouse_product_id),
        )
        .await
    }

    /// List a user's notifications, newest first, dismissed excluded
    pub async fn list(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Notification>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_dismissed = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, notification_type, title, message, entity_type,
                   entity_id, is_read, is_dismissed, created_at, read_at
            FROM notifications
            WHERE user_id = $1 AND is_dismissed = FALSE
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(pagination.limit()))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: notifications,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND is_read = FALSE AND is_dismissed = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    pub async fn mark_as_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) -> AppResult<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE user_id = $1 AND is_read = FALSE AND is_dismissed = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(updated.rows_affected())
    }

    pub async fn dismiss(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE notifications SET is_dismissed = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }
        Ok(())
    }
}

/// Outbound webhook for mirroring notifications to an external channel
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    http_client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build from configuration; `None` when no webhook URL is set
    pub fn from_config(webhook_url: &Option<String>) -> Option<Self> {
        webhook_url
            .as_ref()
            .filter(|url| !url.is_empty())
            .map(|url| Self::new(url.clone()))
    }

    pub async fn send(&self, title: &str, message: &str) -> Result<(), String> {
        let body = serde_json::json!({
            "title": title,
            "text": message,
        });

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Failed to send webhook: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Webhook returned status: {}", response.status()));
        }
        Ok(())
    }
}
