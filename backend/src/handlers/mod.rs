//! HTTP request handlers
//!
//! Handlers stay thin: deserialize, call the service, serialize. Ledger
//! mutations return their updates so the threshold check can run here,
//! after the transaction has committed.

pub mod adjustments;
pub mod alerts;
pub mod goods_receipts;
pub mod health;
pub mod invoices;
pub mod notifications;
pub mod purchase_orders;
pub mod serials;
pub mod stock;
pub mod transfers;
pub mod warehouses;

use crate::services::{NotificationService, ThresholdAlertService};
use crate::services::notification::WebhookClient;
use crate::AppState;

/// Notification service wired with the configured webhook, if any
pub(crate) fn notification_service(state: &AppState) -> NotificationService {
    let service = NotificationService::new(state.db.clone());
    match WebhookClient::from_config(&state.config.notifications.webhook_url) {
        Some(webhook) => service.with_webhook(webhook),
        None => service,
    }
}

/// Threshold alerting backed by the configured notification channel
pub(crate) fn alert_service(state: &AppState) -> ThresholdAlertService {
    ThresholdAlertService::new(state.db.clone(), notification_service(state))
}
