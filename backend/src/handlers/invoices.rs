//! Invoice and payment handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::alert_service;
use crate::middleware::CurrentUser;
use crate::services::invoice::{
    AddPaymentRequest, CreateInvoiceRequest, Invoice, InvoiceDetail, InvoicePayment,
    InvoiceService,
};
use crate::AppState;
use shared::{DocumentStatus, InvoiceStatus, Pagination, PaginatedResponse};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<InvoiceDetail>)> {
    let service = InvoiceService::new(state.db.clone());
    let invoice = service.create(req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Invoice>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            InvoiceStatus::parse(s).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown invoice status '{}'", s),
            })
        })
        .transpose()?;

    let service = InvoiceService::new(state.db.clone());
    Ok(Json(service.list(status, pagination).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}

pub async fn issue(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db.clone());
    Ok(Json(service.issue(id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db.clone());
    Ok(Json(service.cancel(id).await?))
}

pub async fn add_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddPaymentRequest>,
) -> AppResult<(StatusCode, Json<InvoicePayment>)> {
    let service = InvoiceService::new(state.db.clone());
    let payment = service.add_payment(id, req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Approve a payment. If the invoice crossed into fully paid, the stock
/// deduction has committed and every affected level is threshold-checked.
pub async fn approve_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, payment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db.clone());
    let outcome = service.approve_payment(id, payment_id, user.user_id).await?;

    let alerts = alert_service(&state);
    for update in &outcome.updates {
        alerts.check_and_notify(update).await;
    }

    Ok(Json(outcome.invoice))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, payment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db.clone());
    let outcome = service.reject_payment(id, payment_id, user.user_id).await?;
    Ok(Json(outcome.invoice))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((id, payment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let service = InvoiceService::new(state.db.clone());
    service.delete_payment(id, payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
