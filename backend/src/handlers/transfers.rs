//! Stock transfer handlers

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
use crate::services::transfer::{
    CreateTransferRequest, ExecuteLineRequest, StockTransfer, StockTransferDetail,
    StockTransferService,
};
use crate::AppState;
use shared::{DocumentStatus, Pagination, PaginatedResponse, TransferStatus};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateTransferRequest>,
) -> AppResult<(StatusCode, Json<StockTransferDetail>)> {
    let service = StockTransferService::new(state.db.clone());
    let transfer = service.create(req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<StockTransfer>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            TransferStatus::parse(s).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown stock transfer status '{}'", s),
            })
        })
        .transpose()?;

    let service = StockTransferService::new(state.db.clone());
    Ok(Json(service.list(status, pagination).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockTransferDetail>> {
    let service = StockTransferService::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockTransfer>> {
    let service = StockTransferService::new(state.db.clone());
    Ok(Json(service.approve(id, user.user_id).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockTransfer>> {
    let service = StockTransferService::new(state.db.clone());
    Ok(Json(service.reject(id, user.user_id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockTransfer>> {
    let service = StockTransferService::new(state.db.clone());
    Ok(Json(service.cancel(id).await?))
}

/// Execute quantity for a line; both warehouses are threshold-checked
/// once the move has committed
pub async fn execute_line(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ExecuteLineRequest>,
) -> AppResult<Json<StockTransferDetail>> {
    let service = StockTransferService::new(state.db.clone());
    let outcome = service.execute_line(id, line_id, req).await?;

    let alerts = alert_service(&state);
    alerts.check_and_notify(&outcome.source_update).await;
    alerts.check_and_notify(&outcome.dest_update).await;

    Ok(Json(outcome.transfer))
}
