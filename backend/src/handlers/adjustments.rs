//! Stock adjustment handlers

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
use crate::services::adjustment::{
    CreateAdjustmentRequest, StockAdjustment, StockAdjustmentDetail, StockAdjustmentService,
};
use crate::AppState;
use shared::{AdjustmentStatus, DocumentStatus, Pagination, PaginatedResponse};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateAdjustmentRequest>,
) -> AppResult<(StatusCode, Json<StockAdjustmentDetail>)> {
    let service = StockAdjustmentService::new(state.db.clone());
    let adjustment = service.create(req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<StockAdjustment>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            AdjustmentStatus::parse(s).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown stock adjustment status '{}'", s),
            })
        })
        .transpose()?;

    let service = StockAdjustmentService::new(state.db.clone());
    Ok(Json(service.list(status, pagination).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockAdjustmentDetail>> {
    let service = StockAdjustmentService::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}

/// Approve the count; every corrected level is threshold-checked after
/// the corrections have committed
pub async fn approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockAdjustmentDetail>> {
    let service = StockAdjustmentService::new(state.db.clone());
    let outcome = service.approve(id, user.user_id).await?;

    let alerts = alert_service(&state);
    for update in &outcome.updates {
        alerts.check_and_notify(update).await;
    }

    Ok(Json(outcome.adjustment))
}

pub async fn reject(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockAdjustment>> {
    let service = StockAdjustmentService::new(state.db.clone());
    Ok(Json(service.reject(id, user.user_id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockAdjustment>> {
    let service = StockAdjustmentService::new(state.db.clone());
    Ok(Json(service.cancel(id).await?))
}
