//! Goods receipt handlers

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
use crate::services::goods_receipt::{
    CreateGoodsReceiptRequest, GoodsReceipt, GoodsReceiptDetail, GoodsReceiptService,
    ReceiveLineRequest,
};
use crate::AppState;
use shared::{GoodsReceiptStatus, DocumentStatus, Pagination, PaginatedResponse};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateGoodsReceiptRequest>,
) -> AppResult<(StatusCode, Json<GoodsReceiptDetail>)> {
    let service = GoodsReceiptService::new(state.db.clone());
    let receipt = service.create(req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<GoodsReceipt>>> {
    let status = parse_filter(query.status.as_deref())?;
    let service = GoodsReceiptService::new(state.db.clone());
    Ok(Json(service.list(status, pagination).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GoodsReceiptDetail>> {
    let service = GoodsReceiptService::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}

/// Receive quantity (and serials for tracked products) against a line.
/// The threshold check runs after the receipt transaction commits.
pub async fn receive_line(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ReceiveLineRequest>,
) -> AppResult<Json<GoodsReceiptDetail>> {
    let service = GoodsReceiptService::new(state.db.clone());
    let outcome = service.receive_line(id, line_id, req).await?;

    alert_service(&state).check_and_notify(&outcome.update).await;

    Ok(Json(outcome.receipt))
}

pub async fn put_away(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GoodsReceipt>> {
    let service = GoodsReceiptService::new(state.db.clone());
    Ok(Json(service.put_away(id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GoodsReceipt>> {
    let service = GoodsReceiptService::new(state.db.clone());
    Ok(Json(service.cancel(id).await?))
}

fn parse_filter(status: Option<&str>) -> AppResult<Option<GoodsReceiptStatus>> {
    status
        .map(|s| {
            GoodsReceiptStatus::parse(s).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown goods receipt status '{}'", s),
            })
        })
        .transpose()
}
