//! Purchase order handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::purchase_order::{
    CreatePurchaseOrderRequest, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderService,
};
use crate::AppState;
use shared::{DocumentStatus, Pagination, PaginatedResponse, PurchaseOrderStatus};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePurchaseOrderRequest>,
) -> AppResult<(StatusCode, Json<PurchaseOrderDetail>)> {
    let service = PurchaseOrderService::new(state.db.clone());
    let order = service.create(req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<PurchaseOrder>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            PurchaseOrderStatus::parse(s).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown purchase order status '{}'", s),
            })
        })
        .transpose()?;

    let service = PurchaseOrderService::new(state.db.clone());
    Ok(Json(service.list(status, pagination).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    let service = PurchaseOrderService::new(state.db.clone());
    Ok(Json(service.get(id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = PurchaseOrderService::new(state.db.clone());
    Ok(Json(service.approve(id, user.user_id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = PurchaseOrderService::new(state.db.clone());
    Ok(Json(service.cancel(id).await?))
}
