//! Stock ledger handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::alert_service;
use crate::middleware::CurrentUser;
use crate::services::ledger::{MovementReason, StockLedgerService, StockLevel, StockMovement};
use crate::AppState;
use shared::{Pagination, PaginatedResponse};

pub async fn get_level(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_product_id): Path<Uuid>,
) -> AppResult<Json<StockLevel>> {
    let service = StockLedgerService::new(state.db.clone());
    Ok(Json(service.get_level(warehouse_product_id).await?))
}

pub async fn list_levels(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockLevel>>> {
    let service = StockLedgerService::new(state.db.clone());
    Ok(Json(service.list_levels(warehouse_id).await?))
}

pub async fn list_movements(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_product_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let service = StockLedgerService::new(state.db.clone());
    Ok(Json(
        service.list_movements(warehouse_product_id, pagination).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    pub reason: MovementReason,
}

/// Standalone stock adjustment outside any document flow, e.g. a return
pub async fn adjust(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_product_id): Path<Uuid>,
    Json(req): Json<AdjustStockRequest>,
) -> AppResult<Json<StockLevel>> {
    let service = StockLedgerService::new(state.db.clone());
    let update = service
        .adjust(warehouse_product_id, req.delta, req.reason)
        .await?;

    alert_service(&state).check_and_notify(&update).await;

    Ok(Json(service.get_level(warehouse_product_id).await?))
}
