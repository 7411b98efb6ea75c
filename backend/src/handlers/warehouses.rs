//! Warehouse and product catalog handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::warehouse::{
    CreateProductRequest, CreateWarehouseRequest, Product, StockProductRequest, Warehouse,
    WarehouseService,
};
use crate::AppState;

pub async fn create_warehouse(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<CreateWarehouseRequest>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    let service = WarehouseService::new(state.db.clone());
    let warehouse = service.create_warehouse(req).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<Warehouse>>> {
    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.list_warehouses().await?))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.get_warehouse(id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = WarehouseService::new(state.db.clone());
    let product = service.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.get_product(id).await?))
}

pub async fn stock_product(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<StockProductRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let service = WarehouseService::new(state.db.clone());
    let id = service.stock_product(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "warehouse_product_id": id })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CriticalLevelRequest {
    pub critical_level_qty: Option<i64>,
}

pub async fn update_critical_level(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_product_id): Path<Uuid>,
    Json(req): Json<CriticalLevelRequest>,
) -> AppResult<StatusCode> {
    let service = WarehouseService::new(state.db.clone());
    service
        .update_critical_level(warehouse_product_id, req.critical_level_qty)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_stock_level(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = WarehouseService::new(state.db.clone());
    service.archive_stock_level(warehouse_product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
