//! Serial registry handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::serial::{SerialRegistryService, SerialUnit};
use crate::AppState;
use shared::{SerialState, SerialUnitSpec};

#[derive(Debug, Deserialize)]
pub struct ListUnitsQuery {
    pub state: Option<String>,
}

pub async fn list_units(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_product_id): Path<Uuid>,
    Query(query): Query<ListUnitsQuery>,
) -> AppResult<Json<Vec<SerialUnit>>> {
    let filter = match query.state.as_deref() {
        Some(s) => Some(SerialState::parse(s).ok_or_else(|| AppError::Validation {
            field: "state".to_string(),
            message: format!("Unknown serial state '{}'", s),
        })?),
        None => None,
    };

    let service = SerialRegistryService::new(state.db.clone());
    Ok(Json(service.list_units(warehouse_product_id, filter).await?))
}

pub async fn get_unit(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((warehouse_product_id, serial_number)): Path<(Uuid, String)>,
) -> AppResult<Json<SerialUnit>> {
    let service = SerialRegistryService::new(state.db.clone());
    Ok(Json(
        service.get_unit(warehouse_product_id, &serial_number).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceUnitRequest {
    pub sold_unit_id: Uuid,
    pub replacement: SerialUnitSpec,
}

/// Warranty replacement: a sold unit is swapped for a fresh available one
pub async fn replace_unit(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<ReplaceUnitRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let service = SerialRegistryService::new(state.db.clone());
    let new_id = service.replace_unit(req.sold_unit_id, &req.replacement).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "serial_unit_id": new_id })),
    ))
}
