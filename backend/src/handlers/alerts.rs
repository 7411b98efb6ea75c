//! Threshold alert rule handlers; rule management is admin-only

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::alert_service;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::alerts::{AlertRule, UpsertAlertRuleRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub warehouse_id: Option<Uuid>,
}

pub async fn upsert_rule(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpsertAlertRuleRequest>,
) -> AppResult<(StatusCode, Json<AlertRule>)> {
    require_admin(&user)?;
    let rule = alert_service(&state).upsert_rule(req).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn list_rules(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<AlertRule>>> {
    require_admin(&user)?;
    Ok(Json(alert_service(&state).list_rules(query.warehouse_id).await?))
}

pub async fn get_rule(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AlertRule>> {
    require_admin(&user)?;
    Ok(Json(alert_service(&state).get_rule(id).await?))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_admin(&user)?;
    alert_service(&state).delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
