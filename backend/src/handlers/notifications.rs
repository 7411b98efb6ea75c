//! Notification handlers; each user only sees their own notifications

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::notification_service;
use crate::middleware::CurrentUser;
use crate::services::notification::Notification;
use crate::AppState;
use shared::{Pagination, PaginatedResponse};

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let service = notification_service(&state);
    Ok(Json(service.list(user.user_id, pagination).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let service = notification_service(&state);
    let count = service.unread_count(user.user_id).await?;
    Ok(Json(json!({ "unread": count })))
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = notification_service(&state);
    service.mark_as_read(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_as_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let service = notification_service(&state);
    let updated = service.mark_all_as_read(user.user_id).await?;
    Ok(Json(json!({ "marked_read": updated })))
}

pub async fn dismiss(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = notification_service(&state);
    service.dismiss(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
