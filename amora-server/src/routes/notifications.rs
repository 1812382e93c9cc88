use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use amora_notification::Notification;
use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /notifications - the caller's notifications, newest first.
pub async fn list_notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let items = state.relay.list_notifications(user.id, query.unread_only)?;
    Ok(Json(ApiResponse::ok(items)))
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// GET /notifications/unread-count
pub async fn unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let count = state.relay.unread_count(user.id)?;
    Ok(Json(ApiResponse::ok(UnreadCountResponse { count })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkReadRequest {
    #[validate(length(min = 1, message = "no notifications provided"))]
    pub notification_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

/// POST /notifications/mark-read - mark owned notifications as read; ids
/// not owned by the caller are silently ignored.
pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<Json<ApiResponse<MarkReadResponse>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let updated = state.relay.mark_read(user.id, &req.notification_ids)?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { updated })))
}
