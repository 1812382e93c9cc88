use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use amora_match::blocks::{self, BlockedUser};
use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::AppState;

/// GET /blocks - the users blocked by the caller.
pub async fn list_blocked(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<BlockedUser>>>> {
    let blocked = blocks::blocked_users(&state.db, user.id)?;
    Ok(Json(ApiResponse::ok(blocked)))
}

/// POST /blocks/:user_id - block a user.
pub async fn block(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    blocks::block(&state.db, user.id, user_id)?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "blocked": user_id }))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnblockRequest {
    #[validate(length(min = 1, message = "no users provided"))]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UnblockResponse {
    pub removed: usize,
}

/// DELETE /blocks - batch unblock.
pub async fn unblock(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnblockRequest>,
) -> AppResult<Json<ApiResponse<UnblockResponse>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let removed = blocks::unblock(&state.db, user.id, &req.user_ids)?;
    Ok(Json(ApiResponse::ok(UnblockResponse { removed })))
}
