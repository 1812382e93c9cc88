use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amora_match::likes::VISIT_FAME_DELTA;
use amora_match::models::CandidateProfile;
use amora_notification::NotificationKind;
use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::AppState;

/// GET /matching/browse - ranked candidates for the caller.
pub async fn browse(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<CandidateProfile>>>> {
    let candidates = amora_match::list_candidates(&state.db, user.id)?;
    Ok(Json(ApiResponse::ok(candidates)))
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub target_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

/// POST /matching/like - like a profile; a mutual like creates the
/// conversation and fires both match notifications.
pub async fn like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<ApiResponse<LikeResponse>>> {
    let target = amora_match::identity::session_user(&state.db, req.target_id)?;
    let outcome = amora_match::like(&state.db, user.id, target.id)?;

    if outcome.matched {
        let conversation =
            amora_chat::find_or_create_conversation(&state.db, user.id, target.id)?;

        state.relay.notify(
            user.id,
            target.id,
            NotificationKind::Match,
            &format!("You matched with {}!", target.username),
        )?;
        state.relay.notify(
            target.id,
            user.id,
            NotificationKind::Match,
            &format!("You matched with {}!", user.username),
        )?;

        return Ok(Json(ApiResponse::ok(LikeResponse {
            matched: true,
            conversation_id: Some(conversation.id),
        })));
    }

    state.relay.notify(
        target.id,
        user.id,
        NotificationKind::Like,
        &format!("{} liked your profile.", user.username),
    )?;

    Ok(Json(ApiResponse::ok(LikeResponse {
        matched: false,
        conversation_id: None,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UnlikeRequest {
    pub target_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UnlikeResponse {
    pub unliked: bool,
}

/// POST /matching/unlike - terminally withdraw a like. Idempotent.
pub async fn unlike(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnlikeRequest>,
) -> AppResult<Json<ApiResponse<UnlikeResponse>>> {
    let unliked = amora_match::unlike(&state.db, user.id, req.target_id)?;
    Ok(Json(ApiResponse::ok(UnlikeResponse { unliked })))
}

/// POST /matching/visit/:user_id - record a profile visit.
pub async fn visit(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let target = amora_match::identity::session_user(&state.db, user_id)?;

    if target.id != user.id {
        amora_match::likes::bump_fame(&state.db, target.id, VISIT_FAME_DELTA)?;
        state.relay.notify(
            target.id,
            user.id,
            NotificationKind::Visit,
            &format!("{} viewed your profile.", user.username),
        )?;
    }

    Ok(Json(ApiResponse::ok(serde_json::json!({ "visited": target.id }))))
}

#[derive(Debug, Serialize)]
pub struct ResetFameResponse {
    pub reset: usize,
}

/// POST /maintenance/reset-fame - daily housekeeping hook.
pub async fn reset_fame(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ResetFameResponse>>> {
    let reset = amora_match::likes::reset_fame_ratings(&state.db)?;
    Ok(Json(ApiResponse::ok(ResetFameResponse { reset })))
}
