use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amora_chat::dates::{self, DateResolution, PreferenceOutcome};
use amora_chat::InviteStatus;
use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub conversation_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub status: InviteStatus,
}

/// POST /dates/invite - issue or re-issue the conversation's date invite.
pub async fn invite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InviteRequest>,
) -> AppResult<Json<ApiResponse<InviteResponse>>> {
    let status = dates::invite(&state.db, &state.registry, req.conversation_id, &user)?;
    Ok(Json(ApiResponse::ok(InviteResponse { status })))
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub conversation_id: Uuid,
    pub accepted: bool,
}

/// POST /dates/respond - accept or decline the pending invite.
pub async fn respond(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RespondRequest>,
) -> AppResult<Json<ApiResponse<InviteResponse>>> {
    let status = dates::respond(
        &state.db,
        &state.registry,
        req.conversation_id,
        &user,
        req.accepted,
    )?;
    Ok(Json(ApiResponse::ok(InviteResponse { status })))
}

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub moments: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub waiting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DateResolution>,
}

/// POST /dates/preferences - submit one side's choices; resolves the date
/// once both participants are in.
pub async fn submit_preferences(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreferencesRequest>,
) -> AppResult<Json<ApiResponse<PreferencesResponse>>> {
    let outcome = dates::submit_preferences(
        &state.db,
        &state.registry,
        req.conversation_id,
        &user,
        req.moments,
        req.activities,
    )?;

    let response = match outcome {
        PreferenceOutcome::Waiting => PreferencesResponse {
            waiting: true,
            result: None,
        },
        PreferenceOutcome::Resolved(resolution) => PreferencesResponse {
            waiting: false,
            result: Some(resolution),
        },
    };
    Ok(Json(ApiResponse::ok(response)))
}
