use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use amora_chat::models::ConversationSummary;
use amora_chat::{conversations, messages, Message};
use amora_shared::errors::AppResult;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::AppState;

/// GET /chat/conversations - the caller's conversations, blocked and
/// unliked pairs hidden.
pub async fn list_conversations(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<ConversationSummary>>>> {
    let summaries = conversations::conversations_for(&state.db, user.id)?;
    Ok(Json(ApiResponse::ok(summaries)))
}

/// GET /chat/conversations/:id/messages - paginated history, newest first.
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let (items, total) = messages::list_messages(&state.db, conversation_id, user.id, &params)?;
    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub content: String,
}

/// POST /chat/send - persist and fan out a chat message.
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let message = messages::send_message(
        &state.db,
        &state.registry,
        &state.relay,
        req.conversation_id,
        &user,
        &req.content,
    )?;
    Ok(Json(ApiResponse::ok(message)))
}

#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub conversation_id: Uuid,
    pub is_typing: bool,
}

/// POST /chat/typing - live-only typing indicator.
pub async fn typing(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<TypingRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    messages::typing(
        &state.db,
        &state.registry,
        req.conversation_id,
        &user,
        req.is_typing,
    )?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "typing": req.is_typing }))))
}
