//! WebSocket admission and connection lifecycle for the three live channels.
//!
//! Admission happens before registration: a missing/invalid token, an
//! unknown user, or an offline user on the notifications channel closes the
//! socket with a policy-violation code and the connection never joins the
//! registry.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use amora_match::identity;
use amora_match::models::SessionUser;
use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::middleware::authenticate_socket_token;
use amora_shared::registry::{ChannelKind, POLICY_VIOLATION};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SocketAuthQuery {
    pub token: Option<String>,
}

/// GET /ws/chat/:conversation_id
pub async fn chat_socket(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<SocketAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        run_channel(socket, state, ChannelKind::Chat, Some(conversation_id), query.token)
    })
}

/// GET /ws/video/:conversation_id
pub async fn video_socket(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<SocketAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        run_channel(socket, state, ChannelKind::Video, Some(conversation_id), query.token)
    })
}

/// GET /ws/notifications - channel id is the authenticated user's id.
pub async fn notification_socket(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SocketAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        run_channel(socket, state, ChannelKind::Notifications, None, query.token)
    })
}

async fn run_channel(
    socket: WebSocket,
    state: Arc<AppState>,
    kind: ChannelKind,
    channel: Option<Uuid>,
    token: Option<String>,
) {
    let user = match admit(&state, kind, token.as_deref()) {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!(kind = kind.as_str(), error = %err, "socket admission rejected");
            close_policy_violation(socket, err.to_string()).await;
            return;
        }
    };

    let channel = channel.unwrap_or(user.id);

    let (tx, mut outbound) = mpsc::unbounded_channel();
    let conn = state.registry.register(kind, channel, user.id, tx);
    tracing::info!(kind = kind.as_str(), channel = %channel, user_id = %user.id, "socket connected");

    let (mut sink, mut stream) = socket.split();
    let user_id = user.id;

    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if sink.send(message).await.is_err() || closing {
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) if kind == ChannelKind::Video => {
                    // Signaling payloads are relayed verbatim to the peer.
                    state
                        .registry
                        .broadcast_text(kind, channel, &text, Some(&|id| id != user_id));
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Pings and keep-alive text on the other channels are ignored.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, user_id = %user_id, "socket read failed");
                    break;
                }
            },
        }
    }

    state.registry.unregister(kind, channel, conn);
    tracing::info!(kind = kind.as_str(), channel = %channel, user_id = %user_id, "socket disconnected");
}

fn admit(state: &AppState, kind: ChannelKind, token: Option<&str>) -> AppResult<SessionUser> {
    let token = token.ok_or_else(|| AppError::unauthorized("missing token"))?;
    let auth = authenticate_socket_token(token)?;
    let user = identity::session_user(&state.db, auth.id)?;

    if kind == ChannelKind::Notifications && !user.is_online {
        return Err(AppError::new(ErrorCode::UserOffline, "user is offline"));
    }

    Ok(user)
}

async fn close_policy_violation(mut socket: WebSocket, reason: String) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: POLICY_VIOLATION,
            reason: reason.into(),
        })))
        .await;
}
