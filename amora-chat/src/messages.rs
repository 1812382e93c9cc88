//! Message persistence and live fan-out. A message that reaches storage is a
//! success; live delivery is best-effort with a stored-notification fallback
//! for an absent peer.

use std::sync::Arc;

use diesel::prelude::*;
use uuid::Uuid;

use amora_notification::{NotificationKind, NotificationRelay};
use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::registry::{ChannelKind, ConnectionRegistry};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::PaginationParams;

use crate::conversations;
use crate::models::{Message, MessageKind, NewMessage};
use crate::schema::messages;

/// Persist a text message, push it to both participants' live chat
/// connections, and fall back to a stored notification when the peer has no
/// open chat connection.
pub fn send_message(
    pool: &DbPool,
    registry: &Arc<ConnectionRegistry>,
    relay: &NotificationRelay,
    conversation_id: Uuid,
    sender: &AuthUser,
    content: &str,
) -> AppResult<Message> {
    if content.trim().is_empty() {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "message content must not be empty",
        ));
    }

    let conversation = conversations::fetch(pool, conversation_id)?;
    let receiver_id = conversations::other_participant(&conversation, sender.id)?;

    let mut conn = get_conn(pool)?;
    let message = insert_message(&mut conn, conversation_id, sender.id, MessageKind::Text, content)?;
    drop(conn);

    // Restrict delivery to the two participants; stale registrations on the
    // channel never see the payload.
    let sender_id = sender.id;
    let participants = move |id: Uuid| id == sender_id || id == receiver_id;
    registry.broadcast(
        ChannelKind::Chat,
        conversation_id,
        &message_payload(&message),
        Some(&participants),
    );

    if !registry.is_connected(ChannelKind::Chat, conversation_id, receiver_id) {
        // The message row is already durable; a failed fallback notification
        // must not fail the send.
        if let Err(e) = relay.notify(
            receiver_id,
            sender.id,
            NotificationKind::Message,
            &format!("{} sent you a message.", sender.username),
        ) {
            tracing::warn!(error = %e, receiver = %receiver_id, "message fallback notification failed");
        }
    }

    Ok(message)
}

/// Relay a typing indicator to everyone in the conversation except the
/// sender. Nothing is persisted.
pub fn typing(
    pool: &DbPool,
    registry: &Arc<ConnectionRegistry>,
    conversation_id: Uuid,
    sender: &AuthUser,
    is_typing: bool,
) -> AppResult<()> {
    let conversation = conversations::fetch(pool, conversation_id)?;
    conversations::other_participant(&conversation, sender.id)?;

    let payload = serde_json::json!({
        "event": "typing",
        "typing": is_typing,
        "username": sender.username,
    });
    let sender_id = sender.id;
    let not_sender = move |id: Uuid| id != sender_id;
    registry.broadcast(ChannelKind::Chat, conversation_id, &payload, Some(&not_sender));
    Ok(())
}

/// Messages for a conversation, newest first.
pub fn list_messages(
    pool: &DbPool,
    conversation_id: Uuid,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<(Vec<Message>, i64)> {
    let conversation = conversations::fetch(pool, conversation_id)?;
    conversations::other_participant(&conversation, user_id)?;

    let mut conn = get_conn(pool)?;
    let total: i64 = messages::table
        .filter(messages::conversation_id.eq(conversation_id))
        .count()
        .get_result(&mut conn)?;

    let items: Vec<Message> = messages::table
        .filter(messages::conversation_id.eq(conversation_id))
        .order(messages::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load(&mut conn)?;

    Ok((items, total))
}

pub(crate) fn insert_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    sender_id: Uuid,
    kind: MessageKind,
    content: &str,
) -> AppResult<Message> {
    let message = diesel::insert_into(messages::table)
        .values(&NewMessage {
            conversation_id,
            sender_id,
            kind: kind.as_str().to_string(),
            content: content.to_string(),
        })
        .get_result(conn)?;
    Ok(message)
}

/// Wire shape of a live chat message.
pub(crate) fn message_payload(message: &Message) -> serde_json::Value {
    serde_json::json!({
        "id": message.id,
        "sender_id": message.sender_id,
        "kind": message.kind,
        "content": message.content,
        "timestamp": message.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn payload_carries_the_full_record() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            kind: "text".into(),
            content: "see you at 8".into(),
            created_at: Utc::now(),
        };

        let payload = message_payload(&message);
        assert_eq!(payload["content"], "see you at 8");
        assert_eq!(payload["kind"], "text");
        assert_eq!(payload["sender_id"], serde_json::json!(message.sender_id));
    }
}
