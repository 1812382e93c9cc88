//! Conversations are unordered pairs stored with a normalized participant
//! order, which makes creation idempotent under concurrent mutual likes.

use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Conversation, ConversationSummary, NewConversation};
use crate::schema::conversations;

/// Normalize a participant pair: smaller id first.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Fetch the conversation for a pair, creating it if absent. The unique
/// (user1, user2) constraint plus a do-nothing insert keeps concurrent
/// callers from producing two rows.
pub fn find_or_create_conversation(pool: &DbPool, a: Uuid, b: Uuid) -> AppResult<Conversation> {
    let mut conn = get_conn(pool)?;
    let (user1, user2) = ordered_pair(a, b);

    let existing: Option<Conversation> = conversations::table
        .filter(conversations::user1_id.eq(user1))
        .filter(conversations::user2_id.eq(user2))
        .first(&mut conn)
        .optional()?;
    if let Some(conversation) = existing {
        return Ok(conversation);
    }

    diesel::insert_into(conversations::table)
        .values(&NewConversation {
            user1_id: user1,
            user2_id: user2,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    // Re-read: either our insert landed or a concurrent one did.
    let conversation = conversations::table
        .filter(conversations::user1_id.eq(user1))
        .filter(conversations::user2_id.eq(user2))
        .first(&mut conn)?;

    tracing::info!(user1 = %user1, user2 = %user2, "conversation ready");
    Ok(conversation)
}

pub fn fetch(pool: &DbPool, conversation_id: Uuid) -> AppResult<Conversation> {
    let mut conn = get_conn(pool)?;
    fetch_conn(&mut conn, conversation_id)
}

pub(crate) fn fetch_conn(conn: &mut PgConnection, conversation_id: Uuid) -> AppResult<Conversation> {
    conversations::table
        .find(conversation_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ConversationNotFound, "conversation not found"))
}

/// The conversation's other participant, or an error when the caller is not
/// a participant at all.
pub fn other_participant(conversation: &Conversation, user_id: Uuid) -> AppResult<Uuid> {
    if conversation.user1_id == user_id {
        Ok(conversation.user2_id)
    } else if conversation.user2_id == user_id {
        Ok(conversation.user1_id)
    } else {
        Err(AppError::new(
            ErrorCode::NotConversationParticipant,
            "you are not a participant of this conversation",
        ))
    }
}

/// The caller's conversation list with peer display data. Pairs that are
/// blocked or unliked in either direction are hidden, not deleted.
pub fn conversations_for(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
    let mut conn = get_conn(pool)?;

    let rows: Vec<Conversation> = conversations::table
        .filter(
            conversations::user1_id
                .eq(user_id)
                .or(conversations::user2_id.eq(user_id)),
        )
        .order(conversations::created_at.desc())
        .load(&mut conn)?;

    let mut summaries = Vec::with_capacity(rows.len());
    for conversation in rows {
        let other_id = other_participant(&conversation, user_id)?;

        if amora_match::blocks::are_blocked(pool, user_id, other_id)? {
            continue;
        }
        if amora_match::likes::is_unliked_between(pool, user_id, other_id)? {
            continue;
        }

        let peer = amora_match::identity::session_user(pool, other_id)?;
        summaries.push(ConversationSummary {
            id: conversation.id,
            other_user_id: other_id,
            other_username: peer.username,
            is_online: peer.is_online,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn conversation(user1: Uuid, user2: Uuid) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            user1_id: user1,
            user2_id: user2,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pair_order_is_direction_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
    }

    #[test]
    fn pair_order_puts_smaller_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (first, second) = ordered_pair(a, b);
        assert!(first <= second);
    }

    #[test]
    fn other_participant_resolves_both_sides() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conv = conversation(a, b);
        assert_eq!(other_participant(&conv, a).unwrap(), b);
        assert_eq!(other_participant(&conv, b).unwrap(), a);
    }

    #[test]
    fn stranger_is_not_a_participant() {
        let conv = conversation(Uuid::new_v4(), Uuid::new_v4());
        assert!(other_participant(&conv, Uuid::new_v4()).is_err());
    }
}
