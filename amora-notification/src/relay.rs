//! The notification relay: persist a record, then push it to the receiver's
//! live notification connection if one exists. Persistence must succeed for
//! the call to succeed; the push is best-effort.

use std::sync::Arc;

use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::AppResult;
use amora_shared::registry::{ChannelKind, ConnectionRegistry};

use crate::models::{NewNotification, Notification, NotificationKind};
use crate::schema::notifications;

pub struct NotificationRelay {
    pool: DbPool,
    registry: Arc<ConnectionRegistry>,
}

impl NotificationRelay {
    pub fn new(pool: DbPool, registry: Arc<ConnectionRegistry>) -> Self {
        Self { pool, registry }
    }

    /// Persist and push a notification.
    ///
    /// Returns `None` without writing anything when the pair is blocked in
    /// either direction or carries a terminal unlike: suppressed pairs must
    /// leave no trace at all.
    pub fn notify(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
        kind: NotificationKind,
        context: &str,
    ) -> AppResult<Option<Notification>> {
        if amora_match::blocks::are_blocked(&self.pool, receiver_id, sender_id)? {
            tracing::debug!(receiver = %receiver_id, sender = %sender_id, "notification suppressed: blocked pair");
            return Ok(None);
        }
        if amora_match::likes::is_unliked_between(&self.pool, receiver_id, sender_id)? {
            tracing::debug!(receiver = %receiver_id, sender = %sender_id, "notification suppressed: unliked pair");
            return Ok(None);
        }

        let mut conn = get_conn(&self.pool)?;
        let notification: Notification = diesel::insert_into(notifications::table)
            .values(&NewNotification {
                receiver_id,
                sender_id,
                kind: kind.as_str().to_string(),
                context: context.to_string(),
            })
            .get_result(&mut conn)?;

        // Live push is fire-and-forget: a dead or absent connection never
        // fails the triggering request.
        self.registry.broadcast(
            ChannelKind::Notifications,
            receiver_id,
            &push_payload(&notification),
            None,
        );

        tracing::debug!(
            notification_id = %notification.id,
            receiver = %receiver_id,
            kind = kind.as_str(),
            "notification recorded"
        );
        Ok(Some(notification))
    }

    /// The receiver's notifications, newest first.
    pub fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        let mut conn = get_conn(&self.pool)?;

        let mut query = notifications::table
            .filter(notifications::receiver_id.eq(user_id))
            .order(notifications::created_at.desc())
            .into_boxed();
        if unread_only {
            query = query.filter(notifications::is_read.eq(false));
        }

        Ok(query.load(&mut conn)?)
    }

    pub fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let mut conn = get_conn(&self.pool)?;
        let count = notifications::table
            .filter(notifications::receiver_id.eq(user_id))
            .filter(notifications::is_read.eq(false))
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    /// Mark the given notifications as read. Only rows owned by `user_id`
    /// are touched; foreign or unknown ids are silently ignored.
    pub fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<usize> {
        let mut conn = get_conn(&self.pool)?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::receiver_id.eq(user_id))
                .filter(notifications::id.eq_any(ids))
                .filter(notifications::is_read.eq(false)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)?;
        Ok(updated)
    }
}

/// Wire shape of a live-pushed notification record.
fn push_payload(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "id": notification.id,
        "type": notification.kind,
        "context": notification.context,
        "sender_id": notification.sender_id,
        "timestamp": notification.created_at,
        "is_read": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn push_payload_shape() {
        let notification = Notification {
            id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            kind: "match".into(),
            context: "You matched with alice!".into(),
            is_read: false,
            created_at: Utc::now(),
        };

        let payload = push_payload(&notification);
        assert_eq!(payload["type"], "match");
        assert_eq!(payload["is_read"], false);
        assert_eq!(payload["context"], "You matched with alice!");
        assert_eq!(
            payload["sender_id"],
            serde_json::json!(notification.sender_id)
        );
    }
}
