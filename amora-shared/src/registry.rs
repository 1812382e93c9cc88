//! In-process registry of live socket connections, keyed by channel.
//!
//! Every live connection (chat, video, notifications) runs as its own task
//! holding the receiving half of an mpsc channel; the registry keeps the
//! sending halves and fans payloads out to them. The registry is an injected
//! service object shared behind an `Arc`, rebuilt empty on restart.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{CloseFrame, Message};
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// WebSocket close code sent when a connection is rejected or superseded.
pub const POLICY_VIOLATION: u16 = 1008;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Per-conversation chat channel; a user may hold several connections
    /// (multiple tabs).
    Chat,
    /// Per-conversation signaling channel; pruned once empty.
    Video,
    /// Per-user channel (the channel id is the user id); a user holds at
    /// most one connection here, a newer one supersedes the older.
    Notifications,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Video => "video",
            Self::Notifications => "notifications",
        }
    }

    fn prune_when_empty(&self) -> bool {
        // Chat channels stay in the map for bookkeeping across reconnects.
        matches!(self, Self::Video | Self::Notifications)
    }

    fn single_connection_per_user(&self) -> bool {
        matches!(self, Self::Notifications)
    }
}

/// Sending half of a connection task's outbound queue.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Handle identifying one registration; required to unregister the exact
/// connection instance (a user may hold several on the same channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(u64);

#[derive(Debug, Clone)]
struct Member {
    user_id: Uuid,
    conn_id: u64,
    sender: ConnectionSender,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    channels: DashMap<(ChannelKind, Uuid), Vec<Member>>,
    next_conn_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a channel and return its registration handle.
    ///
    /// On the notifications channel an existing connection for the same user
    /// is sent a close frame and dropped before the new one is admitted.
    pub fn register(
        &self,
        kind: ChannelKind,
        channel: Uuid,
        user_id: Uuid,
        sender: ConnectionSender,
    ) -> ConnectionId {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut members = self.channels.entry((kind, channel)).or_default();

        if kind.single_connection_per_user() {
            members.retain(|m| {
                if m.user_id == user_id {
                    let _ = m.sender.send(Message::Close(Some(CloseFrame {
                        code: POLICY_VIOLATION,
                        reason: "superseded by a newer connection".into(),
                    })));
                    false
                } else {
                    true
                }
            });
        }

        members.push(Member {
            user_id,
            conn_id,
            sender,
        });

        tracing::debug!(
            kind = kind.as_str(),
            channel = %channel,
            user_id = %user_id,
            "connection registered"
        );

        ConnectionId(conn_id)
    }

    /// Remove the exact connection instance from a channel.
    pub fn unregister(&self, kind: ChannelKind, channel: Uuid, conn: ConnectionId) {
        let now_empty = match self.channels.get_mut(&(kind, channel)) {
            Some(mut members) => {
                members.retain(|m| m.conn_id != conn.0);
                members.is_empty()
            }
            None => return,
        };

        if now_empty && kind.prune_when_empty() {
            // Re-check emptiness under the entry lock: a concurrent register
            // may have admitted a member since the guard above was dropped.
            self.channels
                .remove_if(&(kind, channel), |_, members| members.is_empty());
        }

        tracing::debug!(kind = kind.as_str(), channel = %channel, "connection unregistered");
    }

    /// Send a JSON payload to every channel member whose user id satisfies
    /// the predicate. Returns the number of successful sends.
    pub fn broadcast(
        &self,
        kind: ChannelKind,
        channel: Uuid,
        payload: &serde_json::Value,
        predicate: Option<&dyn Fn(Uuid) -> bool>,
    ) -> usize {
        self.broadcast_text(kind, channel, &payload.to_string(), predicate)
    }

    /// Raw-text variant of [`broadcast`](Self::broadcast), used by the video
    /// channel which relays signaling payloads verbatim.
    pub fn broadcast_text(
        &self,
        kind: ChannelKind,
        channel: Uuid,
        text: &str,
        predicate: Option<&dyn Fn(Uuid) -> bool>,
    ) -> usize {
        // Snapshot the member list so sends do not hold the shard lock and
        // the iteration tolerates a concurrent unregister.
        let members: Vec<Member> = match self.channels.get(&(kind, channel)) {
            Some(members) => members.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for member in members {
            if let Some(pred) = predicate {
                if !pred(member.user_id) {
                    continue;
                }
            }
            match member.sender.send(Message::Text(text.to_owned())) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    // Peer task already gone; its unregister will catch up.
                    tracing::warn!(
                        kind = kind.as_str(),
                        channel = %channel,
                        user_id = %member.user_id,
                        "skipping send to dead connection"
                    );
                }
            }
        }
        delivered
    }

    /// Whether the user currently holds at least one live connection on the
    /// channel. Drives the stored-notification fallback on chat sends.
    pub fn is_connected(&self, kind: ChannelKind, channel: Uuid, user_id: Uuid) -> bool {
        self.channels
            .get(&(kind, channel))
            .map_or(false, |members| members.iter().any(|m| m.user_id == user_id))
    }

    /// Whether the channel still has an entry in the map (empty or not).
    pub fn has_channel(&self, kind: ChannelKind, channel: Uuid) -> bool {
        self.channels.contains_key(&(kind, channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (ConnectionSender, mpsc::UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn notification_channel_is_single_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (tx1, mut rx1) = pair();
        let (tx2, _rx2) = pair();

        registry.register(ChannelKind::Notifications, user, user, tx1);
        registry.register(ChannelKind::Notifications, user, user, tx2);

        // The stale connection received a policy-violation close frame.
        match rx1.try_recv().unwrap() {
            Message::Close(Some(frame)) => assert_eq!(frame.code, POLICY_VIOLATION),
            other => panic!("expected close frame, got {other:?}"),
        }

        // Only the new connection remains.
        let sent = registry.broadcast(
            ChannelKind::Notifications,
            user,
            &serde_json::json!({"type": "like"}),
            None,
        );
        assert_eq!(sent, 1);
    }

    #[test]
    fn chat_channel_allows_multiple_tabs() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();

        let (tx1, mut rx1) = pair();
        let (tx2, mut rx2) = pair();
        registry.register(ChannelKind::Chat, channel, user, tx1);
        registry.register(ChannelKind::Chat, channel, user, tx2);

        let sent = registry.broadcast(
            ChannelKind::Chat,
            channel,
            &serde_json::json!({"content": "hi"}),
            None,
        );
        assert_eq!(sent, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn broadcast_respects_predicate() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();

        let (tx1, mut sender_rx) = pair();
        let (tx2, mut receiver_rx) = pair();
        registry.register(ChannelKind::Chat, channel, sender, tx1);
        registry.register(ChannelKind::Chat, channel, receiver, tx2);

        let sent = registry.broadcast_text(
            ChannelKind::Chat,
            channel,
            "typing",
            Some(&|id| id != sender),
        );

        assert_eq!(sent, 1);
        assert!(sender_rx.try_recv().is_err());
        assert!(receiver_rx.try_recv().is_ok());
    }

    #[test]
    fn broadcast_survives_dead_member() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let dead = Uuid::new_v4();
        let alive = Uuid::new_v4();

        let (tx1, rx1) = pair();
        drop(rx1); // peer task is gone
        let (tx2, mut rx2) = pair();
        registry.register(ChannelKind::Chat, channel, dead, tx1);
        registry.register(ChannelKind::Chat, channel, alive, tx2);

        let sent = registry.broadcast_text(ChannelKind::Chat, channel, "payload", None);
        assert_eq!(sent, 1);
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn video_channel_pruned_when_empty() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();

        let (tx, _rx) = pair();
        let conn = registry.register(ChannelKind::Video, channel, user, tx);
        assert!(registry.has_channel(ChannelKind::Video, channel));

        registry.unregister(ChannelKind::Video, channel, conn);
        assert!(!registry.has_channel(ChannelKind::Video, channel));
    }

    #[test]
    fn chat_channel_survives_when_empty() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();

        let (tx, _rx) = pair();
        let conn = registry.register(ChannelKind::Chat, channel, user, tx);
        registry.unregister(ChannelKind::Chat, channel, conn);

        assert!(registry.has_channel(ChannelKind::Chat, channel));
        assert!(!registry.is_connected(ChannelKind::Chat, channel, user));
    }

    #[test]
    fn unregister_removes_exact_instance() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();

        let (tx1, _rx1) = pair();
        let (tx2, _rx2) = pair();
        let first = registry.register(ChannelKind::Chat, channel, user, tx1);
        registry.register(ChannelKind::Chat, channel, user, tx2);

        registry.unregister(ChannelKind::Chat, channel, first);
        assert!(registry.is_connected(ChannelKind::Chat, channel, user));

        let sent = registry.broadcast_text(ChannelKind::Chat, channel, "x", None);
        assert_eq!(sent, 1);
    }

    #[test]
    fn is_connected_lifecycle() {
        let registry = ConnectionRegistry::new();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();

        assert!(!registry.is_connected(ChannelKind::Chat, channel, user));

        let (tx, _rx) = pair();
        let conn = registry.register(ChannelKind::Chat, channel, user, tx);
        assert!(registry.is_connected(ChannelKind::Chat, channel, user));

        registry.unregister(ChannelKind::Chat, channel, conn);
        assert!(!registry.is_connected(ChannelKind::Chat, channel, user));
    }
}
