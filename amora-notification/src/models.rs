use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::notifications;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
    Like,
    Match,
    Visit,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Like => "like",
            Self::Match => "match",
            Self::Visit => "visit",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message" => Ok(Self::Message),
            "like" => Ok(Self::Like),
            "match" => Ok(Self::Match),
            "visit" => Ok(Self::Visit),
            _ => Err(format!("unknown notification kind: {s}")),
        }
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub receiver_id: Uuid,
    pub sender_id: Uuid,
    pub kind: String,
    pub context: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub receiver_id: Uuid,
    pub sender_id: Uuid,
    pub kind: String,
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_roundtrip() {
        for kind in [
            NotificationKind::Message,
            NotificationKind::Like,
            NotificationKind::Match,
            NotificationKind::Visit,
        ] {
            assert_eq!(NotificationKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(NotificationKind::from_str("poke").is_err());
    }
}
