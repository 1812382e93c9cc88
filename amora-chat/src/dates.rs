//! Date negotiation: a per-conversation invite state machine and the
//! preference-intersection resolver that proposes a concrete date once both
//! participants have submitted their choices.
//!
//! States: none -> pending -> {accepted, declined}; declined -> pending
//! (re-invite). An accepted invite is terminal for the row, but preferences
//! keep flowing until both sides are in.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::registry::{ChannelKind, ConnectionRegistry};
use amora_shared::types::auth::AuthUser;

use crate::conversations;
use crate::messages::insert_message;
use crate::models::{DateInvite, DatePreference, InviteStatus, MessageKind, NewDateInvite, NewDatePreference};
use crate::schema::{date_invites, date_preferences};

/// Activity token that short-circuits intersection: either side offering it
/// resolves the activity to [`WILDCARD_LABEL`] no matter what else overlaps.
pub const WILDCARD_TOKEN: &str = "surprise me";
pub const WILDCARD_LABEL: &str = "Surprise!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteDecision {
    /// Create or overwrite the singleton invite as pending.
    Create,
    /// The invite is already accepted; signal success without mutating.
    AlreadyAccepted,
}

/// The invite transition table.
pub fn decide_invite(current: Option<InviteStatus>) -> AppResult<InviteDecision> {
    match current {
        Some(InviteStatus::Pending) => Err(AppError::new(
            ErrorCode::InvitePending,
            "a date invite is already pending",
        )),
        Some(InviteStatus::Accepted) => Ok(InviteDecision::AlreadyAccepted),
        Some(InviteStatus::Declined) | None => Ok(InviteDecision::Create),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DateResolution {
    Success { moment: String, activity: String },
    NoMatch,
}

/// Intersect both participants' choices. The lexicographically smallest
/// shared element wins, which keeps resolution deterministic for a given
/// pair of sets.
pub fn resolve_preferences(
    a_moments: &[String],
    a_activities: &[String],
    b_moments: &[String],
    b_activities: &[String],
) -> DateResolution {
    let moment = smallest_common(a_moments, b_moments);
    let activity = if has_wildcard(a_activities) || has_wildcard(b_activities) {
        Some(WILDCARD_LABEL.to_string())
    } else {
        smallest_common(a_activities, b_activities)
    };

    match (moment, activity) {
        (Some(moment), Some(activity)) => DateResolution::Success { moment, activity },
        _ => DateResolution::NoMatch,
    }
}

fn smallest_common(a: &[String], b: &[String]) -> Option<String> {
    let b_set: HashSet<&str> = b.iter().map(String::as_str).collect();
    a.iter()
        .filter(|item| b_set.contains(item.as_str()))
        .min()
        .cloned()
}

fn has_wildcard(activities: &[String]) -> bool {
    activities
        .iter()
        .any(|a| a.trim().eq_ignore_ascii_case(WILDCARD_TOKEN))
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceOutcome {
    /// Stored; the other participant has not submitted yet.
    Waiting,
    Resolved(DateResolution),
}

/// Issue (or re-issue after a decline) the conversation's date invite.
pub fn invite(
    pool: &DbPool,
    registry: &Arc<ConnectionRegistry>,
    conversation_id: Uuid,
    sender: &AuthUser,
) -> AppResult<InviteStatus> {
    let conversation = conversations::fetch(pool, conversation_id)?;
    conversations::other_participant(&conversation, sender.id)?;

    let mut conn = get_conn(pool)?;
    let current: Option<DateInvite> = date_invites::table
        .filter(date_invites::conversation_id.eq(conversation_id))
        .first(&mut conn)
        .optional()?;
    let current_status = current
        .map(|invite| invite.parsed_status().map_err(AppError::Validation))
        .transpose()?;

    match decide_invite(current_status)? {
        InviteDecision::AlreadyAccepted => Ok(InviteStatus::Accepted),
        InviteDecision::Create => {
            // Singleton per conversation: overwrite in place, never multiply.
            diesel::insert_into(date_invites::table)
                .values(&NewDateInvite {
                    conversation_id,
                    sender_id: sender.id,
                    status: InviteStatus::Pending.as_str().to_string(),
                })
                .on_conflict(date_invites::conversation_id)
                .do_update()
                .set((
                    date_invites::sender_id.eq(sender.id),
                    date_invites::status.eq(InviteStatus::Pending.as_str()),
                    date_invites::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?;

            insert_message(
                &mut conn,
                conversation_id,
                sender.id,
                MessageKind::System,
                &format!("{} suggested going on a date.", sender.username),
            )?;
            drop(conn);

            broadcast_invite(registry, conversation_id, sender, InviteStatus::Pending);
            Ok(InviteStatus::Pending)
        }
    }
}

/// Accept or decline the pending invite.
pub fn respond(
    pool: &DbPool,
    registry: &Arc<ConnectionRegistry>,
    conversation_id: Uuid,
    user: &AuthUser,
    accepted: bool,
) -> AppResult<InviteStatus> {
    let conversation = conversations::fetch(pool, conversation_id)?;
    conversations::other_participant(&conversation, user.id)?;

    let mut conn = get_conn(pool)?;
    let invite: DateInvite = date_invites::table
        .filter(date_invites::conversation_id.eq(conversation_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::InviteNotFound, "no date invite for this conversation"))?;

    let status = if accepted {
        InviteStatus::Accepted
    } else {
        InviteStatus::Declined
    };

    diesel::update(date_invites::table.find(invite.id))
        .set((
            date_invites::status.eq(status.as_str()),
            date_invites::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    let verb = if accepted { "accepted" } else { "declined" };
    insert_message(
        &mut conn,
        conversation_id,
        user.id,
        MessageKind::System,
        &format!("{} {verb} the date invite.", user.username),
    )?;
    drop(conn);

    broadcast_invite(registry, conversation_id, user, status);
    Ok(status)
}

/// Store one participant's moments/activities and resolve the date once both
/// sides have submitted.
pub fn submit_preferences(
    pool: &DbPool,
    registry: &Arc<ConnectionRegistry>,
    conversation_id: Uuid,
    user: &AuthUser,
    moments: Vec<String>,
    activities: Vec<String>,
) -> AppResult<PreferenceOutcome> {
    let conversation = conversations::fetch(pool, conversation_id)?;
    let other_id = conversations::other_participant(&conversation, user.id)?;

    let mut conn = get_conn(pool)?;
    let invite: Option<DateInvite> = date_invites::table
        .filter(date_invites::conversation_id.eq(conversation_id))
        .first(&mut conn)
        .optional()?;
    let accepted = invite
        .map(|i| i.parsed_status().map_err(AppError::Validation))
        .transpose()?
        .is_some_and(|status| status == InviteStatus::Accepted);
    if !accepted {
        return Err(AppError::new(
            ErrorCode::InviteNotAccepted,
            "the date invite has not been accepted by both participants",
        ));
    }

    diesel::insert_into(date_preferences::table)
        .values(&NewDatePreference {
            conversation_id,
            user_id: user.id,
            moments: moments.clone(),
            activities: activities.clone(),
        })
        .on_conflict((date_preferences::conversation_id, date_preferences::user_id))
        .do_update()
        .set((
            date_preferences::moments.eq(moments.clone()),
            date_preferences::activities.eq(activities.clone()),
            date_preferences::submitted_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    let other: Option<DatePreference> = date_preferences::table
        .filter(date_preferences::conversation_id.eq(conversation_id))
        .filter(date_preferences::user_id.eq(other_id))
        .first(&mut conn)
        .optional()?;

    let Some(other) = other else {
        return Ok(PreferenceOutcome::Waiting);
    };

    let resolution = resolve_preferences(&moments, &activities, &other.moments, &other.activities);
    let (status, text) = match &resolution {
        DateResolution::Success { moment, activity } => (
            "success",
            format!("Date proposal: {activity}, {moment}."),
        ),
        DateResolution::NoMatch => (
            "no_match",
            "No overlapping choices. Narrow your picks and try again.".to_string(),
        ),
    };

    insert_message(&mut conn, conversation_id, user.id, MessageKind::System, &text)?;
    drop(conn);

    registry.broadcast(
        ChannelKind::Chat,
        conversation_id,
        &serde_json::json!({
            "type": "date_result",
            "status": status,
            "message": text,
        }),
        None,
    );

    tracing::info!(conversation = %conversation_id, status, "date preferences resolved");
    Ok(PreferenceOutcome::Resolved(resolution))
}

fn broadcast_invite(
    registry: &Arc<ConnectionRegistry>,
    conversation_id: Uuid,
    actor: &AuthUser,
    status: InviteStatus,
) {
    registry.broadcast(
        ChannelKind::Chat,
        conversation_id,
        &serde_json::json!({
            "type": "date_invite",
            "sender_id": actor.id,
            "sender_name": actor.username,
            "status": status.as_str(),
        }),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn invite_from_scratch_creates() {
        assert_eq!(decide_invite(None).unwrap(), InviteDecision::Create);
    }

    #[test]
    fn invite_while_pending_conflicts() {
        let err = decide_invite(Some(InviteStatus::Pending)).unwrap_err();
        match err {
            AppError::Known { code, .. } => assert_eq!(code, ErrorCode::InvitePending),
            other => panic!("expected known error, got {other:?}"),
        }
    }

    #[test]
    fn reinvite_after_decline_creates() {
        assert_eq!(
            decide_invite(Some(InviteStatus::Declined)).unwrap(),
            InviteDecision::Create
        );
    }

    #[test]
    fn invite_on_accepted_is_a_noop_signal() {
        assert_eq!(
            decide_invite(Some(InviteStatus::Accepted)).unwrap(),
            InviteDecision::AlreadyAccepted
        );
    }

    #[test]
    fn overlapping_preferences_resolve() {
        let resolution = resolve_preferences(
            &owned(&["evening"]),
            &owned(&["dinner"]),
            &owned(&["evening", "morning"]),
            &owned(&["dinner", "cinema"]),
        );
        assert_eq!(
            resolution,
            DateResolution::Success {
                moment: "evening".into(),
                activity: "dinner".into(),
            }
        );
    }

    #[test]
    fn disjoint_activities_do_not_match() {
        let resolution = resolve_preferences(
            &owned(&["evening"]),
            &owned(&["dinner"]),
            &owned(&["evening"]),
            &owned(&["cinema"]),
        );
        assert_eq!(resolution, DateResolution::NoMatch);
    }

    #[test]
    fn disjoint_moments_do_not_match() {
        let resolution = resolve_preferences(
            &owned(&["morning"]),
            &owned(&["dinner"]),
            &owned(&["evening"]),
            &owned(&["dinner"]),
        );
        assert_eq!(resolution, DateResolution::NoMatch);
    }

    #[test]
    fn wildcard_overrides_activity_intersection() {
        let resolution = resolve_preferences(
            &owned(&["evening"]),
            &owned(&["Surprise Me"]),
            &owned(&["evening"]),
            &owned(&["cinema"]),
        );
        assert_eq!(
            resolution,
            DateResolution::Success {
                moment: "evening".into(),
                activity: WILDCARD_LABEL.into(),
            }
        );
    }

    #[test]
    fn wildcard_still_needs_a_common_moment() {
        let resolution = resolve_preferences(
            &owned(&["morning"]),
            &owned(&["surprise me"]),
            &owned(&["evening"]),
            &owned(&["cinema"]),
        );
        assert_eq!(resolution, DateResolution::NoMatch);
    }

    #[test]
    fn resolution_is_deterministic() {
        // Same sets in any order pick the lexicographically smallest element.
        let first = resolve_preferences(
            &owned(&["evening", "afternoon"]),
            &owned(&["dinner", "bowling"]),
            &owned(&["afternoon", "evening"]),
            &owned(&["bowling", "dinner"]),
        );
        assert_eq!(
            first,
            DateResolution::Success {
                moment: "afternoon".into(),
                activity: "bowling".into(),
            }
        );
    }
}
