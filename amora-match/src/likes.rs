//! Like/unlike state transitions, mutual-match detection and fame rating.

use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::NewLike;
use crate::schema::{likes, profiles};

pub const LIKE_FAME_DELTA: i32 = 3;
pub const MATCH_FAME_DELTA: i32 = 7;
pub const VISIT_FAME_DELTA: i32 = 1;

pub const FAME_MIN: i32 = 0;
pub const FAME_MAX: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub matched: bool,
}

/// Pair state fetched before a like is attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LikeContext {
    pub liker_has_main_picture: bool,
    pub pair_blocked: bool,
    pub pair_unliked: bool,
    pub already_liked: bool,
    pub reverse_liked: bool,
}

/// The like transition table. Pure so every branch is testable without a
/// store; the service wraps it in a transaction.
pub fn decide_like(liker: Uuid, liked: Uuid, ctx: &LikeContext) -> AppResult<LikeOutcome> {
    if liker == liked {
        return Err(AppError::new(
            ErrorCode::InvalidTarget,
            "you cannot like yourself",
        ));
    }
    if ctx.pair_blocked {
        return Err(AppError::new(
            ErrorCode::BlockedPair,
            "interaction with this profile is blocked",
        ));
    }
    if ctx.pair_unliked {
        return Err(AppError::new(
            ErrorCode::PairUnliked,
            "this pair has been unliked",
        ));
    }
    if !ctx.liker_has_main_picture {
        return Err(AppError::new(
            ErrorCode::MissingMainPicture,
            "a main profile picture is required before liking",
        ));
    }
    if ctx.already_liked {
        return Err(AppError::new(
            ErrorCode::DuplicateLike,
            "profile already liked",
        ));
    }

    Ok(LikeOutcome {
        matched: ctx.reverse_liked,
    })
}

/// Record a like from `liker` to `liked`.
///
/// On success the liked user's fame rating is bumped; when the inverse like
/// already exists both ratings get the match bonus and `matched` is true.
/// Conversation creation and notifications are orchestrated by the caller.
pub fn like(pool: &DbPool, liker: Uuid, liked: Uuid) -> AppResult<LikeOutcome> {
    let mut conn = get_conn(pool)?;

    conn.transaction::<_, AppError, _>(|conn| {
        let ctx = LikeContext {
            liker_has_main_picture: has_main_picture(conn, liker)?,
            pair_blocked: crate::blocks::are_blocked_conn(conn, liker, liked)?,
            pair_unliked: is_unliked_between_conn(conn, liker, liked)?,
            already_liked: like_exists(conn, liker, liked)?,
            reverse_liked: like_exists(conn, liked, liker)?,
        };

        let outcome = decide_like(liker, liked, &ctx)?;

        // The unique (liker, liked) constraint makes concurrent duplicates a
        // no-op insert rather than an error.
        let inserted = diesel::insert_into(likes::table)
            .values(&NewLike {
                liker_id: liker,
                liked_id: liked,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        if inserted == 0 {
            return Err(AppError::new(ErrorCode::DuplicateLike, "profile already liked"));
        }

        bump_fame_conn(conn, liked, LIKE_FAME_DELTA)?;
        if outcome.matched {
            bump_fame_conn(conn, liker, MATCH_FAME_DELTA)?;
            bump_fame_conn(conn, liked, MATCH_FAME_DELTA)?;
        }

        tracing::info!(liker = %liker, liked = %liked, matched = outcome.matched, "like recorded");
        Ok(outcome)
    })
}

/// Flag an existing like as unliked. Returns `true` only on the transition;
/// a missing row or an already-flagged row is a no-op. The flag is terminal.
pub fn unlike(pool: &DbPool, liker: Uuid, liked: Uuid) -> AppResult<bool> {
    let mut conn = get_conn(pool)?;

    let updated = diesel::update(
        likes::table
            .filter(likes::liker_id.eq(liker))
            .filter(likes::liked_id.eq(liked))
            .filter(likes::unliked.eq(false)),
    )
    .set(likes::unliked.eq(true))
    .execute(&mut conn)?;

    if updated > 0 {
        tracing::info!(liker = %liker, liked = %liked, "like withdrawn");
    }
    Ok(updated > 0)
}

/// Whether any like between the two users carries the terminal unlike flag.
pub fn is_unliked_between(pool: &DbPool, a: Uuid, b: Uuid) -> AppResult<bool> {
    let mut conn = get_conn(pool)?;
    is_unliked_between_conn(&mut conn, a, b).map_err(AppError::Database)
}

pub(crate) fn is_unliked_between_conn(
    conn: &mut PgConnection,
    a: Uuid,
    b: Uuid,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        likes::table
            .filter(likes::unliked.eq(true))
            .filter(
                (likes::liker_id.eq(a).and(likes::liked_id.eq(b)))
                    .or(likes::liker_id.eq(b).and(likes::liked_id.eq(a))),
            ),
    ))
    .get_result(conn)
}

fn like_exists(conn: &mut PgConnection, liker: Uuid, liked: Uuid) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        likes::table
            .filter(likes::liker_id.eq(liker))
            .filter(likes::liked_id.eq(liked))
            .filter(likes::unliked.eq(false)),
    ))
    .get_result(conn)
}

fn has_main_picture(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<bool> {
    profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select(profiles::has_main_picture)
        .first(conn)
        .optional()
        .map(|flag| flag.unwrap_or(false))
}

// --- Fame rating ---

pub fn clamp_fame(value: i32) -> i32 {
    value.clamp(FAME_MIN, FAME_MAX)
}

/// Adjust a user's fame rating, clamped to the canonical [0, 50] scale.
pub fn bump_fame(pool: &DbPool, user_id: Uuid, delta: i32) -> AppResult<()> {
    let mut conn = get_conn(pool)?;
    bump_fame_conn(&mut conn, user_id, delta).map_err(AppError::Database)
}

fn bump_fame_conn(conn: &mut PgConnection, user_id: Uuid, delta: i32) -> QueryResult<()> {
    let current: Option<i32> = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select(profiles::fame_rating)
        .first(conn)
        .optional()?;

    if let Some(current) = current {
        diesel::update(profiles::table.filter(profiles::user_id.eq(user_id)))
            .set(profiles::fame_rating.eq(clamp_fame(current + delta)))
            .execute(conn)?;
    }
    Ok(())
}

/// Zero every fame rating. Called by the external daily housekeeping job.
pub fn reset_fame_ratings(pool: &DbPool) -> AppResult<usize> {
    let mut conn = get_conn(pool)?;
    let reset = diesel::update(profiles::table)
        .set(profiles::fame_rating.eq(0))
        .execute(&mut conn)?;
    tracing::info!(profiles = reset, "fame ratings reset");
    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    fn clean_ctx() -> LikeContext {
        LikeContext {
            liker_has_main_picture: true,
            ..Default::default()
        }
    }

    fn code_of(err: AppError) -> ErrorCode {
        match err {
            AppError::Known { code, .. } => code,
            other => panic!("expected a known error, got {other:?}"),
        }
    }

    #[test]
    fn plain_like_does_not_match() {
        let (a, b) = ids();
        let outcome = decide_like(a, b, &clean_ctx()).unwrap();
        assert!(!outcome.matched);
    }

    #[test]
    fn reverse_like_makes_a_match() {
        let (a, b) = ids();
        let ctx = LikeContext {
            reverse_liked: true,
            ..clean_ctx()
        };
        assert!(decide_like(a, b, &ctx).unwrap().matched);
    }

    #[test]
    fn self_like_rejected() {
        let a = Uuid::new_v4();
        let err = decide_like(a, a, &clean_ctx()).unwrap_err();
        assert_eq!(code_of(err), ErrorCode::InvalidTarget);
    }

    #[test]
    fn blocked_pair_rejected() {
        let (a, b) = ids();
        let ctx = LikeContext {
            pair_blocked: true,
            ..clean_ctx()
        };
        assert_eq!(code_of(decide_like(a, b, &ctx).unwrap_err()), ErrorCode::BlockedPair);
    }

    #[test]
    fn unliked_pair_never_matches_again() {
        let (a, b) = ids();
        // Even with the reverse like present, a terminal unlike wins.
        let ctx = LikeContext {
            pair_unliked: true,
            reverse_liked: true,
            ..clean_ctx()
        };
        assert_eq!(code_of(decide_like(a, b, &ctx).unwrap_err()), ErrorCode::PairUnliked);
    }

    #[test]
    fn main_picture_required() {
        let (a, b) = ids();
        let ctx = LikeContext {
            liker_has_main_picture: false,
            ..Default::default()
        };
        assert_eq!(
            code_of(decide_like(a, b, &ctx).unwrap_err()),
            ErrorCode::MissingMainPicture
        );
    }

    #[test]
    fn duplicate_like_rejected() {
        let (a, b) = ids();
        let ctx = LikeContext {
            already_liked: true,
            ..clean_ctx()
        };
        assert_eq!(code_of(decide_like(a, b, &ctx).unwrap_err()), ErrorCode::DuplicateLike);
    }

    #[test]
    fn fame_clamps_at_both_ends() {
        assert_eq!(clamp_fame(47 + LIKE_FAME_DELTA), 50);
        assert_eq!(clamp_fame(50 + MATCH_FAME_DELTA), 50);
        assert_eq!(clamp_fame(-5), 0);
        assert_eq!(clamp_fame(12 + VISIT_FAME_DELTA), 13);
    }
}
