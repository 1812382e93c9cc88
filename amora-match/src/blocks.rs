//! Directed block pairs, checked symmetrically everywhere they matter.

use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::NewBlock;
use crate::schema::{blocks, users};

#[derive(Debug, Serialize)]
pub struct BlockedUser {
    pub id: Uuid,
    pub username: String,
}

/// Insert a block; already-blocked pairs are a no-op.
pub fn block(pool: &DbPool, blocker: Uuid, blocked: Uuid) -> AppResult<()> {
    if blocker == blocked {
        return Err(AppError::new(
            ErrorCode::InvalidTarget,
            "you cannot block yourself",
        ));
    }

    let mut conn = get_conn(pool)?;
    diesel::insert_into(blocks::table)
        .values(&NewBlock {
            blocker_id: blocker,
            blocked_id: blocked,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    tracing::info!(blocker = %blocker, blocked = %blocked, "user blocked");
    Ok(())
}

/// Remove blocks the caller placed on the given users.
pub fn unblock(pool: &DbPool, blocker: Uuid, blocked_ids: &[Uuid]) -> AppResult<usize> {
    let mut conn = get_conn(pool)?;
    let removed = diesel::delete(
        blocks::table
            .filter(blocks::blocker_id.eq(blocker))
            .filter(blocks::blocked_id.eq_any(blocked_ids)),
    )
    .execute(&mut conn)?;
    Ok(removed)
}

/// The users blocked by the caller, with usernames for display.
pub fn blocked_users(pool: &DbPool, blocker: Uuid) -> AppResult<Vec<BlockedUser>> {
    let mut conn = get_conn(pool)?;
    let rows: Vec<(Uuid, String)> = blocks::table
        .inner_join(users::table.on(users::id.eq(blocks::blocked_id)))
        .filter(blocks::blocker_id.eq(blocker))
        .select((users::id, users::username))
        .load(&mut conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, username)| BlockedUser { id, username })
        .collect())
}

/// Whether either user has blocked the other.
pub fn are_blocked(pool: &DbPool, a: Uuid, b: Uuid) -> AppResult<bool> {
    let mut conn = get_conn(pool)?;
    are_blocked_conn(&mut conn, a, b).map_err(AppError::Database)
}

pub(crate) fn are_blocked_conn(conn: &mut PgConnection, a: Uuid, b: Uuid) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(blocks::table.filter(
        (blocks::blocker_id.eq(a).and(blocks::blocked_id.eq(b)))
            .or(blocks::blocker_id.eq(b).and(blocks::blocked_id.eq(a))),
    )))
    .get_result(conn)
}
