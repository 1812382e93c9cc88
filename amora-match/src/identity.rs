//! Reads against the identity store. Session issuance lives elsewhere; the
//! core only resolves a decoded token to a user row and its presence flag.

use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::SessionUser;
use crate::schema::users;

pub fn session_user(pool: &DbPool, user_id: Uuid) -> AppResult<SessionUser> {
    let mut conn = get_conn(pool)?;
    users::table
        .filter(users::id.eq(user_id))
        .select((users::id, users::username, users::is_online))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::NotFound, "user not found"))
}
