// User accounts and their 1:1 karma profiles. No authentication here: the
// request layer names the acting user and this module only guarantees the
// rows exist.
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::forum::domain::{new_id, now_timestamp, User, UserProfile};
use crate::state::DbPool;

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Look up a user by name, creating the user and an empty profile on first
/// sight. Returns the user and whether it was created.
pub fn get_or_create_user(pool: &DbPool, username: &str) -> AppResult<(User, bool)> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("username is required".into()));
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = tx
        .query_row(
            "SELECT id, username, created_at FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        )
        .optional()?;

    if let Some(user) = existing {
        tx.commit()?;
        return Ok((user, false));
    }

    let user = User {
        id: new_id(),
        username: username.to_string(),
        created_at: now_timestamp(),
    };
    tx.execute(
        "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
        params![user.id, user.username, user.created_at],
    )?;
    tx.execute(
        "INSERT INTO user_profiles (user_id, total_karma, created_at) VALUES (?1, 0, ?2)",
        params![user.id, user.created_at],
    )?;
    tx.commit()?;

    tracing::info!(user_id = %user.id, username = %user.username, "Created user");
    Ok((user, true))
}

pub fn get_user(pool: &DbPool, id: &str) -> AppResult<User> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT id, username, created_at FROM users WHERE id = ?1",
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

pub fn get_profile(pool: &DbPool, user_id: &str) -> AppResult<UserProfile> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT user_id, total_karma, created_at FROM user_profiles WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(UserProfile {
                user_id: row.get(0)?,
                total_karma: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// Usernames of everyone who commented on the post, keyed by user id.
/// One joined query so tree rendering never looks users up row by row.
pub fn comment_author_usernames(
    pool: &DbPool,
    post_id: &str,
) -> AppResult<HashMap<String, String>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT DISTINCT u.id, u.username
         FROM users u
         JOIN comments c ON c.author_id = u.id
         WHERE c.post_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![post_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

/// Within-transaction existence check used by the mutating operations.
pub(crate) fn user_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}
