use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::error::{AppError, AppResult};
use crate::forum::domain::{new_id, now_timestamp, Post};
use crate::forum::{reactions, users};
use crate::state::DbPool;

pub(crate) fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        content: row.get(2)?,
        like_count: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const POST_COLUMNS: &str = "id, author_id, content, like_count, created_at, updated_at";

pub fn create_post(pool: &DbPool, author_id: &str, content: &str) -> AppResult<Post> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("content is required".into()));
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !users::user_exists(&tx, author_id)? {
        return Err(AppError::NotFound);
    }

    let now = now_timestamp();
    let post = Post {
        id: new_id(),
        author_id: author_id.to_string(),
        content: content.to_string(),
        like_count: 0,
        created_at: now.clone(),
        updated_at: now,
    };
    tx.execute(
        "INSERT INTO posts (id, author_id, content, like_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5)",
        params![
            post.id,
            post.author_id,
            post.content,
            post.created_at,
            post.updated_at
        ],
    )?;
    tx.commit()?;

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "Created post");
    Ok(post)
}

pub fn get_post(pool: &DbPool, id: &str) -> AppResult<Post> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        params![id],
        post_from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// Newest-first listing, each post paired with its author's username and
/// its comment count. One query; usernames come from the join rather than
/// a lookup per row.
pub fn list_posts(pool: &DbPool) -> AppResult<Vec<(Post, String, i64)>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.author_id, p.content, p.like_count, p.created_at, p.updated_at,
                u.username,
                (SELECT COUNT(*) FROM comments WHERE comments.post_id = p.id)
         FROM posts p
         JOIN users u ON u.id = p.author_id
         ORDER BY p.created_at DESC, p.id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((post_from_row(row)?, row.get(6)?, row.get(7)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a post, its comment tree, and every like and karma transaction
/// pointing at any of them. Authors' karma totals are debited for the
/// deleted transactions so totals keep matching the remaining ledger.
pub fn delete_post(pool: &DbPool, id: &str) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(AppError::NotFound);
    }

    let comment_ids: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM comments WHERE post_id = ?1")?;
        let ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };

    reactions::purge_subject_reactions(&tx, "post", id)?;
    for cid in &comment_ids {
        reactions::purge_subject_reactions(&tx, "comment", cid)?;
    }

    // Comments go with the post via ON DELETE CASCADE.
    tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    tx.commit()?;

    tracing::info!(post_id = %id, n_comments = comment_ids.len(), "Deleted post");
    Ok(())
}
