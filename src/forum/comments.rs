// Nested-set comment tree. Every comment carries an interval (lft, rgt)
// on a number line private to its post, plus its depth. A node's subtree
// is exactly the rows with lft/rgt inside its interval, so "all replies,
// recursively" is one ordered range scan. Inserts carve the new interval
// out of the parent's right boundary and shift everything to the right of
// it; the immediate transaction serializes those shifts per writer.
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::error::{AppError, AppResult};
use crate::forum::domain::{new_id, now_timestamp, Comment};
use crate::forum::{reactions, users};
use crate::state::DbPool;

const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, parent_id, content, like_count, lft, rgt, depth, created_at, updated_at";

pub(crate) fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        parent_id: row.get(3)?,
        content: row.get(4)?,
        like_count: row.get(5)?,
        lft: row.get(6)?,
        rgt: row.get(7)?,
        depth: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub fn create_comment(
    pool: &DbPool,
    post_id: &str,
    author_id: &str,
    parent_id: Option<&str>,
    content: &str,
) -> AppResult<Comment> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("content is required".into()));
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let post_exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    if !post_exists {
        return Err(AppError::NotFound);
    }
    if !users::user_exists(&tx, author_id)? {
        return Err(AppError::NotFound);
    }

    let (lft, rgt, depth) = match parent_id {
        Some(pid) => {
            let parent: Option<(String, i64, i64)> = tx
                .query_row(
                    "SELECT post_id, rgt, depth FROM comments WHERE id = ?1",
                    params![pid],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let (parent_post, parent_rgt, parent_depth) = parent.ok_or(AppError::NotFound)?;
            if parent_post != post_id {
                return Err(AppError::ParentMismatch);
            }

            // Open a two-unit gap at the parent's right boundary. The
            // parent's own rgt grows with the first update, so the new
            // child lands as its last child (creation order among
            // siblings).
            tx.execute(
                "UPDATE comments SET rgt = rgt + 2 WHERE post_id = ?1 AND rgt >= ?2",
                params![post_id, parent_rgt],
            )?;
            tx.execute(
                "UPDATE comments SET lft = lft + 2 WHERE post_id = ?1 AND lft >= ?2",
                params![post_id, parent_rgt],
            )?;
            (parent_rgt, parent_rgt + 1, parent_depth + 1)
        }
        None => {
            // Roots append at the end of the post's number line.
            let max_rgt: i64 = tx.query_row(
                "SELECT COALESCE(MAX(rgt), 0) FROM comments WHERE post_id = ?1",
                params![post_id],
                |row| row.get(0),
            )?;
            (max_rgt + 1, max_rgt + 2, 0)
        }
    };

    let now = now_timestamp();
    let comment = Comment {
        id: new_id(),
        post_id: post_id.to_string(),
        author_id: author_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        content: content.to_string(),
        like_count: 0,
        lft,
        rgt,
        depth,
        created_at: now.clone(),
        updated_at: now,
    };
    tx.execute(
        "INSERT INTO comments
             (id, post_id, author_id, parent_id, content, like_count,
              lft, rgt, depth, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10)",
        params![
            comment.id,
            comment.post_id,
            comment.author_id,
            comment.parent_id,
            comment.content,
            comment.lft,
            comment.rgt,
            comment.depth,
            comment.created_at,
            comment.updated_at
        ],
    )?;
    tx.commit()?;

    tracing::info!(comment_id = %comment.id, post_id, depth, "Created comment");
    Ok(comment)
}

pub fn get_comment(pool: &DbPool, id: &str) -> AppResult<Comment> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
        params![id],
        comment_from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// The comment plus all of its descendants in document (pre-order) order.
pub fn subtree(pool: &DbPool, comment_id: &str) -> AppResult<Vec<Comment>> {
    let conn = pool.get()?;
    // The root's bounds and the range scan resolve inside one statement,
    // so an insert committing in between cannot shift the intervals out
    // from under the scan.
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments
         WHERE post_id = (SELECT post_id FROM comments WHERE id = ?1)
           AND lft >= (SELECT lft FROM comments WHERE id = ?1)
           AND rgt <= (SELECT rgt FROM comments WHERE id = ?1)
         ORDER BY lft"
    ))?;
    let rows = stmt
        .query_map(params![comment_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    // A live comment always matches itself, so no rows means no comment.
    if rows.is_empty() {
        return Err(AppError::NotFound);
    }
    Ok(rows)
}

/// Top-level comments of a post in creation order.
pub fn root_comments(pool: &DbPool, post_id: &str) -> AppResult<Vec<Comment>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments
         WHERE post_id = ?1 AND parent_id IS NULL
         ORDER BY created_at, id"
    ))?;
    let rows = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every comment of the post in document order, for rendering the full
/// tree in one pass.
pub fn post_comments(pool: &DbPool, post_id: &str) -> AppResult<Vec<Comment>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 ORDER BY lft"
    ))?;
    let rows = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a comment and its whole subtree, close the interval gap, and
/// cascade to the subtree's likes and karma transactions.
pub fn delete_comment(pool: &DbPool, id: &str) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let node: Option<(String, i64, i64)> = tx
        .query_row(
            "SELECT post_id, lft, rgt FROM comments WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let (post_id, lft, rgt) = node.ok_or(AppError::NotFound)?;

    let subtree_ids: Vec<String> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM comments WHERE post_id = ?1 AND lft >= ?2 AND rgt <= ?3",
        )?;
        let ids = stmt
            .query_map(params![post_id, lft, rgt], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    for cid in &subtree_ids {
        reactions::purge_subject_reactions(&tx, "comment", cid)?;
    }

    tx.execute(
        "DELETE FROM comments WHERE post_id = ?1 AND lft >= ?2 AND rgt <= ?3",
        params![post_id, lft, rgt],
    )?;

    let width = rgt - lft + 1;
    tx.execute(
        "UPDATE comments SET lft = lft - ?1 WHERE post_id = ?2 AND lft > ?3",
        params![width, post_id, rgt],
    )?;
    tx.execute(
        "UPDATE comments SET rgt = rgt - ?1 WHERE post_id = ?2 AND rgt > ?3",
        params![width, post_id, rgt],
    )?;
    tx.commit()?;

    tracing::info!(comment_id = %id, n_removed = subtree_ids.len(), "Deleted comment subtree");
    Ok(())
}
