// Like/unlike engine. Each call is one immediate (write-locked) SQLite
// transaction covering the ledger row, the denormalized like_count, the
// karma transaction, and the author's running total, so partial application
// is never visible. Idempotency rests on the UNIQUE (user, subject) index:
// INSERT OR IGNORE turns a concurrent duplicate into the no-op path.
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::{AppError, AppResult};
use crate::forum::domain::{new_id, now_timestamp, LikeOutcome, Subject, UnlikeOutcome};
use crate::forum::users;
use crate::state::DbPool;

/// Author of the subject, or None when the subject does not exist.
fn subject_author(conn: &Connection, subject: &Subject) -> rusqlite::Result<Option<String>> {
    let sql = match subject {
        Subject::Post(_) => "SELECT author_id FROM posts WHERE id = ?1",
        Subject::Comment(_) => "SELECT author_id FROM comments WHERE id = ?1",
    };
    conn.query_row(sql, params![subject.id()], |row| row.get(0))
        .optional()
}

fn counter_table(subject: &Subject) -> &'static str {
    match subject {
        Subject::Post(_) => "posts",
        Subject::Comment(_) => "comments",
    }
}

pub fn like(pool: &DbPool, user_id: &str, subject: &Subject) -> AppResult<LikeOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let author_id = subject_author(&tx, subject)?.ok_or(AppError::NotFound)?;
    if !users::user_exists(&tx, user_id)? {
        return Err(AppError::NotFound);
    }

    let now = now_timestamp();
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO likes (id, user_id, subject_kind, subject_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new_id(), user_id, subject.kind(), subject.id(), now],
    )?;
    if inserted == 0 {
        // Already liked; nothing to account for.
        tx.commit()?;
        return Ok(LikeOutcome { created: false });
    }

    tx.execute(
        &format!(
            "UPDATE {} SET like_count = like_count + 1 WHERE id = ?1",
            counter_table(subject)
        ),
        params![subject.id()],
    )?;

    // Self-likes take the same path; author == liker is not special.
    let amount = subject.karma_reward();
    tx.execute(
        "INSERT INTO karma_transactions
             (id, user_id, amount, transaction_type, subject_kind, subject_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new_id(),
            author_id,
            amount,
            subject.transaction_type(),
            subject.kind(),
            subject.id(),
            now
        ],
    )?;
    tx.execute(
        "UPDATE user_profiles SET total_karma = total_karma + ?1 WHERE user_id = ?2",
        params![amount, author_id],
    )?;

    tx.commit()?;
    tracing::debug!(%subject, user_id, %author_id, amount, "Recorded like");
    Ok(LikeOutcome { created: true })
}

pub fn unlike(pool: &DbPool, user_id: &str, subject: &Subject) -> AppResult<UnlikeOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let author_id = subject_author(&tx, subject)?.ok_or(AppError::NotFound)?;

    let removed = tx.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND subject_kind = ?2 AND subject_id = ?3",
        params![user_id, subject.kind(), subject.id()],
    )?;
    if removed == 0 {
        tx.commit()?;
        return Ok(UnlikeOutcome { removed: false });
    }

    let like_count: i64 = tx.query_row(
        &format!(
            "SELECT like_count FROM {} WHERE id = ?1",
            counter_table(subject)
        ),
        params![subject.id()],
        |row| row.get(0),
    )?;
    if like_count <= 0 {
        // A ledger row existed without a counted like; abort and surface.
        return Err(AppError::InvariantViolation(format!(
            "like_count for {} would go negative",
            subject
        )));
    }
    tx.execute(
        &format!(
            "UPDATE {} SET like_count = like_count - 1 WHERE id = ?1",
            counter_table(subject)
        ),
        params![subject.id()],
    )?;

    // Remove exactly one matching karma transaction: every like credits one
    // row, so one unlike debits one row, never other likers' credits.
    let txn: Option<(String, i64)> = tx
        .query_row(
            "SELECT id, amount FROM karma_transactions
             WHERE user_id = ?1 AND transaction_type = ?2
               AND subject_kind = ?3 AND subject_id = ?4
             ORDER BY created_at, id LIMIT 1",
            params![
                author_id,
                subject.transaction_type(),
                subject.kind(),
                subject.id()
            ],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (txn_id, amount) = txn.ok_or_else(|| {
        AppError::InvariantViolation(format!("like on {} has no karma transaction", subject))
    })?;

    tx.execute(
        "DELETE FROM karma_transactions WHERE id = ?1",
        params![txn_id],
    )?;
    tx.execute(
        "UPDATE user_profiles SET total_karma = total_karma - ?1 WHERE user_id = ?2",
        params![amount, author_id],
    )?;

    tx.commit()?;
    tracing::debug!(%subject, user_id, %author_id, amount, "Removed like");
    Ok(UnlikeOutcome { removed: true })
}

/// Cascade cleanup when a subject is deleted: drop its likes and karma
/// transactions and debit each recipient's total for the removed credits.
pub(crate) fn purge_subject_reactions(
    conn: &Connection,
    subject_kind: &str,
    subject_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM likes WHERE subject_kind = ?1 AND subject_id = ?2",
        params![subject_kind, subject_id],
    )?;

    let debits: Vec<(String, i64)> = {
        let mut stmt = conn.prepare(
            "SELECT user_id, SUM(amount) FROM karma_transactions
             WHERE subject_kind = ?1 AND subject_id = ?2
             GROUP BY user_id",
        )?;
        let rows = stmt
            .query_map(params![subject_kind, subject_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    for (user_id, amount) in debits {
        conn.execute(
            "UPDATE user_profiles SET total_karma = total_karma - ?1 WHERE user_id = ?2",
            params![amount, user_id],
        )?;
    }
    conn.execute(
        "DELETE FROM karma_transactions WHERE subject_kind = ?1 AND subject_id = ?2",
        params![subject_kind, subject_id],
    )?;
    Ok(())
}
