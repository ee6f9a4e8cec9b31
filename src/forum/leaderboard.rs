// Read-side rollup of the karma ledger over a trailing window. No state of
// its own: ranking is recomputed from karma_transactions on every call.
use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::DbPool;

pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub karma: i64,
}

fn window_cutoff(window: Duration) -> String {
    (Utc::now() - window).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Top `limit` users by karma earned since `now - window`. Users whose
/// windowed sum is zero (or who earned nothing in the window) are left out.
pub fn top_karma_earners(
    pool: &DbPool,
    window: Duration,
    limit: usize,
) -> AppResult<Vec<LeaderboardEntry>> {
    let cutoff = window_cutoff(window);
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT k.user_id, u.username, SUM(k.amount) AS karma
         FROM karma_transactions k
         JOIN users u ON u.id = k.user_id
         WHERE k.created_at >= ?1
         GROUP BY k.user_id
         HAVING karma != 0
         ORDER BY karma DESC, u.username
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![cutoff, limit as i64], |row| {
            Ok(LeaderboardEntry {
                user_id: row.get(0)?,
                username: row.get(1)?,
                karma: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Karma one user earned inside the window; 0 when there are no
/// transactions.
pub fn karma_in_window(pool: &DbPool, user_id: &str, window: Duration) -> AppResult<i64> {
    let cutoff = window_cutoff(window);
    let conn = pool.get()?;
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM karma_transactions
         WHERE user_id = ?1 AND created_at >= ?2",
        params![user_id, cutoff],
        |row| row.get(0),
    )?;
    Ok(sum)
}
