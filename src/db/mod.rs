use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::state::DbPool;

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go through with_init so every pooled connection gets them,
    // not just the first one handed out.
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_pool() -> (TempDir, DbPool) {
        let tmp = TempDir::new().unwrap();
        let pool = create_pool(&tmp.path().join("test.db")).unwrap();
        run_migrations(&pool).unwrap();
        (tmp, pool)
    }

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path).unwrap();
        assert!(db_path.exists());
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn migrations_run_successfully() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"user_profiles".to_string()));
        assert!(tables.contains(&"posts".to_string()));
        assert!(tables.contains(&"comments".to_string()));
        assert!(tables.contains(&"likes".to_string()));
        assert!(tables.contains(&"karma_transactions".to_string()));
    }

    #[test]
    fn migrations_are_idempotent() {
        let (_tmp, pool) = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn like_triple_is_unique() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, created_at)
             VALUES ('u1', 'alice', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO likes (id, user_id, subject_kind, subject_id, created_at)
             VALUES ('l1', 'u1', 'post', 'p1', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO likes (id, user_id, subject_kind, subject_id, created_at)
             VALUES ('l2', 'u1', 'post', 'p1', '2026-01-01T00:00:01.000000Z')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn foreign_keys_enforced() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO posts (id, author_id, content, created_at, updated_at)
             VALUES ('post-1', 'nonexistent-user', 'hello',
                     '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn negative_like_count_rejected() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, created_at)
             VALUES ('u1', 'alice', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO posts (id, author_id, content, like_count, created_at, updated_at)
             VALUES ('p1', 'u1', 'hi', -1,
                     '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());
    }
}
