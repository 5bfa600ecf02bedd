pub mod models;
pub mod store;

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::password::hash_password;
use crate::state::DbPool;

/// Placeholder avatar used when registration supplies no image or the
/// upload gateway fails.
pub const DEFAULT_AVATAR_URL: &str = "https://i.ibb.co/0jQjZfV/default-avatar.jpg";

/// Bootstrap account inserted on first start, for manual testing.
pub const SEED_PHONE: &str = "7777777777";
pub const SEED_PASSWORD: &str = "123456";
const SEED_NAME: &str = "Admin";

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::builder().max_size(8).build(manager)?;

    // Configure SQLite for performance
    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    Ok(pool)
}

/// Apply pending migrations and make sure the seed user exists.
/// Safe to call on every process start.
pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
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

    let seed_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE phone = ?1",
        params![SEED_PHONE],
        |row| row.get(0),
    )?;

    if !seed_exists {
        conn.execute(
            "INSERT INTO users (id, name, phone, password_hash, avatar, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid::Uuid::new_v4().to_string(),
                SEED_NAME,
                SEED_PHONE,
                hash_password(SEED_PASSWORD),
                DEFAULT_AVATAR_URL,
                now_timestamp(),
            ],
        )?;
        tracing::info!("Created seed user (phone {})", SEED_PHONE);
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// RFC 3339 UTC with millisecond precision, so the TEXT column sorts
/// chronologically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> DbPool {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        pool.get()
            .unwrap()
            .execute_batch("PRAGMA journal_mode = WAL;")
            .unwrap();
        pool
    }

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
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
    fn migrations_create_all_tables() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
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
        assert!(tables.contains(&"posts".to_string()));
        assert!(tables.contains(&"likes".to_string()));
        assert!(tables.contains(&"comments".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn migrations_are_idempotent() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap(); // Should not error on second run

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn seed_user_is_created_exactly_once() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE phone = ?1",
                params![SEED_PHONE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn seed_user_digest_matches_hash_of_seed_password() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let stored: String = conn
            .query_row(
                "SELECT password_hash FROM users WHERE phone = ?1",
                params![SEED_PHONE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, hash_password(SEED_PASSWORD));
    }

    #[test]
    fn duplicate_phone_insert_violates_constraint() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO users (id, name, phone, password_hash, avatar, created_at)
             VALUES ('x', 'Clone', ?1, 'digest', 'url', ?2)",
            params![SEED_PHONE, now_timestamp()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_timestamp();
        assert!(a < b);
    }
}
