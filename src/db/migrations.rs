//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: request history
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- HISTORY
        -- One row per processed photo (append-only)
        -- ============================================
        CREATE TABLE history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,            -- Telegram user id
            display_name TEXT NOT NULL,
            username TEXT,                       -- Telegram handle, if set
            created_at TEXT NOT NULL,            -- UTC, ISO 8601 with millis
            success INTEGER NOT NULL CHECK(success IN (0, 1)),

            -- Nutrition per serving (NULL unless success = 1)
            food TEXT,
            serving_size REAL,                   -- grams
            fat REAL,                            -- grams
            carbs REAL,                          -- grams
            fiber REAL,                          -- grams
            sugar REAL,                          -- grams
            sodium INTEGER,                      -- milligrams
            potassium INTEGER,                   -- milligrams
            cholesterol INTEGER,                 -- milligrams

            CHECK (success = 0 OR food IS NOT NULL)
        );

        CREATE INDEX idx_history_user_time ON history(user_id, created_at);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version (0 before the first migration)
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let tracked: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'
        )",
        [],
        |row| row.get(0),
    )?;
    if !tracked {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DbError};

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            assert!(needs_migration(conn)?);
            run_migrations(conn)?;
            run_migrations(conn)?;
            assert_eq!(get_schema_version(conn)?, SCHEMA_VERSION);
            assert!(!needs_migration(conn)?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_fresh_database_is_version_zero() {
        let db = Database::in_memory().unwrap();
        let version = db.with_conn(|conn| get_schema_version(conn)).unwrap();
        assert_eq!(version, 0);
    }

    #[test]
    fn test_schema_version_query_errors_are_reported() {
        let db = Database::in_memory().unwrap();
        let result = db.with_conn(|conn| {
            conn.execute("CREATE TABLE schema_migrations (name TEXT)", [])?;
            get_schema_version(conn)
        });
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }
}
