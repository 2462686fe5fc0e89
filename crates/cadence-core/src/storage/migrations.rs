//! Database schema migrations for cadence.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: source records owned by the CRUD layer.
///
/// - intervals: events, tasks, breaks and travel blocks
/// - break_preferences / wind_down_settings: one row per owner
/// - habit_entries: one row per (habit, date)
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS intervals (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL,
            kind        TEXT NOT NULL,
            title       TEXT NOT NULL,
            start_time  TEXT NOT NULL,
            end_time    TEXT NOT NULL,
            location    TEXT,
            tags        TEXT NOT NULL DEFAULT '[]',
            priority    INTEGER,
            protected   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_intervals_owner_start ON intervals(owner_id, start_time);
        CREATE INDEX IF NOT EXISTS idx_intervals_owner_kind_start ON intervals(owner_id, kind, start_time);

        CREATE TABLE IF NOT EXISTS break_preferences (
            owner_id          TEXT PRIMARY KEY,
            interval_minutes  INTEGER NOT NULL,
            duration_minutes  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wind_down_settings (
            owner_id                    TEXT PRIMARY KEY,
            sleep_time                  TEXT NOT NULL,
            wind_down_duration_minutes  INTEGER NOT NULL,
            is_active                   INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS habit_entries (
            habit_id   TEXT NOT NULL,
            date       TEXT NOT NULL,
            completed  INTEGER NOT NULL,
            notes      TEXT,
            UNIQUE (habit_id, date)
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: derived snapshot records.
///
/// - burnout_analyses / daily_summaries: one row per (owner, date)
/// - polls and poll_votes: one vote row per (poll, voter)
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS burnout_analyses (
            owner_id         TEXT NOT NULL,
            date             TEXT NOT NULL,
            risk_score       REAL NOT NULL,
            risk_level       TEXT NOT NULL,
            factors          TEXT NOT NULL DEFAULT '[]',
            recommendations  TEXT NOT NULL DEFAULT '[]',
            UNIQUE (owner_id, date)
        );

        CREATE TABLE IF NOT EXISTS daily_summaries (
            owner_id  TEXT NOT NULL,
            date      TEXT NOT NULL,
            content   TEXT NOT NULL,
            stats     TEXT NOT NULL,
            UNIQUE (owner_id, date)
        );

        CREATE TABLE IF NOT EXISTS polls (
            id                TEXT PRIMARY KEY,
            organizer_id      TEXT NOT NULL,
            title             TEXT NOT NULL,
            time_slots        TEXT NOT NULL,
            duration_minutes  INTEGER NOT NULL,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS poll_votes (
            poll_id          TEXT NOT NULL,
            voter_id         TEXT NOT NULL,
            preferred_slots  TEXT NOT NULL,
            voted_at         TEXT NOT NULL,
            UNIQUE (poll_id, voter_id)
        );",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);

        for table in [
            "intervals",
            "break_preferences",
            "wind_down_settings",
            "habit_entries",
            "burnout_analyses",
            "daily_summaries",
            "polls",
            "poll_votes",
        ] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO habit_entries (habit_id, date, completed) VALUES ('h1', '2026-01-01', 1)",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), 2);
        let kept: i32 = conn
            .query_row("SELECT COUNT(*) FROM habit_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kept, 1);
        conn.prepare("SELECT poll_id, voter_id FROM poll_votes").unwrap();
    }

    #[test]
    fn test_unique_keys_reject_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO habit_entries (habit_id, date, completed) VALUES ('h1', '2026-01-01', 1)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO habit_entries (habit_id, date, completed) VALUES ('h1', '2026-01-01', 0)",
            [],
        );
        assert!(dup.is_err());
    }
}
