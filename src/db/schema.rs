// Database schema: table creation.
//
// A `schema_version` table records which schema the file was created with so
// later migrations have something to key off.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent and safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Accounts whose feeds are crawled
        CREATE TABLE IF NOT EXISTS tracked_accounts (
            account TEXT PRIMARY KEY NOT NULL,
            added_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Every post ever observed. Rows are never removed, only flagged.
        CREATE TABLE IF NOT EXISTS posts (
            post_id INTEGER PRIMARY KEY NOT NULL,   -- platform id, globally unique
            owner_account TEXT NOT NULL,            -- feed the post appeared in
            text TEXT NOT NULL,                     -- tags stripped, entities decoded
            raw_text TEXT NOT NULL,                 -- markup as captured
            deleted INTEGER NOT NULL DEFAULT 0,
            repost_source TEXT DEFAULT NULL,        -- original author for reposts
            first_seen_at TEXT NOT NULL DEFAULT (datetime('now')),
            deleted_at TEXT DEFAULT NULL
        );

        -- Scan state: last crawl time and outcome per account
        CREATE TABLE IF NOT EXISTS scan_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Window queries: owner_account = ? AND post_id >= ?
        CREATE INDEX IF NOT EXISTS idx_posts_owner_id
            ON posts(owner_account, post_id);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
