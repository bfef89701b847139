// Database queries: CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::models::{
    AppliedChanges, ChangeSet, InsertOutcome, Post, PostCounts, TrackedAccount, WindowChanges,
};

// --- Scan state ---

/// Get a scan state value by key (e.g., "last_crawl_at:someone").
pub fn get_scan_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM scan_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a scan state value (upsert).
pub fn set_scan_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Tracked accounts ---

/// Add an account to the tracked set. Returns false if it was already tracked.
pub fn register_account(conn: &Connection, account: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO tracked_accounts (account) VALUES (?1)
         ON CONFLICT(account) DO NOTHING",
        params![account],
    )?;
    Ok(changed > 0)
}

pub fn is_tracked(conn: &Connection, account: &str) -> Result<bool> {
    let tracked: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM tracked_accounts WHERE account = ?1",
        params![account],
        |row| row.get(0),
    )?;
    Ok(tracked)
}

/// All tracked accounts, alphabetically.
pub fn tracked_accounts(conn: &Connection) -> Result<Vec<TrackedAccount>> {
    let mut stmt =
        conn.prepare("SELECT account, added_at FROM tracked_accounts ORDER BY account")?;
    let rows = stmt.query_map([], |row| {
        Ok(TrackedAccount {
            account: row.get(0)?,
            added_at: row.get(1)?,
        })
    })?;

    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(row?);
    }
    Ok(accounts)
}

// --- Posts ---

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        post_id: row.get(0)?,
        owner_account: row.get(1)?,
        text: row.get(2)?,
        raw_text: row.get(3)?,
        deleted: row.get(4)?,
        repost_source: row.get(5)?,
    })
}

/// Insert a post unless a row with the same `post_id` already exists.
///
/// The `deleted` flag of the incoming value is ignored; new rows always start
/// live.
pub fn insert_post(conn: &Connection, post: &Post) -> Result<InsertOutcome> {
    let changed = conn.execute(
        "INSERT INTO posts (post_id, owner_account, text, raw_text, deleted, repost_source)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)
         ON CONFLICT(post_id) DO NOTHING",
        params![
            post.post_id,
            post.owner_account,
            post.text,
            post.raw_text,
            post.repost_source,
        ],
    )?;

    Ok(if changed > 0 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::AlreadyExists
    })
}

/// Flag a post as deleted. Returns true only when the flag actually flipped;
/// an already-deleted or unknown post is left alone.
pub fn mark_deleted(conn: &Connection, post_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE posts SET deleted = 1, deleted_at = datetime('now')
         WHERE post_id = ?1 AND deleted = 0",
        params![post_id],
    )?;
    Ok(changed > 0)
}

/// All posts of `account` with `post_id >= min_post_id`, newest first.
pub fn query_posts_since(conn: &Connection, account: &str, min_post_id: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(
        "SELECT post_id, owner_account, text, raw_text, deleted, repost_source
         FROM posts
         WHERE owner_account = ?1 AND post_id >= ?2
         ORDER BY post_id DESC",
    )?;
    let rows = stmt.query_map(params![account, min_post_id], post_from_row)?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

pub fn get_post(conn: &Connection, post_id: i64) -> Result<Option<Post>> {
    let mut stmt = conn.prepare(
        "SELECT post_id, owner_account, text, raw_text, deleted, repost_source
         FROM posts WHERE post_id = ?1",
    )?;
    let post = stmt.query_row(params![post_id], post_from_row).optional()?;
    Ok(post)
}

pub fn post_counts(conn: &Connection, account: &str) -> Result<PostCounts> {
    let counts = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(deleted), 0),
                COALESCE(SUM(repost_source IS NOT NULL), 0)
         FROM posts WHERE owner_account = ?1",
        params![account],
        |row| {
            Ok(PostCounts {
                total: row.get(0)?,
                deleted: row.get(1)?,
                reposts: row.get(2)?,
            })
        },
    )?;
    Ok(counts)
}

/// Apply one reconciliation pass in a single transaction.
///
/// Either every insert and deletion lands or none do.
pub fn apply_changes(conn: &mut Connection, changes: &ChangeSet) -> Result<AppliedChanges> {
    let tx = conn.transaction()?;
    let applied = write_changes(&tx, changes)?;
    tx.commit()?;
    Ok(applied)
}

/// Read the account's window at `boundary_id`, plan against it, and apply the
/// plan, all inside one `BEGIN IMMEDIATE` transaction.
///
/// The write lock is taken before the read, so another process crawling the
/// same database waits instead of planning against a stale window.
pub fn reconcile_window(
    conn: &mut Connection,
    account: &str,
    boundary_id: i64,
    plan: &dyn Fn(&[Post]) -> ChangeSet,
) -> Result<WindowChanges> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let window = query_posts_since(&tx, account, boundary_id)?;
    let changes = plan(&window);
    let applied = write_changes(&tx, &changes)?;
    tx.commit()?;

    Ok(WindowChanges {
        window_size: window.len(),
        applied,
    })
}

fn write_changes(conn: &Connection, changes: &ChangeSet) -> Result<AppliedChanges> {
    let mut applied = AppliedChanges::default();

    for post in &changes.inserts {
        match insert_post(conn, post)? {
            InsertOutcome::Inserted => applied.inserted += 1,
            InsertOutcome::AlreadyExists => applied.already_present += 1,
        }
    }

    for &post_id in &changes.deletions {
        if mark_deleted(conn, post_id)? {
            applied.marked_deleted += 1;
        }
    }

    Ok(applied)
}
