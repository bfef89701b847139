// Data models: Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use serde::{Deserialize, Serialize};

/// One post as it appeared in a tracked account's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// The account whose feed the post appeared in
    pub owner_account: String,
    /// Body with tags stripped and entities decoded
    pub text: String,
    /// Body with markup preserved, exactly as captured
    pub raw_text: String,
    pub post_id: i64,
    pub deleted: bool,
    /// Original author when this is a repost, `None` for original posts
    pub repost_source: Option<String>,
}

impl Post {
    /// True when the post was authored by the account it was found under.
    pub fn is_original(&self) -> bool {
        self.repost_source.is_none()
    }
}

/// A tracked account and when it was registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub account: String,
    pub added_at: String,
}

/// Result of an insert-if-absent on the posts table.
///
/// `AlreadyExists` is the normal outcome for a repost that was recorded on an
/// earlier crawl and now sits below the comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// The writes one reconciliation pass wants to make, applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub inserts: Vec<Post>,
    pub deletions: Vec<i64>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletions.is_empty()
    }
}

/// What actually changed when a `ChangeSet` was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChanges {
    pub inserted: usize,
    pub already_present: usize,
    pub marked_deleted: usize,
}

/// Result of a store-side window reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowChanges {
    /// Stored posts at or above the boundary when the window was read
    pub window_size: usize,
    pub applied: AppliedChanges,
}

/// Per-account row counts for the status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCounts {
    pub total: i64,
    pub deleted: i64,
    pub reposts: i64,
}
