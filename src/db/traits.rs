// Database trait: backend-agnostic async interface for all DB operations.
//
// Implementor: SqliteDatabase (wraps rusqlite). Methods are async so a sync
// backend behind a Mutex and a natively async one fit the same interface.
//
// The trait mirrors the queries.rs function signatures one-to-one.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    AppliedChanges, ChangeSet, InsertOutcome, Post, PostCounts, TrackedAccount, WindowChanges,
};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Scan state ---

    /// Get a scan state value by key.
    async fn get_scan_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a scan state value (upsert).
    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Tracked accounts ---

    /// Add an account to the tracked set. Returns false if already tracked.
    async fn register_account(&self, account: &str) -> Result<bool>;

    async fn is_tracked(&self, account: &str) -> Result<bool>;

    async fn tracked_accounts(&self) -> Result<Vec<TrackedAccount>>;

    // --- Posts ---

    /// Insert a post unless its `post_id` is already stored.
    async fn insert_post(&self, post: &Post) -> Result<InsertOutcome>;

    /// Flag a post deleted. Returns true only if the flag changed.
    async fn mark_deleted(&self, post_id: i64) -> Result<bool>;

    /// Posts of `account` with `post_id >= min_post_id`, newest first.
    async fn query_posts_since(&self, account: &str, min_post_id: i64) -> Result<Vec<Post>>;

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>>;

    async fn post_counts(&self, account: &str) -> Result<PostCounts>;

    /// Apply inserts and deletions together in one transaction.
    async fn apply_changes(&self, changes: &ChangeSet) -> Result<AppliedChanges>;

    /// Read the account's posts at or above `boundary_id`, hand them to
    /// `plan`, and apply the returned changes. The read and the writes share
    /// one write transaction, so no other writer can slip in between.
    async fn reconcile_window(
        &self,
        account: &str,
        boundary_id: i64,
        plan: &(dyn for<'p> Fn(&'p [Post]) -> ChangeSet + Sync),
    ) -> Result<WindowChanges>;
}
