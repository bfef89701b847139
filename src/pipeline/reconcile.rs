// Reconciliation: decide which fetched posts are new and which stored posts
// have disappeared from the feed.
//
// Reposts carry the original author's id, which can be arbitrarily old, so
// the feed window is bounded by the oldest *original* post in the batch.
// Only stored posts at or above that id are compared against the batch;
// anything older may simply have scrolled out of the pages we fetched.

use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::models::{AppliedChanges, ChangeSet, Post};
use crate::db::Database;

/// Why a reconciliation pass made no changes at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// The batch had only reposts, so there is no trustworthy window.
    NoOriginalPost,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::NoOriginalPost => write!(f, "no original post in fetched batch"),
        }
    }
}

/// What one applied reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub boundary_id: i64,
    /// Stored posts at or above the boundary
    pub window_size: usize,
    pub applied: AppliedChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(ReconcileSummary),
    Aborted(AbortReason),
}

/// Smallest id among the original (non-repost) posts in the batch.
pub fn boundary_id(fetched: &[Post]) -> Option<i64> {
    // Feed order is newest first, so walk it backwards
    fetched
        .iter()
        .rev()
        .filter(|p| p.is_original())
        .map(|p| p.post_id)
        .min()
}

/// Work out the inserts and deletions for a batch against the stored window.
///
/// `stored_window` must already be limited to the account's posts with
/// `post_id >= boundary_id`.
pub fn plan_changes(fetched: &[Post], stored_window: &[Post]) -> ChangeSet {
    let stored_ids: HashSet<i64> = stored_window.iter().map(|p| p.post_id).collect();
    let fetched_ids: HashSet<i64> = fetched.iter().map(|p| p.post_id).collect();

    let mut queued = HashSet::new();
    let inserts = fetched
        .iter()
        .filter(|p| !stored_ids.contains(&p.post_id))
        .filter(|p| queued.insert(p.post_id))
        .cloned()
        .collect();

    let deletions = stored_window
        .iter()
        .filter(|p| !p.deleted && !fetched_ids.contains(&p.post_id))
        .map(|p| p.post_id)
        .collect();

    ChangeSet { inserts, deletions }
}

/// Compare `fetched` with the stored window starting at `boundary_id` and
/// apply the result.
///
/// The window read and the writes run in one store transaction, so a cycle
/// in another process can't change the window between plan and apply.
/// Callers running cycles concurrently in this process still hold the
/// account's lock for the duration of this call.
pub async fn reconcile_window(
    db: &dyn Database,
    account: &str,
    boundary_id: i64,
    fetched: &[Post],
) -> Result<ReconcileSummary> {
    let plan = |stored_window: &[Post]| {
        let changes = plan_changes(fetched, stored_window);
        debug!(
            account = account,
            boundary_id,
            window = stored_window.len(),
            inserts = changes.inserts.len(),
            deletions = changes.deletions.len(),
            "Planned reconciliation"
        );
        changes
    };
    let window = db.reconcile_window(account, boundary_id, &plan).await?;

    if window.applied.marked_deleted > 0 {
        info!(
            account = account,
            deleted = window.applied.marked_deleted,
            "Posts disappeared from feed"
        );
    }

    Ok(ReconcileSummary {
        boundary_id,
        window_size: window.window_size,
        applied: window.applied,
    })
}

/// Reconcile a freshly fetched batch for `account` against the store.
///
/// Returns `Aborted` without touching the store when the batch has no
/// original post.
pub async fn reconcile(
    db: &dyn Database,
    account: &str,
    fetched: &[Post],
) -> Result<ReconcileOutcome> {
    let Some(boundary) = boundary_id(fetched) else {
        warn!(
            account = account,
            fetched = fetched.len(),
            "No original post in batch, skipping reconciliation"
        );
        return Ok(ReconcileOutcome::Aborted(AbortReason::NoOriginalPost));
    };

    let summary = reconcile_window(db, account, boundary, fetched).await?;
    Ok(ReconcileOutcome::Applied(summary))
}
