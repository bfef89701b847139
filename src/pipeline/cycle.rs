// Crawl cycle: fetch every page for an account, then reconcile.
//
// A cycle moves Fetching → Bounding → Diffing → Done. It ends Aborted when
// the batch has no original post and Failed on a transport or store error.
// Store writes only happen in Diffing, after every page has arrived, so an
// aborted, failed, or cancelled cycle leaves the store untouched.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::reconcile::{self, ReconcileOutcome, ReconcileSummary};
use crate::db::Database;
use crate::error::CycleError;
use crate::feed::{fetch_pages, FeedTransport, PostExtractor};

/// Where a cycle is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    Fetching,
    Bounding,
    Diffing,
    Done,
    Aborted,
    Failed,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Fetching => "fetching",
            CycleState::Bounding => "bounding",
            CycleState::Diffing => "diffing",
            CycleState::Done => "done",
            CycleState::Aborted => "aborted",
            CycleState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything worth knowing about a finished cycle. Stored as JSON in
/// scan state so `status` can show it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub account: String,
    /// Terminal state: Done, Aborted or Failed
    pub state: CycleState,
    pub pages_fetched: u32,
    pub posts_fetched: usize,
    pub malformed_blocks: usize,
    pub summary: Option<ReconcileSummary>,
    /// Abort reason or error message
    pub detail: Option<String>,
    pub finished_at: String,
}

/// Process exit status for a batch of cycles: 1 if any failed, 2 if any
/// aborted, 0 otherwise.
pub fn exit_code(reports: &[CycleReport]) -> u8 {
    if reports.iter().any(|r| r.state == CycleState::Failed) {
        1
    } else if reports.iter().any(|r| r.state == CycleState::Aborted) {
        2
    } else {
        0
    }
}

/// One async mutex per account, so two cycles never interleave their window
/// read and their writes for the same account.
#[derive(Default)]
pub struct AccountLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub async fn lock(&self, account: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(account.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Runs crawl cycles against one store and one feed transport.
pub struct Crawler {
    db: Arc<dyn Database>,
    transport: Arc<dyn FeedTransport>,
    extractor: PostExtractor,
    base_url: String,
    locks: AccountLocks,
}

impl Crawler {
    pub fn new(
        db: Arc<dyn Database>,
        transport: Arc<dyn FeedTransport>,
        extractor: PostExtractor,
        base_url: &str,
    ) -> Self {
        Self {
            db,
            transport,
            extractor,
            base_url: base_url.trim_end_matches('/').to_string(),
            locks: AccountLocks::default(),
        }
    }

    /// Run one cycle for `account`, fetching up to `pages` pages.
    ///
    /// The returned report is `Done` or `Aborted`; failures come back as
    /// errors and leave the store untouched.
    pub async fn run_cycle(&self, account: &str, pages: u32) -> Result<CycleReport, CycleError> {
        if !self.db.is_tracked(account).await? {
            return Err(CycleError::UntrackedAccount(account.to_string()));
        }

        transition(account, CycleState::Fetching);
        let feed = fetch_pages(
            self.transport.as_ref(),
            &self.extractor,
            &self.base_url,
            account,
            pages,
        )
        .await?;

        let mut report = CycleReport {
            account: account.to_string(),
            state: CycleState::Bounding,
            pages_fetched: feed.pages_fetched,
            posts_fetched: feed.posts.len(),
            malformed_blocks: feed.malformed_blocks,
            summary: None,
            detail: None,
            finished_at: String::new(),
        };

        // Bounding and Diffing both happen inside `reconcile`, under the
        // account lock. An abort there leaves the store untouched.
        transition(account, CycleState::Bounding);
        let outcome = {
            let _guard = self.locks.lock(account).await;
            reconcile::reconcile(self.db.as_ref(), account, &feed.posts).await?
        };

        match outcome {
            ReconcileOutcome::Applied(summary) => {
                transition(account, CycleState::Done);
                info!(
                    account = account,
                    pages = report.pages_fetched,
                    inserted = summary.applied.inserted,
                    deleted = summary.applied.marked_deleted,
                    "Crawl cycle complete"
                );
                report.state = CycleState::Done;
                report.summary = Some(summary);
            }
            ReconcileOutcome::Aborted(reason) => {
                transition(account, CycleState::Aborted);
                report.state = CycleState::Aborted;
                report.detail = Some(reason.to_string());
            }
        }

        report.finished_at = chrono::Utc::now().to_rfc3339();
        Ok(report)
    }

    /// Run a cycle, turning any error into a `Failed` report, and record the
    /// result in scan state.
    pub async fn crawl(&self, account: &str, pages: u32) -> CycleReport {
        let report = match self.run_cycle(account, pages).await {
            Ok(report) => report,
            // Nothing to record for an account we don't track
            Err(e @ CycleError::UntrackedAccount(_)) => return failed_report(account, e),
            Err(e) => {
                warn!(account = account, error = %e, "Crawl cycle failed");
                failed_report(account, e)
            }
        };

        self.record(&report).await;
        report
    }

    async fn record(&self, report: &CycleReport) {
        let result = async {
            let json = serde_json::to_string(report)?;
            self.db
                .set_scan_state(&last_crawl_key(&report.account), &report.finished_at)
                .await?;
            self.db
                .set_scan_state(&last_outcome_key(&report.account), &json)
                .await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(account = %report.account, error = %e, "Failed to record crawl outcome");
        }
    }

    /// Crawl several accounts, at most `concurrency` at a time.
    ///
    /// Reports come back in completion order.
    pub async fn crawl_many(
        &self,
        accounts: &[String],
        pages: u32,
        concurrency: usize,
    ) -> Vec<CycleReport> {
        let pb = if accounts.len() > 1 {
            let pb = ProgressBar::new(accounts.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Crawling [{bar:30}] {pos}/{len} ({eta})")
                    .unwrap(),
            );
            Some(pb)
        } else {
            None
        };

        let reports: Vec<CycleReport> = stream::iter(accounts.iter().map(|account| {
            let pb = pb.clone();
            async move {
                let report = self.crawl(account, pages).await;
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                report
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        reports
    }
}

fn transition(account: &str, state: CycleState) {
    debug!(account = account, state = %state, "Cycle state");
}

fn failed_report(account: &str, error: CycleError) -> CycleReport {
    CycleReport {
        account: account.to_string(),
        state: CycleState::Failed,
        pages_fetched: 0,
        posts_fetched: 0,
        malformed_blocks: 0,
        summary: None,
        detail: Some(error.to_string()),
        finished_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Scan state key holding the time of the account's last finished cycle.
pub fn last_crawl_key(account: &str) -> String {
    format!("last_crawl_at:{account}")
}

/// Scan state key holding the account's last `CycleReport` as JSON.
pub fn last_outcome_key(account: &str) -> String {
    format!("last_crawl_outcome:{account}")
}
