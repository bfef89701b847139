// Crawl pipeline: reconcile fetched batches against the store, and run
// full per-account cycles on top of that.

pub mod cycle;
pub mod reconcile;

pub use cycle::{exit_code, CycleReport, CycleState, Crawler};
pub use reconcile::{reconcile, AbortReason, ReconcileOutcome, ReconcileSummary};
