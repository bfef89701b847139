// Colored terminal output for crawl results and account status.
//
// This module handles all terminal-specific formatting. The main.rs and
// status.rs display paths delegate here.

use colored::Colorize;

use crate::db::models::PostCounts;
use crate::pipeline::{CycleReport, CycleState};

/// One line per finished cycle.
pub fn display_cycle_reports(reports: &[CycleReport]) {
    for report in reports {
        println!("  {}", format_cycle_report(report));
    }
}

/// Plain-text body of a cycle line, colored by outcome.
pub fn format_cycle_report(report: &CycleReport) -> String {
    let state = colorize_state(report.state);
    match (&report.summary, &report.detail) {
        (Some(summary), _) => {
            let deleted = if summary.applied.marked_deleted > 0 {
                format!("{} deleted", summary.applied.marked_deleted)
                    .red()
                    .bold()
                    .to_string()
            } else {
                "0 deleted".dimmed().to_string()
            };
            format!(
                "@{:<24} {:<8} {} pages, {} posts, {} new, {}",
                report.account,
                state,
                report.pages_fetched,
                report.posts_fetched,
                summary.applied.inserted,
                deleted,
            )
        }
        (None, Some(detail)) => format!(
            "@{:<24} {:<8} {}",
            report.account,
            state,
            super::truncate_chars(detail, 100).dimmed()
        ),
        (None, None) => format!("@{:<24} {:<8}", report.account, state),
    }
}

/// Display one tracked account's counts and last crawl outcome.
pub fn display_account_status(
    account: &str,
    counts: &PostCounts,
    last_report: Option<&CycleReport>,
) {
    let deleted = if counts.deleted > 0 {
        counts.deleted.to_string().red().to_string()
    } else {
        counts.deleted.to_string()
    };

    println!(
        "  @{:<24} {:>6} posts  {:>5} reposts  {:>5} deleted",
        account, counts.total, counts.reposts, deleted
    );

    match last_report {
        Some(report) => println!(
            "    last crawl: {} ({})",
            report.finished_at.dimmed(),
            colorize_state(report.state)
        ),
        None => println!("    last crawl: {}", "never".dimmed()),
    }
}

/// Colorize a terminal cycle state.
fn colorize_state(state: CycleState) -> colored::ColoredString {
    match state {
        CycleState::Done => state.as_str().green(),
        CycleState::Aborted => state.as_str().yellow(),
        CycleState::Failed => state.as_str().red().bold(),
        _ => state.as_str().dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AppliedChanges;
    use crate::pipeline::ReconcileSummary;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn done_report_lists_counts() {
        plain();
        let report = CycleReport {
            account: "alice".to_string(),
            state: CycleState::Done,
            pages_fetched: 3,
            posts_fetched: 40,
            malformed_blocks: 0,
            summary: Some(ReconcileSummary {
                boundary_id: 100,
                window_size: 38,
                applied: AppliedChanges {
                    inserted: 2,
                    already_present: 0,
                    marked_deleted: 1,
                },
            }),
            detail: None,
            finished_at: String::new(),
        };
        let line = format_cycle_report(&report);
        assert!(line.contains("3 pages, 40 posts, 2 new, 1 deleted"));
    }

    #[test]
    fn aborted_report_shows_reason() {
        plain();
        let report = CycleReport {
            account: "alice".to_string(),
            state: CycleState::Aborted,
            pages_fetched: 1,
            posts_fetched: 4,
            malformed_blocks: 0,
            summary: None,
            detail: Some("no original post in fetched batch".to_string()),
            finished_at: String::new(),
        };
        let line = format_cycle_report(&report);
        assert!(line.contains("aborted"));
        assert!(line.contains("no original post"));
    }
}
