// System status display: DB size, tracked accounts, last crawl per account.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::db::Database;
use crate::output::terminal;
use crate::pipeline::cycle::{last_outcome_key, CycleReport};

/// Display system status to the terminal.
pub async fn show(db: &Arc<dyn Database>, db_path: &str) -> Result<()> {
    // Database file size
    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let accounts = db.tracked_accounts().await?;
    if accounts.is_empty() {
        println!("Tracked accounts: none");
        println!("  Run `ghostpost track <account>` to start watching one");
        return Ok(());
    }

    println!("Tracked accounts: {}", accounts.len());
    for tracked in &accounts {
        let counts = db.post_counts(&tracked.account).await?;
        let last_report = load_last_report(db, &tracked.account).await?;
        terminal::display_account_status(&tracked.account, &counts, last_report.as_ref());
    }

    Ok(())
}

/// Load the stored report of an account's most recent cycle.
pub async fn load_last_report(db: &Arc<dyn Database>, account: &str) -> Result<Option<CycleReport>> {
    let Some(json) = db.get_scan_state(&last_outcome_key(account)).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&json) {
        Ok(report) => Ok(Some(report)),
        Err(e) => {
            warn!(account = account, error = %e, "Ignoring unreadable crawl outcome");
            Ok(None)
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn last_report_tolerates_garbage() {
        let db = crate::db::in_memory().unwrap();
        assert!(load_last_report(&db, "alice").await.unwrap().is_none());

        db.set_scan_state(&last_outcome_key("alice"), "not json")
            .await
            .unwrap();
        assert!(load_last_report(&db, "alice").await.unwrap().is_none());
    }
}
