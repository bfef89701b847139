use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use ghostpost::config::Config;
use ghostpost::feed::{HttpFeedClient, PostExtractor};
use ghostpost::pipeline::{exit_code, Crawler};

/// Ghostpost: notice when tracked accounts delete their posts.
///
/// Crawls each account's feed, records every post it sees, and flags posts
/// that vanish from the range of the feed it can still see.
#[derive(Parser)]
#[command(name = "ghostpost", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Start tracking one or more accounts
    Track {
        /// Account handles (a leading @ is ignored)
        #[arg(required = true)]
        accounts: Vec<String>,
    },

    /// Crawl accounts and flag posts that disappeared
    Crawl {
        /// Account handles to crawl (must already be tracked)
        #[arg(required = true)]
        accounts: Vec<String>,

        /// Feed pages to fetch per account (default: GHOSTPOST_PAGES or 3)
        #[arg(long)]
        pages: Option<u32>,

        /// Number of accounts to crawl in parallel (default: GHOSTPOST_CONCURRENCY or 4)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show tracked accounts, post counts and last crawl results
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ghostpost=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing ghostpost database...");
            let db = ghostpost::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: ghostpost track <account>");
        }

        Commands::Track { accounts } => {
            let db = ghostpost::db::open_sqlite(&config.db_path)?;
            for account in &accounts {
                let account = normalize_account(account);
                if db.register_account(account).await? {
                    println!("  {} now tracking @{account}", "+".green());
                } else {
                    println!("  {} @{account} already tracked", "=".dimmed());
                }
            }
        }

        Commands::Crawl {
            accounts,
            pages,
            concurrency,
        } => {
            let pages = pages.unwrap_or(config.default_pages);
            Config::require_pages(pages)?;
            let concurrency = concurrency.unwrap_or(config.concurrency);

            let db = ghostpost::db::open_sqlite(&config.db_path)?;
            let transport = Arc::new(HttpFeedClient::new(config.request_timeout)?);
            let crawler = Crawler::new(
                db,
                transport,
                PostExtractor::new(config.strictness),
                &config.feed_url,
            );

            let accounts: Vec<String> = accounts
                .iter()
                .map(|a| normalize_account(a).to_string())
                .collect();

            println!(
                "Crawling {} account(s), {} page(s) each...",
                accounts.len(),
                pages
            );

            let reports = crawler.crawl_many(&accounts, pages, concurrency).await;
            ghostpost::output::terminal::display_cycle_reports(&reports);

            let deleted: usize = reports
                .iter()
                .filter_map(|r| r.summary.as_ref())
                .map(|s| s.applied.marked_deleted)
                .sum();
            println!("\n{}", "Crawl complete.".bold());
            println!("  Newly deleted posts: {deleted}");

            return Ok(ExitCode::from(exit_code(&reports)));
        }

        Commands::Status => {
            let db = ghostpost::db::open_sqlite(&config.db_path)?;
            ghostpost::status::show(&db, &config.db_path).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Strip a leading @ and surrounding whitespace from a handle.
fn normalize_account(account: &str) -> &str {
    let account = account.trim();
    account.strip_prefix('@').unwrap_or(account)
}
