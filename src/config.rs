use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::feed::Strictness;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// Feed host; account pages live at `{feed_url}/{account}`
    pub feed_url: String,
    /// Pages fetched per account when `crawl` isn't given `--pages`
    pub default_pages: u32,
    /// Account cycles run in parallel when `crawl` isn't given `--concurrency`
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub strictness: Strictness,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every setting has a default; only malformed numbers are an error.
    pub fn load() -> Result<Self> {
        Ok(Self {
            db_path: env::var("GHOSTPOST_DB_PATH").unwrap_or_else(|_| "./ghostpost.db".to_string()),
            feed_url: env::var("GHOSTPOST_FEED_URL")
                .unwrap_or_else(|_| crate::feed::client::DEFAULT_FEED_URL.to_string()),
            default_pages: parse_var("GHOSTPOST_PAGES", 3)?,
            concurrency: parse_var("GHOSTPOST_CONCURRENCY", 4)?,
            request_timeout: Duration::from_secs(parse_var("GHOSTPOST_REQUEST_TIMEOUT_SECS", 30)?),
            strictness: match env::var("GHOSTPOST_STRICT_PAGES").as_deref() {
                Ok("1") | Ok("true") | Ok("yes") => Strictness::Strict,
                // unset or anything else stays lenient
                _ => Strictness::Lenient,
            },
        })
    }

    /// Check that a crawl will fetch at least one page.
    pub fn require_pages(pages: u32) -> Result<()> {
        if pages == 0 {
            anyhow::bail!(
                "Page count must be at least 1.\n\
                 Pass --pages or set GHOSTPOST_PAGES in your .env file."
            );
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
