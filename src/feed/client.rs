// Feed transport: fetches raw feed pages over HTTP.
//
// The paginator only needs "give me the bytes at this URL", so it talks to
// the FeedTransport trait. HttpFeedClient is the reqwest implementation;
// tests plug in scripted transports instead.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

/// Default feed host. Account feeds live at `{base}/{account}`.
pub const DEFAULT_FEED_URL: &str = "https://mobile.twitter.com";

/// Query parameter carrying the pagination cursor.
pub const CURSOR_PARAM: &str = "max_id";

/// Source of raw feed pages.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Fetch the page at `url`. Any transport failure or non-success status
    /// is a `FetchError`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// URL of an account's newest feed page.
pub fn base_feed_url(base_url: &str, account: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), account)
}

/// URL of the feed page that follows `cursor`.
pub fn cursor_feed_url(base_url: &str, account: &str, cursor: &str) -> String {
    format!(
        "{}?{}={}",
        base_feed_url(base_url, account),
        CURSOR_PARAM,
        cursor
    )
}

/// Unauthenticated HTTP client for feed pages.
pub struct HttpFeedClient {
    client: reqwest::Client,
}

impl HttpFeedClient {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ghostpost/0.1 (deleted-post tracker)")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url = url, "Feed GET request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(body.to_vec())
    }
}
