// Pagination: walks an account's feed for a bounded number of pages.
//
// Pages come newest first and each cursor points strictly older, so the
// concatenation of all pages is the account's feed in reverse-chronological
// order. Nothing here touches the store: a failed fetch simply drops
// everything collected so far.

use tracing::{debug, info};

use super::client::{base_feed_url, cursor_feed_url, FeedTransport};
use super::extract::PostExtractor;
use crate::db::models::Post;
use crate::error::CycleError;

/// All posts gathered for one account in one crawl.
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    /// Posts across all pages, newest first.
    pub posts: Vec<Post>,
    pub pages_fetched: u32,
    /// Malformed blocks skipped across all pages (lenient mode only).
    pub malformed_blocks: usize,
    /// True when the last page had no cursor.
    pub reached_end: bool,
}

/// Fetch up to `page_count` pages of `account`'s feed.
///
/// Stops early when a page carries no cursor. Any fetch failure aborts the
/// whole walk and the pages already fetched are discarded.
pub async fn fetch_pages(
    transport: &dyn FeedTransport,
    extractor: &PostExtractor,
    base_url: &str,
    account: &str,
    page_count: u32,
) -> Result<FetchedFeed, CycleError> {
    let mut feed = FetchedFeed::default();
    let mut cursor: Option<String> = None;

    for page in 0..page_count {
        let url = match cursor {
            Some(ref c) => cursor_feed_url(base_url, account, c),
            None => base_feed_url(base_url, account),
        };

        let body = transport.fetch(&url).await?;
        let extracted = extractor.extract_bytes(&body, account)?;

        debug!(
            page = page + 1,
            page_posts = extracted.posts.len(),
            total_collected = feed.posts.len() + extracted.posts.len(),
            "Fetched page of posts for @{}",
            account
        );

        feed.pages_fetched += 1;
        feed.malformed_blocks += extracted.malformed.len();
        feed.posts.extend(extracted.posts);

        cursor = extracted.next_cursor;
        if cursor.is_none() {
            feed.reached_end = true;
            break;
        }
    }

    info!(
        count = feed.posts.len(),
        pages = feed.pages_fetched,
        account = account,
        "Collected feed posts"
    );

    Ok(feed)
}
