// Feed access: fetching account pages and turning markup into posts.
//
// Each submodule handles one step: transport, extraction (including tag
// stripping and entity decoding), and pagination across pages.

pub mod client;
pub mod extract;
pub mod paginate;

pub use client::{FeedTransport, HttpFeedClient};
pub use extract::{ExtractedPage, PostExtractor, Strictness};
pub use paginate::{fetch_pages, FetchedFeed};
