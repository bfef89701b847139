// Ghostpost: deleted-post detection for tracked social media accounts.
//
// This is the library root. Each module corresponds to one stage of the
// crawl: fetching and extracting feed pages, reconciling them against the
// store, and reporting the results.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod output;
pub mod pipeline;
pub mod status;
