//! Error types for the crawl path.
//!
//! The store layer reports failures as `anyhow::Error`; these typed errors
//! cover the cases callers need to tell apart: a transport failure, a page
//! that could not be read, and the cycle-level wrapper around both.

use thiserror::Error;

/// The feed could not be fetched.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read.
    #[error("failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },
}

/// A line matched a marker but did not carry the value the marker promises.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed page at line {line}: {reason}")]
pub struct MalformedPage {
    /// 1-based line number within the fetched page
    pub line: usize,
    pub reason: String,
}

/// Why one account's crawl cycle failed.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("account @{0} is not tracked; run `ghostpost track {0}` first")]
    UntrackedAccount(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Only raised when strict page parsing is enabled.
    #[error(transparent)]
    MalformedPage(#[from] MalformedPage),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}
