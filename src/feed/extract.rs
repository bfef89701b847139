// Post extraction: turns one feed page into post records and a cursor.
//
// The mobile feed markup is scanned line by line. Each post block looks like:
//
//   <span>@</span>alice                              author marker
//   <div class="tweet-text" data-id="1234">          container marker (id)
//   <div class="dir-ltr" dir="ltr">  body text ...   body marker
//
// and the page ends with a `max_id=...">Load older Tweets</a>` link when
// older posts exist. A small state machine tracks which block we're in so a
// post is only emitted once author, id and body have all been seen. The last
// author seen stays in effect for later blocks until another author line
// replaces it; the id is consumed by the body it belongs to.

use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::Html;
use tracing::{debug, warn};

use crate::db::models::Post;
use crate::error::MalformedPage;

const AUTHOR_MARKER: &str = "<span>@</span>";
const CONTAINER_MARKER: &str = "<div class=\"tweet-text\"";
const BODY_MARKER: &str = "<div class=\"dir-ltr\" dir=\"ltr\">";
const BODY_MARKER_WITH_PADDING: &str = "<div class=\"dir-ltr\" dir=\"ltr\">  ";
const CURSOR_MARKER: &str = "max_id";

static CONTAINER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div class="tweet-text" data-id="([0-9]+)">"#).expect("valid container regex")
});
static CURSOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"max_id=([0-9]+)">Load older Tweets</a>"#).expect("valid cursor regex")
});

/// What to do when a marker line is missing the value it should carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Skip the broken block, keep scanning, and report it alongside the posts.
    #[default]
    Lenient,
    /// Fail the whole page on the first malformed line.
    Strict,
}

/// Everything pulled out of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Posts in page order (newest first).
    pub posts: Vec<Post>,
    /// Cursor for the next older page, `None` at the end of the feed.
    pub next_cursor: Option<String>,
    /// Blocks skipped in lenient mode.
    pub malformed: Vec<MalformedPage>,
}

/// Scanner state between lines.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ExtractState {
    /// No usable author line seen yet.
    SeekingAuthor,
    /// An author is known; waiting for a container id and then its body.
    SeekingBody {
        author: String,
        post_id: Option<i64>,
    },
}

/// Classification of a single line. Markers are tested in this order.
#[derive(Debug, PartialEq, Eq)]
enum Marker {
    Author(String),
    Container(Option<i64>),
    Body(String),
    Cursor(Option<String>),
    Other,
}

fn classify(line: &str) -> Marker {
    if line.contains(AUTHOR_MARKER) {
        Marker::Author(line.replace(AUTHOR_MARKER, "").trim().to_string())
    } else if line.contains(CONTAINER_MARKER) {
        let id = CONTAINER_ID
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok());
        Marker::Container(id)
    } else if line.contains(BODY_MARKER_WITH_PADDING) {
        Marker::Body(line.replace(BODY_MARKER, "").trim().to_string())
    } else if line.contains(CURSOR_MARKER) {
        let cursor = CURSOR
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        Marker::Cursor(cursor)
    } else {
        Marker::Other
    }
}

/// Strip all tags from a captured body, decode entities, and trim.
///
/// The body is parsed as an HTML fragment, so every named and numeric
/// character reference the HTML standard defines is decoded.
pub fn body_text(raw_text: &str) -> String {
    let fragment = Html::parse_fragment(raw_text);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Line-oriented extractor for feed pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostExtractor {
    pub strictness: Strictness,
}

impl PostExtractor {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    /// Extract from raw response bytes. Invalid UTF-8 is replaced, not fatal.
    pub fn extract_bytes(
        &self,
        page: &[u8],
        owner_account: &str,
    ) -> Result<ExtractedPage, MalformedPage> {
        self.extract(&String::from_utf8_lossy(page), owner_account)
    }

    /// Extract the posts and the next-page cursor from one page of markup.
    ///
    /// Posts authored by anyone other than `owner_account` come back as
    /// reposts with `repost_source` set to that author.
    pub fn extract(&self, page: &str, owner_account: &str) -> Result<ExtractedPage, MalformedPage> {
        let mut out = ExtractedPage::default();
        let mut state = ExtractState::SeekingAuthor;

        for (index, line) in page.lines().enumerate() {
            let line_no = index + 1;

            match classify(line) {
                Marker::Author(author) if author.is_empty() => {
                    self.malformed(&mut out, line_no, "author marker without a handle")?;
                    state = ExtractState::SeekingAuthor;
                }
                Marker::Author(author) => {
                    // A new author always opens a new block; an unfinished
                    // previous block is dropped without emitting.
                    state = ExtractState::SeekingBody {
                        author,
                        post_id: None,
                    };
                }
                Marker::Container(parsed) => {
                    if parsed.is_none() {
                        self.malformed(&mut out, line_no, "post container without a numeric id")?;
                    }
                    match &mut state {
                        ExtractState::SeekingBody { post_id, .. } => *post_id = parsed,
                        ExtractState::SeekingAuthor => {
                            debug!(line = line_no, "post container before any author line");
                        }
                    }
                }
                Marker::Body(raw_text) => {
                    // Emitting consumes the id but keeps the author, so a
                    // stray second body can't duplicate the post.
                    if let ExtractState::SeekingBody { author, post_id } = &mut state {
                        if let Some(post_id) = post_id.take() {
                            out.posts.push(Post {
                                owner_account: owner_account.to_string(),
                                text: body_text(&raw_text),
                                raw_text,
                                post_id,
                                deleted: false,
                                repost_source: (author.as_str() != owner_account)
                                    .then(|| author.clone()),
                            });
                        }
                    }
                }
                Marker::Cursor(Some(cursor)) => out.next_cursor = Some(cursor),
                Marker::Cursor(None) => {
                    self.malformed(&mut out, line_no, "pagination link without a cursor")?;
                }
                Marker::Other => {}
            }
        }

        Ok(out)
    }

    fn malformed(
        &self,
        out: &mut ExtractedPage,
        line: usize,
        reason: &str,
    ) -> Result<(), MalformedPage> {
        let err = MalformedPage {
            line,
            reason: reason.to_string(),
        };
        match self.strictness {
            Strictness::Strict => Err(err),
            Strictness::Lenient => {
                warn!(line, reason, "Skipping malformed block");
                out.malformed.push(err);
                Ok(())
            }
        }
    }
}
