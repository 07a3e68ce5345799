use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::fetcher::FetchError;
use super::parser::ParseError;

/// A normalized article pulled from one of the configured feeds.
///
/// Items are derived on every refresh and never persisted. `title` and
/// `link` are always non-empty once an item leaves the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    /// Deduplication key, compared byte-for-byte.
    pub link: String,
    /// Date text exactly as it appeared in the feed.
    pub published: String,
    /// Epoch seconds parsed from `published`, or 0 when unparsable.
    pub timestamp: i64,
    pub source: String,
}

/// One page of the aggregated news list, as returned by `GET /api/news`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsPage {
    pub items: Vec<NewsItem>,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
    pub total: usize,
}

/// Why a single feed contributed nothing to a refresh cycle.
#[derive(Debug, Error)]
pub enum FeedFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Outcome of fetching and parsing one feed during a refresh.
#[derive(Debug)]
pub struct FeedOutcome {
    pub url: String,
    /// Number of items kept from this feed, or the reason it was dropped
    pub result: Result<usize, FeedFailure>,
}

/// Summary of one aggregation cycle.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub feeds: Vec<FeedOutcome>,
    /// Items after merge and dedupe.
    pub items: usize,
    pub elapsed: Duration,
}

impl RefreshReport {
    pub fn failed(&self) -> usize {
        self.feeds.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.feeds.len() - self.failed()
    }

    /// JSON view used by the status endpoint.
    pub fn summary(&self) -> serde_json::Value {
        let feeds: Vec<serde_json::Value> = self
            .feeds
            .iter()
            .map(|f| match &f.result {
                Ok(count) => serde_json::json!({ "url": f.url, "items": count }),
                Err(e) => serde_json::json!({ "url": f.url, "error": e.to_string() }),
            })
            .collect();

        serde_json::json!({
            "items": self.items,
            "feeds_ok": self.succeeded(),
            "feeds_failed": self.failed(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "feeds": feeds,
        })
    }
}
