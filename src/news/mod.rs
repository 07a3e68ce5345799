//! Security news aggregation for the `/api/news` endpoint.
//!
//! The pipeline runs on demand whenever the cached list has gone stale:
//!
//! - **Fetching**: one HTTP GET per configured feed, in order, no retries
//! - **Parsing**: RSS (`channel/item`) or Atom (`entry`) into [`NewsItem`]s
//! - **Merging**: stable sort newest first, then drop repeated links
//! - **Caching**: a single immutable snapshot reused until its TTL expires
//! - **Pagination**: per-request slicing of the cached list
//!
//! A failing feed never fails the request. Each cycle records why a feed
//! contributed nothing in a [`RefreshReport`], logs it, and counts it.
//!
//! # Architecture
//!
//! - [`fetcher`] - HTTP download with timeout and size limit, behind [`FeedSource`]
//! - [`parser`] - XML to items, including title/link filtering and source labels
//! - [`dates`] - ordered date format attempts
//! - [`aggregator`] - the cache and merge step
//! - [`page`] - pagination

pub mod aggregator;
pub mod dates;
pub mod fetcher;
pub mod page;
pub mod parser;
mod types;

pub use aggregator::{merge, NewsAggregator, Snapshot, DEFAULT_CACHE_TTL};
pub use fetcher::{FeedSource, FetchError, HttpFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_SIZE};
pub use page::{paginate, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use parser::{parse_feed, ParseError, ParseResult};
pub use types::{FeedFailure, FeedOutcome, NewsItem, NewsPage, RefreshReport};

/// Feeds aggregated when the configuration does not list any.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://thehackernews.com/feeds/posts/default",
    "https://krebsonsecurity.com/feed/",
    "https://www.darkreading.com/rss.xml",
    "https://feeds.feedburner.com/OpenAIBlog",
    "https://www.schneier.com/feed/atom/",
];
