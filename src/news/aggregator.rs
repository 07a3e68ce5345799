use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::fetcher::{FeedSource, HttpFetcher};
use super::page::paginate;
use super::parser::{parse_feed, ParseResult};
use super::types::{FeedFailure, FeedOutcome, NewsItem, NewsPage, RefreshReport};

/// How long an aggregated list is served before it is rebuilt
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// An immutable aggregation result. Replaced wholesale, never edited.
#[derive(Debug)]
pub struct Snapshot {
    pub refreshed_at: Instant,
    pub items: Arc<Vec<NewsItem>>,
    pub report: RefreshReport,
}

impl Snapshot {
    /// An empty snapshot is never fresh, so a cycle where every feed failed
    /// is retried by the next request.
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.items.is_empty() && self.refreshed_at.elapsed() < ttl
    }
}

/// Pull-driven news cache over a fixed list of feeds.
///
/// Readers get the cached list while it is fresh. The first reader to find
/// it stale rebuilds it; readers arriving during a rebuild wait for that
/// rebuild instead of starting their own.
pub struct NewsAggregator<S = HttpFetcher> {
    source: S,
    feeds: Vec<String>,
    ttl: Duration,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    refresh_lock: Mutex<()>,
    /// Feeds dropped from a cycle since startup
    failures: AtomicU64,
}

impl<S: FeedSource> NewsAggregator<S> {
    pub fn new(source: S, feeds: Vec<String>, ttl: Duration) -> Self {
        Self {
            source,
            feeds,
            ttl,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            failures: AtomicU64::new(0),
        }
    }

    /// Returns the merged, sorted, deduplicated item list, rebuilding it
    /// first if the cache is stale.
    pub async fn items(&self) -> Arc<Vec<NewsItem>> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            tracing::debug!(items = snapshot.items.len(), "News cache hit");
            return Arc::clone(&snapshot.items);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have finished a rebuild while we waited
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Arc::clone(&snapshot.items);
        }

        let snapshot = Arc::new(self.refresh().await);
        let items = Arc::clone(&snapshot.items);
        *self.snapshot.write().await = Some(snapshot);
        items
    }

    /// One page of the current item list.
    pub async fn page(&self, page: i64, page_size: i64) -> NewsPage {
        let items = self.items().await;
        paginate(&items, page, page_size)
    }

    /// The last snapshot, fresh or not, without triggering a rebuild.
    pub async fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().await.clone()
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    pub fn failures_total(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn fresh_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .filter(|s| s.is_fresh(self.ttl))
            .cloned()
    }

    /// Fetches every feed in configured order, one at a time.
    async fn refresh(&self) -> Snapshot {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(self.feeds.len());
        let mut collected = Vec::new();

        for url in &self.feeds {
            let result = match self.collect_feed(url).await {
                Ok(items) => {
                    let count = items.len();
                    collected.extend(items);
                    Ok(count)
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(feed = %url, error = %e, "Feed dropped from news refresh");
                    Err(e)
                }
            };
            outcomes.push(FeedOutcome {
                url: url.clone(),
                result,
            });
        }

        let items = merge(collected);
        let report = RefreshReport {
            feeds: outcomes,
            items: items.len(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            items = report.items,
            feeds_ok = report.succeeded(),
            feeds_failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "News cache refreshed"
        );

        Snapshot {
            refreshed_at: Instant::now(),
            items: Arc::new(items),
            report,
        }
    }

    async fn collect_feed(&self, url: &str) -> Result<Vec<NewsItem>, FeedFailure> {
        let bytes = self.source.fetch(url).await?;
        let ParseResult { items, skipped } = parse_feed(&bytes, url)?;

        if skipped > 0 {
            tracing::debug!(
                feed = %url,
                skipped = skipped,
                "Feed items without title or link skipped"
            );
        }

        Ok(items)
    }
}

/// Orders items newest first and drops repeated links.
///
/// The sort is stable, so items with equal timestamps (including the 0 used
/// for unknown dates) stay in concatenation order. The first occurrence of a
/// link after sorting is the one kept.
pub fn merge(mut items: Vec<NewsItem>) -> Vec<NewsItem> {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.link.clone()));
    items
}
