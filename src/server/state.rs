use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::news::{FetchError, HttpFetcher, NewsAggregator};
use crate::waitlist::Waitlist;

pub const REPORT_FILE: &str = "sample_report.pdf";

/// Shared handler state. Cloning is cheap; everything lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsAggregator>,
    pub waitlist: Arc<Waitlist>,
    static_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(news: NewsAggregator, waitlist: Waitlist, static_dir: &Path) -> Self {
        Self {
            news: Arc::new(news),
            waitlist: Arc::new(waitlist),
            static_dir: Arc::new(static_dir.to_path_buf()),
        }
    }

    /// Wires up the HTTP fetcher, cache and waitlist from configuration.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.fetch_timeout(), config.max_feed_bytes)?;
        let news = NewsAggregator::new(fetcher, config.feeds.clone(), config.cache_ttl());
        let waitlist = Waitlist::new(&config.data_dir);
        Ok(Self::new(news, waitlist, &config.static_dir))
    }

    pub fn report_path(&self) -> PathBuf {
        self.static_dir.join(REPORT_FILE)
    }
}
