//! SentinelAI backend: a small HTTP service that aggregates security news
//! feeds, collects early-access signups, and serves a sample report.
//!
//! - [`news`] - feed fetching, parsing, merging, caching, pagination
//! - [`waitlist`] - JSON-file backed signup list
//! - [`server`] - axum router and handlers
//! - [`config`] - `sentinel.toml` loading and environment overrides

pub mod config;
pub mod news;
pub mod server;
pub mod waitlist;
