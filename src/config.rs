//! Configuration file parser for `sentinel.toml`.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::news::{DEFAULT_CACHE_TTL, DEFAULT_FEEDS, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_SIZE};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// An environment override could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level server configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind the HTTP listener to.
    pub host: String,

    /// Port to listen on. `PORT` in the environment takes precedence.
    pub port: u16,

    /// Directory holding `waitlist.json`. Created on startup if missing.
    pub data_dir: PathBuf,

    /// Directory holding `sample_report.pdf`.
    pub static_dir: PathBuf,

    /// RSS/Atom feed URLs aggregated by `/api/news`, in priority order.
    pub feeds: Vec<String>,

    /// Seconds an aggregated news list is served before being rebuilt.
    pub cache_ttl_secs: u64,

    /// Per-feed request timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Largest feed body accepted, in bytes.
    pub max_feed_bytes: usize,

    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("static"),
            feeds: DEFAULT_FEEDS.iter().map(|f| f.to_string()).collect(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_feed_bytes: DEFAULT_MAX_FEED_SIZE,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "host",
        "port",
        "data_dir",
        "static_dir",
        "feeds",
        "cache_ttl_secs",
        "fetch_timeout_secs",
        "max_feed_bytes",
        "cors_allowed_origins",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Feed URLs that are not http(s) → dropped with a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.drop_invalid_feeds();
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Applies `PORT` from the environment, if set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_port_var(std::env::var("PORT").ok())
    }

    fn with_port_var(mut self, port: Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = port {
            self.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "PORT", value })?;
        }
        Ok(self)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Per-feed timeout, never shorter than one second.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn drop_invalid_feeds(&mut self) {
        self.feeds.retain(|feed| match url::Url::parse(feed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => true,
            Ok(url) => {
                tracing::warn!(feed = %feed, scheme = url.scheme(), "Skipping feed with unsupported scheme");
                false
            }
            Err(e) => {
                tracing::warn!(feed = %feed, error = %e, "Skipping invalid feed URL");
                false
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("sentinel_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sentinel.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.feeds.len(), 5);
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(8));
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/sentinel_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 8000);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "port = 9000\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_ttl_secs, 600); // default
        assert_eq!(config.feeds.len(), 5); // default
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
host = "127.0.0.1"
port = 3000
data_dir = "/var/lib/sentinel"
static_dir = "/srv/static"
feeds = ["https://example.com/feed.xml", "http://news.example.org/atom"]
cache_ttl_secs = 60
fetch_timeout_secs = 3
max_feed_bytes = 4096
cors_allowed_origins = ["https://sentinel.example.com"]
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sentinel"));
        assert_eq!(config.static_dir, PathBuf::from("/srv/static"));
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_feed_bytes, 4096);
        assert_eq!(config.cors_allowed_origins, vec!["https://sentinel.example.com"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_feed_urls_dropped() {
        let content = r#"feeds = ["https://ok.example/feed", "file:///etc/passwd", "not a url"]"#;
        let (dir, path) = write_config("bad_feeds", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feeds, vec!["https://ok.example/feed"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "port = 8001\ntotally_fake_key = 42\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 8001);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "port = \"eighty\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = Config {
            fetch_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_port_override() {
        let config = Config::default()
            .with_port_var(Some("9123".to_string()))
            .unwrap();
        assert_eq!(config.port, 9123);

        let config = Config::default().with_port_var(None).unwrap();
        assert_eq!(config.port, 8000);

        let err = Config::default()
            .with_port_var(Some("http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PORT", .. }));
    }
}
