use std::env;
use std::str::FromStr;

use tracing::info;

use crate::error::{Result, TweetlineError};

pub const DEFAULT_MAX_EMBED_DEPTH: usize = 2;
pub const DEFAULT_STREAM_CAPACITY: usize = 32;
pub const DEFAULT_MAX_EMPTY_PAGES: usize = 5;
pub const DEFAULT_PERMALINK_BASE: &str = "https://twitter.com";

/// Ingest configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How many levels of embedded reposts/quotes are resolved below a
    /// top-level record.
    pub max_embed_depth: usize,
    /// Size of the bounded hand-off between a pagination session and its consumer.
    pub stream_capacity: usize,
    /// Consecutive empty pages tolerated before a session gives up.
    pub max_empty_pages: usize,
    /// Base used to build post and profile permalinks.
    pub permalink_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_embed_depth: DEFAULT_MAX_EMBED_DEPTH,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            max_empty_pages: DEFAULT_MAX_EMPTY_PAGES,
            permalink_base: DEFAULT_PERMALINK_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables. Every variable is
    /// optional; malformed numbers are rejected rather than silently defaulted.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            max_embed_depth: parsed_env("TWEETLINE_MAX_EMBED_DEPTH", DEFAULT_MAX_EMBED_DEPTH)?,
            stream_capacity: parsed_env("TWEETLINE_STREAM_CAPACITY", DEFAULT_STREAM_CAPACITY)?,
            max_empty_pages: parsed_env("TWEETLINE_MAX_EMPTY_PAGES", DEFAULT_MAX_EMPTY_PAGES)?,
            permalink_base: env::var("TWEETLINE_PERMALINK_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_PERMALINK_BASE.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_capacity == 0 {
            return Err(TweetlineError::Validation(
                "TWEETLINE_STREAM_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.permalink_base.is_empty() {
            return Err(TweetlineError::Validation(
                "TWEETLINE_PERMALINK_BASE must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            max_embed_depth = self.max_embed_depth,
            stream_capacity = self.stream_capacity,
            max_empty_pages = self.max_empty_pages,
            permalink_base = self.permalink_base.as_str(),
            "Config loaded"
        );
    }
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TweetlineError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
