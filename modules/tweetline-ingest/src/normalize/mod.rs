//! Wire record → canonical entity.
//!
//! Each wire shape is first projected onto a borrowed neutral view, and a
//! single builder turns that view into the canonical type. Embedded reposts
//! and quotes recurse with an explicit depth that is threaded through every
//! call; nothing here keeps state between records.

mod html;
mod media;
mod profile;
mod tweet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use typed_builder::TypedBuilder;

use tweetline_common::config::{DEFAULT_MAX_EMBED_DEPTH, DEFAULT_PERMALINK_BASE};
use tweetline_common::{Config, Post, Profile};

use crate::error::NormalizeError;

pub use profile::{normalize_profile, normalize_wire_user};
pub use tweet::{normalize_post, normalize_wire_post};

/// The platform's textual date format, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const PLATFORM_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct NormalizeOptions {
    /// Embedded levels resolved below the top-level record, which is depth 0.
    #[builder(default = DEFAULT_MAX_EMBED_DEPTH)]
    pub max_embed_depth: usize,
    #[builder(default = DEFAULT_PERMALINK_BASE.to_string(), setter(into))]
    pub permalink_base: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&Config> for NormalizeOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_embed_depth: config.max_embed_depth,
            permalink_base: config.permalink_base.clone(),
        }
    }
}

/// A canonical entity the paginator can produce from one raw record.
pub trait Normalize: Sized + Send + 'static {
    /// Used in log fields.
    const KIND: &'static str;

    fn normalize(raw: &Value, options: &NormalizeOptions) -> Result<Self, NormalizeError>;
}

impl Normalize for Post {
    const KIND: &'static str = "post";

    fn normalize(raw: &Value, options: &NormalizeOptions) -> Result<Self, NormalizeError> {
        normalize_post(raw, options)
    }
}

impl Normalize for Profile {
    const KIND: &'static str = "profile";

    fn normalize(raw: &Value, options: &NormalizeOptions) -> Result<Self, NormalizeError> {
        normalize_profile(raw, options)
    }
}

pub(crate) fn parse_platform_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw.trim(), PLATFORM_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// First non-empty candidate, owned.
pub(crate) fn first_present(candidates: &[Option<&str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn required(
    candidates: &[Option<&str>],
    field: &'static str,
) -> Result<String, NormalizeError> {
    first_present(candidates).ok_or(NormalizeError::MalformedRecord { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_platform_dates() {
        let dt = parse_platform_date("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(dt.year(), 2018);
        assert_eq!(dt.month(), 10);
        assert_eq!(dt.hour(), 20);
        assert_eq!(dt.timestamp(), 1_539_202_764);
    }

    #[test]
    fn offsets_are_converted_to_utc() {
        let dt = parse_platform_date("Wed Oct 10 22:19:24 +0200 2018").unwrap();
        assert_eq!(dt.hour(), 20);
    }

    #[test]
    fn rejects_other_formats() {
        assert!(parse_platform_date("2018-10-10T20:19:24Z").is_none());
        assert!(parse_platform_date("").is_none());
    }

    #[test]
    fn first_present_skips_blank_candidates() {
        assert_eq!(
            first_present(&[None, Some("  "), Some("x"), Some("y")]),
            Some("x".to_string())
        );
        assert_eq!(first_present(&[None, Some("")]), None);
    }

    #[test]
    fn options_follow_config() {
        let config = Config {
            max_embed_depth: 4,
            permalink_base: "https://x.com".to_string(),
            ..Config::default()
        };
        let options = NormalizeOptions::from(&config);
        assert_eq!(options.max_embed_depth, 4);
        assert_eq!(options.permalink_base, "https://x.com");
    }
}
