use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Media ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Photo {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub id: String,
    /// Still image shown before playback.
    pub preview: String,
    /// Highest-bitrate progressive mp4.
    pub url: String,
    /// Adaptive stream playlist, when the platform offers one.
    pub hls_url: Option<String>,
}

/// Animated GIF. The platform serves these as silent looping mp4s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Gif {
    pub id: String,
    pub preview: String,
    pub url: String,
}

// --- Entities ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Mention {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// An outbound link as the platform reports it: the short `t.co` form, the
/// expanded destination and the display form, plus its character span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UrlRef {
    pub url: String,
    pub expanded_url: String,
    pub display_url: String,
    pub span: Option<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub kind: String,
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

/// Geo-tag attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Place {
    pub id: String,
    pub place_type: String,
    pub name: String,
    pub full_name: String,
    pub country_code: String,
    pub country: String,
    pub bounding_box: Option<BoundingBox>,
}

// --- Post ---

/// A single post in canonical form, independent of the wire shape it was
/// decoded from.
///
/// `is_repost` implies `reposted.is_some()` and `is_quote` implies
/// `quoted.is_some()`. At most one of `reposted` and `quoted` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Post {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub username: String,
    /// Author display name.
    pub name: String,
    pub text: String,
    pub html: String,
    pub permanent_url: String,

    /// Seconds since the Unix epoch; 0 when the source date did not parse.
    pub timestamp: i64,
    pub time_parsed: DateTime<Utc>,

    pub likes: i64,
    pub reposts: i64,
    pub replies: i64,
    pub views: i64,

    pub photos: Vec<Photo>,
    pub videos: Vec<Video>,
    pub gifs: Vec<Gif>,
    pub sensitive_content: bool,

    pub hashtags: Vec<String>,
    pub mentions: Vec<Mention>,
    pub urls: Vec<UrlRef>,
    pub place: Option<Place>,

    // Raw identifiers, kept even when the owned relationship is absent.
    pub in_reply_to_id: Option<String>,
    pub quoted_id: Option<String>,
    pub reposted_id: Option<String>,
    pub self_thread_id: Option<String>,

    pub in_reply_to: Option<Box<Post>>,
    pub quoted: Option<Box<Post>>,
    pub reposted: Option<Box<Post>>,
    /// Continuations of a self-thread, oldest first. Only populated on the
    /// thread root, and only by caller-side linking.
    pub thread: Vec<Post>,

    pub is_reply: bool,
    pub is_repost: bool,
    pub is_quote: bool,
    pub is_pinned: bool,
    pub is_self_thread: bool,
}

impl Post {
    /// Whether `other` continues the self-thread started by this post.
    pub fn is_thread_root_of(&self, other: &Post) -> bool {
        other.is_self_thread && other.self_thread_id.as_deref() == Some(self.id.as_str())
    }
}

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub biography: String,
    pub location: String,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub url: String,

    pub followers_count: i64,
    pub following_count: i64,
    pub tweets_count: i64,
    pub likes_count: i64,
    pub listed_count: i64,
    pub media_count: i64,

    pub is_verified: bool,
    pub is_blue_verified: bool,
    pub is_private: bool,

    pub pinned_post_ids: Vec<String>,
    pub joined: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn has_pinned(&self, post_id: &str) -> bool {
        self.pinned_post_ids.iter().any(|id| id == post_id)
    }
}
