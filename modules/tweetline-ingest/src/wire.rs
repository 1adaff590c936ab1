// Wire shapes for posts and users as the platform's web API sends them.
// Two layouts coexist in a single response: the legacy flat record and the
// nested v2 record that wraps a `legacy` sub-object. Embedded reposts and
// quotes are kept as raw JSON so shape detection runs again on each level.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

const VISIBILITY_WRAPPER: &str = "TweetWithVisibilityResults";

// --- Shape detection ---

/// A post in whichever wire shape it arrived in.
#[derive(Debug, Clone)]
pub enum WireTweet {
    V2(Box<TweetV2>),
    Legacy(Box<LegacyTweet>),
}

impl WireTweet {
    /// Pick the v2 shape when `legacy` is a non-empty object, the flat shape
    /// otherwise. Visibility wrappers are peeled off first.
    pub fn detect(value: &Value) -> Result<Self, serde_json::Error> {
        let value = unwrap_visibility(value);
        if has_object(value, "legacy") {
            TweetV2::deserialize(value).map(|t| WireTweet::V2(Box::new(t)))
        } else {
            LegacyTweet::deserialize(value).map(|t| WireTweet::Legacy(Box::new(t)))
        }
    }
}

/// A user in whichever wire shape it arrived in.
#[derive(Debug, Clone)]
pub enum WireUser {
    V2(Box<UserV2>),
    Legacy(Box<LegacyUser>),
}

impl WireUser {
    pub fn detect(value: &Value) -> Result<Self, serde_json::Error> {
        if has_object(value, "legacy") {
            UserV2::deserialize(value).map(|u| WireUser::V2(Box::new(u)))
        } else {
            LegacyUser::deserialize(value).map(|u| WireUser::Legacy(Box::new(u)))
        }
    }
}

fn unwrap_visibility(mut value: &Value) -> &Value {
    while value.get("__typename").and_then(Value::as_str) == Some(VISIBILITY_WRAPPER) {
        match value.get("tweet") {
            Some(inner) if inner.is_object() => value = inner,
            _ => break,
        }
    }
    value
}

fn has_object(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_object)
        .is_some_and(|obj| !obj.is_empty())
}

// --- Posts ---

/// The flat record. Also the `legacy` sub-object of a v2 record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyTweet {
    pub id_str: Option<String>,
    pub user_id_str: Option<String>,
    pub conversation_id_str: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    pub full_text: Option<String>,
    pub text: Option<String>,

    #[serde(default, deserialize_with = "count")]
    pub favorite_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub retweet_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub reply_count: i64,

    pub entities: Option<Entities>,
    pub extended_entities: Option<ExtendedEntities>,
    pub place: Option<WirePlace>,
    pub ext_views: Option<Views>,
    pub self_thread: Option<SelfThread>,

    pub in_reply_to_status_id_str: Option<String>,
    pub quoted_status_id_str: Option<String>,
    pub retweeted_status_id_str: Option<String>,
    pub retweeted_status_result: Option<ResultEnvelope>,

    /// Author object; flat records only.
    pub user: Option<LegacyUser>,
    /// Embedded repost; flat records only.
    pub retweeted_status: Option<Value>,
    /// Embedded quote; flat records only.
    pub quoted_status: Option<Value>,
}

/// The nested record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetV2 {
    #[serde(rename = "__typename")]
    pub typename: Option<String>,
    pub rest_id: Option<String>,
    pub core: Option<TweetCore>,
    pub views: Option<Views>,
    pub note_tweet: Option<NoteTweet>,
    pub quoted_status_result: Option<ResultEnvelope>,
    #[serde(default)]
    pub legacy: LegacyTweet,
}

/// `{ "result": ... }` around an embedded record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultEnvelope {
    pub result: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetCore {
    pub user_results: Option<UserEnvelope>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEnvelope {
    pub result: Option<UserV2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Views {
    #[serde(default, deserialize_with = "lenient_string")]
    pub count: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelfThread {
    pub id_str: Option<String>,
}

/// Long-form post body; the legacy `full_text` is truncated when this is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteTweet {
    pub note_tweet_results: Option<NoteTweetResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteTweetResults {
    pub result: Option<NoteTweetResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteTweetResult {
    pub text: Option<String>,
    pub entity_set: Option<Entities>,
}

// --- Entities ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entities {
    #[serde(default, deserialize_with = "nullable")]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default, deserialize_with = "nullable")]
    pub media: Vec<MediaEntity>,
    #[serde(default, deserialize_with = "nullable")]
    pub urls: Vec<UrlEntity>,
    #[serde(default, deserialize_with = "nullable")]
    pub user_mentions: Vec<MentionEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedEntities {
    #[serde(default, deserialize_with = "nullable")]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashtagEntity {
    pub text: Option<String>,
    #[serde(default, deserialize_with = "indices")]
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentionEntity {
    pub id_str: Option<String>,
    pub screen_name: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "indices")]
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlEntity {
    pub url: Option<String>,
    pub expanded_url: Option<String>,
    pub display_url: Option<String>,
    #[serde(default, deserialize_with = "indices")]
    pub indices: Vec<usize>,
}

/// Media entry from either `entities.media` or `extended_entities.media`;
/// only the extended list carries `video_info` and sensitivity warnings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaEntity {
    pub id_str: Option<String>,
    pub media_url_https: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    pub video_info: Option<VideoInfo>,
    pub ext_sensitive_media_warning: Option<SensitiveMediaWarning>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub variants: Vec<VideoVariant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoVariant {
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "count")]
    pub bitrate: i64,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensitiveMediaWarning {
    #[serde(default)]
    pub adult_content: bool,
    #[serde(default)]
    pub graphic_violence: bool,
    #[serde(default)]
    pub other: bool,
}

impl SensitiveMediaWarning {
    pub fn any(&self) -> bool {
        self.adult_content || self.graphic_violence || self.other
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirePlace {
    pub id: Option<String>,
    pub place_type: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub bounding_box: Option<WireBoundingBox>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireBoundingBox {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

// --- Users ---

/// The flat user record. Also the `legacy` sub-object of a v2 user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyUser {
    pub id_str: Option<String>,
    pub screen_name: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    pub entities: Option<UserEntities>,

    #[serde(default, deserialize_with = "count")]
    pub followers_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub friends_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub statuses_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub favourites_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub listed_count: i64,
    #[serde(default, deserialize_with = "count")]
    pub media_count: i64,

    pub verified: Option<bool>,
    pub protected: Option<bool>,
    pub profile_image_url_https: Option<String>,
    pub profile_banner_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub pinned_tweet_ids_str: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEntities {
    pub url: Option<UrlList>,
    pub description: Option<UrlList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlList {
    #[serde(default, deserialize_with = "nullable")]
    pub urls: Vec<UrlEntity>,
}

/// The nested user record. Newer top-level groups (`core`, `avatar`,
/// `location`, `privacy`, `verification`) duplicate parts of `legacy`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserV2 {
    #[serde(rename = "__typename")]
    pub typename: Option<String>,
    pub id: Option<String>,
    pub rest_id: Option<String>,
    pub is_blue_verified: Option<bool>,
    pub core: Option<UserCore>,
    pub avatar: Option<UserAvatar>,
    pub location: Option<UserLocation>,
    pub privacy: Option<UserPrivacy>,
    pub verification: Option<UserVerification>,
    pub profile_bio: Option<UserBio>,
    #[serde(default)]
    pub legacy: LegacyUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserCore {
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    pub name: Option<String>,
    pub screen_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAvatar {
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLocation {
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPrivacy {
    pub protected: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserVerification {
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserBio {
    pub description: Option<String>,
}

// --- Lenient field decoders ---

/// `null` decodes to the type's default instead of failing the record.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Counters arrive as numbers, numeric strings, or null.
fn count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// Strings pass through and numbers keep their decimal form; anything else
/// is treated as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Character spans. A list with any entry that is not a non-negative
/// integer is dropped whole so start and end never drift apart.
fn indices<'de, D>(deserializer: D) -> Result<Vec<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(items)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .map(|v| v.as_u64().and_then(|n| usize::try_from(n).ok()))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_shape_detected_by_legacy_object() {
        let raw = json!({ "rest_id": "1", "legacy": { "id_str": "1", "full_text": "hi" } });
        assert!(matches!(WireTweet::detect(&raw).unwrap(), WireTweet::V2(_)));
    }

    #[test]
    fn empty_legacy_object_falls_back_to_flat() {
        let raw = json!({ "id_str": "1", "user_id_str": "2", "legacy": {} });
        assert!(matches!(WireTweet::detect(&raw).unwrap(), WireTweet::Legacy(_)));
    }

    #[test]
    fn visibility_wrapper_is_peeled() {
        let raw = json!({
            "__typename": "TweetWithVisibilityResults",
            "tweet": { "rest_id": "9", "legacy": { "id_str": "9" } }
        });
        match WireTweet::detect(&raw).unwrap() {
            WireTweet::V2(t) => assert_eq!(t.rest_id.as_deref(), Some("9")),
            WireTweet::Legacy(_) => panic!("expected nested shape"),
        }
    }

    #[test]
    fn counters_accept_strings_and_null() {
        let raw = json!({ "id_str": "1", "favorite_count": "12", "retweet_count": null, "reply_count": 3 });
        let tweet = LegacyTweet::deserialize(&raw).unwrap();
        assert_eq!(tweet.favorite_count, 12);
        assert_eq!(tweet.retweet_count, 0);
        assert_eq!(tweet.reply_count, 3);
    }

    #[test]
    fn null_lists_decode_empty() {
        let raw = json!({ "hashtags": null, "urls": [], "user_mentions": null });
        let entities = Entities::deserialize(&raw).unwrap();
        assert!(entities.hashtags.is_empty());
        assert!(entities.user_mentions.is_empty());
    }

    #[test]
    fn non_string_timestamp_is_absent_not_fatal() {
        let raw = json!({ "id_str": "1", "user_id_str": "7", "created_at": { "epoch": 1 } });
        let tweet = LegacyTweet::deserialize(&raw).unwrap();
        assert!(tweet.created_at.is_none());

        let raw = json!({ "id_str": "1", "user_id_str": "7", "created_at": 1539202764 });
        let tweet = LegacyTweet::deserialize(&raw).unwrap();
        assert_eq!(tweet.created_at.as_deref(), Some("1539202764"));
    }

    #[test]
    fn bad_indices_drop_the_span() {
        let raw = json!({ "url": "https://t.co/a", "indices": [-1, 4] });
        assert!(UrlEntity::deserialize(&raw).unwrap().indices.is_empty());

        let raw = json!({ "url": "https://t.co/a", "indices": "0,4" });
        assert!(UrlEntity::deserialize(&raw).unwrap().indices.is_empty());

        let raw = json!({ "url": "https://t.co/a", "indices": [0, 4] });
        assert_eq!(UrlEntity::deserialize(&raw).unwrap().indices, vec![0, 4]);
    }

    #[test]
    fn bitrate_accepts_strings() {
        let raw = json!({ "content_type": "video/mp4", "bitrate": "832000", "url": "https://v/a.mp4" });
        assert_eq!(VideoVariant::deserialize(&raw).unwrap().bitrate, 832_000);

        let raw = json!({ "content_type": "video/mp4", "url": "https://v/a.mp4" });
        assert_eq!(VideoVariant::deserialize(&raw).unwrap().bitrate, 0);
    }

    #[test]
    fn numeric_view_count_kept_as_text() {
        let views = Views::deserialize(&json!({ "count": 991 })).unwrap();
        assert_eq!(views.count.as_deref(), Some("991"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = json!({ "id_str": "1", "brand_new_field": { "nested": [1, 2, 3] } });
        assert!(LegacyTweet::deserialize(&raw).is_ok());
    }
}
