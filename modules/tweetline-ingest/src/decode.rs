// Raw-page decoding: response body → records + next cursor.
// Handles both the GraphQL timeline layout (instructions/entries with
// `*_results.result` payloads) and the older adaptive-search layout
// (`globalObjects` keyed by id, entries pointing into it).

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::{PageFetcher, RawPage};

/// How deep under `data` to look for the `instructions` array.
const MAX_INSTRUCTIONS_DEPTH: usize = 8;

/// How many levels of repost/quote references to inline from `globalObjects`.
const MAX_ADAPTIVE_EMBEDS: usize = 3;

/// Flat records reference reposts and quotes by id; the nested key is what
/// the normalizer reads.
const ADAPTIVE_EMBEDS: [(&str, &str); 2] = [
    ("retweeted_status_id_str", "retweeted_status"),
    ("quoted_status_id_str", "quoted_status"),
];

pub trait PageDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<RawPage, FetchError>;
}

/// Which records a timeline page carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEntity {
    Tweets,
    Users,
}

impl TimelineEntity {
    fn results_key(self) -> &'static str {
        match self {
            TimelineEntity::Tweets => "tweet_results",
            TimelineEntity::Users => "user_results",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimelineDecoder {
    entity: TimelineEntity,
}

impl TimelineDecoder {
    pub fn new(entity: TimelineEntity) -> Self {
        Self { entity }
    }

    pub fn tweets() -> Self {
        Self::new(TimelineEntity::Tweets)
    }

    pub fn users() -> Self {
        Self::new(TimelineEntity::Users)
    }

    pub fn entity(&self) -> TimelineEntity {
        self.entity
    }

    fn decode_graphql(&self, data: &Value) -> Result<RawPage, FetchError> {
        let instructions = find_instructions(data, MAX_INSTRUCTIONS_DEPTH).ok_or_else(|| {
            FetchError::Decode("no timeline instructions in response".to_string())
        })?;

        let mut page = RawPage::default();
        for instruction in instructions {
            match instruction["type"].as_str() {
                Some("TimelineAddEntries") => {
                    for entry in instruction["entries"].as_array().into_iter().flatten() {
                        self.graphql_entry(entry, &mut page);
                    }
                }
                Some("TimelineReplaceEntry") | Some("TimelinePinEntry") => {
                    self.graphql_entry(&instruction["entry"], &mut page);
                }
                _ => {}
            }
        }
        Ok(page)
    }

    fn graphql_entry(&self, entry: &Value, page: &mut RawPage) {
        if is_promoted(entry) {
            return;
        }
        let content = &entry["content"];
        let entry_type = content["entryType"]
            .as_str()
            .or_else(|| content["__typename"].as_str());

        match entry_type {
            Some("TimelineTimelineCursor") => {
                if content["cursorType"].as_str() == Some("Bottom") {
                    if let Some(value) = content["value"].as_str() {
                        page.next_cursor = value.to_string();
                    }
                }
            }
            Some("TimelineTimelineItem") => self.graphql_item(&content["itemContent"], page),
            Some("TimelineTimelineModule") => {
                for item in content["items"].as_array().into_iter().flatten() {
                    self.graphql_item(&item["item"]["itemContent"], page);
                }
            }
            other => debug!(entry_type = ?other, "Timeline entry skipped"),
        }
    }

    fn graphql_item(&self, item_content: &Value, page: &mut RawPage) {
        let result = &item_content[self.entity.results_key()]["result"];
        if result.is_object() {
            page.items.push(result.clone());
        }
    }

    fn decode_adaptive(&self, root: &Value, objects: &Map<String, Value>) -> RawPage {
        let globals = GlobalObjects {
            tweets: objects.get("tweets").and_then(Value::as_object),
            users: objects.get("users").and_then(Value::as_object),
        };

        let mut page = RawPage::default();
        let instructions = root["timeline"]["instructions"].as_array();
        for instruction in instructions.into_iter().flatten() {
            let entries: Vec<&Value> = if let Some(add) = instruction["addEntries"]["entries"].as_array() {
                add.iter().collect()
            } else if instruction["replaceEntry"]["entry"].is_object() {
                vec![&instruction["replaceEntry"]["entry"]]
            } else {
                Vec::new()
            };

            for entry in entries {
                if is_promoted(entry) {
                    continue;
                }
                let content = &entry["content"];
                let cursor = &content["operation"]["cursor"];
                if cursor["cursorType"].as_str() == Some("Bottom") {
                    if let Some(value) = cursor["value"].as_str() {
                        page.next_cursor = value.to_string();
                    }
                    continue;
                }

                let item = &content["item"]["content"];
                match self.entity {
                    TimelineEntity::Tweets => {
                        let Some(id) = item["tweet"]["id"].as_str() else { continue };
                        let Some(tweet) = globals.tweet(id) else {
                            debug!(post_id = id, "Entry references a tweet missing from globalObjects");
                            continue;
                        };
                        page.items.push(globals.resolve(tweet, 0));
                    }
                    TimelineEntity::Users => {
                        let Some(id) = item["user"]["id"].as_str() else { continue };
                        if let Some(user) = globals.user(id) {
                            page.items.push(user.clone());
                        }
                    }
                }
            }
        }
        page
    }
}

impl PageDecoder for TimelineDecoder {
    fn decode(&self, body: &[u8]) -> Result<RawPage, FetchError> {
        let root: Value = serde_json::from_slice(body)?;

        if let Some(objects) = root.get("globalObjects").and_then(Value::as_object) {
            return Ok(self.decode_adaptive(&root, objects));
        }

        match root.get("data") {
            Some(data) if !data.is_null() => self.decode_graphql(data),
            _ => Err(platform_error(&root)),
        }
    }
}

/// The id-keyed tables of an adaptive response.
struct GlobalObjects<'a> {
    tweets: Option<&'a Map<String, Value>>,
    users: Option<&'a Map<String, Value>>,
}

impl GlobalObjects<'_> {
    fn tweet(&self, id: &str) -> Option<&Value> {
        self.tweets.and_then(|t| t.get(id))
    }

    fn user(&self, id: &str) -> Option<&Value> {
        self.users.and_then(|u| u.get(id))
    }

    /// Copy a tweet with its author object attached and its repost/quote
    /// references inlined. Objects the record already carries are kept.
    fn resolve(&self, tweet: &Value, depth: usize) -> Value {
        let mut tweet = tweet.clone();
        let Some(obj) = tweet.as_object_mut() else {
            return tweet;
        };

        if !obj.contains_key("user") {
            let author = obj
                .get("user_id_str")
                .and_then(Value::as_str)
                .and_then(|id| self.user(id));
            if let Some(author) = author {
                obj.insert("user".to_string(), author.clone());
            }
        }

        if depth >= MAX_ADAPTIVE_EMBEDS {
            return tweet;
        }
        for (id_key, embed_key) in ADAPTIVE_EMBEDS {
            if obj.contains_key(embed_key) {
                continue;
            }
            let Some(id) = obj.get(id_key).and_then(Value::as_str) else {
                continue;
            };
            match self.tweet(id) {
                Some(referenced) => {
                    let embed = self.resolve(referenced, depth + 1);
                    obj.insert(embed_key.to_string(), embed);
                }
                None => debug!(post_id = id, field = embed_key, "Referenced tweet missing from globalObjects"),
            }
        }
        tweet
    }
}

fn is_promoted(entry: &Value) -> bool {
    entry["entryId"]
        .as_str()
        .is_some_and(|id| id.starts_with("promoted"))
}

fn find_instructions(value: &Value, depth: usize) -> Option<&Vec<Value>> {
    let obj = value.as_object()?;
    if let Some(instructions) = obj.get("instructions").and_then(Value::as_array) {
        return Some(instructions);
    }
    if depth == 0 {
        return None;
    }
    obj.values().find_map(|child| find_instructions(child, depth - 1))
}

fn platform_error(root: &Value) -> FetchError {
    let message = root["errors"]
        .as_array()
        .and_then(|errors| errors.first())
        .and_then(|e| e["message"].as_str())
        .unwrap_or("response carried no data");
    FetchError::Platform(message.to_string())
}

/// Produces raw response bodies; pairs with a `PageDecoder`.
#[async_trait]
pub trait BodySource: Send + Sync {
    async fn fetch_body(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<Vec<u8>, FetchError>;
}

/// A `PageFetcher` built from a body source and a decoder. Decode failures
/// surface as the fetcher's error.
pub struct DecodingFetcher<S, D> {
    source: S,
    decoder: D,
}

impl<S: BodySource, D: PageDecoder> DecodingFetcher<S, D> {
    pub fn new(source: S, decoder: D) -> Self {
        Self { source, decoder }
    }
}

#[async_trait]
impl<S: BodySource, D: PageDecoder> PageFetcher for DecodingFetcher<S, D> {
    async fn fetch_page(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<RawPage, FetchError> {
        let body = self.source.fetch_body(query, remaining, cursor).await?;
        self.decoder.decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instructions_found_at_any_depth() {
        let data = json!({ "a": { "b": { "timeline": { "instructions": [] } } } });
        assert!(find_instructions(&data, MAX_INSTRUCTIONS_DEPTH).is_some());
        assert!(find_instructions(&data, 1).is_none());
    }

    #[test]
    fn author_attached_without_overwriting() {
        let users = json!({ "7": { "screen_name": "alice" } });
        let globals = GlobalObjects { tweets: None, users: users.as_object() };

        let tweet = globals.resolve(&json!({ "id_str": "1", "user_id_str": "7" }), 0);
        assert_eq!(tweet["user"]["screen_name"], "alice");

        let tweet = globals.resolve(
            &json!({ "id_str": "1", "user_id_str": "7", "user": { "screen_name": "kept" } }),
            0,
        );
        assert_eq!(tweet["user"]["screen_name"], "kept");
    }

    #[test]
    fn references_inline_until_depth_limit() {
        let tweets = json!({
            "1": { "id_str": "1", "user_id_str": "7", "quoted_status_id_str": "1" }
        });
        let globals = GlobalObjects { tweets: tweets.as_object(), users: None };

        let tweet = globals.resolve(&tweets["1"], 0);
        let mut level = &tweet;
        for _ in 0..MAX_ADAPTIVE_EMBEDS {
            level = &level["quoted_status"];
            assert_eq!(level["id_str"], "1");
        }
        assert!(level.get("quoted_status").is_none());
    }

    #[test]
    fn existing_embed_is_not_replaced() {
        let tweets = json!({ "2": { "id_str": "2", "full_text": "from table" } });
        let globals = GlobalObjects { tweets: tweets.as_object(), users: None };

        let tweet = globals.resolve(
            &json!({
                "id_str": "1",
                "retweeted_status_id_str": "2",
                "retweeted_status": { "id_str": "2", "full_text": "inline" }
            }),
            0,
        );
        assert_eq!(tweet["retweeted_status"]["full_text"], "inline");
    }

    #[test]
    fn missing_data_reports_platform_error() {
        let body = br#"{ "errors": [{ "message": "Rate limit exceeded", "code": 88 }] }"#;
        assert_eq!(
            TimelineDecoder::tweets().decode(body),
            Err(FetchError::Platform("Rate limit exceeded".to_string()))
        );
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(
            TimelineDecoder::tweets().decode(b"<html>"),
            Err(FetchError::Decode(_))
        ));
    }
}
