//! Shared fixtures for integration tests: hand-built wire records and a
//! scripted fetcher that serves canned pages and records every call.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use tweetline_ingest::{FetchError, PageFetcher, RawPage};

pub const CREATED_AT: &str = "Wed Oct 10 20:19:24 +0000 2018";

/// A flat record with the minimum a post needs.
pub fn legacy_tweet(id: &str, text: &str) -> Value {
    json!({
        "id_str": id,
        "user_id_str": "7",
        "created_at": CREATED_AT,
        "full_text": text,
        "user": { "id_str": "7", "screen_name": "alice", "name": "Alice" }
    })
}

/// The same content as [`legacy_tweet`] in the nested shape.
pub fn v2_tweet(id: &str, text: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": id,
        "core": {
            "user_results": {
                "result": {
                    "__typename": "User",
                    "rest_id": "7",
                    "legacy": { "screen_name": "alice", "name": "Alice" }
                }
            }
        },
        "legacy": {
            "id_str": id,
            "user_id_str": "7",
            "created_at": CREATED_AT,
            "full_text": text
        }
    })
}

/// A flat record exercising every field the normalizer maps: counters in
/// both number and string form, entities with spans, extended media, a
/// place, reply and thread ids, views and an embedded quote.
pub fn rich_legacy_tweet(id: &str) -> Value {
    let text = "@bob #rust tips https://t.co/lnk https://t.co/med";
    json!({
        "id_str": id,
        "user_id_str": "7",
        "conversation_id_str": "90",
        "created_at": CREATED_AT,
        "full_text": text,
        "favorite_count": 12,
        "retweet_count": "3",
        "reply_count": null,
        "in_reply_to_status_id_str": "90",
        "self_thread": { "id_str": "90" },
        "quoted_status_id_str": "60",
        "ext_views": { "count": "4501", "state": "EnabledWithCount" },
        "entities": {
            "hashtags": [{ "text": "rust", "indices": [5, 10] }],
            "user_mentions": [{ "id_str": "8", "screen_name": "bob", "name": "Bob", "indices": [0, 4] }],
            "urls": [{
                "url": "https://t.co/lnk",
                "expanded_url": "https://example.com/tips",
                "display_url": "example.com/tips",
                "indices": [16, 32]
            }],
            "media": [{ "id_str": "m1", "type": "photo", "media_url_https": "https://pbs/simple.jpg" }]
        },
        "extended_entities": { "media": [
            { "id_str": "m1", "type": "photo", "media_url_https": "https://pbs/one.jpg", "url": "https://t.co/med" },
            {
                "id_str": "m2",
                "type": "video",
                "media_url_https": "https://pbs/thumb.jpg",
                "url": "https://t.co/med",
                "video_info": { "variants": [
                    { "content_type": "video/mp4", "bitrate": "256000", "url": "https://v/low.mp4" },
                    { "content_type": "application/x-mpegURL", "url": "https://v/pl.m3u8" },
                    { "content_type": "video/mp4", "bitrate": 2176000, "url": "https://v/high.mp4" }
                ]},
                "ext_sensitive_media_warning": { "other": true }
            }
        ]},
        "place": {
            "id": "p1",
            "place_type": "city",
            "name": "Lisbon",
            "full_name": "Lisbon, Portugal",
            "country_code": "PT",
            "country": "Portugal",
            "bounding_box": { "type": "Polygon", "coordinates": [[[-9.2, 38.7], [-9.1, 38.7], [-9.1, 38.8]]] }
        },
        "user": { "id_str": "7", "screen_name": "alice", "name": "Alice" },
        "quoted_status": legacy_tweet("60", "the quoted one")
    })
}

/// Rewrap a flat record in the nested shape: the author moves under `core`,
/// an embedded quote under `quoted_status_result`, everything else under
/// `legacy`.
pub fn nest(flat: &Value) -> Value {
    let mut legacy = flat.clone();
    let fields = legacy.as_object_mut().expect("flat record is an object");
    let user = fields.remove("user").unwrap_or_default();
    let quoted = fields.remove("quoted_status");

    let mut nested = json!({
        "__typename": "Tweet",
        "rest_id": flat["id_str"],
        "core": { "user_results": { "result": {
            "__typename": "User",
            "rest_id": user["id_str"],
            "legacy": user
        }}},
        "legacy": legacy
    });
    if let Some(quoted) = quoted {
        nested["quoted_status_result"] = json!({ "result": nest(&quoted) });
    }
    nested
}

/// `depth` v2 records, each quoting the next.
pub fn quote_chain(depth: usize) -> Value {
    let mut record = v2_tweet(&format!("q{depth}"), &format!("level {depth}"));
    for level in (0..depth).rev() {
        let mut outer = v2_tweet(&format!("q{level}"), &format!("level {level}"));
        outer["quoted_status_result"] = json!({ "result": record });
        record = outer;
    }
    record
}

/// Numbered posts `start..start + count`.
pub fn posts(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| legacy_tweet(&i.to_string(), &format!("post {i}")))
        .collect()
}

/// A record every normalizer rejects.
pub fn malformed() -> Value {
    json!({ "full_text": "no id, no author" })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub query: String,
    pub remaining: usize,
    pub cursor: String,
}

/// Serves one scripted response per call, in order. Calls past the end of
/// the script get an empty, final page.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<Vec<Result<RawPage, FetchError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<RawPage, FetchError>>) -> Self {
        let mut script = script;
        script.reverse();
        Self {
            script: Arc::new(Mutex::new(script)),
            calls: Arc::default(),
        }
    }

    /// `total` numbered posts split into pages of `page_size`, chained by
    /// cursors `c1`, `c2`, ... with an empty cursor after the last page.
    pub fn paged(total: usize, page_size: usize) -> Self {
        let pages = total.div_ceil(page_size);
        let script = (0..pages)
            .map(|p| {
                let start = p * page_size;
                let count = page_size.min(total - start);
                let next = if p + 1 == pages { String::new() } else { format!("c{}", p + 1) };
                Ok(RawPage::new(posts(start, count), next))
            })
            .collect();
        Self::new(script)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shared(&self) -> Arc<dyn PageFetcher> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<RawPage, FetchError> {
        self.calls.lock().unwrap().push(Call {
            query: query.to_string(),
            remaining,
            cursor: cursor.to_string(),
        });
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(RawPage::default()))
    }
}
