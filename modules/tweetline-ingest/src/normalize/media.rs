// Media extraction. The extended list is a superset of the simple one and
// replaces it whenever it is present.

use tracing::debug;

use tweetline_common::{Gif, Photo, Video};

use crate::wire::{LegacyTweet, MediaEntity};

const MP4: &str = "video/mp4";
const HLS: &str = "application/x-mpegURL";

/// Short link in the text that points at a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InlineMedia {
    pub short_url: String,
    pub media_url: String,
}

#[derive(Debug, Default)]
pub(crate) struct ExtractedMedia {
    pub photos: Vec<Photo>,
    pub videos: Vec<Video>,
    pub gifs: Vec<Gif>,
    pub sensitive: bool,
    pub inline: Vec<InlineMedia>,
}

pub(crate) fn extract(legacy: &LegacyTweet, post_id: &str) -> ExtractedMedia {
    let extended = legacy
        .extended_entities
        .as_ref()
        .map(|e| e.media.as_slice())
        .unwrap_or_default();
    let simple = legacy
        .entities
        .as_ref()
        .map(|e| e.media.as_slice())
        .unwrap_or_default();
    let list = if extended.is_empty() { simple } else { extended };

    let mut out = ExtractedMedia::default();
    for item in list {
        let id = item.id_str.clone().unwrap_or_default();
        let preview = item.media_url_https.clone().unwrap_or_default();

        if let Some(short) = item.url.as_deref().filter(|u| !u.is_empty()) {
            if !preview.is_empty() {
                out.inline.push(InlineMedia {
                    short_url: short.to_string(),
                    media_url: preview.clone(),
                });
            }
        }
        if item
            .ext_sensitive_media_warning
            .as_ref()
            .is_some_and(|w| w.any())
        {
            out.sensitive = true;
        }

        match item.kind.as_deref() {
            Some("photo") if !preview.is_empty() => out.photos.push(Photo { id, url: preview }),
            Some("video") => match best_variant(item, MP4) {
                Some(url) => out.videos.push(Video {
                    id,
                    preview,
                    url,
                    hls_url: best_variant(item, HLS),
                }),
                None => debug!(post_id, media_id = id.as_str(), "Unsupported media variant, video dropped"),
            },
            Some("animated_gif") => match best_variant(item, MP4) {
                Some(url) => out.gifs.push(Gif { id, preview, url }),
                None => debug!(post_id, media_id = id.as_str(), "Unsupported media variant, gif dropped"),
            },
            other => debug!(post_id, media_id = id.as_str(), kind = ?other, "Media entry skipped"),
        }
    }
    out
}

/// Highest-bitrate playable variant of the given container type.
fn best_variant(item: &MediaEntity, content_type: &str) -> Option<String> {
    item.video_info
        .as_ref()?
        .variants
        .iter()
        .filter(|v| v.content_type.as_deref() == Some(content_type))
        .filter(|v| v.url.as_deref().is_some_and(|u| !u.is_empty()))
        .max_by_key(|v| v.bitrate)
        .and_then(|v| v.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn legacy(raw: serde_json::Value) -> LegacyTweet {
        LegacyTweet::deserialize(&raw).unwrap()
    }

    #[test]
    fn picks_highest_bitrate_mp4_and_hls() {
        let tweet = legacy(json!({
            "extended_entities": { "media": [{
                "id_str": "v1",
                "type": "video",
                "media_url_https": "https://pbs/thumb.jpg",
                "video_info": { "variants": [
                    { "content_type": "video/mp4", "bitrate": 256000, "url": "https://v/low.mp4" },
                    { "content_type": "application/x-mpegURL", "url": "https://v/pl.m3u8" },
                    { "content_type": "video/mp4", "bitrate": 2176000, "url": "https://v/high.mp4" }
                ]}
            }]}
        }));
        let media = extract(&tweet, "1");
        assert_eq!(media.videos.len(), 1);
        assert_eq!(media.videos[0].url, "https://v/high.mp4");
        assert_eq!(media.videos[0].hls_url.as_deref(), Some("https://v/pl.m3u8"));
        assert_eq!(media.videos[0].preview, "https://pbs/thumb.jpg");
    }

    #[test]
    fn video_without_playable_variant_is_dropped() {
        let tweet = legacy(json!({
            "extended_entities": { "media": [
                { "id_str": "v1", "type": "video", "media_url_https": "https://pbs/t.jpg",
                  "video_info": { "variants": [{ "content_type": "application/x-mpegURL", "url": "https://v/pl.m3u8" }] } },
                { "id_str": "p1", "type": "photo", "media_url_https": "https://pbs/p.jpg" }
            ]}
        }));
        let media = extract(&tweet, "1");
        assert!(media.videos.is_empty());
        assert_eq!(media.photos.len(), 1);
    }

    #[test]
    fn extended_list_replaces_simple_list() {
        let tweet = legacy(json!({
            "entities": { "media": [
                { "id_str": "p1", "type": "photo", "media_url_https": "https://pbs/simple.jpg" }
            ]},
            "extended_entities": { "media": [
                { "id_str": "p1", "type": "photo", "media_url_https": "https://pbs/a.jpg" },
                { "id_str": "p2", "type": "photo", "media_url_https": "https://pbs/b.jpg" }
            ]}
        }));
        let media = extract(&tweet, "1");
        let urls: Vec<_> = media.photos.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://pbs/a.jpg", "https://pbs/b.jpg"]);
    }

    #[test]
    fn simple_list_used_when_extended_missing() {
        let tweet = legacy(json!({
            "entities": { "media": [
                { "id_str": "p1", "type": "photo", "media_url_https": "https://pbs/simple.jpg", "url": "https://t.co/abc" }
            ]}
        }));
        let media = extract(&tweet, "1");
        assert_eq!(media.photos[0].url, "https://pbs/simple.jpg");
        assert_eq!(media.inline[0].short_url, "https://t.co/abc");
    }

    #[test]
    fn sensitive_warning_flags_post() {
        let tweet = legacy(json!({
            "extended_entities": { "media": [{
                "id_str": "g1", "type": "animated_gif", "media_url_https": "https://pbs/g.jpg",
                "ext_sensitive_media_warning": { "graphic_violence": true },
                "video_info": { "variants": [{ "content_type": "video/mp4", "bitrate": 0, "url": "https://v/g.mp4" }] }
            }]}
        }));
        let media = extract(&tweet, "1");
        assert!(media.sensitive);
        assert_eq!(media.gifs[0].url, "https://v/g.mp4");
    }
}
