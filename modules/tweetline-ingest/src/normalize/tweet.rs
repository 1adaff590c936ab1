// Post normalization: wire shape → neutral view → canonical Post.

use chrono::DateTime;
use serde_json::Value;
use tracing::debug;

use tweetline_common::{Mention, Place, Post, UrlRef};

use crate::error::NormalizeError;
use crate::wire::{Entities, LegacyTweet, NoteTweetResult, WirePlace, WireTweet};

use super::profile::UserView;
use super::{first_present, html, media, parse_platform_date, required, NormalizeOptions};

/// Normalize one raw post record, detecting its wire shape.
pub fn normalize_post(raw: &Value, options: &NormalizeOptions) -> Result<Post, NormalizeError> {
    let wire = WireTweet::detect(raw)?;
    normalize_wire_post(&wire, options)
}

/// Normalize an already decoded post record as a top-level entity.
pub fn normalize_wire_post(
    wire: &WireTweet,
    options: &NormalizeOptions,
) -> Result<Post, NormalizeError> {
    build_post(&TweetView::from_wire(wire), 0, options)
}

/// Shape-independent view of a post record. Both wire shapes project onto
/// this, so there is only one place that builds a `Post`.
struct TweetView<'a> {
    id: [Option<&'a str>; 2],
    author_id: [Option<&'a str>; 2],
    author: Option<UserView<'a>>,
    legacy: &'a LegacyTweet,
    views: Option<&'a str>,
    note: Option<&'a NoteTweetResult>,
    reposted: Option<&'a Value>,
    quoted: Option<&'a Value>,
}

impl<'a> TweetView<'a> {
    fn from_wire(wire: &'a WireTweet) -> Self {
        match wire {
            WireTweet::V2(tweet) => {
                let legacy = &tweet.legacy;
                let user = tweet
                    .core
                    .as_ref()
                    .and_then(|core| core.user_results.as_ref())
                    .and_then(|envelope| envelope.result.as_ref());
                let author = user.map(UserView::from_v2);
                TweetView {
                    id: [tweet.rest_id.as_deref(), legacy.id_str.as_deref()],
                    author_id: [
                        legacy.user_id_str.as_deref(),
                        author.as_ref().and_then(|a| a.id),
                    ],
                    author,
                    legacy,
                    views: tweet
                        .views
                        .as_ref()
                        .and_then(|v| v.count.as_deref())
                        .or_else(|| legacy.ext_views.as_ref().and_then(|v| v.count.as_deref())),
                    note: tweet
                        .note_tweet
                        .as_ref()
                        .and_then(|n| n.note_tweet_results.as_ref())
                        .and_then(|r| r.result.as_ref()),
                    reposted: legacy
                        .retweeted_status_result
                        .as_ref()
                        .and_then(|r| r.result.as_ref()),
                    quoted: tweet
                        .quoted_status_result
                        .as_ref()
                        .and_then(|r| r.result.as_ref()),
                }
            }
            WireTweet::Legacy(legacy) => {
                let author = legacy.user.as_ref().map(UserView::from_legacy);
                TweetView {
                    id: [legacy.id_str.as_deref(), None],
                    author_id: [
                        legacy.user_id_str.as_deref(),
                        author.as_ref().and_then(|a| a.id),
                    ],
                    author,
                    legacy,
                    views: legacy.ext_views.as_ref().and_then(|v| v.count.as_deref()),
                    note: None,
                    reposted: legacy
                        .retweeted_status_result
                        .as_ref()
                        .and_then(|r| r.result.as_ref())
                        .or(legacy.retweeted_status.as_ref()),
                    quoted: legacy.quoted_status.as_ref(),
                }
            }
        }
    }
}

fn build_post(
    view: &TweetView<'_>,
    depth: usize,
    options: &NormalizeOptions,
) -> Result<Post, NormalizeError> {
    let legacy = view.legacy;
    let id = required(&view.id, "id")?;
    let user_id = required(&view.author_id, "user_id")?;
    let username = view
        .author
        .as_ref()
        .and_then(|a| a.username)
        .unwrap_or_default()
        .to_string();
    let name = view
        .author
        .as_ref()
        .and_then(|a| a.name)
        .unwrap_or_default()
        .to_string();

    let empty = Entities::default();
    let (text, entities) = match view.note.and_then(|n| n.text.as_deref()) {
        Some(note_text) if !note_text.is_empty() => (
            note_text.to_string(),
            view.note
                .and_then(|n| n.entity_set.as_ref())
                .or(legacy.entities.as_ref())
                .unwrap_or(&empty),
        ),
        _ => (
            first_present(&[legacy.full_text.as_deref(), legacy.text.as_deref()]).unwrap_or_default(),
            legacy.entities.as_ref().unwrap_or(&empty),
        ),
    };

    let time_parsed = match legacy.created_at.as_deref() {
        Some(raw) => parse_platform_date(raw).unwrap_or_else(|| {
            debug!(post_id = id.as_str(), raw, "Unparseable timestamp, keeping zero time");
            DateTime::UNIX_EPOCH
        }),
        None => DateTime::UNIX_EPOCH,
    };

    let hashtags = entities
        .hashtags
        .iter()
        .filter_map(|h| first_present(&[h.text.as_deref()]))
        .collect();
    let mentions = entities
        .user_mentions
        .iter()
        .filter_map(|m| {
            Some(Mention {
                username: first_present(&[m.screen_name.as_deref()])?,
                id: m.id_str.clone().unwrap_or_default(),
                name: m.name.clone().unwrap_or_default(),
            })
        })
        .collect();
    let urls: Vec<UrlRef> = entities
        .urls
        .iter()
        .filter_map(|u| {
            let short = first_present(&[u.url.as_deref()])?;
            Some(UrlRef {
                expanded_url: first_present(&[u.expanded_url.as_deref()])
                    .unwrap_or_else(|| short.clone()),
                display_url: u.display_url.clone().unwrap_or_default(),
                span: match u.indices.as_slice() {
                    [start, end] => Some([*start, *end]),
                    _ => None,
                },
                url: short,
            })
        })
        .collect();

    let media = media::extract(legacy, &id);
    let html = html::render(&text, &urls, &media, &options.permalink_base);

    let in_reply_to_id = first_present(&[legacy.in_reply_to_status_id_str.as_deref()]);
    let self_thread_id = first_present(&[legacy
        .self_thread
        .as_ref()
        .and_then(|t| t.id_str.as_deref())]);
    let is_self_thread = self_thread_id.as_deref().is_some_and(|root| root != id);

    // A resolved repost never doubles as a quote; any quote belongs to the
    // reposted post.
    let reposted = embedded(view.reposted, depth, options, "repost", &id);
    let quoted = if reposted.is_some() {
        None
    } else {
        embedded(view.quoted, depth, options, "quote", &id)
    };

    let reposted_id = first_present(&[legacy.retweeted_status_id_str.as_deref()])
        .or_else(|| reposted.as_ref().map(|p| p.id.clone()));
    let quoted_id = first_present(&[legacy.quoted_status_id_str.as_deref()])
        .or_else(|| quoted.as_ref().map(|p| p.id.clone()));

    let permalink_user = if username.is_empty() { "i/web" } else { username.as_str() };

    Ok(Post {
        conversation_id: first_present(&[legacy.conversation_id_str.as_deref()])
            .unwrap_or_else(|| id.clone()),
        permanent_url: format!("{}/{}/status/{}", options.permalink_base, permalink_user, id),
        user_id,
        name,
        text,
        html,
        timestamp: time_parsed.timestamp(),
        time_parsed,
        likes: legacy.favorite_count,
        reposts: legacy.retweet_count,
        replies: legacy.reply_count,
        views: view
            .views
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default(),
        photos: media.photos,
        videos: media.videos,
        gifs: media.gifs,
        sensitive_content: media.sensitive,
        hashtags,
        mentions,
        urls,
        place: legacy.place.as_ref().and_then(convert_place),
        is_reply: in_reply_to_id.is_some(),
        is_repost: reposted.is_some(),
        is_quote: quoted.is_some(),
        is_pinned: false,
        is_self_thread,
        in_reply_to_id,
        quoted_id,
        reposted_id,
        self_thread_id,
        in_reply_to: None,
        quoted,
        reposted,
        thread: Vec::new(),
        username,
        id,
    })
}

/// Resolve an embedded repost or quote one level deeper. Anything that
/// cannot be resolved, including records past the depth limit, becomes an
/// absent relationship rather than an error.
fn embedded(
    raw: Option<&Value>,
    depth: usize,
    options: &NormalizeOptions,
    relation: &'static str,
    parent_id: &str,
) -> Option<Box<Post>> {
    let raw = raw.filter(|v| v.is_object())?;

    if depth >= options.max_embed_depth {
        debug!(
            post_id = parent_id,
            relation,
            depth,
            max_depth = options.max_embed_depth,
            "Recursion limit exceeded, truncating embedded record"
        );
        return None;
    }

    let wire = match WireTweet::detect(raw) {
        Ok(wire) => wire,
        Err(err) => {
            debug!(post_id = parent_id, relation, error = %err, "Undecodable embedded record dropped");
            return None;
        }
    };

    match build_post(&TweetView::from_wire(&wire), depth + 1, options) {
        Ok(post) => Some(Box::new(post)),
        Err(err) => {
            debug!(post_id = parent_id, relation, error = %err, "Embedded record dropped");
            None
        }
    }
}

fn convert_place(place: &WirePlace) -> Option<Place> {
    let id = first_present(&[place.id.as_deref()])?;
    Some(Place {
        id,
        place_type: place.place_type.clone().unwrap_or_default(),
        name: place.name.clone().unwrap_or_default(),
        full_name: place.full_name.clone().unwrap_or_default(),
        country_code: place.country_code.clone().unwrap_or_default(),
        country: place.country.clone().unwrap_or_default(),
        bounding_box: place.bounding_box.as_ref().map(|b| tweetline_common::BoundingBox {
            kind: b.kind.clone().unwrap_or_default(),
            coordinates: b.coordinates.clone(),
        }),
    })
}
