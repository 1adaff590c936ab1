// HTML rendering of post text: hashtags, mentions and short links become
// anchors, media not already inlined is appended.

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use tweetline_common::UrlRef;

use super::media::ExtractedMedia;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\B#\w+").expect("valid regex"));
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\B@\w+").expect("valid regex"));
static SHORT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://t\.co/\w+").expect("valid regex"));

/// Escape a value for use inside a double-quoted attribute.
fn attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '\'', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

pub(crate) fn render(text: &str, urls: &[UrlRef], media: &ExtractedMedia, base: &str) -> String {
    let base = attr(base);
    let html = HASHTAG_RE
        .replace_all(text, |caps: &Captures| {
            let tag = &caps[0];
            format!(r#"<a href="{base}/hashtag/{}">{tag}</a>"#, &tag[1..])
        })
        .into_owned();

    let html = MENTION_RE
        .replace_all(&html, |caps: &Captures| {
            let handle = &caps[0];
            format!(r#"<a href="{base}/{}">{handle}</a>"#, &handle[1..])
        })
        .into_owned();

    let mut inlined: Vec<&str> = Vec::new();
    let mut html = SHORT_LINK_RE
        .replace_all(&html, |caps: &Captures| {
            let short = &caps[0];
            if let Some(link) = urls.iter().find(|u| u.url == short) {
                return format!(r#"<a href="{}">{short}</a>"#, attr(&link.expanded_url));
            }
            if let Some(item) = media.inline.iter().find(|m| m.short_url == short) {
                inlined.push(item.media_url.as_str());
                return format!(r#"<br><a href="{short}"><img src="{}"/></a>"#, attr(&item.media_url));
            }
            short.to_string()
        })
        .into_owned();

    for photo in &media.photos {
        if !inlined.contains(&photo.url.as_str()) {
            let _ = write!(html, r#"<br><img src="{}"/>"#, attr(&photo.url));
        }
    }
    for video in &media.videos {
        if !inlined.contains(&video.preview.as_str()) {
            let _ = write!(html, r#"<br><video controls="controls"><source src="{}"></video>"#, attr(&video.url));
        }
    }
    for gif in &media.gifs {
        if !inlined.contains(&gif.preview.as_str()) {
            let _ = write!(html, r#"<br><video autoplay loop muted playsinline><source src="{}"></video>"#, attr(&gif.url));
        }
    }

    html.replace('\n', "<br>")
}
