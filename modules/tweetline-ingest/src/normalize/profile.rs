// Profile normalization. Also provides the author view used by posts.

use serde_json::Value;

use tweetline_common::Profile;

use crate::error::NormalizeError;
use crate::wire::{LegacyUser, UserV2, WireUser};

use super::{first_present, parse_platform_date, required, NormalizeOptions};

/// Normalize one raw user record, detecting its wire shape.
pub fn normalize_profile(
    raw: &Value,
    options: &NormalizeOptions,
) -> Result<Profile, NormalizeError> {
    let wire = WireUser::detect(raw)?;
    normalize_wire_user(&wire, options)
}

pub fn normalize_wire_user(
    wire: &WireUser,
    options: &NormalizeOptions,
) -> Result<Profile, NormalizeError> {
    let view = match wire {
        WireUser::V2(user) => UserView::from_v2(user),
        WireUser::Legacy(user) => UserView::from_legacy(user),
    };
    let legacy = view.legacy;

    let id = required(&[view.id], "id")?;
    let username = required(&[view.username], "username")?;

    Ok(Profile {
        url: format!("{}/{}", options.permalink_base, username),
        name: view.name.unwrap_or_default().to_string(),
        biography: first_present(&[view.description]).unwrap_or_default(),
        location: first_present(&[view.location]).unwrap_or_default(),
        website: legacy
            .entities
            .as_ref()
            .and_then(|e| e.url.as_ref())
            .and_then(|list| list.urls.first())
            .and_then(|u| first_present(&[u.expanded_url.as_deref(), u.url.as_deref()])),
        avatar: first_present(&[view.avatar]),
        banner: first_present(&[legacy.profile_banner_url.as_deref()]),
        followers_count: legacy.followers_count,
        following_count: legacy.friends_count,
        tweets_count: legacy.statuses_count,
        likes_count: legacy.favourites_count,
        listed_count: legacy.listed_count,
        media_count: legacy.media_count,
        is_verified: view.verified,
        is_blue_verified: view.blue_verified,
        is_private: view.protected,
        pinned_post_ids: legacy
            .pinned_tweet_ids_str
            .iter()
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .collect(),
        joined: view.created_at.and_then(parse_platform_date),
        id,
        username,
    })
}

/// Shape-independent view of a user record. Newer v2 groups win over their
/// `legacy` duplicates when they carry a value.
pub(crate) struct UserView<'a> {
    pub id: Option<&'a str>,
    pub username: Option<&'a str>,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub avatar: Option<&'a str>,
    pub created_at: Option<&'a str>,
    pub verified: bool,
    pub blue_verified: bool,
    pub protected: bool,
    pub legacy: &'a LegacyUser,
}

impl<'a> UserView<'a> {
    pub(crate) fn from_v2(user: &'a UserV2) -> Self {
        let legacy = &user.legacy;
        let core = user.core.as_ref();
        UserView {
            id: pick(user.rest_id.as_deref(), legacy.id_str.as_deref()),
            username: pick(
                core.and_then(|c| c.screen_name.as_deref()),
                legacy.screen_name.as_deref(),
            ),
            name: pick(core.and_then(|c| c.name.as_deref()), legacy.name.as_deref()),
            description: pick(
                user.profile_bio.as_ref().and_then(|b| b.description.as_deref()),
                legacy.description.as_deref(),
            ),
            location: pick(
                user.location.as_ref().and_then(|l| l.location.as_deref()),
                legacy.location.as_deref(),
            ),
            avatar: pick(
                user.avatar.as_ref().and_then(|a| a.image_url.as_deref()),
                legacy.profile_image_url_https.as_deref(),
            ),
            created_at: pick(
                core.and_then(|c| c.created_at.as_deref()),
                legacy.created_at.as_deref(),
            ),
            verified: user
                .verification
                .as_ref()
                .and_then(|v| v.verified)
                .or(legacy.verified)
                .unwrap_or(false),
            blue_verified: user.is_blue_verified.unwrap_or(false),
            protected: user
                .privacy
                .as_ref()
                .and_then(|p| p.protected)
                .or(legacy.protected)
                .unwrap_or(false),
            legacy,
        }
    }

    pub(crate) fn from_legacy(user: &'a LegacyUser) -> Self {
        UserView {
            id: user.id_str.as_deref(),
            username: user.screen_name.as_deref(),
            name: user.name.as_deref(),
            description: user.description.as_deref(),
            location: user.location.as_deref(),
            avatar: user.profile_image_url_https.as_deref(),
            created_at: user.created_at.as_deref(),
            verified: user.verified.unwrap_or(false),
            blue_verified: false,
            protected: user.protected.unwrap_or(false),
            legacy: user,
        }
    }
}

fn pick<'a>(preferred: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    preferred
        .filter(|s| !s.trim().is_empty())
        .or(fallback.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newer_groups_override_legacy_duplicates() {
        let raw = json!({
            "rest_id": "42",
            "core": { "screen_name": "newname", "name": "New Name" },
            "avatar": { "image_url": "https://img/new.jpg" },
            "privacy": { "protected": true },
            "legacy": {
                "screen_name": "oldname",
                "name": "Old Name",
                "profile_image_url_https": "https://img/old.jpg",
                "protected": false
            }
        });
        let profile = normalize_profile(&raw, &NormalizeOptions::default()).unwrap();
        assert_eq!(profile.username, "newname");
        assert_eq!(profile.name, "New Name");
        assert_eq!(profile.avatar.as_deref(), Some("https://img/new.jpg"));
        assert!(profile.is_private);
        assert_eq!(profile.url, "https://twitter.com/newname");
    }

    #[test]
    fn blank_newer_group_falls_back_to_legacy() {
        let raw = json!({
            "rest_id": "42",
            "core": { "screen_name": "" },
            "legacy": { "screen_name": "oldname" }
        });
        let profile = normalize_profile(&raw, &NormalizeOptions::default()).unwrap();
        assert_eq!(profile.username, "oldname");
    }

    #[test]
    fn handle_is_required() {
        let raw = json!({ "id_str": "42", "name": "No Handle" });
        assert_eq!(
            normalize_profile(&raw, &NormalizeOptions::default()),
            Err(NormalizeError::MalformedRecord { field: "username" })
        );
    }
}
