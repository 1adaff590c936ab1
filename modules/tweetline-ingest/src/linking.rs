// Caller-side linking across already normalized posts.
// These need more than one record (a profile and its posts, or a whole
// batch) so they live outside the normalizer. Each consumes the batch and
// returns a new one.

use std::collections::HashMap;

use tweetline_common::{Post, Profile};

/// Flag the posts the profile advertises as pinned.
pub fn mark_pinned(posts: Vec<Post>, profile: &Profile) -> Vec<Post> {
    posts
        .into_iter()
        .map(|post| Post {
            is_pinned: profile.has_pinned(&post.id),
            ..post
        })
        .collect()
}

/// Attach self-thread continuations to their root, oldest first.
///
/// Continuations whose root is not in the batch are left as they are. Ties
/// on timestamp keep batch order.
pub fn assemble_threads(posts: Vec<Post>) -> Vec<Post> {
    let mut chains: HashMap<String, Vec<Post>> = HashMap::new();
    for post in posts.iter().filter(|p| p.is_self_thread) {
        if let Some(root_id) = &post.self_thread_id {
            chains.entry(root_id.clone()).or_default().push(post.clone());
        }
    }
    for chain in chains.values_mut() {
        chain.sort_by_key(|p| p.timestamp);
    }

    posts
        .into_iter()
        .map(|post| match chains.get(&post.id) {
            Some(chain) => Post {
                thread: chain.clone(),
                ..post
            },
            None => post,
        })
        .collect()
}

/// Fill `in_reply_to` with a copy of the parent when it is in the batch.
pub fn link_replies(posts: Vec<Post>) -> Vec<Post> {
    let parents: HashMap<String, Post> = posts
        .iter()
        .map(|p| (p.id.clone(), p.clone()))
        .collect();

    posts
        .into_iter()
        .map(|post| {
            let parent = post
                .in_reply_to_id
                .as_ref()
                .filter(|id| **id != post.id)
                .and_then(|id| parents.get(id))
                .cloned();
            match parent {
                Some(parent) => Post {
                    in_reply_to: Some(Box::new(parent)),
                    ..post
                },
                None => post,
            }
        })
        .collect()
}
