//! Search filtering and per-user grouping of posts.
//!
//! Everything here is pure: the same posts and query always produce the same
//! groups, and nothing is read from or written to the outside world.

use crate::types::{Post, PostGroup};
use std::collections::HashMap;

/// Returns true when the post title contains `query`, ignoring case.
/// An empty query matches every post.
pub fn matches_query(post: &Post, query: &str) -> bool {
    title_contains(&post.title, &query.to_lowercase())
}

fn title_contains(title: &str, lowered_query: &str) -> bool {
    lowered_query.is_empty() || title.to_lowercase().contains(lowered_query)
}

/// Filters `posts` by `query` and groups the survivors by `user_id`.
///
/// Groups appear in the order of their first matching post, and posts keep
/// their input order inside each group. Users with no matching post are
/// left out entirely.
pub fn group_posts(posts: &[Post], query: &str) -> Vec<PostGroup> {
    let lowered_query = query.to_lowercase();
    let mut groups: Vec<PostGroup> = Vec::new();
    let mut index_by_user: HashMap<i64, usize> = HashMap::new();

    for post in posts {
        if !title_contains(&post.title, &lowered_query) {
            continue;
        }

        let slot = *index_by_user.entry(post.user_id).or_insert_with(|| {
            groups.push(PostGroup::new(post.user_id));
            groups.len() - 1
        });
        groups[slot].posts.push(post.clone());
    }

    groups
}

/// Total number of posts across all groups.
pub fn total_posts(groups: &[PostGroup]) -> usize {
    groups.iter().map(PostGroup::len).sum()
}

pub fn find_post(groups: &[PostGroup], post_id: i64) -> Option<&Post> {
    groups
        .iter()
        .flat_map(|group| group.posts.iter())
        .find(|post| post.id == post_id)
}
