//! Local feed search: a pure filter over the feed cache snapshot.
//!
//! Case-insensitive substring match across a fixed field set: title, author,
//! poster username, and the hostname derived from the story URL. Output
//! preserves feed order; there is no relevance ranking and no network access.
//! Callers reject empty queries upstream; this engine is never invoked with
//! one.
use crate::state::{FeedCache, Story};

/// Filter the feed to stories matching `query`.
pub fn filter<'a>(feed: &'a FeedCache, query: &str) -> Vec<&'a Story> {
    let needle = query.to_lowercase();
    feed.iter().filter(|story| matches(story, &needle)).collect()
}

fn matches(story: &Story, needle: &str) -> bool {
    story.title.to_lowercase().contains(needle)
        || story.author.to_lowercase().contains(needle)
        || story.owner.to_lowercase().contains(needle)
        || story
            .hostname()
            .is_some_and(|host| host.contains(needle))
}
