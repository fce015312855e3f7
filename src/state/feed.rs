//! The feed cache: an ordered, deduplicated collection of stories assembled
//! from pagination batches.
//!
//! Order is the server-declared order, ties broken by batch arrival. Lookup
//! and delete are O(1) amortized: stories live in an id-keyed map, order is a
//! separate id list that tolerates tombstones and compacts lazily.
use crate::api::{ApiClient, NewStory, PAGE_SIZE};
use crate::state::{Session, StateError, Story};
use std::collections::HashMap;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct FeedCache {
    by_id: HashMap<String, Story>,
    /// Front = most recent. May hold ids of removed stories until compaction.
    order: VecDeque<String>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Story> {
        self.by_id.get(id)
    }

    /// Stories in feed order, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Story> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Snapshot of the current order as owned clones, for rendering layers
    /// that outlive the borrow.
    pub fn snapshot(&self) -> Vec<Story> {
        self.iter().cloned().collect()
    }

    /// Fetch the first page; if it comes back full, eagerly fetch one
    /// follow-up page at the next offset so the initial view holds more than
    /// a single page when the server has one. At most two batches; anything
    /// beyond goes through [`FeedCache::load_more`].
    ///
    /// Returns the number of stories newly added to the cache. If the eager
    /// second fetch fails, the first batch stays merged and the error
    /// surfaces.
    pub async fn load_initial(&mut self, api: &ApiClient) -> Result<usize, StateError> {
        let first = api.stories(None).await?;
        let first_len = first.len();
        let mut added = self.merge(first.into_iter().map(Story::from));

        if first_len >= PAGE_SIZE {
            let second = api.stories(Some(first_len)).await?;
            added += self.merge(second.into_iter().map(Story::from));
        }

        tracing::info!(added = added, total = self.len(), "Initial feed loaded");
        Ok(added)
    }

    /// Fetch exactly one page at `offset` and merge it. Used for
    /// scroll-triggered pagination past the initial eager fetch.
    pub async fn load_more(&mut self, api: &ApiClient, offset: usize) -> Result<usize, StateError> {
        let batch = api.stories(Some(offset)).await?;
        let added = self.merge(batch.into_iter().map(Story::from));
        tracing::debug!(offset = offset, added = added, "Feed page merged");
        Ok(added)
    }

    /// Append a batch preserving arrival order, silently dropping ids already
    /// present. Idempotent under re-fetch or retry. Returns how many stories
    /// were actually inserted.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = Story>) -> usize {
        let mut added = 0;
        for story in batch {
            if self.by_id.contains_key(&story.id) {
                continue;
            }
            // A previously evicted id may still sit in the order list as a
            // tombstone; re-inserting without purging it would render twice.
            self.purge_order(&story.id);
            self.order.push_back(story.id.clone());
            self.by_id.insert(story.id.clone(), story);
            added += 1;
        }
        added
    }

    /// Validate and submit a new story, inserting the server's returned
    /// record at the most-recent position. Empty fields fail locally with no
    /// network call.
    pub async fn submit(
        &mut self,
        session: &Session,
        api: &ApiClient,
        title: &str,
        author: &str,
        url: &str,
    ) -> Result<Story, StateError> {
        for (field, value) in [("title", title), ("author", author), ("url", url)] {
            if value.trim().is_empty() {
                return Err(StateError::Validation { field });
            }
        }

        let payload = api
            .create_story(session.credential(), NewStory { title, author, url })
            .await?;
        let story = Story::from(payload);
        tracing::info!(story_id = %story.id, "Story submitted");

        // Re-submission can hand back an id we already hold, or one that was
        // evicted and still tombstoned; drop every stale position before
        // inserting at the front.
        self.by_id.remove(&story.id);
        self.purge_order(&story.id);
        self.order.push_front(story.id.clone());
        self.by_id.insert(story.id.clone(), story.clone());
        Ok(story)
    }

    /// Delete a story owned by the session's user. The ownership check runs
    /// before any network call; a remote failure leaves the cache entry
    /// untouched and is never retried.
    pub async fn remove(
        &mut self,
        session: &Session,
        api: &ApiClient,
        id: &str,
    ) -> Result<Story, StateError> {
        let story = self
            .by_id
            .get(id)
            .ok_or_else(|| StateError::UnknownStory(id.to_string()))?;
        if story.owner != session.username {
            return Err(StateError::Ownership {
                id: id.to_string(),
                owner: story.owner.clone(),
            });
        }

        api.delete_story(session.credential(), id).await?;
        tracing::info!(story_id = id, "Story deleted");
        self.evict(id)
            .ok_or_else(|| StateError::UnknownStory(id.to_string()))
    }

    /// Drop every order entry for `id`. Skipped entirely while the order list
    /// holds no tombstones, so plain inserts stay O(1).
    fn purge_order(&mut self, id: &str) {
        if self.order.len() > self.by_id.len() {
            self.order.retain(|entry| entry != id);
        }
    }

    /// Remove an entry from the map; the order list keeps a tombstone until
    /// compaction. O(1) amortized.
    fn evict(&mut self, id: &str) -> Option<Story> {
        let story = self.by_id.remove(id);
        if story.is_some() && self.order.len() >= 32 && self.order.len() > self.by_id.len() * 2 {
            let by_id = &self.by_id;
            self.order.retain(|entry| by_id.contains_key(entry));
        }
        story
    }
}
