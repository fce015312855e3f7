//! Client-side state for the story service.
//!
//! Everything the UI renders lives here: the session, the feed cache, and the
//! favorites set, composed into one explicit [`AppState`] object. The state
//! layer owns reconciliation against the remote service; rendering front ends
//! issue intents through `AppState` methods and re-read the snapshots it
//! exposes. No ambient globals, no retries, no partial effects on failure.
mod favorites;
mod feed;
mod search;
mod session;

pub use favorites::{FavoriteState, FavoritesCoordinator, ToggleOutcome};
pub use feed::FeedCache;
pub use search::filter;
pub use session::{Session, SessionManager};

use crate::api::{ApiClient, ApiError, StoryPayload};
use crate::util::story_hostname;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by state operations.
///
/// The local-guard variants (`AuthRequired`, `Validation`, `Ownership`,
/// `ConcurrentMutation`, `UnknownStory`) are raised before any network call is
/// made and leave every cache untouched.
#[derive(Debug, Error)]
pub enum StateError {
    /// The server refused a login or signup; carries its stated reason.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The operation needs a signed-in session and none is active.
    #[error("sign in required")]
    AuthRequired,
    /// A required submission field was empty.
    #[error("{field} must not be empty")]
    Validation { field: &'static str },
    /// A delete was attempted on a story the session does not own.
    #[error("story {id} belongs to {owner}")]
    Ownership { id: String, owner: String },
    /// A favorite toggle for this id is still awaiting the server.
    #[error("a favorite change for story {id} is already in flight")]
    ConcurrentMutation { id: String },
    /// The story id is not present in the local feed cache.
    #[error("story {0} is not in the local feed")]
    UnknownStory(String),
    /// A remote call failed; local state was rolled back or left untouched.
    #[error(transparent)]
    Network(#[from] ApiError),
}

/// A story record as held by the client.
///
/// Identity is `id`; the remaining fields are immutable once the server has
/// created the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    /// Username of the submitting user. Only the owner may delete the story.
    pub owner: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Story {
    /// Display hostname derived from the story URL (`www.` stripped), if the
    /// URL parses.
    pub fn hostname(&self) -> Option<String> {
        story_hostname(&self.url)
    }
}

impl From<StoryPayload> for Story {
    fn from(payload: StoryPayload) -> Self {
        Self {
            id: payload.story_id,
            title: payload.title,
            author: payload.author,
            url: payload.url,
            owner: payload.username,
            created_at: payload.created_at,
        }
    }
}

/// The whole client state, composed from the four components.
///
/// Rendering layers hold one of these, call the intent methods below, and
/// re-read the snapshot accessors after every operation. Components never
/// reach back into presentation concerns.
#[derive(Debug)]
pub struct AppState {
    pub session: SessionManager,
    pub feed: FeedCache,
    pub favorites: FavoritesCoordinator,
    own_stories: Vec<Story>,
}

impl AppState {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            feed: FeedCache::new(),
            favorites: FavoritesCoordinator::new(),
            own_stories: Vec::new(),
        }
    }

    // ========================================================================
    // Snapshots (read-only)
    // ========================================================================

    /// Stories the signed-in user has submitted, most recent first.
    pub fn own_stories(&self) -> &[Story] {
        &self.own_stories
    }

    // ========================================================================
    // Session intents
    // ========================================================================

    /// Restore a persisted session, seeding favorites and own stories from
    /// the fetched user record. Returns true when a session is active after
    /// the attempt. Never fails: a stale credential degrades to signed-out.
    pub async fn restore(&mut self, api: &ApiClient) -> bool {
        match self.session.restore(api).await {
            Some(user) => {
                self.hydrate_user(&user);
                true
            }
            None => false,
        }
    }

    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<(), StateError> {
        let user = self.session.login(api, username, password).await?;
        self.hydrate_user(&user);
        Ok(())
    }

    pub async fn signup(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), StateError> {
        let user = self.session.signup(api, username, password, display_name).await?;
        self.hydrate_user(&user);
        Ok(())
    }

    /// Synchronous: clears durable storage, the in-memory session, and all
    /// favorites state (including pending toggles) so nothing leaks into a
    /// later session. Never touches the network.
    pub fn logout(&mut self) {
        self.session.logout();
        self.favorites.reset();
        self.own_stories.clear();
    }

    // ========================================================================
    // Feed intents
    // ========================================================================

    pub async fn load_feed(&mut self, api: &ApiClient) -> Result<usize, StateError> {
        self.feed.load_initial(api).await
    }

    pub async fn load_more(&mut self, api: &ApiClient, offset: usize) -> Result<usize, StateError> {
        self.feed.load_more(api, offset).await
    }

    pub async fn submit_story(
        &mut self,
        api: &ApiClient,
        title: &str,
        author: &str,
        url: &str,
    ) -> Result<Story, StateError> {
        let session = self.session.current().ok_or(StateError::AuthRequired)?;
        let story = self.feed.submit(session, api, title, author, url).await?;
        self.own_stories.insert(0, story.clone());
        Ok(story)
    }

    pub async fn delete_story(&mut self, api: &ApiClient, id: &str) -> Result<(), StateError> {
        let session = self.session.current().ok_or(StateError::AuthRequired)?;
        self.feed.remove(session, api, id).await?;
        self.own_stories.retain(|s| s.id != id);
        Ok(())
    }

    // ========================================================================
    // Favorites intents
    // ========================================================================

    /// Toggle a favorite. Returns the new membership once the server has
    /// confirmed it.
    pub async fn toggle_favorite(
        &mut self,
        api: &ApiClient,
        id: &str,
    ) -> Result<bool, StateError> {
        let outcome = self
            .favorites
            .toggle(self.session.current(), api, id)
            .await?;
        self.own_stories = outcome.user.stories.into_iter().map(Story::from).collect();
        Ok(outcome.favorited)
    }

    /// Remove every favorite, one server call at a time.
    pub async fn clear_favorites(&mut self, api: &ApiClient) -> Result<(), StateError> {
        self.favorites.clear_all(self.session.current(), api).await
    }

    // ========================================================================
    // Search intent
    // ========================================================================

    /// Filter the current feed snapshot. Pure; no network.
    pub fn search(&self, query: &str) -> Vec<&Story> {
        filter(&self.feed, query)
    }

    fn hydrate_user(&mut self, user: &crate::api::UserPayload) {
        self.favorites
            .seed(user.favorites.iter().map(|s| s.story_id.clone()));
        self.own_stories = user.stories.iter().cloned().map(Story::from).collect();
    }
}
