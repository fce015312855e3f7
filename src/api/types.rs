//! Wire types for the story service JSON API.
//!
//! Field names mirror the server's camelCase payloads; serde renaming keeps
//! the Rust side idiomatic. Timestamps are optional because older records on
//! the hosted service omit them.
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A single story as the server represents it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPayload {
    pub story_id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    /// Username of the poster (the story's owner).
    pub username: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A user record as returned by login/signup/user-detail/favorites calls.
///
/// `favorites` and `stories` default to empty: the signup response carries
/// neither.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub favorites: Vec<StoryPayload>,
    #[serde(default)]
    pub stories: Vec<StoryPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoriesEnvelope {
    pub stories: Vec<StoryPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoryEnvelope {
    pub story: StoryPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: UserPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthEnvelope {
    pub user: UserPayload,
    pub token: String,
}

/// Best-effort shape of the server's error body: `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
}
