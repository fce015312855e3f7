//! HTTP client for the remote story service.
//!
//! Every call goes through [`ApiClient`]; the rest of the crate never touches
//! reqwest directly. Requests carry a hard 20-second timeout. Nothing here is
//! retried; callers decide what a failure means for their local state.
use crate::api::types::{
    AuthEnvelope, ErrorEnvelope, StoriesEnvelope, StoryEnvelope, UserEnvelope,
};
use crate::api::{StoryPayload, UserPayload};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// The hosted story service. Overridable via config for self-hosted instances
/// and for tests, which point it at a local mock server.
pub const DEFAULT_BASE_URL: &str = "https://hack-or-snooze-v3.herokuapp.com";

/// Server-enforced page size for `GET /stories`.
pub const PAGE_SIZE: usize = 25;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors from remote story service calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure (DNS, connection, TLS, body read).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the 20-second timeout.
    #[error("request timed out after 20s")]
    Timeout,
    /// Non-2xx response; `message` is the server's reason when it sent one.
    #[error("server rejected request ({status}): {message}")]
    Status { status: u16, message: String },
}

impl ApiError {
    /// True for 4xx responses where the server refused the request for a
    /// reason it stated (bad credentials, duplicate username, missing story).
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if (400..500).contains(status))
    }

    /// The server-supplied reason, if this was a status error.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Fields for a story submission.
#[derive(Debug, Clone)]
pub struct NewStory<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub url: &'a str,
}

/// Thin wrapper around `reqwest::Client` bound to one service base URL.
///
/// Cloning is cheap; `reqwest::Client` is internally reference-counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Build with a caller-configured `reqwest::Client` (custom timeouts,
    /// proxies).
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of the story feed. `skip = None` is the first page.
    pub async fn stories(&self, skip: Option<usize>) -> Result<Vec<StoryPayload>, ApiError> {
        let mut request = self.http.get(format!("{}/stories", self.base_url));
        if let Some(skip) = skip {
            request = request.query(&[("skip", skip)]);
        }
        tracing::debug!(skip = ?skip, "Fetching story page");
        let envelope: StoriesEnvelope = send(request).await?;
        Ok(envelope.stories)
    }

    /// Create a story owned by the authenticated user.
    pub async fn create_story(
        &self,
        token: &SecretString,
        story: NewStory<'_>,
    ) -> Result<StoryPayload, ApiError> {
        let request = self
            .http
            .post(format!("{}/stories", self.base_url))
            .json(&json!({
                "token": token.expose_secret(),
                "story": {
                    "author": story.author,
                    "title": story.title,
                    "url": story.url,
                },
            }));
        tracing::debug!(title = story.title, "Submitting story");
        let envelope: StoryEnvelope = send(request).await?;
        Ok(envelope.story)
    }

    /// Delete a story by id. The server enforces ownership independently of
    /// any client-side check.
    pub async fn delete_story(&self, token: &SecretString, id: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .delete(format!("{}/stories/{}", self.base_url, id))
            .query(&[("token", token.expose_secret())]);
        tracing::debug!(story_id = id, "Deleting story");
        check(request).await?;
        Ok(())
    }

    /// Register a new account. Returns the created user and its credential.
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<(UserPayload, SecretString), ApiError> {
        let request = self
            .http
            .post(format!("{}/signup", self.base_url))
            .json(&json!({
                "user": { "username": username, "password": password, "name": name },
            }));
        tracing::debug!(username = username, "Signing up");
        let envelope: AuthEnvelope = send(request).await?;
        Ok((envelope.user, SecretString::from(envelope.token)))
    }

    /// Authenticate an existing account.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserPayload, SecretString), ApiError> {
        let request = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&json!({
                "user": { "username": username, "password": password },
            }));
        tracing::debug!(username = username, "Logging in");
        let envelope: AuthEnvelope = send(request).await?;
        Ok((envelope.user, SecretString::from(envelope.token)))
    }

    /// Fetch the full user record: profile, favorites, and owned stories.
    pub async fn user(
        &self,
        token: &SecretString,
        username: &str,
    ) -> Result<UserPayload, ApiError> {
        let request = self
            .http
            .get(format!("{}/users/{}", self.base_url, username))
            .query(&[("token", token.expose_secret())]);
        tracing::debug!(username = username, "Fetching user record");
        let envelope: UserEnvelope = send(request).await?;
        Ok(envelope.user)
    }

    /// Add a story to the user's favorites. Returns the updated user record.
    pub async fn add_favorite(
        &self,
        token: &SecretString,
        username: &str,
        story_id: &str,
    ) -> Result<UserPayload, ApiError> {
        let request = self
            .http
            .post(format!(
                "{}/users/{}/favorites/{}",
                self.base_url, username, story_id
            ))
            .json(&json!({ "token": token.expose_secret() }));
        tracing::debug!(username = username, story_id = story_id, "Adding favorite");
        let envelope: UserEnvelope = send(request).await?;
        Ok(envelope.user)
    }

    /// Remove a story from the user's favorites. Returns the updated user
    /// record.
    pub async fn remove_favorite(
        &self,
        token: &SecretString,
        username: &str,
        story_id: &str,
    ) -> Result<UserPayload, ApiError> {
        let request = self
            .http
            .delete(format!(
                "{}/users/{}/favorites/{}",
                self.base_url, username, story_id
            ))
            .query(&[("token", token.expose_secret())]);
        tracing::debug!(username = username, story_id = story_id, "Removing favorite");
        let envelope: UserEnvelope = send(request).await?;
        Ok(envelope.user)
    }
}

/// Send a request, enforce the timeout, surface non-2xx as `Status`, and
/// decode the JSON body.
async fn send<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ApiError> {
    let response = check(request).await?;
    Ok(response.json::<T>().await?)
}

/// Send a request and return the response if it succeeded, extracting the
/// server's error message otherwise. Used directly for calls whose body we
/// discard (DELETE /stories).
async fn check(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
        .await
        .map_err(|_| ApiError::Timeout)?
        .map_err(ApiError::Network)?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // The service reports failures as {"error": {"message": ...}}; fall back
    // to the status line when the body is missing or unparseable.
    let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.error.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    tracing::debug!(status = status.as_u16(), message = %message, "Server rejected request");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
