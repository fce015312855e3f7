//! Session lifecycle: login, signup, restore from durable storage, logout.
//!
//! The invariant here is that a credential is never held without its matching
//! username. [`Session`] bundles them, and the credential store persists them
//! as one pair. The credential itself is a `SecretString` so it stays out of
//! `Debug` output and logs.
use crate::api::{ApiClient, UserPayload};
use crate::state::StateError;
use crate::storage::CredentialStore;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// An authenticated identity plus its bearer credential.
#[derive(Debug)]
pub struct Session {
    pub username: String,
    pub display_name: String,
    credential: SecretString,
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn from_parts(
        username: String,
        display_name: String,
        credential: SecretString,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            username,
            display_name,
            credential,
            created_at,
        }
    }

    /// The bearer token for authenticated remote calls.
    pub fn credential(&self) -> &SecretString {
        &self.credential
    }
}

/// Owns the current [`Session`] and the durable credential pair.
#[derive(Debug)]
pub struct SessionManager {
    store: CredentialStore,
    current: Option<Session>,
}

impl SessionManager {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Try to revive a persisted session.
    ///
    /// No stored pair → no session, silently. A stored pair is validated by
    /// fetching the full user record; if the server rejects the credential
    /// (expired or revoked) the stale pair is discarded from storage. A
    /// transient network failure also yields no session but keeps the pair
    /// for the next attempt. Neither case is an error.
    ///
    /// On success the session is installed and the fetched user record is
    /// returned so the caller can seed favorites and own stories.
    pub async fn restore(&mut self, api: &ApiClient) -> Option<UserPayload> {
        let stored = self.store.load()?;

        match api.user(&stored.credential, &stored.username).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "Session restored");
                self.current = Some(Session::from_parts(
                    user.username.clone(),
                    user.name.clone(),
                    stored.credential,
                    user.created_at,
                ));
                Some(user)
            }
            Err(e) if e.is_rejection() => {
                tracing::info!(username = %stored.username, error = %e, "Stored credential rejected, discarding");
                self.store.clear();
                None
            }
            Err(e) => {
                tracing::warn!(username = %stored.username, error = %e, "Session restore failed, will retry next start");
                None
            }
        }
    }

    /// Authenticate and install a session, persisting the credential pair.
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<UserPayload, StateError> {
        let (user, credential) = api
            .login(username, password)
            .await
            .map_err(auth_or_network)?;
        self.install(user, credential)
    }

    /// Create an account and install a session, persisting the credential
    /// pair.
    pub async fn signup(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserPayload, StateError> {
        let (user, credential) = api
            .signup(username, password, display_name)
            .await
            .map_err(auth_or_network)?;
        self.install(user, credential)
    }

    /// Drop the session and its persisted credential. Synchronous; never
    /// touches the network.
    pub fn logout(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::info!(username = %session.username, "Logged out");
        }
        self.store.clear();
    }

    fn install(
        &mut self,
        user: UserPayload,
        credential: SecretString,
    ) -> Result<UserPayload, StateError> {
        if let Err(e) = self.store.save(&credential, &user.username) {
            // The in-memory session is still good; persistence just means the
            // user signs in again next start.
            tracing::warn!(error = %e, "Failed to persist credential");
        }
        tracing::info!(username = %user.username, "Signed in");
        self.current = Some(Session::from_parts(
            user.username.clone(),
            user.name.clone(),
            credential,
            user.created_at,
        ));
        Ok(user)
    }
}

/// Login/signup rejections carry the server's reason (bad password, duplicate
/// username); everything else is a plain network failure.
fn auth_or_network(e: crate::api::ApiError) -> StateError {
    if e.is_rejection() {
        StateError::Auth(e.server_message().unwrap_or("rejected").to_string())
    } else {
        StateError::Network(e)
    }
}
