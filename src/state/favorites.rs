//! Optimistic favorite toggles reconciled against server truth.
//!
//! Each story id moves through a small state machine scoped to the active
//! session: `NotFavorited → PendingAdd → Favorited` and back via
//! `PendingRemove`. The optimistic flip happens the instant a toggle is
//! requested; the server's response then replaces the whole local set, so the
//! coordinator self-corrects against any drift. A failed call rolls the flip
//! back. At most one mutation per id may be in flight; an overlapping toggle
//! is rejected, never queued.
use crate::api::{ApiClient, UserPayload};
use crate::state::{Session, StateError};
use std::collections::{HashMap, HashSet};

/// Where a story id currently sits in the toggle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteState {
    NotFavorited,
    /// Optimistically added; awaiting server confirmation.
    PendingAdd,
    Favorited,
    /// Optimistically removed; awaiting server confirmation.
    PendingRemove,
}

/// Result of a confirmed toggle: the new membership and the server's updated
/// user record (callers refresh own-story lists from it).
#[derive(Debug)]
pub struct ToggleOutcome {
    pub favorited: bool,
    pub user: UserPayload,
}

/// Owns the favorites set for the active session.
#[derive(Debug, Default)]
pub struct FavoritesCoordinator {
    /// Optimistic membership view: flipped at toggle start, reconciled or
    /// rolled back when the server answers.
    favorites: HashSet<String>,
    /// In-flight toggles: id → membership before the optimistic flip.
    pending: HashMap<String, bool>,
}

impl FavoritesCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set from a fresh user record (login/signup/restore).
    /// Clears any pending state from a previous session.
    pub fn seed(&mut self, ids: impl IntoIterator<Item = String>) {
        self.pending.clear();
        self.favorites = ids.into_iter().collect();
    }

    /// Drop everything, pending toggles included. Called on logout so no
    /// state leaks into a later session.
    pub fn reset(&mut self) {
        self.favorites.clear();
        self.pending.clear();
    }

    /// Optimistic membership: reflects pending toggles immediately. This is
    /// the view the rendering layer re-reads after every operation.
    pub fn contains(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn state_of(&self, id: &str) -> FavoriteState {
        match (self.pending.contains_key(id), self.favorites.contains(id)) {
            (true, true) => FavoriteState::PendingAdd,
            (true, false) => FavoriteState::PendingRemove,
            (false, true) => FavoriteState::Favorited,
            (false, false) => FavoriteState::NotFavorited,
        }
    }

    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.favorites.iter().map(String::as_str)
    }

    /// Toggle a story's favorite status for the signed-in user.
    ///
    /// Fails fast, with no network call and no state change, when there is no
    /// session (`AuthRequired`) or when a toggle for the same id is already
    /// in flight (`ConcurrentMutation`). On success the local set is wholly
    /// replaced by the server's; on failure the optimistic flip is undone and
    /// the error surfaces.
    pub async fn toggle(
        &mut self,
        session: Option<&Session>,
        api: &ApiClient,
        id: &str,
    ) -> Result<ToggleOutcome, StateError> {
        let session = session.ok_or(StateError::AuthRequired)?;
        let adding = self.begin(id)?;

        let result = if adding {
            api.add_favorite(session.credential(), &session.username, id)
                .await
        } else {
            api.remove_favorite(session.credential(), &session.username, id)
                .await
        };

        match result {
            Ok(user) => {
                self.commit(id, &user);
                tracing::debug!(story_id = id, favorited = adding, "Favorite toggle confirmed");
                Ok(ToggleOutcome {
                    favorited: self.favorites.contains(id),
                    user,
                })
            }
            Err(e) => {
                self.rollback(id);
                tracing::debug!(story_id = id, error = %e, "Favorite toggle rolled back");
                Err(e.into())
            }
        }
    }

    /// Remove every favorite, one sequential server call per id so the
    /// per-id in-flight guard is never stressed. A failure partway through
    /// stops the sweep; the set then reflects exactly what the server has
    /// confirmed so far.
    pub async fn clear_all(
        &mut self,
        session: Option<&Session>,
        api: &ApiClient,
    ) -> Result<(), StateError> {
        let session = session.ok_or(StateError::AuthRequired)?;

        let mut snapshot: Vec<String> = self.favorites.iter().cloned().collect();
        snapshot.sort();

        for id in snapshot {
            // A toggle confirmed earlier in the sweep may already have
            // removed this id from the server-reconciled set.
            if !self.favorites.contains(&id) {
                continue;
            }
            if self.pending.contains_key(&id) {
                return Err(StateError::ConcurrentMutation { id });
            }

            self.pending.insert(id.clone(), true);
            self.favorites.remove(&id);
            match api
                .remove_favorite(session.credential(), &session.username, &id)
                .await
            {
                Ok(user) => self.commit(&id, &user),
                Err(e) => {
                    self.rollback(&id);
                    return Err(e.into());
                }
            }
        }

        tracing::info!("All favorites cleared");
        Ok(())
    }

    /// Enter the pending state for `id`, applying the optimistic flip.
    /// Returns whether this toggle is an add.
    fn begin(&mut self, id: &str) -> Result<bool, StateError> {
        if self.pending.contains_key(id) {
            return Err(StateError::ConcurrentMutation { id: id.to_string() });
        }

        let was_favorited = self.favorites.contains(id);
        self.pending.insert(id.to_string(), was_favorited);
        if was_favorited {
            self.favorites.remove(id);
        } else {
            self.favorites.insert(id.to_string());
        }
        Ok(!was_favorited)
    }

    /// Reconcile with the server's answer: the returned set is the truth,
    /// regardless of what the optimistic flip guessed.
    fn commit(&mut self, id: &str, user: &UserPayload) {
        self.pending.remove(id);
        self.favorites = user
            .favorites
            .iter()
            .map(|s| s.story_id.clone())
            .collect();
    }

    /// Undo the optimistic flip for a failed toggle.
    fn rollback(&mut self, id: &str) {
        if let Some(was_favorited) = self.pending.remove(id) {
            if was_favorited {
                self.favorites.insert(id.to_string());
            } else {
                self.favorites.remove(id);
            }
        }
    }
}
