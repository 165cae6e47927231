//! Favorite coins, scoped to the signed-in user or the anonymous session

use crate::error::FavoritesError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Insertion-ordered set of coin ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FavoriteSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, coin_id: &str) -> bool {
        self.members.contains(coin_id)
    }

    /// Adds the id if absent, removes it otherwise; returns the new membership
    pub fn toggle(&mut self, coin_id: &str) -> bool {
        if self.members.remove(coin_id) {
            self.order.retain(|id| id != coin_id);
            false
        } else {
            self.members.insert(coin_id.to_string());
            self.order.push(coin_id.to_string());
            true
        }
    }

    /// Ids in the order they were added
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl From<Vec<String>> for FavoriteSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<FavoriteSet> for Vec<String> {
    fn from(set: FavoriteSet) -> Self {
        set.order
    }
}

impl<S: Into<String>> FromIterator<S> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FavoriteSet::new();
        for id in iter {
            let id = id.into();
            if set.members.insert(id.clone()) {
                set.order.push(id);
            }
        }
        set
    }
}

/// Whether anonymous sessions may keep favorites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoritesPolicy {
    #[default]
    AllowAnonymous,
    RequireAuth,
}

/// Trait for favorites providers
///
/// The tracker reads favorites through this seam so the backing store
/// (local session, remote account) can be swapped.
pub trait FavoritesProvider: Send + Sync {
    /// Flips membership of `coin_id`
    ///
    /// # Returns
    /// The new membership, or `RequiresAuth` if the active scope may not
    /// hold favorites. Nothing is mutated in the error case.
    fn toggle_favorite(&self, coin_id: &str) -> Result<bool, FavoritesError>;

    /// True if `coin_id` is a favorite in the active scope
    fn is_favorite(&self, coin_id: &str) -> bool;

    /// Favorite ids of the active scope, in insertion order
    fn get_favorites(&self) -> Vec<String>;

    /// Snapshot of the active scope for the projection
    fn favorite_set(&self) -> FavoriteSet {
        self.get_favorites().into()
    }

    /// Copy of every scope, for persistence
    fn snapshot(&self) -> FavoritesSnapshot {
        FavoritesSnapshot {
            anonymous: self.favorite_set(),
            users: HashMap::new(),
        }
    }

    /// Replaces stored favorites with `snapshot`
    fn hydrate(&self, _snapshot: FavoritesSnapshot) {}
}

/// Persistable view of every scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoritesSnapshot {
    pub anonymous: FavoriteSet,
    pub users: HashMap<String, FavoriteSet>,
}

#[derive(Debug, Default)]
struct SessionState {
    current_user: Option<String>,
    anonymous: FavoriteSet,
    users: HashMap<String, FavoriteSet>,
}

impl SessionState {
    fn active(&self) -> Option<&FavoriteSet> {
        match &self.current_user {
            Some(user) => self.users.get(user),
            None => Some(&self.anonymous),
        }
    }
}

/// In-process favorites with one set per user plus the anonymous session
pub struct SessionFavorites {
    policy: FavoritesPolicy,
    state: RwLock<SessionState>,
}

impl SessionFavorites {
    pub fn new(policy: FavoritesPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn policy(&self) -> FavoritesPolicy {
        self.policy
    }

    /// Switches the active scope to `user_id`
    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let mut state = self.write_state();
        state.users.entry(user_id.clone()).or_default();
        tracing::debug!(user = %user_id, "Favorites scope switched to user");
        state.current_user = Some(user_id);
    }

    /// Returns to the anonymous scope; the user's set is kept
    pub fn sign_out(&self) {
        self.write_state().current_user = None;
    }

    pub fn current_user(&self) -> Option<String> {
        self.read_state().current_user.clone()
    }

    // Poisoning is ignored: every write leaves the sets consistent.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionFavorites {
    fn default() -> Self {
        Self::new(FavoritesPolicy::default())
    }
}

impl FavoritesProvider for SessionFavorites {
    fn toggle_favorite(&self, coin_id: &str) -> Result<bool, FavoritesError> {
        let mut state = self.write_state();
        let set = match state.current_user.clone() {
            Some(user) => state.users.entry(user).or_default(),
            None if self.policy == FavoritesPolicy::RequireAuth => {
                return Err(FavoritesError::RequiresAuth)
            }
            None => &mut state.anonymous,
        };
        Ok(set.toggle(coin_id))
    }

    fn is_favorite(&self, coin_id: &str) -> bool {
        self.read_state()
            .active()
            .map(|set| set.contains(coin_id))
            .unwrap_or(false)
    }

    fn get_favorites(&self) -> Vec<String> {
        self.read_state()
            .active()
            .map(|set| set.ids().to_vec())
            .unwrap_or_default()
    }

    fn favorite_set(&self) -> FavoriteSet {
        self.read_state().active().cloned().unwrap_or_default()
    }

    fn snapshot(&self) -> FavoritesSnapshot {
        let state = self.read_state();
        FavoritesSnapshot {
            anonymous: state.anonymous.clone(),
            users: state.users.clone(),
        }
    }

    /// Replaces every scope; the signed-in user is unchanged
    fn hydrate(&self, snapshot: FavoritesSnapshot) {
        let mut state = self.write_state();
        state.anonymous = snapshot.anonymous;
        state.users = snapshot.users;
        if let Some(user) = state.current_user.clone() {
            state.users.entry(user).or_default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_keeps_insertion_order() {
        let favorites = SessionFavorites::default();
        assert_eq!(favorites.toggle_favorite("solana"), Ok(true));
        assert_eq!(favorites.toggle_favorite("bitcoin"), Ok(true));
        assert_eq!(favorites.toggle_favorite("ethereum"), Ok(true));
        assert_eq!(favorites.toggle_favorite("bitcoin"), Ok(false));

        assert_eq!(favorites.get_favorites(), vec!["solana", "ethereum"]);
        assert!(favorites.is_favorite("solana"));
        assert!(!favorites.is_favorite("bitcoin"));
    }

    #[test]
    fn test_require_auth_rejects_anonymous_toggle() {
        let favorites = SessionFavorites::new(FavoritesPolicy::RequireAuth);

        assert_eq!(
            favorites.toggle_favorite("bitcoin"),
            Err(FavoritesError::RequiresAuth)
        );
        assert!(favorites.get_favorites().is_empty());

        favorites.sign_in("alice");
        assert_eq!(favorites.toggle_favorite("bitcoin"), Ok(true));
        assert!(favorites.is_favorite("bitcoin"));
    }

    #[test]
    fn test_scopes_are_independent() {
        let favorites = SessionFavorites::default();
        favorites.toggle_favorite("dogecoin").unwrap();

        favorites.sign_in("alice");
        assert!(favorites.get_favorites().is_empty());
        favorites.toggle_favorite("bitcoin").unwrap();

        favorites.sign_out();
        assert_eq!(favorites.get_favorites(), vec!["dogecoin"]);

        favorites.sign_in("alice");
        assert_eq!(favorites.get_favorites(), vec!["bitcoin"]);
    }

    #[test]
    fn test_snapshot_roundtrip_through_json() {
        let favorites = SessionFavorites::default();
        favorites.toggle_favorite("tron").unwrap();
        favorites.sign_in("bob");
        favorites.toggle_favorite("uniswap").unwrap();

        let json = serde_json::to_string(&favorites.snapshot()).unwrap();
        let restored = SessionFavorites::default();
        restored.hydrate(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.get_favorites(), vec!["tron"]);
        restored.sign_in("bob");
        assert_eq!(restored.get_favorites(), vec!["uniswap"]);
    }

    #[test]
    fn test_favorite_set_dedups_on_collect() {
        let set: FavoriteSet = vec!["a", "b", "a"].into_iter().collect();
        assert_eq!(set.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(set.len(), 2);
    }
}
