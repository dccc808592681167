//! Session store port: Trait for adaptive-session state.

use crate::domain::AdaptiveSession;

/// Trait for in-progress adaptive sessions.
///
/// Implementations must make `update` atomic with respect to other calls on
/// the same session.
pub trait SessionStore: Send + Sync {
    /// Error type for session operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store a new session under its id.
    ///
    /// # Errors
    /// Returns error if the store is unavailable.
    fn insert(&self, session: AdaptiveSession) -> Result<(), Self::Error>;

    /// Get a copy of a session.
    ///
    /// # Returns
    /// `None` if the id is unknown.
    ///
    /// # Errors
    /// Returns error if the store is unavailable.
    fn get(&self, id: &str) -> Result<Option<AdaptiveSession>, Self::Error>;

    /// Run `f` against a stored session.
    ///
    /// # Returns
    /// `None` if the id is unknown, otherwise the closure's result.
    ///
    /// # Errors
    /// Returns error if the store is unavailable.
    fn update<R, F>(&self, id: &str, f: F) -> Result<Option<R>, Self::Error>
    where
        F: FnOnce(&mut AdaptiveSession) -> R;

    /// Remove and return a session.
    ///
    /// # Errors
    /// Returns error if the store is unavailable.
    fn remove(&self, id: &str) -> Result<Option<AdaptiveSession>, Self::Error>;

    /// Number of live sessions.
    ///
    /// # Errors
    /// Returns error if the store is unavailable.
    fn count(&self) -> Result<usize, Self::Error>;
}
