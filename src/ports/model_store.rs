//! Model store port: Trait for loading and saving trained weights.
//!
//! This trait abstracts where snapshots live (JSON files, memory) from the
//! services that train and serve the classifier.

use crate::engine::ModelSnapshot;

/// Trait for model snapshot persistence.
pub trait ModelStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the stored snapshot.
    ///
    /// # Returns
    /// `None` if no snapshot has been saved yet.
    ///
    /// # Errors
    /// Returns error if a snapshot exists but cannot be read or verified.
    fn try_load(&self) -> Result<Option<ModelSnapshot>, Self::Error>;

    /// Persist a snapshot, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if the snapshot cannot be written.
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), Self::Error>;
}
