//! Adapters layer: Concrete implementations of ports.
//!
//! - `snapshot`: JSON files for trained model weights
//! - `memory`: in-process adaptive session state
//! - `sanitize`: identifier filtering for logs
//! - `logging`: subscriber setup for the binaries

pub mod logging;
pub mod memory;
pub mod sanitize;
pub mod snapshot;

// Re-export storage error for lib.rs
pub use snapshot::StorageError;
