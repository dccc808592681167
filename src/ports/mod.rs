//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and its storage backends (snapshot files,
//! session state).

mod model_store;
mod session_store;

pub use model_store::ModelStore;
pub use session_store::SessionStore;
