//! Application layer: Use cases and services.
//!
//! This module orchestrates the engine with ports to implement
//! one-shot diagnosis and adaptive questioning.

mod adaptive;
pub(crate) mod diagnosis;

pub use adaptive::{AdaptiveConfig, AdaptiveService, AnswerOutcome, Question, StartOutcome};
pub use diagnosis::DiagnosisService;
