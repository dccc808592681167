//! # Diagnostica
#![allow(non_snake_case)]
//!
//! Rule-augmented neural classifier for common illness syndromes.
//!
//! This crate provides:
//! - A one-hidden-layer network trained on synthetic cases sampled from a
//!   fixed symptom/disease knowledge base
//! - Clinical rules that gate and reweight the network's output
//! - Adaptive questioning that picks the next symptom by expected
//!   information gain
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `knowledge`: Read-only symptom and disease catalogues
//! - `domain`: Core value types (features, diseases, reports, sessions)
//! - `engine`: Network, trainer, rule adjuster, selector, datasets
//! - `ports`: Trait definitions for model and session storage
//! - `adapters`: Concrete implementations (JSON snapshots, in-memory sessions)
//! - `application`: Diagnosis and adaptive-questioning services

pub mod adapters;
pub mod application;
pub mod domain;
pub mod engine;
pub mod knowledge;
pub mod ports;

pub use domain::{DiagnosisReport, FeatureVector, Syndrome};
pub use knowledge::KnowledgeBase;

/// Result type for Diagnostica operations
pub type Result<T> = std::result::Result<T, DiagnosticaError>;

/// Main error type for Diagnostica
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticaError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("No diagnosis could be derived from the reported symptoms")]
    NoDiagnosis,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
