//! Domain layer: Core value types.
//!
//! This module contains pure Rust types with no I/O.
//! All types are immutable once built or mutated only through explicit methods.

mod diagnosis;
mod disease;
mod features;
mod session;
mod symptom;

pub use diagnosis::{
    ClinicalReasoning, DiagnosisReport, DifferentialEntry, Finding, PrimaryDiagnosis,
    SeverityAssessment, SeverityLevel, Syndrome,
};
pub(crate) use diagnosis::uuid_v4;
pub use disease::{CertaintyTier, Disease, SymptomPattern};
pub use features::{FeatureVector, TrainingCase, NUM_FEATURES};
pub use session::{AdaptiveSession, Answer, AnswerKind, DEFAULT_YES_SEVERITY, MIN_YES_SEVERITY};
pub use symptom::{SeverityScale, Symptom, NUM_SYMPTOMS};
