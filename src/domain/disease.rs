//! Disease and syndrome definitions.

use serde::{Deserialize, Serialize};

/// How much evidence a diagnosis needs before it can be asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertaintyTier {
    /// Symptoms alone are sufficient
    Clinical,
    /// Likely from symptoms, testing strengthens it
    Presumptive,
    /// A specific test result is required
    Confirmatory,
}

impl CertaintyTier {
    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clinical => "Can be diagnosed based on symptoms alone",
            Self::Presumptive => "Likely diagnosis but benefits from testing",
            Self::Confirmatory => "Requires specific testing for definitive diagnosis",
        }
    }
}

impl std::fmt::Display for CertaintyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clinical => write!(f, "CLINICAL"),
            Self::Presumptive => write!(f, "PRESUMPTIVE"),
            Self::Confirmatory => write!(f, "CONFIRMATORY"),
        }
    }
}

/// Probability and typical normalized severity of one symptom within a disease.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SymptomPattern {
    /// Fraction of cases presenting the symptom, in `[0, 1]`
    pub frequency: f64,
    /// Normalized severity bounds `(lo, hi)` within `[0, 1]`
    pub severity_range: (f64, f64),
}

impl SymptomPattern {
    #[must_use]
    pub const fn new(frequency: f64, lo: f64, hi: f64) -> Self {
        Self {
            frequency,
            severity_range: (lo, hi),
        }
    }
}

/// A catalogue disease or syndrome-level diagnosis.
///
/// `patterns` keeps catalogue order; downstream listings (discriminating
/// features, absent hallmark findings) rely on it.
#[derive(Debug, Clone, Serialize)]
pub struct Disease {
    pub id: usize,
    pub name: &'static str,
    pub medical_name: &'static str,
    pub icd_10: &'static str,
    pub certainty: CertaintyTier,
    pub description: &'static str,
    pub typical_duration: &'static str,
    pub patterns: &'static [(usize, SymptomPattern)],
    pub required_tests: &'static [&'static str],
    pub supportive_tests: &'static [&'static str],
    pub red_flags: &'static [&'static str],
    pub pearls: &'static [&'static str],
}

impl Disease {
    /// Pattern for a symptom, if the disease declares one.
    #[must_use]
    pub fn pattern(&self, symptom_id: usize) -> Option<&SymptomPattern> {
        self.patterns
            .iter()
            .find(|(sid, _)| *sid == symptom_id)
            .map(|(_, p)| p)
    }

    /// Expected frequency of a symptom; undeclared symptoms count as 0.
    #[must_use]
    pub fn frequency(&self, symptom_id: usize) -> f64 {
        self.pattern(symptom_id).map_or(0.0, |p| p.frequency)
    }

    #[must_use]
    pub fn requires_testing(&self) -> bool {
        self.certainty == CertaintyTier::Confirmatory
    }
}
