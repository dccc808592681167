//! Diagnosis report types.
//!
//! Represents the structured output of the rule-adjusted classifier.

use serde::{Deserialize, Serialize};

use super::disease::CertaintyTier;

/// Coarse syndrome inferred from which symptom groups are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Syndrome {
    RespiratoryFebrile,
    Gastrointestinal,
    GeneralSystemic,
    Undifferentiated,
}

impl Syndrome {
    /// Catalogue label, also used to look up the syndrome's differential.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::RespiratoryFebrile => "Respiratory Febrile",
            Self::Gastrointestinal => "Gastrointestinal",
            Self::GeneralSystemic => "General/Systemic",
            Self::Undifferentiated => "Undifferentiated",
        }
    }

    #[must_use]
    pub fn is_respiratory(&self) -> bool {
        matches!(self, Self::RespiratoryFebrile)
    }
}

impl std::fmt::Display for Syndrome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall illness severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityLevel {
    Mild,
    Moderate,
    Severe,
}

impl SeverityLevel {
    /// Get the follow-up advice for this level.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Mild => "Monitor symptoms, seek care if worsening",
            Self::Moderate => "Medical evaluation within 24-48 hours",
            Self::Severe => "Immediate medical evaluation recommended",
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mild => write!(f, "MILD"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Severe => write!(f, "SEVERE"),
        }
    }
}

/// Severity level plus whether a red-flag symptom forced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub level: SeverityLevel,
    pub red_flag: bool,
}

impl std::fmt::Display for SeverityAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.red_flag {
            write!(f, "{} - Immediate evaluation needed", self.level)
        } else {
            write!(f, "{}", self.level)
        }
    }
}

/// The chosen diagnosis after downgrade/upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryDiagnosis {
    pub disease_id: usize,
    pub name: String,
    pub medical_name: String,
    pub icd_10: String,
    /// Adjusted probability of the reported disease
    pub confidence: f64,
    pub certainty: CertaintyTier,
    pub description: String,
}

/// One line of the reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub symptom: String,
    pub significance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalReasoning {
    pub syndrome: Syndrome,
    pub key_findings: Vec<Finding>,
    pub supporting_features: Vec<Finding>,
    pub inconsistent_features: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialEntry {
    pub disease: String,
    pub probability: f64,
    pub icd_10: String,
    pub certainty: CertaintyTier,
    pub key_discriminating_features: Vec<String>,
}

/// Complete diagnosis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    /// Unique identifier
    pub id: String,
    pub syndrome: Syndrome,
    pub severity: SeverityAssessment,
    pub primary: PrimaryDiagnosis,
    pub reasoning: ClinicalReasoning,
    pub differential: Vec<DifferentialEntry>,
    pub required_tests: Vec<String>,
    pub supportive_tests: Vec<String>,
    pub clinical_pearls: Vec<String>,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    /// Test that upgraded a syndrome-level diagnosis to a confirmed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<String>,
    /// Timestamp of diagnosis
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Generate a random UUID v4 string.
///
/// Uses ChaCha20Rng seeded from OS entropy so ids are unpredictable.
pub(crate) fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
