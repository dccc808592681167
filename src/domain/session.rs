//! Adaptive questioning session state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::diagnosis::uuid_v4;
use super::features::FeatureVector;

/// Severity assumed for a "yes" answer given without one (0-10 scale).
pub const DEFAULT_YES_SEVERITY: f64 = 5.0;

/// Lowest severity a "yes" answer contributes, so it always reads as present.
pub const MIN_YES_SEVERITY: f64 = 1.0;

/// Patient response to "do you have X?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerKind {
    Yes,
    No,
    Unknown,
}

impl std::str::FromStr for AnswerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(Self::Yes),
            "n" | "no" => Ok(Self::No),
            "u" | "unknown" | "?" => Ok(Self::Unknown),
            other => Err(format!("Unrecognized answer '{other}' (expected yes/no/unknown)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub kind: AnswerKind,
    /// Reported severity on the 0-10 scale, clamped on entry
    pub severity: Option<f64>,
}

impl Answer {
    #[must_use]
    pub fn new(kind: AnswerKind, severity: Option<f64>) -> Self {
        let severity = severity
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 10.0));
        Self { kind, severity }
    }

    /// Normalized severity this answer contributes, or 0 if it adds no signal.
    #[must_use]
    pub fn normalized_severity(&self) -> f64 {
        match self.kind {
            AnswerKind::Yes => {
                self.severity
                    .unwrap_or(DEFAULT_YES_SEVERITY)
                    .max(MIN_YES_SEVERITY)
                    / 10.0
            }
            AnswerKind::No | AnswerKind::Unknown => 0.0,
        }
    }
}

/// One in-progress adaptive session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveSession {
    pub id: String,
    pub answers: BTreeMap<usize, Answer>,
    /// Questions answered through the session (prior answers excluded)
    pub questions_asked: usize,
    pub threshold: f64,
    pub max_questions: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AdaptiveSession {
    #[must_use]
    pub fn new(threshold: f64, max_questions: usize) -> Self {
        Self {
            id: uuid_v4(),
            answers: BTreeMap::new(),
            questions_asked: 0,
            threshold,
            max_questions,
            created_at: chrono::Utc::now(),
        }
    }

    /// Record an answer supplied before questioning starts.
    pub fn seed(&mut self, symptom_id: usize, answer: Answer) {
        self.answers.insert(symptom_id, answer);
    }

    /// Record the answer to an asked question.
    pub fn record(&mut self, symptom_id: usize, answer: Answer) {
        self.answers.insert(symptom_id, answer);
        self.questions_asked += 1;
    }

    /// Symptom ids that already have any answer.
    #[must_use]
    pub fn asked_ids(&self) -> Vec<usize> {
        self.answers.keys().copied().collect()
    }

    #[must_use]
    pub fn is_first_question(&self) -> bool {
        self.questions_asked == 0
    }

    /// Features built from "yes" answers only.
    #[must_use]
    pub fn features(&self) -> FeatureVector {
        let mut fv = FeatureVector::new();
        for (&sid, answer) in &self.answers {
            fv.set(sid, answer.normalized_severity());
        }
        fv
    }

    /// Whether any symptom has been confirmed present.
    #[must_use]
    pub fn has_confirmed_symptoms(&self) -> bool {
        !self.features().present_ids().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_parsing() {
        assert_eq!("Y".parse::<AnswerKind>(), Ok(AnswerKind::Yes));
        assert_eq!(" no ".parse::<AnswerKind>(), Ok(AnswerKind::No));
        assert_eq!("u".parse::<AnswerKind>(), Ok(AnswerKind::Unknown));
        assert!("maybe".parse::<AnswerKind>().is_err());
    }

    #[test]
    fn test_features_from_answers() {
        let mut session = AdaptiveSession::new(0.8, 10);
        session.seed(0, Answer::new(AnswerKind::Yes, Some(14.0)));
        session.record(3, Answer::new(AnswerKind::No, None));
        session.record(7, Answer::new(AnswerKind::Yes, None));
        session.record(9, Answer::new(AnswerKind::Unknown, Some(8.0)));

        let fv = session.features();
        assert_eq!(fv.severity(0), 1.0);
        assert_eq!(fv.severity(7), 0.5);
        assert_eq!(fv.present_ids(), vec![0, 7]);
        assert_eq!(session.questions_asked, 3);
        assert_eq!(session.asked_ids(), vec![0, 3, 7, 9]);
        assert!(!session.is_first_question());
    }

    #[test]
    fn test_yes_with_zero_severity_stays_present() {
        let mut session = AdaptiveSession::new(0.8, 10);
        session.record(3, Answer::new(AnswerKind::Yes, Some(0.0)));
        session.record(6, Answer::new(AnswerKind::Yes, Some(-4.0)));

        assert!((Answer::new(AnswerKind::Yes, Some(0.0)).normalized_severity() - 0.1).abs() < 1e-12);
        assert_eq!(session.features().present_ids(), vec![3, 6]);
        assert!(session.has_confirmed_symptoms());
        assert_eq!(Answer::new(AnswerKind::No, Some(7.0)).normalized_severity(), 0.0);
    }
}
