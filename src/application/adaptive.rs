//! Adaptive session service: asks the most informative question next.
//!
//! A session starts from optional prior answers, receives one answer per
//! call, and finishes once the leading diagnosis reaches the confidence
//! threshold or the question budget runs out.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::diagnosis::DiagnosisService;
use crate::domain::{AdaptiveSession, Answer, AnswerKind, DiagnosisReport, NUM_SYMPTOMS};
use crate::engine::selector::{should_stop, uniform_posterior};
use crate::engine::AdaptiveSelector;
use crate::knowledge::KnowledgeBase;
use crate::ports::{ModelStore, SessionStore};
use crate::{DiagnosticaError, Result};

/// Stopping parameters for adaptive sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConfig {
    /// Leading posterior probability that ends a session
    pub threshold: f64,
    /// Question budget, prior answers excluded
    pub max_questions: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_questions: 10,
        }
    }
}

impl AdaptiveConfig {
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("DIAGNOSTICA_ADAPTIVE_THRESHOLD") {
            if let Ok(value) = raw.trim().parse::<f64>() {
                if value.is_finite() && value > 0.0 && value <= 1.0 {
                    config.threshold = value;
                }
            }
        }

        if let Ok(raw) = std::env::var("DIAGNOSTICA_ADAPTIVE_MAX_QUESTIONS") {
            if let Ok(value) = raw.trim().parse::<usize>() {
                if value > 0 {
                    config.max_questions = value;
                }
            }
        }

        config
    }

    /// # Errors
    /// Returns `Validation` for a threshold outside (0, 1] or a zero budget.
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(DiagnosticaError::Validation(format!(
                "Confidence threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.max_questions == 0 {
            return Err(DiagnosticaError::Validation(
                "max_questions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A symptom to ask the patient about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub symptom_id: usize,
    pub name: String,
    pub medical_term: String,
    pub icd_10: String,
}

impl Question {
    fn for_symptom(kb: &KnowledgeBase, symptom_id: usize) -> Option<Self> {
        kb.symptom(symptom_id).map(|s| Self {
            symptom_id,
            name: s.name.to_string(),
            medical_term: s.medical_term.to_string(),
            icd_10: s.icd_10.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub next_question: Option<Question>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub finished: bool,
    pub next_question: Option<Question>,
    /// Final report, present once `finished` is set
    pub results: Option<DiagnosisReport>,
}

/// Service driving adaptive sessions on top of a [`DiagnosisService`].
pub struct AdaptiveService<M, S>
where
    M: ModelStore,
    S: SessionStore,
{
    diagnosis: Arc<DiagnosisService<M>>,
    sessions: Arc<S>,
    selector: AdaptiveSelector<'static>,
    config: AdaptiveConfig,
}

impl<M, S> AdaptiveService<M, S>
where
    M: ModelStore,
    M::Error: Into<crate::adapters::StorageError>,
    S: SessionStore,
    S::Error: Into<crate::adapters::StorageError>,
{
    pub fn new(diagnosis: Arc<DiagnosisService<M>>, sessions: Arc<S>) -> Self {
        let kb = diagnosis.knowledge_base();
        Self {
            diagnosis,
            sessions,
            selector: AdaptiveSelector::new(kb),
            config: AdaptiveConfig::from_env_or_default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AdaptiveConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> AdaptiveConfig {
        self.config
    }

    /// Open a session seeded with `{symptom name: severity 0-10}`.
    ///
    /// Severity above 0 records "yes", anything else "no". Unknown names
    /// are ignored. `next_question` is `None` when the prior answers already
    /// meet the threshold; call [`AdaptiveService::finish`] then.
    ///
    /// # Errors
    /// Returns `Validation` for invalid overrides, or a storage error.
    pub fn start(
        &self,
        prior: &BTreeMap<String, f64>,
        threshold: Option<f64>,
        max_questions: Option<usize>,
    ) -> Result<StartOutcome> {
        let config = AdaptiveConfig {
            threshold: threshold.unwrap_or(self.config.threshold),
            max_questions: max_questions.unwrap_or(self.config.max_questions),
        };
        config.validate()?;

        let kb = self.diagnosis.knowledge_base();
        let mut session = AdaptiveSession::new(config.threshold, config.max_questions);
        for (name, severity) in prior {
            let Some(sid) = kb.find_symptom_id_by_name(name) else {
                tracing::debug!("Ignoring unknown prior symptom '{name}'");
                continue;
            };
            let answer = if *severity > 0.0 {
                Answer::new(AnswerKind::Yes, Some(*severity))
            } else {
                Answer::new(AnswerKind::No, None)
            };
            session.seed(sid, answer);
        }

        let posterior = self.posterior(&session)?;
        let next_question = self.next_question(&session, &posterior);
        let session_id = session.id.clone();
        self.sessions
            .insert(session)
            .map_err(|e| DiagnosticaError::Storage(e.into()))?;

        tracing::info!(
            "Adaptive session {} started with {} prior answers",
            session_id,
            prior.len()
        );
        Ok(StartOutcome {
            session_id,
            next_question,
        })
    }

    /// Record one answer and decide whether the session is done.
    ///
    /// # Errors
    /// Returns `SessionNotFound`, `Validation` for an out-of-range symptom
    /// id, or any error from finishing the session.
    pub fn answer(
        &self,
        session_id: &str,
        symptom_id: usize,
        kind: AnswerKind,
        severity: Option<f64>,
    ) -> Result<AnswerOutcome> {
        if symptom_id >= NUM_SYMPTOMS {
            return Err(DiagnosticaError::Validation(format!(
                "Symptom id {symptom_id} out of range (0..{NUM_SYMPTOMS})"
            )));
        }

        let session = self
            .sessions
            .update(session_id, |s| {
                s.record(symptom_id, Answer::new(kind, severity));
                s.clone()
            })
            .map_err(|e| DiagnosticaError::Storage(e.into()))?
            .ok_or_else(|| DiagnosticaError::SessionNotFound(session_id.to_string()))?;

        let posterior = self.posterior(&session)?;
        let next = self.next_question(&session, &posterior);

        match next {
            Some(question) => Ok(AnswerOutcome {
                finished: false,
                next_question: Some(question),
                results: None,
            }),
            None => Ok(AnswerOutcome {
                finished: true,
                next_question: None,
                results: Some(self.finish(session_id)?),
            }),
        }
    }

    /// Diagnose from the session's "yes" answers and close it.
    ///
    /// # Errors
    /// Returns `SessionNotFound` or a diagnosis error.
    pub fn finish(&self, session_id: &str) -> Result<DiagnosisReport> {
        let session = self
            .sessions
            .remove(session_id)
            .map_err(|e| DiagnosticaError::Storage(e.into()))?
            .ok_or_else(|| DiagnosticaError::SessionNotFound(session_id.to_string()))?;

        tracing::info!(
            "Adaptive session {} finished after {} questions",
            session.id,
            session.questions_asked
        );
        self.diagnosis
            .diagnose_features(&session.features(), &BTreeMap::new())
    }

    /// Top `k` unasked symptoms by EIG for a live session.
    ///
    /// # Errors
    /// Returns `SessionNotFound` or a storage error.
    pub fn rank_candidates(&self, session_id: &str, k: usize) -> Result<Vec<(Question, f64)>> {
        let session = self
            .sessions
            .get(session_id)
            .map_err(|e| DiagnosticaError::Storage(e.into()))?
            .ok_or_else(|| DiagnosticaError::SessionNotFound(session_id.to_string()))?;

        let kb = self.diagnosis.knowledge_base();
        let posterior = self.posterior(&session)?;
        Ok(self
            .selector
            .rank_candidates(&posterior, &session.asked_ids(), k)
            .into_iter()
            .filter_map(|(sid, eig)| Question::for_symptom(kb, sid).map(|q| (q, eig)))
            .collect())
    }

    /// # Errors
    /// Returns a storage error.
    pub fn active_sessions(&self) -> Result<usize> {
        self.sessions
            .count()
            .map_err(|e| DiagnosticaError::Storage(e.into()))
    }

    fn posterior(&self, session: &AdaptiveSession) -> Result<Vec<f64>> {
        if !session.has_confirmed_symptoms() {
            return Ok(uniform_posterior(
                self.diagnosis.knowledge_base().num_diseases(),
            ));
        }
        self.diagnosis.posterior(&session.features())
    }

    /// Next question, or `None` once the stop rule fires or nothing is left.
    fn next_question(&self, session: &AdaptiveSession, posterior: &[f64]) -> Option<Question> {
        if should_stop(
            posterior,
            session.questions_asked,
            session.threshold,
            session.max_questions,
        ) {
            tracing::debug!(
                "Stopping after {} questions (max p = {:.3})",
                session.questions_asked,
                posterior.iter().copied().fold(0.0, f64::max)
            );
            return None;
        }
        self.selector
            .select_next(posterior, &session.asked_ids(), session.is_first_question())
            .and_then(|sid| Question::for_symptom(self.diagnosis.knowledge_base(), sid))
    }
}
