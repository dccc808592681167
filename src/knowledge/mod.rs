//! Knowledge base: read-only symptom and disease catalogues.
//!
//! The tables are compiled into the binary. Name lookups go through maps built
//! once on first access; every component borrows the same
//! `&'static KnowledgeBase`.

mod diseases;
mod symptoms;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::domain::{CertaintyTier, Disease, FeatureVector, Symptom, Syndrome};

pub use diseases::{names, DISEASES};
pub use symptoms::{ids, SYMPTOMS};

static KNOWLEDGE_BASE: OnceLock<KnowledgeBase> = OnceLock::new();

/// Confirmed diagnosis, the syndrome-level diagnosis it is reported as
/// without a test, and the test-name keywords that confirm it.
const CONFIRMATION_LINKS: [(&str, &str, &[&str]); 3] = [
    (
        names::INFLUENZA_CONFIRMED,
        names::ILI,
        &["influenza", "flu a", "flu b", "flu test"],
    ),
    (
        names::COVID_CONFIRMED,
        names::COVID_LIKE,
        &["sars-cov-2", "covid"],
    ),
    (names::STREP, names::VIRAL_URI, &["strep"]),
];

/// Result strings counted as a positive test.
const POSITIVE_RESULTS: [&str; 5] = ["positive", "pos", "+", "detected", "reactive"];

/// Immutable catalogue view with precomputed indices.
#[derive(Debug)]
pub struct KnowledgeBase {
    symptoms: &'static [Symptom],
    diseases: &'static [Disease],
    symptom_index: HashMap<String, usize>,
    disease_index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Process-wide knowledge base.
    #[must_use]
    pub fn global() -> &'static KnowledgeBase {
        KNOWLEDGE_BASE.get_or_init(|| Self::from_tables(&SYMPTOMS, &DISEASES))
    }

    fn from_tables(symptoms: &'static [Symptom], diseases: &'static [Disease]) -> Self {
        let symptom_index = symptoms
            .iter()
            .map(|s| (s.name.to_lowercase(), s.id))
            .collect();
        let disease_index = diseases
            .iter()
            .map(|d| (d.name.to_lowercase(), d.id))
            .collect();
        Self {
            symptoms,
            diseases,
            symptom_index,
            disease_index,
        }
    }

    #[must_use]
    pub fn symptom(&self, id: usize) -> Option<&Symptom> {
        self.symptoms.get(id)
    }

    #[must_use]
    pub fn disease(&self, id: usize) -> Option<&Disease> {
        self.diseases.get(id)
    }

    #[must_use]
    pub fn symptoms(&self) -> &[Symptom] {
        self.symptoms
    }

    #[must_use]
    pub fn diseases(&self) -> &[Disease] {
        self.diseases
    }

    #[must_use]
    pub fn num_diseases(&self) -> usize {
        self.diseases.len()
    }

    /// Disease ids in catalogue order.
    #[must_use]
    pub fn all_disease_ids(&self) -> Vec<usize> {
        (0..self.diseases.len()).collect()
    }

    /// Case-insensitive symptom lookup by display name.
    #[must_use]
    pub fn find_symptom_id_by_name(&self, name: &str) -> Option<usize> {
        self.symptom_index.get(&name.trim().to_lowercase()).copied()
    }

    /// Case-insensitive disease lookup by display name.
    #[must_use]
    pub fn find_disease_id_by_name(&self, name: &str) -> Option<usize> {
        self.disease_index.get(&name.trim().to_lowercase()).copied()
    }

    #[must_use]
    pub fn disease_by_name(&self, name: &str) -> Option<&Disease> {
        self.find_disease_id_by_name(name)
            .and_then(|id| self.disease(id))
    }

    /// Build features from `{symptom name: severity 0-10}` entries.
    ///
    /// Unknown names are ignored; severities <= 0 leave the symptom absent.
    pub fn build_features<'a, I>(&self, entries: I) -> FeatureVector
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut fv = FeatureVector::new();
        for (name, severity) in entries {
            match self.find_symptom_id_by_name(name) {
                Some(sid) => fv.set(sid, (severity / 10.0).clamp(0.0, 1.0)),
                None => tracing::debug!("Ignoring unknown symptom name: {name}"),
            }
        }
        fv
    }

    /// Build features from raw readings on each symptom's own scale,
    /// e.g. `("Fever", 102.3)` in °F or `("Rapid Heartbeat", 125.0)` in bpm.
    ///
    /// Readings that normalize to 0 leave the symptom absent.
    pub fn build_features_from_readings<'a, I>(&self, entries: I) -> FeatureVector
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut fv = FeatureVector::new();
        for (name, raw) in entries {
            match self
                .find_symptom_id_by_name(name)
                .and_then(|sid| self.symptom(sid))
            {
                Some(symptom) => fv.set(symptom.id, symptom.normalize(raw)),
                None => tracing::debug!("Ignoring unknown symptom name: {name}"),
            }
        }
        fv
    }

    /// Disease names considered for a syndrome.
    ///
    /// Some names have no catalogue entry; callers skip those.
    #[must_use]
    pub fn appropriate_differential(&self, syndrome: Syndrome) -> &'static [&'static str] {
        match syndrome {
            Syndrome::RespiratoryFebrile => &[
                names::VIRAL_URI,
                names::ILI,
                names::COVID_LIKE,
                names::PNEUMONIA,
                names::STREP,
            ],
            Syndrome::Gastrointestinal => &[
                names::GASTROENTERITIS,
                "Food Poisoning",
                "Viral Gastroenteritis",
                "Bacterial Gastroenteritis",
            ],
            Syndrome::GeneralSystemic => &[
                names::VIRAL_SYNDROME,
                "Early Bacterial Infection",
                "Mononucleosis",
            ],
            Syndrome::Undifferentiated => &[names::VIRAL_SYNDROME],
        }
    }

    /// Catalogue ids of a syndrome's differential, in differential order.
    #[must_use]
    pub fn differential_ids(&self, syndrome: Syndrome) -> Vec<usize> {
        self.appropriate_differential(syndrome)
            .iter()
            .filter_map(|name| self.find_disease_id_by_name(name))
            .collect()
    }

    /// Syndrome-level diagnosis to report when a confirmatory diagnosis has no test.
    #[must_use]
    pub fn syndrome_counterpart(&self, disease_id: usize) -> Option<usize> {
        let name = self.disease(disease_id)?.name;
        CONFIRMATION_LINKS
            .iter()
            .find(|(confirmed, _, _)| *confirmed == name)
            .and_then(|(_, syndrome, _)| self.find_disease_id_by_name(syndrome))
    }

    /// Confirmed diagnosis a positive result on `test_name` establishes.
    #[must_use]
    pub fn confirmed_by_test(&self, test_name: &str) -> Option<usize> {
        let test = test_name.to_lowercase();
        CONFIRMATION_LINKS
            .iter()
            .find(|(_, _, keywords)| keywords.iter().any(|k| test.contains(k)))
            .and_then(|(confirmed, _, _)| self.find_disease_id_by_name(confirmed))
    }

    /// Whether a free-text test result reads as positive.
    #[must_use]
    pub fn is_positive_result(result: &str) -> bool {
        let r = result.trim().to_lowercase();
        POSITIVE_RESULTS.iter().any(|p| r == *p)
    }

    /// Diseases in a given certainty tier.
    #[must_use]
    pub fn diseases_with_certainty(&self, tier: CertaintyTier) -> Vec<usize> {
        self.diseases
            .iter()
            .filter(|d| d.certainty == tier)
            .map(|d| d.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_ids_match_positions() {
        let kb = KnowledgeBase::global();
        for (i, s) in kb.symptoms().iter().enumerate() {
            assert_eq!(s.id, i);
        }
        for (i, d) in kb.diseases().iter().enumerate() {
            assert_eq!(d.id, i);
        }
    }

    #[test]
    fn test_patterns_are_well_formed() {
        let kb = KnowledgeBase::global();
        for d in kb.diseases() {
            for (sid, pattern) in d.patterns {
                assert!(*sid < kb.symptoms().len(), "{} references symptom {sid}", d.name);
                assert!((0.0..=1.0).contains(&pattern.frequency));
                let (lo, hi) = pattern.severity_range;
                assert!(0.0 <= lo && lo <= hi && hi <= 1.0, "{} range {lo}..{hi}", d.name);
            }
        }
    }

    #[test]
    fn test_every_confirmatory_disease_has_a_non_confirmatory_counterpart() {
        let kb = KnowledgeBase::global();
        for id in kb.diseases_with_certainty(CertaintyTier::Confirmatory) {
            let counterpart = kb
                .syndrome_counterpart(id)
                .expect("Confirmatory disease should map to a syndrome");
            let disease = kb.disease(counterpart).expect("Counterpart should exist");
            assert_ne!(disease.certainty, CertaintyTier::Confirmatory);
        }
    }

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        let kb = KnowledgeBase::global();
        assert_eq!(kb.find_symptom_id_by_name("fever"), Some(0));
        assert_eq!(kb.find_symptom_id_by_name("  MUSCLE PAIN "), Some(16));
        assert_eq!(kb.find_symptom_id_by_name("Anosmia"), None);
        assert_eq!(kb.find_disease_id_by_name("urinary tract infection"), Some(10));
    }

    #[test]
    fn test_build_features_ignores_unknown_and_zero() {
        let kb = KnowledgeBase::global();
        let fv = kb.build_features([("Fever", 8.0), ("Cough", 0.0), ("Telepathy", 9.0), ("Nausea", 15.0)]);
        assert_eq!(fv.present_ids(), vec![0, 9]);
        assert!((fv.severity(0) - 0.8).abs() < 1e-12);
        assert_eq!(fv.severity(9), 1.0);
    }

    #[test]
    fn test_readings_use_each_symptom_scale() {
        let kb = KnowledgeBase::global();
        let fv = kb.build_features_from_readings([
            ("Fever", 102.3),
            ("Cough", 6.0),
            ("Rapid Heartbeat", 72.0),
            ("Rash", 40.0),
            ("Telepathy", 9.0),
        ]);
        assert!((fv.severity(0) - 0.5).abs() < 1e-9);
        assert!((fv.severity(3) - 0.6).abs() < 1e-12);
        assert!((fv.severity(21) - 0.4).abs() < 1e-12);
        // resting heart rate is not tachycardia
        assert_eq!(fv.present_ids(), vec![0, 3, 21]);
    }

    #[test]
    fn test_differential_skips_missing_entries() {
        let kb = KnowledgeBase::global();
        assert_eq!(kb.differential_ids(Syndrome::Gastrointestinal), vec![4]);
        assert_eq!(kb.differential_ids(Syndrome::RespiratoryFebrile), vec![0, 1, 2, 5, 8]);
        assert_eq!(kb.differential_ids(Syndrome::Undifferentiated), vec![3]);
    }

    #[test]
    fn test_confirmation_lookup() {
        let kb = KnowledgeBase::global();
        assert_eq!(kb.confirmed_by_test("Influenza A/B Test"), Some(6));
        assert_eq!(kb.confirmed_by_test("SARS-CoV-2 PCR"), Some(7));
        assert_eq!(kb.confirmed_by_test("Rapid Strep"), Some(8));
        assert_eq!(kb.confirmed_by_test("Urinalysis"), None);
        assert!(KnowledgeBase::is_positive_result(" Positive "));
        assert!(!KnowledgeBase::is_positive_result("negative"));
    }
}
