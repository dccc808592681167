//! Synthetic case generation from disease symptom patterns.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::domain::{FeatureVector, TrainingCase};
use crate::knowledge::KnowledgeBase;

/// Frequency above which a symptom counts as a hallmark for atypical cases.
const HALLMARK_FREQUENCY: f64 = 0.7;

/// How a generated case deviates from the textbook presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Typical,
    /// One hallmark symptom missing
    Atypical,
    /// Every severity reduced by 30-50%
    Mild,
}

/// Seeded generator of labelled cases.
pub struct CaseSampler<'kb> {
    kb: &'kb KnowledgeBase,
    rng: ChaCha20Rng,
}

impl<'kb> CaseSampler<'kb> {
    #[must_use]
    pub fn new(kb: &'kb KnowledgeBase, seed: u64) -> Self {
        Self {
            kb,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Draw one case. An unknown disease id yields an empty feature vector.
    pub fn generate_case(&mut self, disease_id: usize, mode: CaseMode) -> FeatureVector {
        let Some(disease) = self.kb.disease(disease_id) else {
            return FeatureVector::new();
        };

        let mut fv = FeatureVector::new();
        for (sid, pattern) in disease.patterns {
            if self.rng.gen::<f64>() < pattern.frequency {
                let (lo, hi) = pattern.severity_range;
                let severity = if lo < hi { self.rng.gen_range(lo..hi) } else { lo };
                fv.set(*sid, severity);
            }
        }

        match mode {
            CaseMode::Typical => {}
            CaseMode::Atypical => {
                let hallmark = disease
                    .patterns
                    .iter()
                    .filter(|(sid, p)| p.frequency > HALLMARK_FREQUENCY && fv.is_present(*sid))
                    .map(|(sid, _)| *sid)
                    .choose(&mut self.rng);
                if let Some(sid) = hallmark {
                    fv.clear(sid);
                }
            }
            CaseMode::Mild => {
                let reduction = self.rng.gen_range(0.3..0.5);
                fv.scale(1.0 - reduction);
            }
        }
        fv
    }

    /// `n` typical, `n / 10` atypical and `n / 10` mild cases per disease, shuffled.
    pub fn generate_training_set(&mut self, n: usize) -> Vec<TrainingCase> {
        let variants = n / 10;
        let mut cases = Vec::with_capacity(self.kb.num_diseases() * (n + 2 * variants));

        for disease_id in self.kb.all_disease_ids() {
            for (mode, count) in [
                (CaseMode::Typical, n),
                (CaseMode::Atypical, variants),
                (CaseMode::Mild, variants),
            ] {
                for _ in 0..count {
                    let features = self.generate_case(disease_id, mode);
                    cases.push(TrainingCase::new(features, disease_id));
                }
            }
        }

        cases.shuffle(&mut self.rng);
        tracing::debug!("Generated {} synthetic cases", cases.len());
        cases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NUM_SYMPTOMS;
    use crate::knowledge::ids;

    #[test]
    fn test_training_set_size_and_labels() {
        let kb = KnowledgeBase::global();
        let mut sampler = CaseSampler::new(kb, 42);
        let cases = sampler.generate_training_set(20);

        assert_eq!(cases.len(), kb.num_diseases() * 24);
        for label in kb.all_disease_ids() {
            assert_eq!(cases.iter().filter(|c| c.label == label).count(), 24);
        }
    }

    #[test]
    fn test_cases_stay_within_pattern() {
        let kb = KnowledgeBase::global();
        let mut sampler = CaseSampler::new(kb, 1);
        let uti = kb.find_disease_id_by_name("Urinary Tract Infection").expect("UTI should exist");
        let disease = kb.disease(uti).expect("Should exist");

        for _ in 0..200 {
            let fv = sampler.generate_case(uti, CaseMode::Typical);
            for sid in fv.present_ids() {
                let pattern = disease.pattern(sid).expect("Present symptom should be in pattern");
                let (lo, hi) = pattern.severity_range;
                let s = fv.severity(sid);
                assert!(s >= lo && s <= hi, "{sid}: {s} outside {lo}..{hi}");
            }
            let v = fv.to_vec();
            for i in 0..NUM_SYMPTOMS {
                assert_eq!(v[i] > 0.0, v[NUM_SYMPTOMS + i] > 0.0);
            }
        }
    }

    #[test]
    fn test_presence_tracks_frequency() {
        let kb = KnowledgeBase::global();
        let mut sampler = CaseSampler::new(kb, 9);
        let uti = kb.find_disease_id_by_name("Urinary Tract Infection").expect("UTI should exist");
        let freq = kb.disease(uti).expect("Should exist").frequency(ids::DYSURIA);

        let trials = 2000;
        let hits = (0..trials)
            .filter(|_| sampler.generate_case(uti, CaseMode::Typical).is_present(ids::DYSURIA))
            .count();
        let observed = hits as f64 / trials as f64;
        assert!((observed - freq).abs() < 0.05, "observed {observed}, expected {freq}");
    }

    #[test]
    fn test_mild_cases_are_scaled_down() {
        let kb = KnowledgeBase::global();
        let mut sampler = CaseSampler::new(kb, 5);
        let ili = kb.find_disease_id_by_name("Influenza-like Illness").expect("ILI should exist");
        let disease = kb.disease(ili).expect("Should exist");

        for _ in 0..100 {
            let fv = sampler.generate_case(ili, CaseMode::Mild);
            for sid in fv.present_ids() {
                let (_, hi) = disease.pattern(sid).expect("In pattern").severity_range;
                assert!(fv.severity(sid) <= hi * 0.7 + 1e-12);
            }
        }
    }

    #[test]
    fn test_atypical_drops_a_hallmark() {
        let kb = KnowledgeBase::global();
        let ili = kb.find_disease_id_by_name("Influenza-like Illness").expect("ILI should exist");
        let disease = kb.disease(ili).expect("Should exist");
        let hallmarks = |fv: &FeatureVector| {
            disease
                .patterns
                .iter()
                .filter(|(sid, p)| p.frequency > HALLMARK_FREQUENCY && fv.is_present(*sid))
                .count()
        };

        let mut typical = CaseSampler::new(kb, 77);
        let mut atypical = CaseSampler::new(kb, 77);
        let trials = 300;
        let typical_total: usize = (0..trials)
            .map(|_| hallmarks(&typical.generate_case(ili, CaseMode::Typical)))
            .sum();
        let atypical_total: usize = (0..trials)
            .map(|_| hallmarks(&atypical.generate_case(ili, CaseMode::Atypical)))
            .sum();
        assert!(atypical_total < typical_total);
    }

    #[test]
    fn test_same_seed_same_cases() {
        let kb = KnowledgeBase::global();
        let a = CaseSampler::new(kb, 42).generate_training_set(5);
        let b = CaseSampler::new(kb, 42).generate_training_set(5);
        assert_eq!(a, b);
        assert_eq!(
            CaseSampler::new(kb, 42).generate_case(999, CaseMode::Typical),
            FeatureVector::new()
        );
    }
}
