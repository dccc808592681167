//! Clinical rule adjuster.
//!
//! Post-processes raw network probabilities with syndrome gating, a
//! Centor-style score for strep, negative evidence from absent hallmark
//! symptoms, guards against implausible urinary diagnoses and targeted
//! boosts. The adjuster is a pure function of its inputs and [`RuleConfig`].

use super::network::{softmax, LOG_EPSILON};
use crate::domain::{FeatureVector, Syndrome};
use crate::knowledge::{ids, names, KnowledgeBase};

const RESPIRATORY_SYMPTOMS: [usize; 6] = [
    ids::COUGH,
    ids::DYSPNEA,
    ids::WHEEZING,
    ids::SORE_THROAT,
    ids::RHINORRHEA,
    ids::CONGESTION,
];
const GI_SYMPTOMS: [usize; 3] = [ids::NAUSEA, ids::VOMITING, ids::DIARRHEA];
const SYSTEMIC_SYMPTOMS: [usize; 3] = [ids::FEVER, ids::FATIGUE, ids::MYALGIA];
/// Respiratory symptoms that make fever a respiratory febrile picture.
const FEBRILE_RESPIRATORY: [usize; 4] = [ids::COUGH, ids::SORE_THROAT, ids::RHINORRHEA, ids::CONGESTION];

/// Tunable rule constants. `Default` holds the calibrated values.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    // Centor score
    pub centor_fever_threshold: f64,
    pub centor_sore_throat_threshold: f64,
    pub centor_low_multiplier: f64,
    pub centor_mid_multiplier: f64,
    pub centor_high_multiplier: f64,

    // Negative evidence
    /// Pattern frequency at which an absent symptom counts against a disease
    pub hallmark_frequency: f64,
    pub negative_evidence_factor: f64,

    // Urinary guard
    pub uti_both_missing_multiplier: f64,
    pub uti_one_missing_multiplier: f64,

    // Log-space gate and boosts
    pub gate_bonus: f64,
    pub nasal_threshold: f64,
    pub uri_cough_threshold: f64,
    pub uri_nasal_bonus: f64,
    pub uri_low_systemic_threshold: f64,
    pub uri_low_systemic_bonus: f64,
    pub uti_nasal_penalty: f64,
    pub ili_fever_myalgia_threshold: f64,
    pub ili_classic_bonus: f64,
    pub ili_fatigue_threshold: f64,
    pub ili_fatigue_bonus: f64,
    pub covid_anosmia_threshold: f64,
    pub covid_anosmia_bonus: f64,
    pub covid_nausea_threshold: f64,
    pub covid_cough_threshold: f64,
    pub covid_gi_bonus: f64,
    pub covid_dyspnea_threshold: f64,
    pub covid_dyspnea_bonus: f64,
    pub pneumonia_dyspnea_threshold: f64,
    pub pneumonia_chest_pain_threshold: f64,
    pub pneumonia_cough_threshold: f64,
    pub pneumonia_bonus: f64,
    /// Applied when the syndrome is respiratory or undifferentiated
    pub uti_respiratory_penalty: f64,
    pub uti_other_penalty: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            centor_fever_threshold: 0.3,
            centor_sore_throat_threshold: 0.5,
            centor_low_multiplier: 0.1,
            centor_mid_multiplier: 0.5,
            centor_high_multiplier: 1.5,

            hallmark_frequency: 0.85,
            negative_evidence_factor: 0.6,

            uti_both_missing_multiplier: 0.03,
            uti_one_missing_multiplier: 0.2,

            gate_bonus: 2.5,
            nasal_threshold: 0.3,
            uri_cough_threshold: 0.2,
            uri_nasal_bonus: 1.5,
            uri_low_systemic_threshold: 0.6,
            uri_low_systemic_bonus: 0.5,
            uti_nasal_penalty: 6.0,
            ili_fever_myalgia_threshold: 0.6,
            ili_classic_bonus: 2.5,
            ili_fatigue_threshold: 0.7,
            ili_fatigue_bonus: 0.5,
            covid_anosmia_threshold: 0.8,
            covid_anosmia_bonus: 2.5,
            covid_nausea_threshold: 0.3,
            covid_cough_threshold: 0.2,
            covid_gi_bonus: 0.5,
            covid_dyspnea_threshold: 0.4,
            covid_dyspnea_bonus: 0.3,
            pneumonia_dyspnea_threshold: 0.5,
            pneumonia_chest_pain_threshold: 0.4,
            pneumonia_cough_threshold: 0.5,
            pneumonia_bonus: 2.0,
            uti_respiratory_penalty: 12.0,
            uti_other_penalty: 8.0,
        }
    }
}

/// Coarse syndrome from the set of present symptom ids.
#[must_use]
pub fn classify_syndrome(present: &[usize]) -> Syndrome {
    let count = |group: &[usize]| present.iter().filter(|sid| group.contains(sid)).count();
    let resp = count(&RESPIRATORY_SYMPTOMS);
    let gi = count(&GI_SYMPTOMS);
    let systemic = count(&SYSTEMIC_SYMPTOMS);

    let febrile_respiratory =
        present.contains(&ids::FEVER) && present.iter().any(|sid| FEBRILE_RESPIRATORY.contains(sid));

    if febrile_respiratory || (resp >= 2 && systemic >= 1) {
        Syndrome::RespiratoryFebrile
    } else if gi >= 2 {
        Syndrome::Gastrointestinal
    } else if systemic >= 2 && resp == 0 && gi == 0 {
        Syndrome::GeneralSystemic
    } else {
        Syndrome::Undifferentiated
    }
}

/// Catalogue ids the rules single out.
#[derive(Debug, Clone, Copy)]
struct RuleTargets {
    uri: Option<usize>,
    ili: Option<usize>,
    covid_like: Option<usize>,
    viral_syndrome: Option<usize>,
    pneumonia: Option<usize>,
    strep: Option<usize>,
    uti: Option<usize>,
}

impl RuleTargets {
    fn resolve(kb: &KnowledgeBase) -> Self {
        Self {
            uri: kb.find_disease_id_by_name(names::VIRAL_URI),
            ili: kb.find_disease_id_by_name(names::ILI),
            covid_like: kb.find_disease_id_by_name(names::COVID_LIKE),
            viral_syndrome: kb.find_disease_id_by_name(names::VIRAL_SYNDROME),
            pneumonia: kb.find_disease_id_by_name(names::PNEUMONIA),
            strep: kb.find_disease_id_by_name(names::STREP),
            uti: kb.find_disease_id_by_name(names::UTI),
        }
    }
}

/// Applies the clinical rules to network output.
pub struct RuleAdjuster<'kb> {
    kb: &'kb KnowledgeBase,
    config: RuleConfig,
    targets: RuleTargets,
}

impl<'kb> RuleAdjuster<'kb> {
    #[must_use]
    pub fn new(kb: &'kb KnowledgeBase) -> Self {
        Self::with_config(kb, RuleConfig::default())
    }

    #[must_use]
    pub fn with_config(kb: &'kb KnowledgeBase, config: RuleConfig) -> Self {
        Self {
            kb,
            config,
            targets: RuleTargets::resolve(kb),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Adjust raw probabilities for the given features.
    ///
    /// Returns a distribution summing to 1, or all zeros if no diagnosis can
    /// be derived. Test results are not used here; they act when the
    /// primary diagnosis is confirmed.
    #[must_use]
    pub fn adjust(&self, raw: &[f64], features: &FeatureVector, has_test_results: bool) -> Vec<f64> {
        let present = features.present_ids();
        let syndrome = classify_syndrome(&present);
        tracing::debug!(
            "Adjusting {} probabilities for {syndrome} (test results: {has_test_results})",
            raw.len()
        );

        let mut p = raw.to_vec();
        self.apply_centor(&mut p, features);
        self.apply_negative_evidence(&mut p, features);
        self.apply_uti_guard(&mut p, features);

        let mut log_p: Vec<f64> = p.iter().map(|x| x.max(LOG_EPSILON).ln()).collect();
        self.apply_gate(&mut log_p, syndrome);
        self.apply_boosts(&mut log_p, features, syndrome);

        renormalize(softmax(&log_p, 1.0))
    }

    fn apply_centor(&self, p: &mut [f64], f: &FeatureVector) {
        let Some(slot) = self.targets.strep.and_then(|id| p.get_mut(id)) else {
            return;
        };
        let cfg = &self.config;
        let score = [
            f.is_present(ids::FEVER) && f.severity(ids::FEVER) > cfg.centor_fever_threshold,
            !f.is_present(ids::COUGH),
            f.is_present(ids::SORE_THROAT)
                && f.severity(ids::SORE_THROAT) > cfg.centor_sore_throat_threshold,
        ]
        .iter()
        .filter(|&&point| point)
        .count();

        *slot *= match score {
            0 | 1 => cfg.centor_low_multiplier,
            2 => cfg.centor_mid_multiplier,
            _ => cfg.centor_high_multiplier,
        };
    }

    fn apply_negative_evidence(&self, p: &mut [f64], f: &FeatureVector) {
        for (disease, prob) in self.kb.diseases().iter().zip(p.iter_mut()) {
            let missing = disease
                .patterns
                .iter()
                .filter(|(sid, pat)| pat.frequency >= self.config.hallmark_frequency && !f.is_present(*sid))
                .count();
            if missing > 0 {
                *prob *= self.config.negative_evidence_factor.powi(missing as i32);
            }
        }
    }

    fn apply_uti_guard(&self, p: &mut [f64], f: &FeatureVector) {
        let Some(slot) = self.targets.uti.and_then(|id| p.get_mut(id)) else {
            return;
        };
        let missing = [ids::URINARY_FREQUENCY, ids::DYSURIA]
            .iter()
            .filter(|sid| !f.is_present(**sid))
            .count();
        match missing {
            2 => *slot *= self.config.uti_both_missing_multiplier,
            1 => *slot *= self.config.uti_one_missing_multiplier,
            _ => {}
        }
    }

    fn apply_gate(&self, log_p: &mut [f64], syndrome: Syndrome) {
        let mut allowed = self.kb.differential_ids(syndrome);
        allowed.extend(self.targets.viral_syndrome);
        for (id, l) in log_p.iter_mut().enumerate() {
            if allowed.contains(&id) {
                *l += self.config.gate_bonus;
            } else {
                *l -= self.config.gate_bonus;
            }
        }
    }

    fn apply_boosts(&self, log_p: &mut [f64], f: &FeatureVector, syndrome: Syndrome) {
        let cfg = &self.config;
        let s = |sid: usize| f.severity(sid);
        let mut bump = |target: Option<usize>, delta: f64| {
            if let Some(l) = target.and_then(|id| log_p.get_mut(id)) {
                *l += delta;
            }
        };

        let nasal = s(ids::RHINORRHEA) > cfg.nasal_threshold || s(ids::CONGESTION) > cfg.nasal_threshold;
        let urinary_absent = !f.is_present(ids::URINARY_FREQUENCY) && !f.is_present(ids::DYSURIA);

        if s(ids::RHINORRHEA) > cfg.nasal_threshold
            && s(ids::CONGESTION) > cfg.nasal_threshold
            && s(ids::COUGH) > cfg.uri_cough_threshold
        {
            bump(self.targets.uri, cfg.uri_nasal_bonus);
        }
        if s(ids::FEVER) < cfg.uri_low_systemic_threshold && s(ids::MYALGIA) < cfg.uri_low_systemic_threshold {
            bump(self.targets.uri, cfg.uri_low_systemic_bonus);
        }
        if nasal && urinary_absent {
            bump(self.targets.uti, -cfg.uti_nasal_penalty);
        }

        if s(ids::FEVER) >= cfg.ili_fever_myalgia_threshold && s(ids::MYALGIA) >= cfg.ili_fever_myalgia_threshold {
            bump(self.targets.ili, cfg.ili_classic_bonus);
        }
        if s(ids::FATIGUE) >= cfg.ili_fatigue_threshold {
            bump(self.targets.ili, cfg.ili_fatigue_bonus);
        }

        if s(ids::ANOSMIA) >= cfg.covid_anosmia_threshold {
            bump(self.targets.covid_like, cfg.covid_anosmia_bonus);
        }
        if s(ids::NAUSEA) >= cfg.covid_nausea_threshold && s(ids::COUGH) > cfg.covid_cough_threshold {
            bump(self.targets.covid_like, cfg.covid_gi_bonus);
        }
        if s(ids::DYSPNEA) >= cfg.covid_dyspnea_threshold {
            bump(self.targets.covid_like, cfg.covid_dyspnea_bonus);
        }

        if s(ids::DYSPNEA) >= cfg.pneumonia_dyspnea_threshold
            && s(ids::CHEST_PAIN) >= cfg.pneumonia_chest_pain_threshold
            && s(ids::COUGH) >= cfg.pneumonia_cough_threshold
        {
            bump(self.targets.pneumonia, cfg.pneumonia_bonus);
        }

        if urinary_absent {
            let penalty = if syndrome.is_respiratory() || syndrome == Syndrome::Undifferentiated {
                cfg.uti_respiratory_penalty
            } else {
                cfg.uti_other_penalty
            };
            bump(self.targets.uti, -penalty);
        }
    }
}

/// Scale to sum 1; a non-positive total yields all zeros.
fn renormalize(mut p: Vec<f64>) -> Vec<f64> {
    let total: f64 = p.iter().sum();
    if total > 0.0 && total.is_finite() {
        for x in &mut p {
            *x /= total;
        }
    } else {
        p.iter_mut().for_each(|x| *x = 0.0);
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::network::argmax;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn features(entries: &[(usize, f64)]) -> FeatureVector {
        let mut fv = FeatureVector::new();
        for &(sid, sev) in entries {
            fv.set(sid, sev);
        }
        fv
    }

    fn uniform(kb: &KnowledgeBase) -> Vec<f64> {
        vec![1.0 / kb.num_diseases() as f64; kb.num_diseases()]
    }

    fn id(kb: &KnowledgeBase, name: &str) -> usize {
        kb.find_disease_id_by_name(name).expect("Disease should exist")
    }

    #[test]
    fn test_syndrome_classification() {
        assert_eq!(classify_syndrome(&[ids::FEVER, ids::COUGH]), Syndrome::RespiratoryFebrile);
        assert_eq!(
            classify_syndrome(&[ids::WHEEZING, ids::DYSPNEA, ids::FATIGUE]),
            Syndrome::RespiratoryFebrile
        );
        assert_eq!(classify_syndrome(&[ids::NAUSEA, ids::DIARRHEA]), Syndrome::Gastrointestinal);
        assert_eq!(classify_syndrome(&[ids::FEVER, ids::MYALGIA]), Syndrome::GeneralSystemic);
        assert_eq!(
            classify_syndrome(&[ids::FEVER, ids::MYALGIA, ids::NAUSEA]),
            Syndrome::Undifferentiated
        );
        assert_eq!(classify_syndrome(&[]), Syndrome::Undifferentiated);
    }

    #[test]
    fn test_adjusted_sums_to_one() {
        let kb = KnowledgeBase::global();
        let adjuster = RuleAdjuster::new(kb);
        let mut rng = ChaCha20Rng::seed_from_u64(21);

        for _ in 0..100 {
            let mut raw: Vec<f64> = (0..kb.num_diseases()).map(|_| rng.gen::<f64>()).collect();
            let total: f64 = raw.iter().sum();
            raw.iter_mut().for_each(|x| *x /= total);

            let mut fv = FeatureVector::new();
            for sid in 0..crate::domain::NUM_SYMPTOMS {
                if rng.gen_bool(0.2) {
                    fv.set(sid, rng.gen::<f64>());
                }
            }

            let adjusted = adjuster.adjust(&raw, &fv, false);
            assert_eq!(adjusted.len(), raw.len());
            assert!((adjusted.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(adjusted.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_uti_suppressed_without_urinary_symptoms() {
        let kb = KnowledgeBase::global();
        let adjuster = RuleAdjuster::new(kb);
        let raw = uniform(kb);
        let fv = features(&[(ids::FEVER, 0.7), (ids::COUGH, 0.6), (ids::RHINORRHEA, 0.6)]);

        let adjusted = adjuster.adjust(&raw, &fv, false);
        let uti = id(kb, names::UTI);
        assert!(adjusted[uti] <= 0.05 * raw[uti]);
    }

    #[test]
    fn test_uti_survives_with_urinary_symptoms() {
        let kb = KnowledgeBase::global();
        let adjuster = RuleAdjuster::new(kb);
        let fv = features(&[(ids::DYSURIA, 0.8), (ids::URINARY_FREQUENCY, 0.7)]);

        let adjusted = adjuster.adjust(&uniform(kb), &fv, false);
        assert!(adjusted[id(kb, names::UTI)] > 1e-3);
    }

    #[test]
    fn test_centor_score_scales_strep() {
        let kb = KnowledgeBase::global();
        let strep = id(kb, names::STREP);
        let neutral = RuleConfig {
            centor_low_multiplier: 1.0,
            centor_mid_multiplier: 1.0,
            centor_high_multiplier: 1.0,
            ..RuleConfig::default()
        };
        let default_rules = RuleAdjuster::new(kb);
        let neutral_rules = RuleAdjuster::with_config(kb, neutral);
        let raw = uniform(kb);

        let full_score = features(&[(ids::FEVER, 0.8), (ids::SORE_THROAT, 0.8)]);
        assert!(
            default_rules.adjust(&raw, &full_score, false)[strep]
                > neutral_rules.adjust(&raw, &full_score, false)[strep]
        );

        let with_cough = features(&[(ids::FEVER, 0.8), (ids::SORE_THROAT, 0.8), (ids::COUGH, 0.5)]);
        assert!(
            default_rules.adjust(&raw, &with_cough, false)[strep]
                < neutral_rules.adjust(&raw, &with_cough, false)[strep]
        );
    }

    #[test]
    fn test_centor_boost_applies_to_trained_output() {
        let kb = KnowledgeBase::global();
        let strep = id(kb, names::STREP);
        let neutral = RuleConfig {
            centor_low_multiplier: 1.0,
            centor_mid_multiplier: 1.0,
            centor_high_multiplier: 1.0,
            ..RuleConfig::default()
        };
        let fv = kb.build_features([
            ("Sore Throat", 8.0),
            ("Fever", 6.0),
            ("Headache", 5.0),
            ("Swelling", 5.0),
        ]);
        let raw = crate::application::diagnosis::tests::shared_model().predict_proba(&fv);

        let boosted = RuleAdjuster::new(kb).adjust(&raw, &fv, false);
        let plain = RuleAdjuster::with_config(kb, neutral).adjust(&raw, &fv, false);
        assert!(boosted[strep] > plain[strep]);
        assert!((boosted.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_classic_flu_picture_favours_ili() {
        let kb = KnowledgeBase::global();
        let adjuster = RuleAdjuster::new(kb);
        let fv = features(&[
            (ids::FEVER, 0.8),
            (ids::MYALGIA, 0.8),
            (ids::FATIGUE, 0.8),
            (ids::COUGH, 0.5),
        ]);

        let adjusted = adjuster.adjust(&uniform(kb), &fv, false);
        assert_eq!(argmax(&adjusted), id(kb, names::ILI));
    }

    #[test]
    fn test_renormalize_zero_total() {
        assert_eq!(renormalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(renormalize(vec![1.0, 3.0]), vec![0.25, 0.75]);
        assert!(renormalize(Vec::new()).is_empty());
    }
}
