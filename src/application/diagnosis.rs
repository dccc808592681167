//! Diagnosis service: Orchestrates one diagnosis request.
//!
//! This service coordinates:
//! - Model loading, or training and saving when no snapshot exists
//! - Feature building from named severities
//! - Network prediction and rule adjustment
//! - Certainty-tier downgrade and test-result upgrade
//! - Report assembly

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{DiagnosisReport, FeatureVector, PrimaryDiagnosis, TrainingCase};
use crate::engine::{
    argmax, classify_syndrome, report, CaseSampler, RuleAdjuster, RuleConfig, TrainedModel,
    Trainer, TrainingConfig, TrainingOutcome,
};
use crate::knowledge::KnowledgeBase;
use crate::ports::ModelStore;
use crate::{DiagnosticaError, Result};

/// Service for running rule-adjusted diagnoses.
pub struct DiagnosisService<M>
where
    M: ModelStore,
{
    store: Arc<M>,
    kb: &'static KnowledgeBase,
    rules: RuleAdjuster<'static>,
    training: TrainingConfig,
    model: Option<TrainedModel>,
}

impl<M> DiagnosisService<M>
where
    M: ModelStore,
    M::Error: Into<crate::adapters::StorageError>,
{
    /// Create a service with environment-derived training config and
    /// default rules. No model is loaded yet.
    pub fn new(store: Arc<M>) -> Self {
        let kb = KnowledgeBase::global();
        Self {
            store,
            kb,
            rules: RuleAdjuster::new(kb),
            training: TrainingConfig::from_env_or_default(),
            model: None,
        }
    }

    #[must_use]
    pub fn with_training_config(mut self, config: TrainingConfig) -> Self {
        self.training = config;
        self
    }

    #[must_use]
    pub fn with_rule_config(mut self, config: RuleConfig) -> Self {
        self.rules = RuleAdjuster::with_config(self.kb, config);
        self
    }

    /// Use an already trained model.
    #[must_use]
    pub fn with_model(mut self, model: TrainedModel) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn knowledge_base(&self) -> &'static KnowledgeBase {
        self.kb
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    /// Load the stored model, or train on synthetic cases and save it.
    ///
    /// # Errors
    /// Returns error if the snapshot is corrupt, does not fit the knowledge
    /// base, or training fails.
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!("Initializing diagnosis service...");

        let loaded = self
            .store
            .try_load()
            .map_err(|e| DiagnosticaError::Storage(e.into()))?;
        match loaded {
            Some(snapshot) => {
                let model = TrainedModel::from_snapshot(snapshot, self.kb.num_diseases())?;
                tracing::info!(
                    "Loaded model ({} hidden neurons, T = {})",
                    model.network().n_hidden(),
                    model.temperature()
                );
                self.model = Some(model);
            }
            None => {
                tracing::info!("No stored model found, training a new one...");
                self.train_synthetic()?;
            }
        }
        Ok(())
    }

    /// Train on freshly sampled synthetic cases and save the result.
    ///
    /// # Errors
    /// Returns error if training or saving fails.
    pub fn train_synthetic(&mut self) -> Result<TrainingOutcome> {
        let mut sampler = CaseSampler::new(self.kb, self.training.seed);
        let cases = sampler.generate_training_set(self.training.cases_per_disease);
        self.train_on(cases)
    }

    /// Train on the given cases, keep the model and save it.
    ///
    /// # Errors
    /// Returns error if training or saving fails.
    pub fn train_on(&mut self, cases: Vec<TrainingCase>) -> Result<TrainingOutcome> {
        let outcome = Trainer::new(self.training.clone()).fit(cases, self.kb.num_diseases())?;
        let model = TrainedModel::from_outcome(&outcome, &self.training)?;

        self.store
            .save(&model.to_snapshot())
            .map_err(|e| DiagnosticaError::Storage(e.into()))?;
        self.model = Some(model);
        Ok(outcome)
    }

    /// The loaded model.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` before [`DiagnosisService::initialize`].
    pub fn model(&self) -> Result<&TrainedModel> {
        self.model.as_ref().ok_or_else(|| {
            DiagnosticaError::ModelNotLoaded("Call initialize() before diagnosing".to_string())
        })
    }

    /// Rule-adjusted distribution over the catalogue for `features`.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` if no model is loaded.
    pub fn posterior(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let raw = self.model()?.predict_proba(features);
        Ok(self.rules.adjust(&raw, features, false))
    }

    /// Diagnose from `{symptom name: severity 0-10}` and `{test name: result}`.
    ///
    /// Unknown symptom names are ignored.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` or `NoDiagnosis`.
    pub fn diagnose(
        &self,
        symptoms: &BTreeMap<String, f64>,
        test_results: &BTreeMap<String, String>,
    ) -> Result<DiagnosisReport> {
        tracing::debug!("Step 1: Building features from {} entries...", symptoms.len());
        let features = self
            .kb
            .build_features(symptoms.iter().map(|(name, sev)| (name.as_str(), *sev)));
        self.diagnose_features(&features, test_results)
    }

    /// Diagnose from raw readings on each symptom's own scale
    /// (°F for fever, bpm for heart rate, percent for rash coverage...).
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` or `NoDiagnosis`.
    pub fn diagnose_readings(
        &self,
        readings: &BTreeMap<String, f64>,
        test_results: &BTreeMap<String, String>,
    ) -> Result<DiagnosisReport> {
        tracing::debug!("Step 1: Normalizing {} raw readings...", readings.len());
        let features = self
            .kb
            .build_features_from_readings(readings.iter().map(|(name, raw)| (name.as_str(), *raw)));
        self.diagnose_features(&features, test_results)
    }

    /// Diagnose from an already built feature vector.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` or `NoDiagnosis`.
    pub fn diagnose_features(
        &self,
        features: &FeatureVector,
        test_results: &BTreeMap<String, String>,
    ) -> Result<DiagnosisReport> {
        let model = self.model()?;
        let kb = self.kb;
        let has_tests = !test_results.is_empty();

        tracing::debug!("Step 2: Classifying syndrome...");
        let syndrome = classify_syndrome(&features.present_ids());

        tracing::debug!("Step 3: Running network...");
        let raw = model.predict_proba(features);

        tracing::debug!("Step 4: Applying clinical rules...");
        let adjusted = self.rules.adjust(&raw, features, has_tests);
        if adjusted.iter().all(|p| *p == 0.0) {
            return Err(DiagnosticaError::NoDiagnosis);
        }

        tracing::debug!("Step 5: Selecting primary diagnosis...");
        let candidate = argmax(&adjusted);
        let mut primary_id = candidate;
        let mut confirmed_by = None;

        if let Some(disease) = kb.disease(candidate) {
            if disease.requires_testing() && !has_tests {
                if let Some(counterpart) = kb.syndrome_counterpart(candidate) {
                    tracing::debug!("Downgrading untested {} to syndrome level", disease.name);
                    primary_id = counterpart;
                }
            }
        }

        for (test, result) in test_results {
            if !KnowledgeBase::is_positive_result(result) {
                continue;
            }
            let Some(confirmed) = kb.confirmed_by_test(test) else {
                continue;
            };
            if primary_id == confirmed || kb.syndrome_counterpart(confirmed) == Some(primary_id) {
                tracing::debug!("Positive {test} confirms diagnosis");
                primary_id = confirmed;
                confirmed_by = Some(test.clone());
                break;
            }
        }

        let disease = kb.disease(primary_id).ok_or(DiagnosticaError::NoDiagnosis)?;

        tracing::debug!("Step 6: Assembling report...");
        let severity = report::assess_severity(features);
        let result = DiagnosisReport {
            id: crate::domain::uuid_v4(),
            syndrome,
            severity,
            primary: PrimaryDiagnosis {
                disease_id: primary_id,
                name: disease.name.to_string(),
                medical_name: disease.medical_name.to_string(),
                icd_10: disease.icd_10.to_string(),
                confidence: adjusted[primary_id],
                certainty: disease.certainty,
                description: disease.description.to_string(),
            },
            reasoning: report::build_reasoning(features, disease, syndrome, kb),
            differential: report::build_differential(&adjusted, syndrome, kb),
            required_tests: disease.required_tests.iter().map(|s| (*s).to_string()).collect(),
            supportive_tests: disease.supportive_tests.iter().map(|s| (*s).to_string()).collect(),
            clinical_pearls: disease.pearls.iter().map(|s| (*s).to_string()).collect(),
            red_flags: report::check_red_flags(features, disease, kb),
            recommendations: report::recommendations(disease, severity, has_tests),
            confirmed_by,
            created_at: chrono::Utc::now(),
        };

        tracing::info!(
            "Diagnosis complete: {} ({:.1}%), syndrome={}, severity={}",
            result.primary.name,
            result.primary.confidence * 100.0,
            result.syndrome,
            result.severity
        );
        Ok(result)
    }

    /// Human-readable explanation of a report.
    #[must_use]
    pub fn explain(&self, report: &DiagnosisReport) -> String {
        report::explain(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::snapshot::JsonModelStore;
    use crate::domain::CertaintyTier;
    use crate::knowledge::names;
    use std::sync::OnceLock;
    use tempfile::tempdir;

    pub(crate) fn small_training_config() -> TrainingConfig {
        TrainingConfig {
            hidden_neurons: 12,
            learning_rate: 0.3,
            epochs: 60,
            patience: 20,
            cases_per_disease: 40,
            validation_fraction: 0.2,
            seed: 42,
        }
    }

    /// One small model shared by every service test.
    pub(crate) fn shared_model() -> TrainedModel {
        static MODEL: OnceLock<TrainedModel> = OnceLock::new();
        MODEL
            .get_or_init(|| {
                let kb = KnowledgeBase::global();
                let config = small_training_config();
                let cases = CaseSampler::new(kb, config.seed)
                    .generate_training_set(config.cases_per_disease);
                let outcome = Trainer::new(config.clone())
                    .fit(cases, kb.num_diseases())
                    .expect("Training should succeed");
                TrainedModel::from_outcome(&outcome, &config).expect("Should build model")
            })
            .clone()
    }

    fn service() -> (tempfile::TempDir, DiagnosisService<JsonModelStore>) {
        let dir = tempdir().expect("Should create temp dir");
        let store = Arc::new(JsonModelStore::new(dir.path()));
        (dir, DiagnosisService::new(store).with_model(shared_model()))
    }

    fn symptoms(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(n, s)| ((*n).to_string(), *s)).collect()
    }

    fn flu_symptoms() -> BTreeMap<String, f64> {
        symptoms(&[
            ("Fever", 8.0),
            ("Fatigue", 9.0),
            ("Cough", 6.0),
            ("Muscle Pain", 8.0),
            ("Headache", 7.0),
            ("Sore Throat", 4.0),
        ])
    }

    #[test]
    fn test_flu_like_presentation() {
        let (_dir, service) = service();
        let report = service
            .diagnose(&flu_symptoms(), &BTreeMap::new())
            .expect("Should diagnose");

        assert_eq!(report.primary.name, names::ILI);
        assert_ne!(report.primary.certainty, CertaintyTier::Confirmatory);
        assert_eq!(report.syndrome, crate::domain::Syndrome::RespiratoryFebrile);
        assert!(report.differential.len() <= 5);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.starts_with("Clinical note:")));
        assert!(service.explain(&report).contains("Respiratory Febrile"));
    }

    #[test]
    fn test_positive_test_upgrades_to_confirmed() {
        let (_dir, service) = service();
        let tests = BTreeMap::from([("Influenza A/B Test".to_string(), "Positive".to_string())]);
        let report = service.diagnose(&flu_symptoms(), &tests).expect("Should diagnose");

        assert_eq!(report.primary.name, names::INFLUENZA_CONFIRMED);
        assert_eq!(report.primary.certainty, CertaintyTier::Confirmatory);
        assert_eq!(report.confirmed_by.as_deref(), Some("Influenza A/B Test"));
        assert!(!report
            .recommendations
            .iter()
            .any(|r| r.starts_with("Confirmatory testing recommended")));
    }

    #[test]
    fn test_negative_test_does_not_upgrade() {
        let (_dir, service) = service();
        let tests = BTreeMap::from([("Influenza A/B Test".to_string(), "Negative".to_string())]);
        let report = service.diagnose(&flu_symptoms(), &tests).expect("Should diagnose");
        assert!(report.confirmed_by.is_none());
    }

    #[test]
    fn test_untested_primary_is_never_confirmatory() {
        let (_dir, service) = service();
        let presentations = [
            symptoms(&[("Fever", 8.0), ("Sore Throat", 9.0), ("Swelling", 6.0)]),
            symptoms(&[("Fever", 7.0), ("Cough", 6.0), ("Blurred Vision", 9.0), ("Fatigue", 7.0)]),
            symptoms(&[("Painful Urination", 8.0), ("Frequent Urination", 7.0)]),
            symptoms(&[("Nausea", 6.0), ("Vomiting", 7.0), ("Diarrhea", 8.0)]),
        ];
        for entry in &presentations {
            let report = service.diagnose(entry, &BTreeMap::new()).expect("Should diagnose");
            assert_ne!(report.primary.certainty, CertaintyTier::Confirmatory);
            let total: f64 = report.differential.iter().map(|d| d.probability).sum();
            assert!(total <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_posterior_sums_to_one() {
        let (_dir, service) = service();
        let mut fv = FeatureVector::new();
        fv.set(0, 0.7);
        let posterior = service.posterior(&fv).expect("Should compute");
        assert!((posterior.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_readings_match_equivalent_severities() {
        let (_dir, service) = service();
        let readings = service
            .diagnose_readings(
                &symptoms(&[("Fever", 102.3), ("Cough", 6.0), ("Rapid Heartbeat", 60.0)]),
                &BTreeMap::new(),
            )
            .expect("Should diagnose");
        let severities = service
            .diagnose(&symptoms(&[("Fever", 5.0), ("Cough", 6.0)]), &BTreeMap::new())
            .expect("Should diagnose");

        assert_eq!(readings.primary.name, severities.primary.name);
        assert!((readings.primary.confidence - severities.primary.confidence).abs() < 1e-9);
    }

    #[test]
    fn test_unloaded_service_errors() {
        let dir = tempdir().expect("Should create temp dir");
        let service = DiagnosisService::new(Arc::new(JsonModelStore::new(dir.path())));
        assert!(matches!(
            service.diagnose(&flu_symptoms(), &BTreeMap::new()),
            Err(DiagnosticaError::ModelNotLoaded(_))
        ));
    }

    #[test]
    fn test_initialize_trains_then_reloads() {
        let dir = tempdir().expect("Should create temp dir");
        let store = Arc::new(JsonModelStore::new(dir.path()));
        let config = TrainingConfig {
            epochs: 5,
            cases_per_disease: 10,
            ..small_training_config()
        };

        let mut first = DiagnosisService::new(Arc::clone(&store)).with_training_config(config.clone());
        first.initialize().expect("Should train and save");
        assert!(store.model_path().exists());

        let mut second = DiagnosisService::new(store).with_training_config(config);
        second.initialize().expect("Should load");

        let mut fv = FeatureVector::new();
        fv.set(3, 0.6);
        assert_eq!(
            first.posterior(&fv).expect("Should compute"),
            second.posterior(&fv).expect("Should compute")
        );
    }
}
