//! Trained classifier and its persisted snapshot form.

use serde::{Deserialize, Serialize};

use super::network::{argmax, Network};
use super::trainer::{TrainingConfig, TrainingOutcome};
use crate::domain::{FeatureVector, NUM_FEATURES, NUM_SYMPTOMS};
use crate::{DiagnosticaError, Result};

/// Model metadata stored alongside the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub num_symptoms: usize,
    pub num_features: usize,
    pub num_diseases: usize,
    pub hidden_neurons: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronRecord {
    pub weights: Vec<f64>,
}

/// Flat JSON form: `{config, network: [hidden, output]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub config: SnapshotConfig,
    pub network: Vec<Vec<NeuronRecord>>,
}

/// A network ready for inference, with its calibrated temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    network: Network,
    temperature: f64,
    learning_rate: f64,
    epochs: usize,
}

impl TrainedModel {
    /// Wrap a trained network.
    ///
    /// # Errors
    /// Returns `Validation` if the network width does not match the feature
    /// layout or the temperature is not positive.
    pub fn new(network: Network, temperature: f64, learning_rate: f64, epochs: usize) -> Result<Self> {
        if network.n_inputs() != NUM_FEATURES {
            return Err(DiagnosticaError::Validation(format!(
                "Network expects {} inputs, features have {NUM_FEATURES}",
                network.n_inputs()
            )));
        }
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(DiagnosticaError::Validation(format!(
                "Temperature must be positive, got {temperature}"
            )));
        }
        Ok(Self {
            network,
            temperature,
            learning_rate,
            epochs,
        })
    }

    /// Build from a finished training run.
    ///
    /// # Errors
    /// See [`TrainedModel::new`].
    pub fn from_outcome(outcome: &TrainingOutcome, config: &TrainingConfig) -> Result<Self> {
        Self::new(
            outcome.network.clone(),
            outcome.temperature,
            config.learning_rate,
            outcome.history.len(),
        )
    }

    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[must_use]
    pub fn num_diseases(&self) -> usize {
        self.network.n_outputs()
    }

    /// Calibrated class probabilities.
    #[must_use]
    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        self.network
            .forward(&features.to_vec(), self.temperature)
            .probabilities
    }

    /// Most probable class; lowest index on ties.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> usize {
        argmax(&self.predict_proba(features))
    }

    #[must_use]
    pub fn to_snapshot(&self) -> ModelSnapshot {
        let layer = |neurons: &[super::network::Neuron]| {
            neurons
                .iter()
                .map(|n| NeuronRecord {
                    weights: n.weights.clone(),
                })
                .collect::<Vec<_>>()
        };
        ModelSnapshot {
            config: SnapshotConfig {
                num_symptoms: NUM_SYMPTOMS,
                num_features: NUM_FEATURES,
                num_diseases: self.network.n_outputs(),
                hidden_neurons: self.network.n_hidden(),
                learning_rate: self.learning_rate,
                epochs: self.epochs,
                temperature: self.temperature,
            },
            network: vec![
                layer(self.network.hidden_layer()),
                layer(self.network.output_layer()),
            ],
        }
    }

    /// Rebuild a model from a snapshot, checking every dimension.
    ///
    /// # Errors
    /// Returns `Validation` if the snapshot does not describe a
    /// `num_features → hidden_neurons → expected_diseases` network.
    pub fn from_snapshot(snapshot: ModelSnapshot, expected_diseases: usize) -> Result<Self> {
        let cfg = &snapshot.config;
        if cfg.num_symptoms != NUM_SYMPTOMS || cfg.num_features != NUM_FEATURES {
            return Err(DiagnosticaError::Validation(format!(
                "Snapshot was built for {} symptoms / {} features, expected {NUM_SYMPTOMS} / {NUM_FEATURES}",
                cfg.num_symptoms, cfg.num_features
            )));
        }
        if cfg.num_diseases != expected_diseases {
            return Err(DiagnosticaError::Validation(format!(
                "Snapshot has {} diseases, knowledge base has {expected_diseases}",
                cfg.num_diseases
            )));
        }

        let [hidden, output]: [Vec<NeuronRecord>; 2] = snapshot.network.try_into().map_err(
            |layers: Vec<Vec<NeuronRecord>>| {
                DiagnosticaError::Validation(format!(
                    "Snapshot must have exactly 2 layers, found {}",
                    layers.len()
                ))
            },
        )?;
        if hidden.len() != cfg.hidden_neurons {
            return Err(DiagnosticaError::Validation(format!(
                "Snapshot declares {} hidden neurons but stores {}",
                cfg.hidden_neurons,
                hidden.len()
            )));
        }
        if output.len() != cfg.num_diseases {
            return Err(DiagnosticaError::Validation(format!(
                "Snapshot declares {} outputs but stores {}",
                cfg.num_diseases,
                output.len()
            )));
        }
        if hidden.iter().any(|n| n.weights.len() != NUM_FEATURES + 1) {
            return Err(DiagnosticaError::Validation(format!(
                "Hidden neurons must carry {} weights",
                NUM_FEATURES + 1
            )));
        }

        let network = Network::from_layers(
            hidden.into_iter().map(|n| n.weights).collect(),
            output.into_iter().map(|n| n.weights).collect(),
        )
        .map_err(DiagnosticaError::Validation)?;

        Self::new(network, cfg.temperature, cfg.learning_rate, cfg.epochs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_model() -> TrainedModel {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let network = Network::initialize(NUM_FEATURES, 5, 4, &mut rng);
        TrainedModel::new(network, 1.25, 0.3, 12).expect("Should build model")
    }

    #[test]
    fn test_snapshot_restores_identical_inference() {
        let model = test_model();
        let restored =
            TrainedModel::from_snapshot(model.to_snapshot(), 4).expect("Should restore snapshot");

        let mut fv = FeatureVector::new();
        fv.set(0, 0.8);
        fv.set(3, 0.4);
        assert_eq!(model.predict_proba(&fv), restored.predict_proba(&fv));
        assert_eq!(restored.temperature(), 1.25);
    }

    #[test]
    fn test_snapshot_shape_is_validated() {
        let model = test_model();

        assert!(TrainedModel::from_snapshot(model.to_snapshot(), 11).is_err());

        let mut truncated = model.to_snapshot();
        truncated.network[0][0].weights.pop();
        assert!(TrainedModel::from_snapshot(truncated, 4).is_err());

        let mut one_layer = model.to_snapshot();
        one_layer.network.pop();
        assert!(TrainedModel::from_snapshot(one_layer, 4).is_err());

        let mut bad_temp = model.to_snapshot();
        bad_temp.config.temperature = 0.0;
        assert!(TrainedModel::from_snapshot(bad_temp, 4).is_err());
    }

    #[test]
    fn test_predict_matches_argmax() {
        let model = test_model();
        let mut fv = FeatureVector::new();
        fv.set(11, 0.9);
        let probs = model.predict_proba(&fv);
        assert_eq!(model.predict(&fv), argmax(&probs));
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
