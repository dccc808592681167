//! Training loop with early stopping and temperature calibration.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::network::{argmax, cross_entropy, Network};
use crate::domain::{TrainingCase, NUM_FEATURES};
use crate::{DiagnosticaError, Result};

/// Temperatures tried during calibration, in order.
pub const TEMPERATURE_CANDIDATES: [f64; 8] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0];

/// Minimum validation-loss drop that counts as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-6;

/// Hyperparameters for one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub hidden_neurons: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Epochs without improvement before stopping
    pub patience: usize,
    /// Typical cases sampled per disease for synthetic data
    pub cases_per_disease: usize,
    pub validation_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_neurons: 20,
            learning_rate: 0.3,
            epochs: 500,
            patience: 20,
            cases_per_disease: 100,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - DIAGNOSTICA_HIDDEN_NEURONS
    /// - DIAGNOSTICA_LEARNING_RATE
    /// - DIAGNOSTICA_EPOCHS
    /// - DIAGNOSTICA_CASES_PER_DISEASE
    /// - DIAGNOSTICA_SEED
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let mut cfg = Self::default();

        if let Some(x) = env_usize("DIAGNOSTICA_HIDDEN_NEURONS") {
            if x > 0 {
                cfg.hidden_neurons = x;
            }
        }

        if let Ok(v) = std::env::var("DIAGNOSTICA_LEARNING_RATE") {
            if let Ok(x) = v.trim().parse::<f64>() {
                if x.is_finite() && x > 0.0 {
                    cfg.learning_rate = x;
                }
            }
        }

        if let Some(x) = env_usize("DIAGNOSTICA_EPOCHS") {
            if x > 0 {
                cfg.epochs = x;
            }
        }

        if let Some(x) = env_usize("DIAGNOSTICA_CASES_PER_DISEASE") {
            if x > 0 {
                cfg.cases_per_disease = x;
            }
        }

        if let Ok(v) = std::env::var("DIAGNOSTICA_SEED") {
            if let Ok(x) = v.trim().parse::<u64>() {
                cfg.seed = x;
            }
        }

        cfg
    }

    /// Validate hyperparameters.
    ///
    /// # Errors
    /// Returns `Validation` for a zero-sized layer, zero epochs, a
    /// non-positive learning rate or a validation fraction outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_neurons == 0 {
            return Err(DiagnosticaError::Validation(
                "hidden_neurons must be > 0".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(DiagnosticaError::Validation(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(DiagnosticaError::Validation("epochs must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(DiagnosticaError::Validation(format!(
                "validation_fraction must be in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse::<usize>().ok()
}

/// Metrics for one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_acc: f64,
    pub val_loss: f64,
    pub val_acc: f64,
}

/// Result of [`Trainer::fit`].
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Weights from the best validation epoch
    pub network: Network,
    pub temperature: f64,
    pub history: Vec<EpochRecord>,
    pub stopped_early: bool,
    /// Held-out cases, kept for evaluation reports
    pub validation: Vec<TrainingCase>,
}

/// Per-example SGD trainer.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    #[must_use]
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Shuffle `cases`, split them, train and calibrate.
    ///
    /// The split puts the first `1 - validation_fraction` of the shuffled
    /// cases in the training set. With no validation cases, early stopping
    /// watches the training loss and the temperature stays at 1.
    ///
    /// # Errors
    /// Returns `Validation` for a bad config, a label outside `n_outputs`
    /// or an empty dataset, and `Training` if a loss becomes non-finite.
    pub fn fit(&self, mut cases: Vec<TrainingCase>, n_outputs: usize) -> Result<TrainingOutcome> {
        self.config.validate()?;
        if cases.is_empty() {
            return Err(DiagnosticaError::Validation(
                "No training cases supplied".to_string(),
            ));
        }
        if let Some(bad) = cases.iter().find(|c| c.label >= n_outputs) {
            return Err(DiagnosticaError::Validation(format!(
                "Label {} out of range for {n_outputs} outputs",
                bad.label
            )));
        }

        let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed);
        cases.shuffle(&mut rng);
        let (mut train, validation) = split(cases, self.config.validation_fraction);

        tracing::info!(
            "Training on {} cases, validating on {} ({} hidden neurons, lr {})",
            train.len(),
            validation.len(),
            self.config.hidden_neurons,
            self.config.learning_rate
        );

        let mut network =
            Network::initialize(NUM_FEATURES, self.config.hidden_neurons, n_outputs, &mut rng);
        let mut best_network = network.clone();
        let mut best_loss = f64::INFINITY;
        let mut stale_epochs = 0usize;
        let mut stopped_early = false;
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            train.shuffle(&mut rng);
            let (train_loss, train_acc) =
                train_epoch(&mut network, &train, self.config.learning_rate);
            let (val_loss, val_acc) = evaluate(&network, 1.0, &validation);
            ensure_finite(epoch, train_loss, val_loss)?;

            let record = EpochRecord {
                epoch,
                train_loss,
                train_acc,
                val_loss,
                val_acc,
            };
            history.push(record);

            if epoch % 10 == 0 {
                tracing::info!(
                    "Epoch {epoch}: train loss {train_loss:.4}, acc {:.1}% | val loss {val_loss:.4}, acc {:.1}%",
                    train_acc * 100.0,
                    val_acc * 100.0
                );
            }

            let monitored = if validation.is_empty() { train_loss } else { val_loss };
            if monitored + IMPROVEMENT_EPSILON < best_loss {
                best_loss = monitored;
                best_network = network.clone();
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= self.config.patience {
                    tracing::info!("Early stopping at epoch {epoch} (best loss {best_loss:.4})");
                    stopped_early = true;
                    break;
                }
            }
        }

        let temperature = calibrate_temperature(&best_network, &validation);
        tracing::info!("Calibrated temperature: {temperature}");

        Ok(TrainingOutcome {
            network: best_network,
            temperature,
            history,
            stopped_early,
            validation,
        })
    }
}

fn split(mut cases: Vec<TrainingCase>, validation_fraction: f64) -> (Vec<TrainingCase>, Vec<TrainingCase>) {
    let n_train = ((cases.len() as f64) * (1.0 - validation_fraction)).floor() as usize;
    let n_train = n_train.clamp(1, cases.len());
    let validation = cases.split_off(n_train);
    (cases, validation)
}

/// One pass of per-example updates; returns mean loss and accuracy.
fn train_epoch(network: &mut Network, cases: &[TrainingCase], learning_rate: f64) -> (f64, f64) {
    let mut total_loss = 0.0;
    let mut correct = 0usize;
    for case in cases {
        let inputs = case.features.to_vec();
        let pass = network.forward(&inputs, 1.0);
        total_loss += cross_entropy(&pass.probabilities, case.label);
        if argmax(&pass.probabilities) == case.label {
            correct += 1;
        }
        network.backward_update(&inputs, &pass, case.label, learning_rate);
    }
    let n = cases.len().max(1) as f64;
    (total_loss / n, correct as f64 / n)
}

fn ensure_finite(epoch: usize, train_loss: f64, val_loss: f64) -> Result<()> {
    if train_loss.is_finite() && val_loss.is_finite() {
        Ok(())
    } else {
        Err(DiagnosticaError::Training(format!(
            "Loss diverged at epoch {epoch} (train {train_loss}, val {val_loss})"
        )))
    }
}

/// Mean cross-entropy and accuracy of `network` at `temperature`.
///
/// An empty set yields `(0.0, 0.0)`.
#[must_use]
pub fn evaluate(network: &Network, temperature: f64, cases: &[TrainingCase]) -> (f64, f64) {
    if cases.is_empty() {
        return (0.0, 0.0);
    }
    let mut total_loss = 0.0;
    let mut correct = 0usize;
    for case in cases {
        let pass = network.forward(&case.features.to_vec(), temperature);
        total_loss += cross_entropy(&pass.probabilities, case.label);
        if argmax(&pass.probabilities) == case.label {
            correct += 1;
        }
    }
    let n = cases.len() as f64;
    (total_loss / n, correct as f64 / n)
}

/// Pick the candidate temperature with the lowest validation NLL.
///
/// The first minimum wins; an empty validation set keeps `1.0`.
#[must_use]
pub fn calibrate_temperature(network: &Network, validation: &[TrainingCase]) -> f64 {
    if validation.is_empty() {
        return 1.0;
    }
    let mut best_t = 1.0;
    let mut best_nll = f64::INFINITY;
    for t in TEMPERATURE_CANDIDATES {
        let (nll, _) = evaluate(network, t, validation);
        if nll < best_nll {
            best_nll = nll;
            best_t = t;
        }
    }
    best_t
}
