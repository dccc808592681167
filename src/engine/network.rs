//! Feed-forward network: one sigmoid hidden layer, linear logits, softmax.
//!
//! Weights are only mutated by [`Network::backward_update`]. Inference writes
//! activations into a [`ForwardPass`] owned by the caller, so a trained
//! network can be shared read-only.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Probability floor used by cross-entropy and log-space rules.
pub const LOG_EPSILON: f64 = 1e-12;

/// A neuron's weights; the last entry is the bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub weights: Vec<f64>,
}

impl Neuron {
    fn random<R: Rng + ?Sized>(n_inputs: usize, rng: &mut R) -> Self {
        Self {
            weights: (0..=n_inputs).map(|_| rng.gen::<f64>()).collect(),
        }
    }

    fn n_inputs(&self) -> usize {
        self.weights.len().saturating_sub(1)
    }

    /// `w·x + b`
    fn activate(&self, inputs: &[f64]) -> f64 {
        let (bias, weights) = match self.weights.split_last() {
            Some(parts) => parts,
            None => return 0.0,
        };
        weights
            .iter()
            .zip(inputs)
            .fold(*bias, |acc, (w, x)| acc + w * x)
    }

    /// Gradient-descent step for error signal `delta`.
    fn descend(&mut self, inputs: &[f64], delta: f64, learning_rate: f64) {
        if let Some((bias, weights)) = self.weights.split_last_mut() {
            for (w, x) in weights.iter_mut().zip(inputs) {
                *w -= learning_rate * delta * x;
            }
            *bias -= learning_rate * delta;
        }
    }
}

/// Activations of one forward pass, scoped to a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    pub hidden: Vec<f64>,
    pub logits: Vec<f64>,
    pub probabilities: Vec<f64>,
}

/// Two-layer perceptron.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    hidden: Vec<Neuron>,
    output: Vec<Neuron>,
}

impl Network {
    /// Allocate a network with weights drawn i.i.d. from U[0, 1).
    pub fn initialize<R: Rng + ?Sized>(
        n_inputs: usize,
        n_hidden: usize,
        n_outputs: usize,
        rng: &mut R,
    ) -> Self {
        let hidden = (0..n_hidden).map(|_| Neuron::random(n_inputs, rng)).collect();
        let output = (0..n_outputs).map(|_| Neuron::random(n_hidden, rng)).collect();
        Self { hidden, output }
    }

    /// Rebuild a network from raw weight rows.
    ///
    /// # Errors
    /// Returns a description of the first shape inconsistency found.
    pub fn from_layers(hidden: Vec<Vec<f64>>, output: Vec<Vec<f64>>) -> Result<Self, String> {
        if hidden.is_empty() || output.is_empty() {
            return Err("Both layers need at least one neuron".to_string());
        }
        let row_len = hidden[0].len();
        if row_len < 2 {
            return Err("Hidden neurons need at least one input weight and a bias".to_string());
        }
        if let Some((i, row)) = hidden.iter().enumerate().find(|(_, r)| r.len() != row_len) {
            return Err(format!(
                "Hidden neuron {i} has {} weights, expected {row_len}",
                row.len()
            ));
        }
        let expected = hidden.len() + 1;
        if let Some((k, row)) = output.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(format!(
                "Output neuron {k} has {} weights, expected {expected}",
                row.len()
            ));
        }
        let all_finite = hidden
            .iter()
            .chain(output.iter())
            .all(|row| row.iter().all(|w| w.is_finite()));
        if !all_finite {
            return Err("Weights must be finite".to_string());
        }

        Ok(Self {
            hidden: hidden.into_iter().map(|weights| Neuron { weights }).collect(),
            output: output.into_iter().map(|weights| Neuron { weights }).collect(),
        })
    }

    #[must_use]
    pub fn n_inputs(&self) -> usize {
        self.hidden.first().map_or(0, Neuron::n_inputs)
    }

    #[must_use]
    pub fn n_hidden(&self) -> usize {
        self.hidden.len()
    }

    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.output.len()
    }

    #[must_use]
    pub fn hidden_layer(&self) -> &[Neuron] {
        &self.hidden
    }

    #[must_use]
    pub fn output_layer(&self) -> &[Neuron] {
        &self.output
    }

    /// Run the network on one input.
    ///
    /// # Panics
    /// Panics if `inputs` does not match the network's input width; callers
    /// build inputs from fixed-size feature vectors.
    #[must_use]
    pub fn forward(&self, inputs: &[f64], temperature: f64) -> ForwardPass {
        assert_eq!(
            inputs.len(),
            self.n_inputs(),
            "feature vector width does not match network input"
        );
        let hidden: Vec<f64> = self.hidden.iter().map(|n| sigmoid(n.activate(inputs))).collect();
        let logits: Vec<f64> = self.output.iter().map(|n| n.activate(&hidden)).collect();
        let probabilities = softmax(&logits, temperature);
        ForwardPass {
            hidden,
            logits,
            probabilities,
        }
    }

    /// One per-example SGD step for softmax + cross-entropy.
    ///
    /// `pass` must come from [`Network::forward`] on the same `inputs` with
    /// the current weights. Hidden deltas are taken against the output
    /// weights before they move.
    pub fn backward_update(
        &mut self,
        inputs: &[f64],
        pass: &ForwardPass,
        label: usize,
        learning_rate: f64,
    ) {
        let output_deltas: Vec<f64> = pass
            .probabilities
            .iter()
            .enumerate()
            .map(|(k, p)| if k == label { p - 1.0 } else { *p })
            .collect();

        let hidden_deltas: Vec<f64> = pass
            .hidden
            .iter()
            .enumerate()
            .map(|(j, h)| {
                let error: f64 = self
                    .output
                    .iter()
                    .zip(&output_deltas)
                    .map(|(neuron, delta)| neuron.weights[j] * delta)
                    .sum();
                error * h * (1.0 - h)
            })
            .collect();

        for (neuron, delta) in self.output.iter_mut().zip(&output_deltas) {
            neuron.descend(&pass.hidden, *delta, learning_rate);
        }
        for (neuron, delta) in self.hidden.iter_mut().zip(&hidden_deltas) {
            neuron.descend(inputs, *delta, learning_rate);
        }
    }
}

#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `softmax(logits / temperature)` with max-subtraction.
#[must_use]
pub fn softmax(logits: &[f64], temperature: f64) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let t = if temperature > 0.0 { temperature } else { 1.0 };
    let scaled: Vec<f64> = logits.iter().map(|z| z / t).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scaled.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Cross-entropy against a one-hot label, with probabilities floored at [`LOG_EPSILON`].
///
/// NaN propagates so divergence stays visible to the caller.
#[must_use]
pub fn cross_entropy(probabilities: &[f64], label: usize) -> f64 {
    match probabilities.get(label) {
        Some(p) if p.is_nan() => f64::NAN,
        Some(p) => -p.max(LOG_EPSILON).ln(),
        None => f64::INFINITY,
    }
}

/// Index of the largest probability; the lowest index wins ties.
#[must_use]
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
