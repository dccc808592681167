//! Accuracy, calibration and confusion reporting.

use serde::Serialize;

use super::model::TrainedModel;
use super::network::argmax;
use crate::domain::TrainingCase;
use crate::knowledge::KnowledgeBase;

/// Number of equal-width confidence bins for ECE.
pub const ECE_BINS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub n: usize,
    pub accuracy: f64,
    /// Expected calibration error over [`ECE_BINS`] bins
    pub ece: f64,
    /// `confusion[true][predicted]`
    pub confusion: Vec<Vec<usize>>,
    pub labels: Vec<String>,
}

impl EvaluationReport {
    /// Multi-line text summary with the confusion matrix.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Cases: {}\nAccuracy: {:.2}%\nECE ({ECE_BINS} bins): {:.4}\n\nConfusion matrix (rows = true, cols = predicted):\n",
            self.n,
            self.accuracy * 100.0,
            self.ece
        );
        for (i, row) in self.confusion.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>4}")).collect();
            let label = self.labels.get(i).map_or("?", String::as_str);
            out.push_str(&format!("{i:>2} {}  {label}\n", cells.join("")));
        }
        out
    }
}

/// `Σ |bin| / n · |acc_bin − conf_bin|` over equal-width confidence bins.
///
/// Each prediction is `(confidence, correct)`.
#[must_use]
pub fn expected_calibration_error(predictions: &[(f64, bool)], bins: usize) -> f64 {
    if predictions.is_empty() || bins == 0 {
        return 0.0;
    }
    let mut count = vec![0usize; bins];
    let mut conf_sum = vec![0.0; bins];
    let mut correct = vec![0usize; bins];

    for &(confidence, is_correct) in predictions {
        let bin = ((confidence.clamp(0.0, 1.0) * bins as f64) as usize).min(bins - 1);
        count[bin] += 1;
        conf_sum[bin] += confidence;
        if is_correct {
            correct[bin] += 1;
        }
    }

    let n = predictions.len() as f64;
    (0..bins)
        .filter(|&b| count[b] > 0)
        .map(|b| {
            let size = count[b] as f64;
            let acc = correct[b] as f64 / size;
            let conf = conf_sum[b] / size;
            size / n * (acc - conf).abs()
        })
        .sum()
}

/// Evaluate a model on labelled cases using raw calibrated probabilities.
#[must_use]
pub fn evaluate_model(model: &TrainedModel, cases: &[TrainingCase], kb: &KnowledgeBase) -> EvaluationReport {
    let k = model.num_diseases();
    let mut confusion = vec![vec![0usize; k]; k];
    let mut predictions = Vec::with_capacity(cases.len());

    for case in cases {
        let probs = model.predict_proba(&case.features);
        let predicted = argmax(&probs);
        let confidence = probs.get(predicted).copied().unwrap_or(0.0);
        if let Some(row) = confusion.get_mut(case.label) {
            row[predicted] += 1;
        }
        predictions.push((confidence, predicted == case.label));
    }

    let correct = predictions.iter().filter(|(_, ok)| *ok).count();
    let accuracy = if cases.is_empty() {
        0.0
    } else {
        correct as f64 / cases.len() as f64
    };

    EvaluationReport {
        n: cases.len(),
        accuracy,
        ece: expected_calibration_error(&predictions, ECE_BINS),
        confusion,
        labels: (0..k)
            .map(|id| kb.disease(id).map_or_else(|| format!("#{id}"), |d| d.name.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureVector, NUM_FEATURES};
    use crate::engine::network::Network;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_ece_perfect_and_overconfident() {
        let perfect = [(1.0, true), (1.0, true)];
        assert_eq!(expected_calibration_error(&perfect, 10), 0.0);

        let overconfident = [(0.9, false), (0.9, false)];
        assert!((expected_calibration_error(&overconfident, 10) - 0.9).abs() < 1e-12);

        let mixed = [(0.75, true), (0.75, false)];
        assert!((expected_calibration_error(&mixed, 10) - 0.25).abs() < 1e-12);
        assert_eq!(expected_calibration_error(&[], 10), 0.0);
    }

    #[test]
    fn test_confusion_matrix_counts_every_case() {
        let kb = KnowledgeBase::global();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let network = Network::initialize(NUM_FEATURES, 4, kb.num_diseases(), &mut rng);
        let model = TrainedModel::new(network, 1.0, 0.3, 0).expect("Should build");

        let mut fv = FeatureVector::new();
        fv.set(0, 0.5);
        let cases = vec![TrainingCase::new(fv, 0), TrainingCase::new(fv, 3), TrainingCase::new(fv, 3)];

        let report = evaluate_model(&model, &cases, kb);
        assert_eq!(report.n, 3);
        let total: usize = report.confusion.iter().flatten().sum();
        assert_eq!(total, 3);
        assert_eq!(report.confusion[3].iter().sum::<usize>(), 2);
        assert_eq!(report.labels.len(), kb.num_diseases());
        assert!(report.summary().contains("Accuracy"));
    }
}
