//! Network input features.
//!
//! A feature vector is 30 presence flags followed by 30 normalized
//! severities. Presence is derived from severity, so the two halves can
//! never disagree.

use serde::{Deserialize, Serialize};

use super::symptom::NUM_SYMPTOMS;

/// Network input dimension: presence + severity.
pub const NUM_FEATURES: usize = NUM_SYMPTOMS * 2;

/// Symptom severities in `[0, 1]`; a symptom is present iff its severity is > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    severity: [f64; NUM_SYMPTOMS],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            severity: [0.0; NUM_SYMPTOMS],
        }
    }
}

impl FeatureVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a normalized severity. Values are clamped to `[0, 1]`; zero,
    /// negative or non-finite values mark the symptom absent. Ids outside the
    /// catalogue are ignored.
    pub fn set(&mut self, symptom_id: usize, severity: f64) {
        if let Some(slot) = self.severity.get_mut(symptom_id) {
            *slot = if severity.is_finite() && severity > 0.0 {
                severity.min(1.0)
            } else {
                0.0
            };
        }
    }

    /// Mark a symptom absent.
    pub fn clear(&mut self, symptom_id: usize) {
        self.set(symptom_id, 0.0);
    }

    /// Multiply every severity by `factor` (expected in `(0, 1]`).
    pub fn scale(&mut self, factor: f64) {
        for s in &mut self.severity {
            *s = (*s * factor).clamp(0.0, 1.0);
        }
    }

    #[must_use]
    pub fn severity(&self, symptom_id: usize) -> f64 {
        self.severity.get(symptom_id).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_present(&self, symptom_id: usize) -> bool {
        self.severity(symptom_id) > 0.0
    }

    /// Ids of present symptoms, ascending.
    #[must_use]
    pub fn present_ids(&self) -> Vec<usize> {
        (0..NUM_SYMPTOMS).filter(|&i| self.severity[i] > 0.0).collect()
    }

    /// Severity half of the vector.
    #[must_use]
    pub fn severities(&self) -> &[f64; NUM_SYMPTOMS] {
        &self.severity
    }

    /// Convert to the 60-wide network input.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(NUM_FEATURES);
        v.extend(self.severity.iter().map(|&s| if s > 0.0 { 1.0 } else { 0.0 }));
        v.extend_from_slice(&self.severity);
        v
    }

    /// Create features from a 60-wide network input.
    ///
    /// # Errors
    /// Returns error if the length is wrong or a presence flag disagrees
    /// with its severity.
    pub fn from_vec(v: &[f64]) -> Result<Self, String> {
        if v.len() != NUM_FEATURES {
            return Err(format!("Expected {NUM_FEATURES} features, got {}", v.len()));
        }

        let mut fv = Self::default();
        for i in 0..NUM_SYMPTOMS {
            let presence = v[i];
            let severity = v[NUM_SYMPTOMS + i];
            if (presence > 0.0) != (severity > 0.0) {
                return Err(format!(
                    "Symptom {i}: presence {presence} disagrees with severity {severity}"
                ));
            }
            fv.set(i, severity);
        }
        Ok(fv)
    }
}

/// A labeled example for training or evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingCase {
    pub features: FeatureVector,
    pub label: usize,
}

impl TrainingCase {
    #[must_use]
    pub fn new(features: FeatureVector, label: usize) -> Self {
        Self { features, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_follows_severity() {
        let mut fv = FeatureVector::new();
        fv.set(0, 0.8);
        fv.set(3, -2.0);
        fv.set(5, 1.7);
        fv.set(99, 0.5);

        let v = fv.to_vec();
        assert_eq!(v.len(), NUM_FEATURES);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[NUM_SYMPTOMS], 0.8);
        assert_eq!(v[3], 0.0);
        assert_eq!(v[5], 1.0);
        assert_eq!(v[NUM_SYMPTOMS + 5], 1.0);
        assert_eq!(fv.present_ids(), vec![0, 5]);
    }

    #[test]
    fn test_scale_keeps_presence() {
        let mut fv = FeatureVector::new();
        fv.set(1, 0.6);
        fv.scale(0.5);
        assert!(fv.is_present(1));
        assert!((fv.severity(1) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_from_vec_rejects_inconsistent_presence() {
        let mut v = vec![0.0; NUM_FEATURES];
        v[2] = 1.0;
        assert!(FeatureVector::from_vec(&v).is_err());
        assert!(FeatureVector::from_vec(&v[..10]).is_err());

        v[NUM_SYMPTOMS + 2] = 0.4;
        let fv = FeatureVector::from_vec(&v).expect("Should parse");
        assert_eq!(fv.present_ids(), vec![2]);
    }
}
