//! Symptom catalogue entries and severity scales.

use serde::Serialize;

/// Number of symptoms in the catalogue.
pub const NUM_SYMPTOMS: usize = 30;

/// Unit a symptom's raw severity reading is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityScale {
    /// Subjective 0-10 rating
    ZeroToTen,
    /// Body temperature in °F (98.6 normal, 106 maximal)
    Temperature,
    /// Percentage change (e.g. body weight)
    Percentage,
    /// Episodes per day (10+ is severe)
    Frequency,
    /// Heart rate in beats per minute
    Bpm,
    /// Percentage of body surface affected
    AreaCoverage,
    /// Hearing loss in dB (60 dB is severe)
    Decibels,
}

impl SeverityScale {
    /// Short label used in catalogue listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ZeroToTen => "0-10",
            Self::Temperature => "temperature",
            Self::Percentage => "percentage",
            Self::Frequency => "frequency",
            Self::Bpm => "bpm",
            Self::AreaCoverage => "area_coverage",
            Self::Decibels => "decibels",
        }
    }

    /// Map a raw reading on this scale into `[0, 1]`.
    #[must_use]
    pub fn normalize(&self, raw: f64) -> f64 {
        if !raw.is_finite() {
            return 0.0;
        }
        let v = match self {
            Self::ZeroToTen | Self::Frequency => raw / 10.0,
            Self::Temperature => (raw - 98.6) / (106.0 - 98.6),
            Self::Percentage | Self::AreaCoverage => raw / 100.0,
            Self::Bpm => (raw - 100.0) / 50.0,
            Self::Decibels => raw / 60.0,
        };
        v.clamp(0.0, 1.0)
    }
}

impl std::fmt::Display for SeverityScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A catalogue symptom. Immutable, compiled into the knowledge base.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Symptom {
    pub id: usize,
    pub name: &'static str,
    pub medical_term: &'static str,
    pub icd_10: &'static str,
    pub description: &'static str,
    pub scale: SeverityScale,
}

impl Symptom {
    /// Normalize a raw reading reported on this symptom's own scale.
    #[must_use]
    pub fn normalize(&self, raw: f64) -> f64 {
        self.scale.normalize(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_scale() {
        let s = SeverityScale::Temperature;
        assert_eq!(s.normalize(98.6), 0.0);
        assert_eq!(s.normalize(97.0), 0.0);
        assert_eq!(s.normalize(110.0), 1.0);
        assert!((s.normalize(102.3) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bpm_scale_clamps_normal_rates() {
        let s = SeverityScale::Bpm;
        assert_eq!(s.normalize(72.0), 0.0);
        assert!((s.normalize(125.0) - 0.5).abs() < 1e-9);
        assert_eq!(s.normalize(180.0), 1.0);
    }

    #[test]
    fn test_linear_scales() {
        assert!((SeverityScale::ZeroToTen.normalize(7.0) - 0.7).abs() < 1e-12);
        assert_eq!(SeverityScale::Frequency.normalize(25.0), 1.0);
        assert!((SeverityScale::Decibels.normalize(30.0) - 0.5).abs() < 1e-12);
        assert!((SeverityScale::AreaCoverage.normalize(40.0) - 0.4).abs() < 1e-12);
        assert_eq!(SeverityScale::Percentage.normalize(f64::NAN), 0.0);
    }
}
