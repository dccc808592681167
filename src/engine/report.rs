//! Report assembly: severity, red flags, reasoning trace, differential,
//! recommendations and the plain-text explanation.

use crate::domain::{
    CertaintyTier, ClinicalReasoning, DiagnosisReport, DifferentialEntry, Disease, FeatureVector,
    Finding, SeverityAssessment, SeverityLevel, Syndrome,
};
use crate::knowledge::{ids, names, KnowledgeBase};

/// Symptom severities that force a SEVERE assessment when exceeded.
const RED_FLAG_THRESHOLDS: [(usize, f64); 4] = [
    (ids::DYSPNEA, 0.5),
    (ids::CHEST_PAIN, 0.6),
    (ids::CONFUSION, 0.5),
    (ids::DIZZINESS, 0.7),
];

const KEY_FINDING_FREQUENCY: f64 = 0.7;
const EXPECTED_FINDING_FREQUENCY: f64 = 0.8;
const DIFFERENTIAL_SIZE: usize = 5;
const DISCRIMINATING_FEATURES: usize = 3;

fn percent(frequency: f64) -> String {
    format!("{:.0}% of cases", frequency * 100.0)
}

fn symptom_name(kb: &KnowledgeBase, sid: usize) -> String {
    kb.symptom(sid)
        .map_or_else(|| format!("Symptom {sid}"), |s| s.name.to_string())
}

#[must_use]
pub fn assess_severity(features: &FeatureVector) -> SeverityAssessment {
    let red_flag = RED_FLAG_THRESHOLDS
        .iter()
        .any(|&(sid, threshold)| features.severity(sid) > threshold);
    if red_flag {
        return SeverityAssessment {
            level: SeverityLevel::Severe,
            red_flag: true,
        };
    }

    let present: Vec<f64> = features
        .present_ids()
        .into_iter()
        .map(|sid| features.severity(sid))
        .collect();
    let level = if present.is_empty() {
        SeverityLevel::Mild
    } else {
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        if mean > 0.7 {
            SeverityLevel::Severe
        } else if mean > 0.5 {
            SeverityLevel::Moderate
        } else {
            SeverityLevel::Mild
        }
    };
    SeverityAssessment {
        level,
        red_flag: false,
    }
}

/// Disease red flags matched by present symptoms, then the generic flags.
#[must_use]
pub fn check_red_flags(features: &FeatureVector, disease: &Disease, kb: &KnowledgeBase) -> Vec<String> {
    let present = features.present_ids();
    let mut flags: Vec<String> = disease
        .red_flags
        .iter()
        .filter(|flag| {
            let flag = flag.to_lowercase();
            present.iter().any(|&sid| {
                kb.symptom(sid)
                    .is_some_and(|s| flag.contains(&s.name.to_lowercase()))
            })
        })
        .map(|flag| (*flag).to_string())
        .collect();

    if features.severity(ids::DYSPNEA) > 0.5 {
        flags.push("Significant shortness of breath - requires evaluation".to_string());
    }
    if features.severity(ids::CHEST_PAIN) > 0.6 {
        flags.push("Chest pain - cardiac evaluation needed".to_string());
    }
    if features.is_present(ids::CONFUSION) {
        flags.push("Altered mental status - urgent evaluation".to_string());
    }
    flags
}

/// Relate present and absent symptoms to the reported disease's pattern.
#[must_use]
pub fn build_reasoning(
    features: &FeatureVector,
    disease: &Disease,
    syndrome: Syndrome,
    kb: &KnowledgeBase,
) -> ClinicalReasoning {
    let mut reasoning = ClinicalReasoning {
        syndrome,
        key_findings: Vec::new(),
        supporting_features: Vec::new(),
        inconsistent_features: Vec::new(),
    };

    for sid in features.present_ids() {
        match disease.pattern(sid) {
            Some(p) if p.frequency > KEY_FINDING_FREQUENCY => reasoning.key_findings.push(Finding {
                symptom: symptom_name(kb, sid),
                significance: "Common in this condition".to_string(),
                frequency: Some(percent(p.frequency)),
            }),
            Some(p) => reasoning.supporting_features.push(Finding {
                symptom: symptom_name(kb, sid),
                significance: "Sometimes seen".to_string(),
                frequency: Some(percent(p.frequency)),
            }),
            None => reasoning.inconsistent_features.push(Finding {
                symptom: symptom_name(kb, sid),
                significance: "Not typical for this diagnosis".to_string(),
                frequency: None,
            }),
        }
    }

    for (sid, p) in disease.patterns {
        if p.frequency > EXPECTED_FINDING_FREQUENCY && !features.is_present(*sid) {
            reasoning.inconsistent_features.push(Finding {
                symptom: format!("{} (absent)", symptom_name(kb, *sid)),
                significance: format!("Expected in {}", percent(p.frequency)),
                frequency: None,
            });
        }
    }

    reasoning
}

/// First hallmark symptoms of a disease, in pattern order.
#[must_use]
pub fn discriminating_features(disease: &Disease, kb: &KnowledgeBase) -> Vec<String> {
    disease
        .patterns
        .iter()
        .filter(|(_, p)| p.frequency > KEY_FINDING_FREQUENCY)
        .take(DISCRIMINATING_FEATURES)
        .map(|(sid, _)| symptom_name(kb, *sid))
        .collect()
}

/// Syndrome-appropriate diseases ranked by adjusted probability.
#[must_use]
pub fn build_differential(adjusted: &[f64], syndrome: Syndrome, kb: &KnowledgeBase) -> Vec<DifferentialEntry> {
    let mut ranked: Vec<(usize, f64)> = kb
        .differential_ids(syndrome)
        .into_iter()
        .filter_map(|id| adjusted.get(id).map(|p| (id, *p)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .take(DIFFERENTIAL_SIZE)
        .filter_map(|(id, probability)| {
            let disease = kb.disease(id)?;
            Some(DifferentialEntry {
                disease: disease.name.to_string(),
                probability,
                icd_10: disease.icd_10.to_string(),
                certainty: disease.certainty,
                key_discriminating_features: discriminating_features(disease, kb),
            })
        })
        .collect()
}

#[must_use]
pub fn recommendations(disease: &Disease, severity: SeverityAssessment, has_test_results: bool) -> Vec<String> {
    let mut out = Vec::new();
    let tests = disease.required_tests.join(", ");

    match disease.certainty {
        CertaintyTier::Confirmatory if !has_test_results => {
            out.push(format!("Confirmatory testing recommended: {tests}"));
        }
        CertaintyTier::Presumptive => out.push(format!("Consider testing to confirm: {tests}")),
        _ => {}
    }

    out.push(severity.level.advice().to_string());

    let boilerplate: &[&str] = match disease.name {
        names::VIRAL_URI => &[
            "Supportive care: rest, fluids, symptom management",
            "Antibiotics not indicated for viral illness",
            "Return if symptoms worsen or persist >10 days",
        ],
        names::ILI => &[
            "Consider influenza testing if within 48 hours of onset",
            "Antiviral therapy most effective if started early",
            "Monitor for secondary bacterial pneumonia",
        ],
        _ => &[],
    };
    out.extend(boilerplate.iter().map(|s| (*s).to_string()));

    if let Some(pearl) = disease.pearls.first() {
        out.push(format!("Clinical note: {pearl}"));
    }
    out
}

/// Human-readable explanation of a report.
#[must_use]
pub fn explain(report: &DiagnosisReport) -> String {
    let mut lines = vec![
        format!(
            "Based on your symptoms, you appear to have a {} syndrome.",
            report.syndrome
        ),
        format!("Severity assessment: {}", report.severity),
    ];

    let reasoning = &report.reasoning;
    if !reasoning.key_findings.is_empty() {
        lines.push("\nKey findings supporting the diagnosis:".to_string());
        for f in reasoning.key_findings.iter().take(3) {
            lines.push(format!("- {}: {}", f.symptom, f.significance));
        }
    }
    if !reasoning.inconsistent_features.is_empty() {
        lines.push("\nFeatures that are less typical:".to_string());
        for f in reasoning.inconsistent_features.iter().take(2) {
            lines.push(format!("- {}: {}", f.symptom, f.significance));
        }
    }

    if report.primary.certainty == CertaintyTier::Confirmatory {
        if let Some(test) = &report.confirmed_by {
            lines.push(format!("\nNote: {} confirmed by {test}.", report.primary.name));
        } else {
            lines.push(format!(
                "\nNote: {} requires laboratory confirmation.",
                report.primary.name
            ));
            lines.push("Without testing, this is a presumptive diagnosis.".to_string());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(entries: &[(usize, f64)]) -> FeatureVector {
        let mut fv = FeatureVector::new();
        for &(sid, sev) in entries {
            fv.set(sid, sev);
        }
        fv
    }

    fn disease(name: &str) -> &'static Disease {
        KnowledgeBase::global()
            .disease_by_name(name)
            .expect("Disease should exist")
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(assess_severity(&FeatureVector::new()).level, SeverityLevel::Mild);

        let red = assess_severity(&features(&[(ids::CHEST_PAIN, 0.65)]));
        assert!(red.red_flag);
        assert_eq!(red.level, SeverityLevel::Severe);

        // threshold is strict
        assert!(!assess_severity(&features(&[(ids::DYSPNEA, 0.5)])).red_flag);

        let moderate = assess_severity(&features(&[(ids::FEVER, 0.6), (ids::COUGH, 0.6)]));
        assert_eq!(moderate.level, SeverityLevel::Moderate);

        let severe = assess_severity(&features(&[(ids::FEVER, 0.9), (ids::FATIGUE, 0.8)]));
        assert_eq!(severe, SeverityAssessment { level: SeverityLevel::Severe, red_flag: false });
    }

    #[test]
    fn test_red_flags_match_symptom_names() {
        let kb = KnowledgeBase::global();
        let uti = disease(names::UTI);
        let flags = check_red_flags(&features(&[(ids::FEVER, 0.4), (ids::CONFUSION, 0.2)]), uti, kb);
        assert_eq!(
            flags,
            vec![
                "Fever".to_string(),
                "Altered mental status - urgent evaluation".to_string()
            ]
        );
    }

    #[test]
    fn test_reasoning_sorts_findings() {
        let kb = KnowledgeBase::global();
        let uti = disease(names::UTI);
        let fv = features(&[(ids::DYSURIA, 0.8), (17, 0.4), (ids::COUGH, 0.5)]);
        let reasoning = build_reasoning(&fv, uti, Syndrome::Undifferentiated, kb);

        assert_eq!(reasoning.key_findings.len(), 1);
        assert_eq!(reasoning.key_findings[0].symptom, "Painful Urination");
        assert_eq!(reasoning.key_findings[0].frequency.as_deref(), Some("95% of cases"));
        assert_eq!(reasoning.supporting_features[0].significance, "Sometimes seen");

        let inconsistent: Vec<&str> = reasoning
            .inconsistent_features
            .iter()
            .map(|f| f.symptom.as_str())
            .collect();
        assert_eq!(inconsistent, vec!["Cough", "Frequent Urination (absent)"]);
    }

    #[test]
    fn test_differential_sorted_and_capped() {
        let kb = KnowledgeBase::global();
        let mut adjusted = vec![0.0; kb.num_diseases()];
        adjusted[0] = 0.1;
        adjusted[1] = 0.5;
        adjusted[2] = 0.2;
        adjusted[5] = 0.15;
        adjusted[8] = 0.05;

        let diff = build_differential(&adjusted, Syndrome::RespiratoryFebrile, kb);
        assert_eq!(diff.len(), 5);
        assert_eq!(diff[0].disease, names::ILI);
        assert!(diff.windows(2).all(|w| w[0].probability >= w[1].probability));
        assert!(diff.iter().all(|d| d.key_discriminating_features.len() <= 3));
    }

    #[test]
    fn test_recommendations_by_tier() {
        let mild = SeverityAssessment {
            level: SeverityLevel::Mild,
            red_flag: false,
        };
        let strep = recommendations(disease(names::STREP), mild, false);
        assert!(strep[0].starts_with("Confirmatory testing recommended:"));
        assert!(strep.last().is_some_and(|r| r.starts_with("Clinical note:")));

        let ili = recommendations(disease(names::ILI), mild, false);
        assert!(ili[0].starts_with("Consider testing to confirm:"));
        assert!(ili.contains(&"Antiviral therapy most effective if started early".to_string()));
    }
}
