//! JSONL case datasets.
//!
//! One object per line: `{"symptoms": {"Fever": 7, ...}, "label_name": "..."}`.
//! Severities are on the 0-10 scale and may be numbers or numeric strings.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::TrainingCase;
use crate::knowledge::KnowledgeBase;
use crate::Result;

#[derive(Debug, Serialize, Deserialize)]
struct DatasetRow {
    symptoms: BTreeMap<String, Value>,
    label_name: String,
}

/// Parsed dataset plus the number of rows dropped for unknown labels.
#[derive(Debug, Clone, Default)]
pub struct DatasetLoad {
    pub cases: Vec<TrainingCase>,
    pub skipped: usize,
}

fn severity_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse JSONL rows from a reader.
///
/// # Errors
/// Returns `Serialization` for a malformed line and `Io` for read failures.
pub fn parse_jsonl<R: BufRead>(reader: R, kb: &KnowledgeBase) -> Result<DatasetLoad> {
    let mut load = DatasetLoad::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: DatasetRow = serde_json::from_str(&line)?;

        let Some(label) = kb.find_disease_id_by_name(&row.label_name) else {
            tracing::debug!("Line {}: unknown label '{}'", line_no + 1, row.label_name);
            load.skipped += 1;
            continue;
        };

        let features = kb.build_features(row.symptoms.iter().filter_map(|(name, value)| {
            severity_value(value).map(|severity| (name.as_str(), severity))
        }));
        load.cases.push(TrainingCase::new(features, label));
    }

    if load.skipped > 0 {
        tracing::warn!("Skipped {} rows with unknown labels", load.skipped);
    }
    Ok(load)
}

/// Load a JSONL dataset from disk.
///
/// # Errors
/// See [`parse_jsonl`]; also fails if the file cannot be opened.
pub fn load_jsonl(path: &Path, kb: &KnowledgeBase) -> Result<DatasetLoad> {
    let file = File::open(path)?;
    let load = parse_jsonl(BufReader::new(file), kb)?;
    tracing::info!("Loaded {} cases from {}", load.cases.len(), path.display());
    Ok(load)
}

/// Write cases as JSONL with 0-10 severities.
///
/// # Errors
/// Returns `Io` or `Serialization` on write failure.
pub fn write_jsonl<W: Write>(mut writer: W, cases: &[TrainingCase], kb: &KnowledgeBase) -> Result<()> {
    for case in cases {
        let symptoms = case
            .features
            .present_ids()
            .into_iter()
            .filter_map(|sid| {
                let symptom = kb.symptom(sid)?;
                let severity = case.features.severity(sid) * 10.0;
                Some((symptom.name.to_string(), Value::from(severity)))
            })
            .collect();
        let label_name = kb
            .disease(case.label)
            .map(|d| d.name.to_string())
            .unwrap_or_default();
        serde_json::to_writer(&mut writer, &DatasetRow { symptoms, label_name })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
