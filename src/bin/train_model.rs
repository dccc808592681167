//! Model training utility for Diagnostica.
//!
//! Trains the classifier on synthetic cases (or a JSONL dataset), writes
//! the snapshot and manifest, and prints an evaluation report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin train_model -- [--jsonl <path>] [--out <dir>] [--eval <path>] [--export-jsonl <path>]
//! ```
//!
//! Hyperparameters come from the `DIAGNOSTICA_*` environment overrides.

#![allow(non_snake_case)]

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use Diagnostica::adapters::snapshot::JsonModelStore;
use Diagnostica::application::DiagnosisService;
use Diagnostica::engine::{evaluate_model, load_jsonl, write_jsonl, CaseSampler, TrainingConfig};
use Diagnostica::KnowledgeBase;

#[derive(Debug, Default)]
struct Args {
    jsonl: Option<PathBuf>,
    out: Option<PathBuf>,
    eval: Option<PathBuf>,
    export_jsonl: Option<PathBuf>,
}

fn usage() -> String {
    "Usage: train_model [--jsonl <path>] [--out <dir>] [--eval <path>] [--export-jsonl <path>]"
        .to_string()
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--jsonl" => &mut parsed.jsonl,
            "--out" => &mut parsed.out,
            "--eval" => &mut parsed.eval,
            "--export-jsonl" => &mut parsed.export_jsonl,
            _ => return Err(usage()),
        };
        let v = args.next().ok_or_else(usage)?;
        *slot = Some(PathBuf::from(v));
    }

    Ok(parsed)
}

fn main() -> Result<()> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let _guard = Diagnostica::adapters::logging::init()?;
    let kb = KnowledgeBase::global();
    let config = TrainingConfig::from_env_or_default();
    config.validate()?;

    let cases = match &args.jsonl {
        Some(path) => {
            let load = load_jsonl(path, kb)
                .with_context(|| format!("Failed to load dataset {}", path.display()))?;
            println!("Loaded {} cases ({} skipped)", load.cases.len(), load.skipped);
            load.cases
        }
        None => {
            let cases = CaseSampler::new(kb, config.seed).generate_training_set(config.cases_per_disease);
            println!("Generated {} synthetic cases", cases.len());
            cases
        }
    };

    if let Some(path) = &args.export_jsonl {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_jsonl(BufWriter::new(file), &cases, kb)?;
        println!("Exported dataset to {}", path.display());
    }

    let store = Arc::new(match &args.out {
        Some(dir) => JsonModelStore::new(dir.clone()),
        None => JsonModelStore::from_env_or_default(),
    });
    let mut service = DiagnosisService::new(Arc::clone(&store)).with_training_config(config);
    let outcome = service.train_on(cases)?;

    let last = outcome.history.last();
    println!(
        "Trained {} epochs{} (T = {})",
        outcome.history.len(),
        if outcome.stopped_early { ", stopped early" } else { "" },
        outcome.temperature
    );
    if let Some(record) = last {
        println!(
            "Final epoch: train loss {:.4}, val loss {:.4}, val acc {:.2}%",
            record.train_loss,
            record.val_loss,
            record.val_acc * 100.0
        );
    }
    println!("Model saved to {}", store.model_path().display());

    let eval_cases = match &args.eval {
        Some(path) => {
            load_jsonl(path, kb)
                .with_context(|| format!("Failed to load evaluation set {}", path.display()))?
                .cases
        }
        None => outcome.validation,
    };

    if eval_cases.is_empty() {
        println!("No evaluation cases available.");
        return Ok(());
    }

    let report = evaluate_model(service.model()?, &eval_cases, kb);
    println!("\n{}", report.summary());
    Ok(())
}
