//! Diagnostica: rule-augmented syndrome classifier.
//!
//! Command-line entry point.
//!
//! ```bash
//! Diagnostica diagnose "Fever:8,Cough:6" [--test "Influenza A/B Test=Positive"]... [--readings] [--json]
//! Diagnostica adaptive [--prior "Fever:8"] [--debug-k K]
//! ```

#![allow(non_snake_case)]

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use Diagnostica::adapters::memory::InMemorySessionStore;
use Diagnostica::adapters::snapshot::JsonModelStore;
use Diagnostica::application::{AdaptiveService, DiagnosisService, Question};
use Diagnostica::domain::AnswerKind;
use Diagnostica::DiagnosisReport;

enum Command {
    Diagnose {
        symptoms: BTreeMap<String, f64>,
        tests: BTreeMap<String, String>,
        readings: bool,
        json: bool,
    },
    Adaptive {
        prior: BTreeMap<String, f64>,
        debug_k: usize,
    },
}

fn usage() -> String {
    [
        "Usage:",
        "  Diagnostica diagnose \"Fever:8,Cough:6\" [--test \"Name=Result\"]... [--readings] [--json]",
        "    --readings  values are raw readings on each symptom's scale (\"Fever:102.3\")",
        "  Diagnostica adaptive [--prior \"Fever:8\"] [--debug-k K]",
    ]
    .join("\n")
}

/// Parse `"Fever:8,Muscle Pain:6"` into `{name: severity}`.
fn parse_symptom_list(raw: &str) -> Result<BTreeMap<String, f64>, String> {
    let mut out = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, severity) = entry
            .rsplit_once(':')
            .ok_or_else(|| format!("Expected 'Name:severity', got '{entry}'"))?;
        let severity = severity
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid severity in '{entry}'"))?;
        if !severity.is_finite() {
            return Err(format!("Invalid severity in '{entry}'"));
        }
        out.insert(name.trim().to_string(), severity);
    }
    Ok(out)
}

fn parse_test(raw: &str) -> Result<(String, String), String> {
    let (name, result) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected 'Test=Result', got '{raw}'"))?;
    Ok((name.trim().to_string(), result.trim().to_string()))
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(usage)?;

    match command.as_str() {
        "diagnose" => {
            let mut symptoms: Option<BTreeMap<String, f64>> = None;
            let mut tests = BTreeMap::new();
            let mut readings = false;
            let mut json = false;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--test" => {
                        let v = args.next().ok_or_else(usage)?;
                        let (name, result) = parse_test(&v)?;
                        tests.insert(name, result);
                    }
                    "--readings" => readings = true,
                    "--json" => json = true,
                    "-h" | "--help" => return Err(usage()),
                    _ if symptoms.is_none() => symptoms = Some(parse_symptom_list(&arg)?),
                    _ => return Err(usage()),
                }
            }
            Ok(Command::Diagnose {
                symptoms: symptoms.ok_or_else(usage)?,
                tests,
                readings,
                json,
            })
        }
        "adaptive" => {
            let mut prior = BTreeMap::new();
            let mut debug_k = 0;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--prior" => {
                        let v = args.next().ok_or_else(usage)?;
                        prior.extend(parse_symptom_list(&v)?);
                    }
                    "--debug-k" => {
                        let v = args.next().ok_or_else(usage)?;
                        debug_k = v
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| "--debug-k must be a non-negative integer".to_string())?;
                    }
                    _ => return Err(usage()),
                }
            }
            Ok(Command::Adaptive { prior, debug_k })
        }
        _ => Err(usage()),
    }
}

fn load_service() -> Result<DiagnosisService<JsonModelStore>> {
    let store = Arc::new(JsonModelStore::from_env_or_default());
    let mut service = DiagnosisService::new(store);
    service
        .initialize()
        .context("Failed to load or train the model")?;
    Ok(service)
}

fn print_report(service: &DiagnosisService<JsonModelStore>, report: &DiagnosisReport) {
    println!(
        "\nPrimary diagnosis: {} ({}, {}) - {:.1}%",
        report.primary.name,
        report.primary.icd_10,
        report.primary.certainty.description(),
        report.primary.confidence * 100.0
    );
    println!("{}\n", service.explain(report));

    if !report.differential.is_empty() {
        println!("Differential:");
        for entry in &report.differential {
            println!(
                "  {:<40} {:>6.1}%  {}",
                entry.disease,
                entry.probability * 100.0,
                entry.key_discriminating_features.join(", ")
            );
        }
    }

    if !report.red_flags.is_empty() {
        println!("\nRed flags:");
        for flag in &report.red_flags {
            println!("  ! {flag}");
        }
    }

    println!("\nRecommendations:");
    for rec in &report.recommendations {
        println!("  - {rec}");
    }
}

fn run_diagnose(
    symptoms: &BTreeMap<String, f64>,
    tests: &BTreeMap<String, String>,
    readings: bool,
    json: bool,
) -> Result<()> {
    let service = load_service()?;
    let report = if readings {
        service.diagnose_readings(symptoms, tests)?
    } else {
        service.diagnose(symptoms, tests)?
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&service, &report);
    }
    Ok(())
}

/// Parse a wizard reply such as `y`, `n`, `u` or `y 7`.
fn parse_reply(line: &str) -> Result<(AnswerKind, Option<f64>), String> {
    let mut parts = line.split_whitespace();
    let kind = parts
        .next()
        .ok_or_else(|| "Empty answer".to_string())?
        .parse::<AnswerKind>()?;
    let severity = match parts.next() {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| format!("Invalid severity '{raw}'"))?,
        ),
        None => None,
    };
    Ok((kind, severity))
}

fn ask(question: &Question) -> Result<()> {
    print!(
        "Do you have {} ({})? [y/n/u, optional severity 0-10] ",
        question.name, question.medical_term
    );
    std::io::stdout().flush()?;
    Ok(())
}

fn run_adaptive(prior: &BTreeMap<String, f64>, debug_k: usize) -> Result<()> {
    let diagnosis = Arc::new(load_service()?);
    let service = AdaptiveService::new(Arc::clone(&diagnosis), Arc::new(InMemorySessionStore::new()));

    let start = service.start(prior, None, None)?;
    let session_id = start.session_id;
    let mut question = start.next_question;

    println!("Answer each question. Empty line finishes now, 'q' quits.\n");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    let report = loop {
        let Some(q) = question.as_ref() else {
            break service.finish(&session_id)?;
        };

        if debug_k > 0 {
            for (candidate, eig) in service.rank_candidates(&session_id, debug_k)? {
                println!("  [debug] {:<24} EIG {eig:.4}", candidate.name);
            }
        }
        ask(q)?;

        let Some(line) = lines.next() else {
            break service.finish(&session_id)?;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            break service.finish(&session_id)?;
        }
        if line.eq_ignore_ascii_case("q") {
            println!("Session abandoned.");
            return Ok(());
        }

        let (kind, severity) = match parse_reply(line) {
            Ok(reply) => reply,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let outcome = service.answer(&session_id, q.symptom_id, kind, severity)?;
        if outcome.finished {
            match outcome.results {
                Some(report) => break report,
                None => bail!("Session finished without results"),
            }
        }
        question = outcome.next_question;
    };

    print_report(&diagnosis, &report);
    Ok(())
}

fn main() -> Result<()> {
    let command = match parse_args() {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let _guard = Diagnostica::adapters::logging::init()?;
    tracing::info!("Starting Diagnostica...");

    match command {
        Command::Diagnose {
            symptoms,
            tests,
            readings,
            json,
        } => run_diagnose(&symptoms, &tests, readings, json)?,
        Command::Adaptive { prior, debug_k } => run_adaptive(&prior, debug_k)?,
    }

    tracing::info!("Diagnostica shutdown complete.");
    Ok(())
}
