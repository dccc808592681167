//! Engine layer: classifier, clinical rules and question selection.
//!
//! Everything here is synchronous and free of I/O except the dataset loader.

pub mod dataset;
pub mod evaluation;
pub mod model;
pub mod network;
pub mod report;
pub mod rules;
pub mod sampler;
pub mod selector;
pub mod trainer;

pub use dataset::{load_jsonl, parse_jsonl, write_jsonl, DatasetLoad};
pub use evaluation::{evaluate_model, expected_calibration_error, EvaluationReport};
pub use model::{ModelSnapshot, NeuronRecord, SnapshotConfig, TrainedModel};
pub use network::{argmax, cross_entropy, softmax, ForwardPass, Network, Neuron};
pub use rules::{classify_syndrome, RuleAdjuster, RuleConfig};
pub use sampler::{CaseMode, CaseSampler};
pub use selector::{AdaptiveSelector, TRIAGE_SHORTLIST};
pub use trainer::{EpochRecord, Trainer, TrainingConfig, TrainingOutcome};
