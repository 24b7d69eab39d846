//! Containerised evaluation of candidate security patches.
//!
//! Each candidate patch is applied, built and exercised against its
//! proof-of-concept inside a fresh container built for that vulnerability
//! instance. The outcome is reduced to a pass/fail verdict with the failing
//! step and any sanitizer report kept for review.
//!
//! # Architecture Overview
//!
//! - **Sanitizer extraction** (`sanitizer`): pure scan of process output for
//!   bracketed sanitizer reports, with a keyword-window fallback
//! - **Step runner** (`runner`, `steps`): drives one container through the
//!   apply → build → reproduce script with timeouts and guaranteed cleanup
//! - **Orchestration** (`orchestrator`): per-record sequencing and success
//!   classification under the strict or generous policy
//! - **Container runtime** (`runtime`): narrow lifecycle trait with a Docker
//!   implementation
//! - **Batch I/O** (`batch`): JSON Lines input records and report output

pub mod batch;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod runner;
pub mod runtime;
pub mod sanitizer;
pub mod steps;

pub use config::{ConfigLoader, EvalConfig};
pub use errors::{ContainerError, EvalError};
pub use models::{BatchSummary, EvaluationVerdict, PatchRecord, RunOutput};
pub use orchestrator::{Evaluator, SuccessPolicy};
pub use runner::StepRunner;
pub use runtime::{ContainerRuntime, DockerRuntime};
pub use sanitizer::{extract_sanitizer_report, SanitizerExtractor};
