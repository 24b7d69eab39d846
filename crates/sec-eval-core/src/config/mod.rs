//! Configuration module for patch evaluation
//!
//! Tuning knobs (image naming, timeouts, the sanitizer context window, worker
//! count) and the process-wide strict/generous policy live in a single
//! `EvalConfig` value that is handed to the orchestrator.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;


use crate::errors::EvalError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<EvalConfig, EvalError> {
    ConfigLoader::from_file(path).await
}
