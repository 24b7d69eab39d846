//! Error types for batch evaluation and container orchestration
//!
//! Two layers are kept apart on purpose: `ContainerError` describes what went
//! wrong while driving a single container, and is converted into a failure
//! verdict at the record boundary. `EvalError` covers batch-level problems
//! (unreadable input, missing structural fields, bad configuration) that abort
//! the whole run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} not found in the JSON data (line {line})")]
    MissingField { line: usize, field: &'static str },
    #[error("No valid JSON found in {0}")]
    EmptyInput(PathBuf),
    #[error("Failed to serialize verdict for '{instance_id}': {source}")]
    Serialize {
        instance_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// Specific error for the container lifecycle provider
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Bollard (Docker client) error: {0}")]
    BollardError(#[from] bollard::errors::Error),
    #[error("Failed to pull image {image}: {message}")]
    ImagePull { image: String, message: String },
    #[error("Container wait timed out after {0:?}")]
    Timeout(Duration),
    #[error("Container wait stream ended unexpectedly")]
    WaitStreamEnded,
    #[error("I/O error during container operation: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Could not create temporary file/directory: {0}")]
    TempFileError(String),
}
