//! Configuration loader for YAML files and environment overrides
//!
//! Precedence, lowest first: built-in defaults, the YAML file, then the
//! `SEC_EVAL_*` environment variables. Command-line flags are applied on top
//! by the binary.

use crate::config::types::EvalConfig;
use crate::errors::EvalError;
use std::env;
use std::path::Path;
use tokio::fs;

pub const ENV_GENEROUS: &str = "SEC_EVAL_GENEROUS";
pub const ENV_WORKERS: &str = "SEC_EVAL_WORKERS";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<EvalConfig, EvalError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            EvalError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    /// Defaults plus environment overrides, for runs without a config file
    pub fn from_env() -> Result<EvalConfig, EvalError> {
        let mut config = EvalConfig::default();
        Self::resolve_environment(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<EvalConfig, EvalError> {
        // serde_yaml rejects an empty document, treat it as "all defaults"
        let mut config: EvalConfig = if content.trim().is_empty() {
            EvalConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                EvalError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::resolve_environment(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_environment(config: &mut EvalConfig) -> Result<(), EvalError> {
        if let Ok(value) = env::var(ENV_GENEROUS) {
            config.generous = parse_bool(&value).ok_or_else(|| {
                EvalError::ConfigError(format!(
                    "{} must be one of true/false/1/0, got '{}'",
                    ENV_GENEROUS, value
                ))
            })?;
        }

        if let Ok(value) = env::var(ENV_WORKERS) {
            config.workers = value.trim().parse().map_err(|_| {
                EvalError::ConfigError(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_WORKERS, value
                ))
            })?;
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
