//! Configuration type definitions for patch evaluation
//!
//! Every field carries a default, so an empty YAML document (or no file at
//! all) yields the reference behaviour: `hwiwonlee/secb.eval.x86_64.<id>:latest`
//! images, a 600 second container budget, a 10 second reproduce budget and
//! strict success classification.

use crate::errors::EvalError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,
    #[serde(default = "default_image_tag")]
    pub image_tag: String,
    /// Tool inside the image that provides the `build` and `repro` subcommands.
    #[serde(default = "default_build_tool")]
    pub build_tool: String,
    /// Where the patch directory is bound inside the container.
    #[serde(default = "default_patch_mount")]
    pub patch_mount: String,
    #[serde(default = "default_security_opts")]
    pub security_opts: Vec<String>,
    #[serde(default = "default_outer_timeout_secs")]
    pub outer_timeout_secs: u64,
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
    #[serde(default = "default_repro_timeout_secs")]
    pub repro_timeout_secs: u64,
    #[serde(default = "default_sanitizer_context_chars")]
    pub sanitizer_context_chars: usize,
    /// Accept a reached reproduce step without a sanitizer report as success.
    #[serde(default)]
    pub generous: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            image_prefix: default_image_prefix(),
            image_tag: default_image_tag(),
            build_tool: default_build_tool(),
            patch_mount: default_patch_mount(),
            security_opts: default_security_opts(),
            outer_timeout_secs: default_outer_timeout_secs(),
            stop_grace_secs: default_stop_grace_secs(),
            repro_timeout_secs: default_repro_timeout_secs(),
            sanitizer_context_chars: default_sanitizer_context_chars(),
            generous: false,
            workers: default_workers(),
        }
    }
}

impl EvalConfig {
    pub fn outer_timeout(&self) -> Duration {
        Duration::from_secs(self.outer_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        if self.image_prefix.trim().is_empty() {
            return Err(EvalError::ConfigError("image_prefix cannot be empty".to_string()));
        }
        if self.image_tag.trim().is_empty() {
            return Err(EvalError::ConfigError("image_tag cannot be empty".to_string()));
        }
        if self.build_tool.trim().is_empty() {
            return Err(EvalError::ConfigError("build_tool cannot be empty".to_string()));
        }
        if !self.patch_mount.starts_with('/') {
            return Err(EvalError::ConfigError(format!(
                "patch_mount must be an absolute container path, got '{}'",
                self.patch_mount
            )));
        }
        if self.outer_timeout_secs == 0 {
            return Err(EvalError::ConfigError("outer_timeout_secs must be greater than 0".to_string()));
        }
        if self.stop_grace_secs == 0 {
            return Err(EvalError::ConfigError("stop_grace_secs must be greater than 0".to_string()));
        }
        if self.repro_timeout_secs == 0 {
            return Err(EvalError::ConfigError("repro_timeout_secs must be greater than 0".to_string()));
        }
        if self.sanitizer_context_chars == 0 {
            return Err(EvalError::ConfigError(
                "sanitizer_context_chars must be greater than 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(EvalError::ConfigError("workers must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn default_image_prefix() -> String {
    "hwiwonlee/secb.eval.x86_64".to_string()
}

fn default_image_tag() -> String {
    "latest".to_string()
}

fn default_build_tool() -> String {
    "secb".to_string()
}

fn default_patch_mount() -> String {
    "/patch".to_string()
}

fn default_security_opts() -> Vec<String> {
    vec!["seccomp=unconfined".to_string()]
}

fn default_outer_timeout_secs() -> u64 { 600 }
fn default_stop_grace_secs() -> u64 { 10 }
fn default_repro_timeout_secs() -> u64 { 10 }
fn default_sanitizer_context_chars() -> usize { 1000 }
fn default_workers() -> usize { 1 }
