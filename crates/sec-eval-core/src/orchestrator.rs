//! Batch evaluation: one verdict per record, in input order.
//!
//! Records are fed through a bounded pool of `workers` concurrent
//! evaluations; `buffered` keeps the output aligned with the input. Each
//! evaluation owns its own container and patch directory through
//! `StepRunner::run`, so nothing is shared between in-flight records.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};

use crate::config::EvalConfig;
use crate::errors::ContainerError;
use crate::models::{EvaluationVerdict, PatchRecord, RunOutput};
use crate::runner::{RunnerSettings, StepRunner};
use crate::runtime::ContainerRuntime;
use crate::sanitizer::SanitizerExtractor;
use crate::steps::{find_failed_step, REPRO_STARTED_MARKER};

pub const NO_PATCH_REASON: &str = "No git_patch provided";
pub const NO_PATCH_LOGS: &str = "No patch was provided in the input data";
pub const SUCCESS_REASON: &str = "Patch applied, compiled, and run successfully.";
pub const GENERIC_FAILURE_REASON: &str = "Patch evaluation failed.";
/// Status used when the container could not be driven at all.
pub const INFRA_FAILURE_EXIT_CODE: i64 = 125;

/// How a finished run is turned into a pass/fail verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessPolicy {
    /// Only a zero exit status counts.
    #[default]
    Strict,
    /// A reached reproduce step with no sanitizer report also counts.
    Generous,
}

impl SuccessPolicy {
    pub fn from_generous(generous: bool) -> Self {
        if generous {
            SuccessPolicy::Generous
        } else {
            SuccessPolicy::Strict
        }
    }
}

pub struct Evaluator {
    runner: StepRunner,
    extractor: SanitizerExtractor,
    policy: SuccessPolicy,
    workers: usize,
}

impl Evaluator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: &EvalConfig) -> Self {
        Self {
            runner: StepRunner::new(runtime, RunnerSettings::from(config)),
            extractor: SanitizerExtractor::new(config.sanitizer_context_chars),
            policy: SuccessPolicy::from_generous(config.generous),
            workers: config.workers.max(1),
        }
    }

    pub async fn evaluate_batch(&self, records: &[PatchRecord]) -> Vec<EvaluationVerdict> {
        stream::iter(records)
            .map(|record| self.evaluate_record(record))
            .buffered(self.workers)
            .collect()
            .await
    }

    pub async fn evaluate_record(&self, record: &PatchRecord) -> EvaluationVerdict {
        let git_patch = match record.patch() {
            Some(patch) => patch,
            None => {
                log::warn!(
                    "No git_patch found for instance {}, marking as failure",
                    record.instance_id
                );
                return EvaluationVerdict {
                    instance_id: record.instance_id.clone(),
                    success: false,
                    reason: NO_PATCH_REASON.to_string(),
                    git_patch: String::new(),
                    exit_code: 1,
                    logs: NO_PATCH_LOGS.to_string(),
                };
            }
        };

        match self
            .runner
            .run(&record.instance_id, &record.work_dir, git_patch)
            .await
        {
            Ok(output) => self.verdict_from_output(record, git_patch, output),
            Err(e) => infrastructure_failure(record, git_patch, e),
        }
    }

    fn verdict_from_output(
        &self,
        record: &PatchRecord,
        git_patch: &str,
        output: RunOutput,
    ) -> EvaluationVerdict {
        let success = classify(self.policy, &self.extractor, output.exit_code, &output.logs);
        let reason = if success {
            log::info!("{}: {}", record.instance_id, SUCCESS_REASON);
            SUCCESS_REASON.to_string()
        } else {
            let reason = failure_reason(&output.logs);
            log::error!("Patch evaluation failed for {}: {}", record.instance_id, reason);
            reason
        };

        EvaluationVerdict {
            instance_id: record.instance_id.clone(),
            success,
            reason,
            git_patch: git_patch.to_string(),
            exit_code: output.exit_code,
            logs: output.logs,
        }
    }
}

/// Decides success for a finished run under `policy`.
pub fn classify(
    policy: SuccessPolicy,
    extractor: &SanitizerExtractor,
    exit_code: i64,
    logs: &str,
) -> bool {
    if exit_code == 0 {
        return true;
    }
    match policy {
        SuccessPolicy::Strict => false,
        SuccessPolicy::Generous => {
            logs.contains(REPRO_STARTED_MARKER) && extractor.extract(logs).is_none()
        }
    }
}

pub fn failure_reason(logs: &str) -> String {
    find_failed_step(logs)
        .unwrap_or(GENERIC_FAILURE_REASON)
        .to_string()
}

fn infrastructure_failure(
    record: &PatchRecord,
    git_patch: &str,
    error: ContainerError,
) -> EvaluationVerdict {
    log::error!(
        "Infrastructure failure while evaluating {}: {}",
        record.instance_id,
        error
    );
    EvaluationVerdict {
        instance_id: record.instance_id.clone(),
        success: false,
        reason: format!("Infrastructure failure: {}", error),
        git_patch: git_patch.to_string(),
        exit_code: INFRA_FAILURE_EXIT_CODE,
        logs: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REACHED_POC: &str = "Step 1: Git apply\nSUCCESS: Git apply passed; exit code=0\n\
                               Step 2: Compile\nSUCCESS: Compile passed; exit code=0\n\
                               Step 3: Run PoC\nFAIL_STEP: Run PoC; exit code=1\n";

    #[test]
    fn test_strict_mode_only_trusts_exit_code() {
        let extractor = SanitizerExtractor::default();
        assert!(classify(SuccessPolicy::Strict, &extractor, 0, "FAIL_STEP: whatever"));
        assert!(!classify(SuccessPolicy::Strict, &extractor, 1, REACHED_POC));
        assert!(!classify(SuccessPolicy::Strict, &extractor, 124, ""));
    }

    #[test]
    fn test_generous_mode_accepts_reached_poc_without_report() {
        let extractor = SanitizerExtractor::default();
        assert!(classify(SuccessPolicy::Generous, &extractor, 1, REACHED_POC));
        assert!(classify(SuccessPolicy::Generous, &extractor, 0, ""));
    }

    #[test]
    fn test_generous_mode_rejects_sanitizer_crash() {
        let extractor = SanitizerExtractor::default();
        let logs = format!(
            "{}==4242==ERROR: AddressSanitizer: SEGV on unknown address\n==4242==ABORTING\n",
            REACHED_POC
        );
        assert!(!classify(SuccessPolicy::Generous, &extractor, 1, &logs));
    }

    #[test]
    fn test_generous_mode_requires_poc_step() {
        let extractor = SanitizerExtractor::default();
        let logs = "Step 1: Git apply\nFAIL_STEP: Git apply; exit code=1\n";
        assert!(!classify(SuccessPolicy::Generous, &extractor, 1, logs));
    }

    #[test]
    fn test_failure_reason() {
        assert_eq!(failure_reason(REACHED_POC), "FAIL_STEP: Run PoC; exit code=1");
        assert_eq!(failure_reason("container killed\n"), GENERIC_FAILURE_REASON);
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(SuccessPolicy::from_generous(false), SuccessPolicy::Strict);
        assert_eq!(SuccessPolicy::from_generous(true), SuccessPolicy::Generous);
        assert_eq!(SuccessPolicy::default(), SuccessPolicy::Strict);
    }
}
