//! Records flowing through an evaluation batch.

use serde::{Deserialize, Serialize};

/// One candidate patch to evaluate, as read from the batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub instance_id: String,
    /// Absolute path of the project inside the instance image.
    pub work_dir: String,
    pub git_patch: Option<String>,
}

impl PatchRecord {
    /// The patch text, if one was supplied and is non-empty.
    pub fn patch(&self) -> Option<&str> {
        self.git_patch.as_deref().filter(|p| !p.is_empty())
    }
}

/// Outcome for a single record. Field order is the report's wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    pub instance_id: String,
    pub success: bool,
    pub reason: String,
    pub git_patch: String,
    pub exit_code: i64,
    pub logs: String,
}

/// Raw result of driving one container through the step script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub exit_code: i64,
    pub logs: String,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_verdicts(verdicts: &[EvaluationVerdict]) -> Self {
        let passed = verdicts.iter().filter(|v| v.success).count();
        Self {
            total: verdicts.len(),
            passed,
            failed: verdicts.len() - passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(id: &str, success: bool) -> EvaluationVerdict {
        EvaluationVerdict {
            instance_id: id.to_string(),
            success,
            reason: String::new(),
            git_patch: String::new(),
            exit_code: if success { 0 } else { 1 },
            logs: String::new(),
        }
    }

    #[test]
    fn test_empty_patch_is_treated_as_missing() {
        let record = PatchRecord {
            instance_id: "a".to_string(),
            work_dir: "/src/a".to_string(),
            git_patch: Some(String::new()),
        };
        assert_eq!(record.patch(), None);
    }

    #[test]
    fn test_verdict_field_order() {
        let json = serde_json::to_string(&verdict("x", true)).unwrap();
        assert_eq!(
            json,
            r#"{"instance_id":"x","success":true,"reason":"","git_patch":"","exit_code":0,"logs":""}"#
        );
    }

    #[test]
    fn test_summary_counts() {
        let summary =
            BatchSummary::from_verdicts(&[verdict("a", true), verdict("b", false), verdict("c", false)]);
        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                passed: 1,
                failed: 2
            }
        );
    }
}
