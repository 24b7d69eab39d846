//! JSON Lines input and report output.
//!
//! Input lines look like
//! `{"instance_id": "...", "instance": {"work_dir": "..."}, "test_result": {"git_patch": "..."}}`;
//! any other fields are ignored. The report is written as one
//! `EvaluationVerdict` object per line.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

use crate::errors::EvalError;
use crate::models::{EvaluationVerdict, PatchRecord};

pub const REPORT_FILE_NAME: &str = "report.jsonl";

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    instance_id: Option<String>,
    #[serde(default)]
    instance: Option<RawInstance>,
    #[serde(default)]
    test_result: Option<RawTestResult>,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    #[serde(default)]
    work_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTestResult {
    #[serde(default)]
    git_patch: Option<String>,
}

/// Parses every non-empty line; any malformed or incomplete record is fatal.
pub fn parse_records(content: &str, source: &Path) -> Result<Vec<PatchRecord>, EvalError> {
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: RawRecord = serde_json::from_str(line).map_err(|source| EvalError::Json {
            line: line_no,
            source,
        })?;

        let instance_id = raw
            .instance_id
            .filter(|id| !id.is_empty())
            .ok_or(EvalError::MissingField {
                line: line_no,
                field: "instance_id",
            })?;
        let work_dir = raw
            .instance
            .and_then(|i| i.work_dir)
            .filter(|dir| !dir.is_empty())
            .ok_or(EvalError::MissingField {
                line: line_no,
                field: "work_dir",
            })?;
        let git_patch = raw.test_result.and_then(|t| t.git_patch);

        records.push(PatchRecord {
            instance_id,
            work_dir,
            git_patch,
        });
    }

    if records.is_empty() {
        return Err(EvalError::EmptyInput(source.to_path_buf()));
    }
    Ok(records)
}

pub async fn read_records(path: &Path) -> Result<Vec<PatchRecord>, EvalError> {
    let content = fs::read_to_string(path).await.map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&content, path)
}

/// `report.jsonl` next to the input file.
pub fn default_report_path(input: &Path) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(REPORT_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(REPORT_FILE_NAME))
}

pub fn render_report(verdicts: &[EvaluationVerdict]) -> Result<String, EvalError> {
    let mut out = String::new();
    for verdict in verdicts {
        let line = serde_json::to_string(verdict).map_err(|source| EvalError::Serialize {
            instance_id: verdict.instance_id.clone(),
            source,
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

pub async fn write_report(path: &Path, verdicts: &[EvaluationVerdict]) -> Result<(), EvalError> {
    let content = render_report(verdicts)?;
    fs::write(path, content).await.map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })
}
