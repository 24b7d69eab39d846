//! The three-step script executed inside every evaluation container.
//!
//! Each step echoes `Step N: <label>` before it runs, then either
//! `SUCCESS: <label> passed; exit code=0` or
//! `FAIL_STEP: <label>; exit code=<n>` followed by `exit <n>`. These lines
//! are the only channel the orchestrator uses to attribute a failure, so the
//! literals below are part of the container protocol.

use crate::config::EvalConfig;

pub const FAIL_MARKER: &str = "FAIL_STEP:";
pub const SUCCESS_MARKER: &str = "SUCCESS:";
pub const PATCH_FILE_NAME: &str = "patch.diff";

/// One short-circuiting step of the evaluation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub command: String,
}

impl Step {
    /// Line printed when the step begins, e.g. `Step 3: Run PoC`.
    pub fn banner(&self, number: usize) -> String {
        format!("Step {}: {}", number, self.label)
    }
}

pub const APPLY_LABEL: &str = "Git apply";
pub const BUILD_LABEL: &str = "Compile";
pub const REPRO_LABEL: &str = "Run PoC";

/// Banner of the reproduce step; its presence proves the PoC was reached.
pub const REPRO_STARTED_MARKER: &str = "Step 3: Run PoC";

pub fn evaluation_steps(config: &EvalConfig) -> Vec<Step> {
    vec![
        Step {
            label: APPLY_LABEL,
            command: format!(
                "git apply --verbose --reject {}/{}",
                config.patch_mount.trim_end_matches('/'),
                PATCH_FILE_NAME
            ),
        },
        Step {
            label: BUILD_LABEL,
            command: format!("{} build", config.build_tool),
        },
        Step {
            label: REPRO_LABEL,
            command: format!("timeout {} {} repro", config.repro_timeout_secs, config.build_tool),
        },
    ]
}

/// Renders the steps as a bash script that stops at the first failing step.
pub fn render_script(steps: &[Step]) -> String {
    let mut script = String::new();
    for (i, step) in steps.iter().enumerate() {
        script.push_str(&format!(
            r#"
echo "{banner}"
{command}
ret=$?
if [ ${{ret}} -ne 0 ]; then
    echo "{fail} {label}; exit code=${{ret}}"
    exit ${{ret}}
else
    echo "{success} {label} passed; exit code=${{ret}}"
fi
"#,
            banner = step.banner(i + 1),
            command = step.command,
            fail = FAIL_MARKER,
            success = SUCCESS_MARKER,
            label = step.label,
        ));
    }
    script.push_str("exit 0\n");
    script
}

/// Full container command: `bash -c <script>`.
pub fn container_command(config: &EvalConfig) -> Vec<String> {
    vec![
        "bash".to_string(),
        "-c".to_string(),
        render_script(&evaluation_steps(config)),
    ]
}

/// First log line reporting a failed step, verbatim (trimmed).
pub fn find_failed_step(logs: &str) -> Option<&str> {
    logs.lines()
        .find(|line| line.starts_with(FAIL_MARKER))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_steps() {
        let steps = evaluation_steps(&EvalConfig::default());
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].command, "git apply --verbose --reject /patch/patch.diff");
        assert_eq!(steps[1].command, "secb build");
        assert_eq!(steps[2].command, "timeout 10 secb repro");
        assert_eq!(steps[2].banner(3), REPRO_STARTED_MARKER);
    }

    #[test]
    fn test_script_short_circuits_each_step_in_order() {
        let script = render_script(&evaluation_steps(&EvalConfig::default()));

        let apply = script.find("echo \"Step 1: Git apply\"").unwrap();
        let build = script.find("echo \"Step 2: Compile\"").unwrap();
        let repro = script.find("echo \"Step 3: Run PoC\"").unwrap();
        assert!(apply < build && build < repro);

        assert!(script.contains("echo \"FAIL_STEP: Compile; exit code=${ret}\"\n    exit ${ret}"));
        assert!(script.contains("echo \"SUCCESS: Run PoC passed; exit code=${ret}\""));
        assert_eq!(script.matches("exit ${ret}").count(), 3);
        assert!(script.ends_with("exit 0\n"));
    }

    #[test]
    fn test_custom_tool_and_timeout() {
        let config = EvalConfig {
            build_tool: "arvo".to_string(),
            repro_timeout_secs: 30,
            patch_mount: "/mnt/fix/".to_string(),
            ..EvalConfig::default()
        };
        let command = container_command(&config);
        assert_eq!(command[0], "bash");
        assert_eq!(command[1], "-c");
        assert!(command[2].contains("git apply --verbose --reject /mnt/fix/patch.diff"));
        assert!(command[2].contains("arvo build"));
        assert!(command[2].contains("timeout 30 arvo repro"));
    }

    #[test]
    fn test_find_failed_step() {
        let logs = "Step 1: Git apply\nSUCCESS: Git apply passed; exit code=0\n\
                    Step 2: Compile\nerror: foo.c:1\nFAIL_STEP: Compile; exit code=2\n";
        assert_eq!(find_failed_step(logs), Some("FAIL_STEP: Compile; exit code=2"));

        // Only lines that begin with the marker count.
        assert_eq!(find_failed_step("  FAIL_STEP: indented\nnothing\n"), None);
    }
}
