//! Drives one container through the apply → build → reproduce script.
//!
//! Per invocation the runner owns two resources: a temporary directory
//! holding `patch.diff` (released when the `TempDir` guard drops) and the
//! container itself (removed unconditionally once the drive phase returns).
//! A wait that errors or exceeds the outer budget is converted into the
//! conventional timeout status 124 after a best-effort graceful stop.

use std::sync::Arc;
use std::time::Duration;

use tempfile::{Builder, TempDir};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::EvalConfig;
use crate::errors::ContainerError;
use crate::models::RunOutput;
use crate::runtime::{ContainerHandle, ContainerRuntime, ContainerSpec, VolumeBind};
use crate::steps::{self, PATCH_FILE_NAME};

/// Exit status reported when the container had to be stopped.
pub const TIMEOUT_EXIT_CODE: i64 = 124;

/// Prefix of the `logs` text recorded when the container output could not be fetched.
pub const LOGS_UNAVAILABLE: &str = "Container logs unavailable:";

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub image_prefix: String,
    pub image_tag: String,
    pub patch_mount: String,
    pub security_opts: Vec<String>,
    pub outer_timeout: Duration,
    pub stop_grace: Duration,
    pub command: Vec<String>,
}

impl From<&EvalConfig> for RunnerSettings {
    fn from(config: &EvalConfig) -> Self {
        Self {
            image_prefix: config.image_prefix.clone(),
            image_tag: config.image_tag.clone(),
            patch_mount: config.patch_mount.clone(),
            security_opts: config.security_opts.clone(),
            outer_timeout: config.outer_timeout(),
            stop_grace: config.stop_grace(),
            command: steps::container_command(config),
        }
    }
}

pub struct StepRunner {
    runtime: Arc<dyn ContainerRuntime>,
    settings: RunnerSettings,
}

impl StepRunner {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: RunnerSettings) -> Self {
        Self { runtime, settings }
    }

    pub fn image_name(&self, instance_id: &str) -> String {
        format!(
            "{}.{}:{}",
            self.settings.image_prefix, instance_id, self.settings.image_tag
        )
    }

    pub async fn run(
        &self,
        instance_id: &str,
        work_dir: &str,
        git_patch: &str,
    ) -> Result<RunOutput, ContainerError> {
        let image = self.image_name(instance_id);
        log::info!("Using docker image: {} for instance {}", image, instance_id);
        self.ensure_image(&image).await?;

        let patch_dir = write_patch(git_patch).await?;

        let spec = ContainerSpec {
            name: container_name(instance_id),
            image,
            command: self.settings.command.clone(),
            working_dir: work_dir.to_string(),
            security_opts: self.settings.security_opts.clone(),
            binds: vec![VolumeBind {
                host_path: patch_dir.path().to_path_buf(),
                container_path: self.settings.patch_mount.clone(),
                read_only: false,
            }],
        };

        let container = self.runtime.create_container(&spec).await?;
        log::info!("Running container {} for instance {}", container.name, instance_id);

        let outcome = self.drive(&container).await;

        if let Err(e) = self.runtime.remove_container(&container).await {
            log::warn!("Error removing container {}: {}", container.name, e);
        }
        drop(patch_dir);

        outcome
    }

    async fn ensure_image(&self, image: &str) -> Result<(), ContainerError> {
        if self.runtime.image_exists(image).await? {
            log::info!("Docker image {} already exists", image);
            return Ok(());
        }

        log::info!("Docker image {} not found, pulling...", image);
        match self.runtime.pull_image(image).await {
            Ok(()) => {
                log::info!("Successfully pulled docker image {}", image);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to pull docker image {}: {}", image, e);
                Err(e)
            }
        }
    }

    async fn drive(&self, container: &ContainerHandle) -> Result<RunOutput, ContainerError> {
        self.runtime.start_container(container).await?;

        let exit_code = match self
            .runtime
            .wait_container(container, self.settings.outer_timeout)
            .await
        {
            Ok(code) => code,
            Err(e) => {
                log::warn!(
                    "Container {} timed out or errored after {:?}: {}",
                    container.name,
                    self.settings.outer_timeout,
                    e
                );
                if let Err(stop_error) = self
                    .runtime
                    .stop_container(container, self.settings.stop_grace)
                    .await
                {
                    log::warn!("Error stopping container {}: {}", container.name, stop_error);
                }
                TIMEOUT_EXIT_CODE
            }
        };

        // The exit status is settled at this point; losing the logs must not change it.
        let logs = match self.runtime.container_logs(container).await {
            Ok(raw_logs) => String::from_utf8_lossy(&raw_logs).into_owned(),
            Err(e) => {
                log::warn!("Error fetching logs for container {}: {}", container.name, e);
                format!("{} {}", LOGS_UNAVAILABLE, e)
            }
        };
        log::debug!("Docker container logs for {}: {}", container.name, logs);

        Ok(RunOutput { exit_code, logs })
    }
}

async fn write_patch(git_patch: &str) -> Result<TempDir, ContainerError> {
    let dir = Builder::new()
        .prefix("sec-eval-patch-")
        .tempdir()
        .map_err(|e| ContainerError::TempFileError(e.to_string()))?;
    let path = dir.path().join(PATCH_FILE_NAME);

    let mut file = fs::File::create(&path).await?;
    file.write_all(git_patch.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    log::info!("Patch file written to: {}", path.display());

    Ok(dir)
}

/// Docker container names allow `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn container_name(instance_id: &str) -> String {
    let sanitized: String = instance_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("sec-eval-{}-{}", sanitized, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = RunnerSettings::from(&EvalConfig::default());
        assert_eq!(settings.outer_timeout, Duration::from_secs(600));
        assert_eq!(settings.stop_grace, Duration::from_secs(10));
        assert_eq!(settings.patch_mount, "/patch");
        assert_eq!(settings.command.len(), 3);
    }

    #[test]
    fn test_container_name_is_sanitized_and_unique() {
        let a = container_name("libfoo/cve 2023:1");
        let b = container_name("libfoo/cve 2023:1");
        assert!(a.starts_with("sec-eval-libfoo-cve-2023-1-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_patch_is_written_with_trailing_newline() {
        let dir = write_patch("--- a/x\n+++ b/x").await.unwrap();
        let content = std::fs::read_to_string(dir.path().join(PATCH_FILE_NAME)).unwrap();
        assert_eq!(content, "--- a/x\n+++ b/x\n");

        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(!path.exists());
    }
}
