// src/runtime/docker.rs
use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions as BollardCreateContainerOptionsQuery,
    CreateImageOptions as BollardCreateImageOptionsQuery,
    LogsOptions as BollardLogsOptionsQuery,
    RemoveContainerOptions as BollardRemoveContainerOptionsQuery,
    StartContainerOptions as BollardStartContainerOptionsQuery,
    StopContainerOptions as BollardStopContainerOptionsQuery,
    WaitContainerOptions as BollardWaitContainerOptionsQuery,
};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::time::Duration;

use super::{ContainerHandle, ContainerRuntime, ContainerSpec};
use crate::errors::ContainerError;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the local daemon. `request_timeout` must exceed the longest
    /// container wait, since the wait is a single long-lived request.
    pub fn new(request_timeout: Duration) -> Result<Self, ContainerError> {
        let docker = Docker::connect_with_local_defaults()?.with_timeout(request_timeout);
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError { status_code: 404, .. }) => Ok(false),
            Err(e) => Err(ContainerError::BollardError(e)),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        let pull_options = Some(BollardCreateImageOptionsQuery {
            from_image: Some(image.to_string()),
            ..Default::default()
        });

        let mut pull_stream = self.docker.create_image(pull_options, None, None);
        while let Some(result) = pull_stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        log::debug!("Pulling {}: {}", image, status);
                    }
                }
                Err(e) => {
                    return Err(ContainerError::ImagePull {
                        image: image.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }

        // A pull stream can finish cleanly without producing the image (e.g. a
        // registry that answers with an empty manifest list).
        if !self.image_exists(image).await? {
            return Err(ContainerError::ImagePull {
                image: image.to_string(),
                message: "image not present after pull".to_string(),
            });
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, ContainerError> {
        let options = Some(BollardCreateContainerOptionsQuery {
            name: Some(spec.name.clone()),
            ..Default::default()
        });

        let binds: Vec<String> = spec.binds.iter().map(|b| b.to_bind_string()).collect();
        let config = ContainerCreateBody {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            working_dir: Some(spec.working_dir.clone()),
            host_config: Some(HostConfig {
                binds: if binds.is_empty() { None } else { Some(binds) },
                security_opt: if spec.security_opts.is_empty() {
                    None
                } else {
                    Some(spec.security_opts.clone())
                },
                ..Default::default()
            }),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let container = self.docker.create_container(options, config).await?;
        for warning in &container.warnings {
            log::warn!("Docker warning for container {}: {}", spec.name, warning);
        }

        Ok(ContainerHandle {
            id: container.id,
            name: spec.name.clone(),
        })
    }

    async fn start_container(&self, handle: &ContainerHandle) -> Result<(), ContainerError> {
        self.docker
            .start_container(&handle.id, None::<BollardStartContainerOptionsQuery>)
            .await?;
        Ok(())
    }

    async fn wait_container(
        &self,
        handle: &ContainerHandle,
        timeout: Duration,
    ) -> Result<i64, ContainerError> {
        let mut wait_stream = self
            .docker
            .wait_container(&handle.id, None::<BollardWaitContainerOptionsQuery>);

        let wait_outcome = tokio::time::timeout(timeout, wait_stream.next())
            .await
            .map_err(|_| ContainerError::Timeout(timeout))?;

        match wait_outcome {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit status as an error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(ContainerError::BollardError(e)),
            None => Err(ContainerError::WaitStreamEnded),
        }
    }

    async fn stop_container(&self, handle: &ContainerHandle, grace: Duration) -> Result<(), ContainerError> {
        let options = BollardStopContainerOptionsQuery {
            t: Some(i32::try_from(grace.as_secs()).unwrap_or(i32::MAX)),
            ..Default::default()
        };
        self.docker.stop_container(&handle.id, Some(options)).await?;
        Ok(())
    }

    async fn container_logs(&self, handle: &ContainerHandle) -> Result<Vec<u8>, ContainerError> {
        let mut output_stream = self.docker.logs(
            &handle.id,
            Some(BollardLogsOptionsQuery {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut output = Vec::new();
        while let Some(log_result) = output_stream.next().await {
            match log_result? {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => output.extend_from_slice(&message),
                _ => {}
            }
        }
        Ok(output)
    }

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), ContainerError> {
        let options = BollardRemoveContainerOptionsQuery {
            force: true,
            ..Default::default()
        };
        self.docker.remove_container(&handle.id, Some(options)).await?;
        Ok(())
    }
}
