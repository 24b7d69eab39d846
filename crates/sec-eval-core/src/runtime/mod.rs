//! Container lifecycle abstraction used by the step runner.
//!
//! The runner only needs a narrow slice of a container engine: image
//! presence and pull, then create/start/wait/stop/logs/remove for a single
//! container. `DockerRuntime` implements it against the local Docker daemon;
//! tests provide in-memory fakes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ContainerError;

pub mod docker;

pub use docker::DockerRuntime;

/// Opaque reference to a created container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// Host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

impl VolumeBind {
    /// `host:container:mode` as understood by the Docker `Binds` field.
    pub fn to_bind_string(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_path.display(),
            self.container_path,
            if self.read_only { "ro" } else { "rw" }
        )
    }
}

/// Everything needed to create one evaluation container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub working_dir: String,
    pub security_opts: Vec<String>,
    pub binds: Vec<VolumeBind>,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError>;

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError>;

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, ContainerError>;

    async fn start_container(&self, handle: &ContainerHandle) -> Result<(), ContainerError>;

    /// Waits for the container to exit and returns its status code.
    /// Must return `ContainerError::Timeout` once `timeout` elapses.
    async fn wait_container(
        &self,
        handle: &ContainerHandle,
        timeout: Duration,
    ) -> Result<i64, ContainerError>;

    async fn stop_container(&self, handle: &ContainerHandle, grace: Duration) -> Result<(), ContainerError>;

    /// Combined stdout and stderr, in arrival order.
    async fn container_logs(&self, handle: &ContainerHandle) -> Result<Vec<u8>, ContainerError>;

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), ContainerError>;
}
