use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use super::ContainerRun;

/// The container-engine surface the deployment workers depend on. Kept as a
/// trait so managers and workers can run against a fake engine in tests.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Cheap availability probe against the daemon.
    async fn ping(&self) -> Result<()>;

    async fn container_exists(&self, name: &str) -> bool;

    async fn is_container_running(&self, name: &str) -> Result<bool>;

    async fn image_exists(&self, image: &str) -> bool;

    async fn network_exists(&self, name: &str) -> bool;

    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Build `image` from the Dockerfile in `context`.
    async fn build_image(&self, image: &str, context: &Path) -> Result<()>;

    /// Stop a container and remove it. Stopping a managed container always
    /// implies removal so a later deploy can recreate it under the same name.
    async fn stop_container(&self, name: &str) -> Result<()>;

    async fn create_network(&self, name: &str) -> Result<()>;

    async fn remove_network(&self, name: &str) -> Result<()>;

    async fn container_logs(&self, name: &str, tail: Option<usize>) -> Result<String>;

    /// Create and start the container described by `run`.
    async fn run_container(&self, run: &ContainerRun) -> Result<()>;
}
