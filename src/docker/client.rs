use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::{BuildImageOptions, CreateImageOptions};
use bollard::models::{
    ContainerStateStatusEnum, HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::run::{parse_port_mapping, RunSpecError};
use super::{ContainerRun, ContainerRuntime};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerConfig {
    pub socket_path: Option<String>,
}

pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Build a client against the configured socket. The connection is lazy;
    /// `ping` is the availability check the managers run before any work.
    pub fn connect(config: DockerConfig) -> Result<Self> {
        let docker = if let Some(socket) = config.socket_path {
            Docker::connect_with_socket(&socket, 120, API_DEFAULT_VERSION)?
        } else {
            Docker::connect_with_socket_defaults()?
        };

        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .context("Docker daemon is not reachable")?;
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> bool {
        self.docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .is_ok()
    }

    async fn is_container_running(&self, name: &str) -> Result<bool> {
        let info = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .context("Failed to inspect container")?;

        Ok(info
            .state
            .and_then(|s| s.status)
            .map(|s| s == ContainerStateStatusEnum::RUNNING)
            .unwrap_or(false))
    }

    async fn image_exists(&self, image: &str) -> bool {
        self.docker.inspect_image(image).await.is_ok()
    }

    async fn network_exists(&self, name: &str) -> bool {
        self.docker
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
            .is_ok()
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!("Pulling Docker image: {}", image);

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(update) = stream.next().await {
            match update {
                Ok(update) => {
                    if let Some(status) = update.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => {
                    error!("Error pulling image {}: {}", image, e);
                    return Err(anyhow::anyhow!("Failed to pull image {}: {}", image, e));
                }
            }
        }

        info!("Successfully pulled image: {}", image);
        Ok(())
    }

    async fn build_image(&self, image: &str, context: &Path) -> Result<()> {
        info!("Building image {} from {:?}", image, context);

        let context_dir = context.to_path_buf();
        let tarball = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let mut builder = tar::Builder::new(Vec::new());
            builder
                .append_dir_all(".", &context_dir)
                .context("Failed to archive build context")?;
            Ok(builder.into_inner()?)
        })
        .await??;

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: image.to_string(),
            rm: true,
            ..Default::default()
        };

        let body = bollard::body_full(bytes::Bytes::from(tarball));
        let mut stream = self.docker.build_image(options, None, Some(body));

        while let Some(update) = stream.next().await {
            let update = update.context("Failed to build image")?;
            if let Some(message) = update.error {
                return Err(anyhow::anyhow!("Image build failed: {}", message));
            }
            if let Some(line) = update.stream {
                debug!("Build: {}", line.trim_end());
            }
        }

        info!("Successfully built image: {}", image);
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        if self.is_container_running(name).await.unwrap_or(false) {
            self.docker
                .stop_container(name, Some(StopContainerOptions { t: 10 }))
                .await
                .context("Failed to stop container")?;
        }

        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .context("Failed to remove container")?;

        info!("Stopped and removed container: {}", name);
        Ok(())
    }

    async fn create_network(&self, name: &str) -> Result<()> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: "bridge".to_string(),
            check_duplicate: true,
            ..Default::default()
        };

        self.docker
            .create_network(options)
            .await
            .with_context(|| format!("Failed to create network '{name}'"))?;

        info!("Created Docker network: {}", name);
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        self.docker
            .remove_network(name)
            .await
            .with_context(|| format!("Failed to remove network '{name}'"))?;

        info!("Removed Docker network: {}", name);
        Ok(())
    }

    async fn container_logs(&self, name: &str, tail: Option<usize>) -> Result<String> {
        let options = LogsOptions {
            stdout: true,
            stderr: true,
            tail: tail.map(|t| t.to_string()).unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));
        let mut logs = String::new();

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(msg) => logs.push_str(&msg.to_string()),
                Err(e) => warn!("Error reading logs: {}", e),
            }
        }

        Ok(logs)
    }

    async fn run_container(&self, run: &ContainerRun) -> Result<()> {
        let config = container_config(run)?;

        let options = CreateContainerOptions {
            name: run.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .context("Failed to create container")?;

        self.docker
            .start_container(&response.id, None::<StartContainerOptions<String>>)
            .await
            .context("Failed to start container")?;

        info!("Started container {} with ID: {}", run.name, response.id);
        Ok(())
    }
}

/// Translate a [`ContainerRun`] into the bollard container configuration.
/// `--privileged` and `--pid=<mode>` extra flags fold into the host config;
/// any other flag has no engine-API equivalent and is dropped with a warning.
pub(crate) fn container_config(run: &ContainerRun) -> Result<Config<String>, RunSpecError> {
    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();

    for mapping in &run.ports {
        let (host, container) = parse_port_mapping(mapping)?;
        let key = format!("{container}/tcp");
        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings.insert(
            key,
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(host),
            }]),
        );
    }

    let mut privileged = run.privileged;
    let mut pid_mode = run.pid_mode.clone();
    for flag in &run.extra_flags {
        if flag == "--privileged" {
            privileged = true;
        } else if let Some(mode) = flag.strip_prefix("--pid=") {
            pid_mode = Some(mode.to_string());
        } else {
            warn!("Ignoring unsupported runtime flag '{}'", flag);
        }
    }

    let restart_policy = match run.restart_policy.as_deref() {
        None => None,
        Some(policy) => Some(RestartPolicy {
            name: Some(restart_policy_name(policy)?),
            maximum_retry_count: None,
        }),
    };

    let host_config = HostConfig {
        binds: (!run.volumes.is_empty()).then(|| run.volumes.clone()),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        network_mode: run.network.clone(),
        privileged: privileged.then_some(true),
        pid_mode,
        restart_policy,
        ..Default::default()
    };

    Ok(Config {
        image: Some(run.image.clone()),
        env: (!run.env.is_empty()).then(|| run.env.clone()),
        cmd: (!run.command.is_empty()).then(|| run.command.clone()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        ..Default::default()
    })
}

fn restart_policy_name(policy: &str) -> Result<RestartPolicyNameEnum, RunSpecError> {
    match policy {
        "no" => Ok(RestartPolicyNameEnum::NO),
        "always" => Ok(RestartPolicyNameEnum::ALWAYS),
        "on-failure" => Ok(RestartPolicyNameEnum::ON_FAILURE),
        "unless-stopped" => Ok(RestartPolicyNameEnum::UNLESS_STOPPED),
        other => Err(RunSpecError::UnknownRestartPolicy(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_translates_ports_env_and_network() {
        let mut run = ContainerRun::new("grafana/grafana", "netflux5g-grafana");
        run.set_network("netflux5g")
            .add_port("3000:3000")
            .add_env("DS_PROMETHEUS=prometheus");

        let config = container_config(&run).unwrap();
        assert_eq!(config.image.as_deref(), Some("grafana/grafana"));
        assert_eq!(
            config.env,
            Some(vec!["DS_PROMETHEUS=prometheus".to_string()])
        );
        assert!(config.exposed_ports.unwrap().contains_key("3000/tcp"));

        let host = config.host_config.unwrap();
        assert_eq!(host.network_mode.as_deref(), Some("netflux5g"));
        let bindings = host.port_bindings.unwrap();
        let binding = bindings["3000/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_port.as_deref(), Some("3000"));
    }

    #[test]
    fn privileged_and_pid_flags_fold_into_host_config() {
        let mut run = ContainerRun::new("img", "c");
        run.add_extra_flag("--privileged").add_extra_flag("--pid=host");

        let host = container_config(&run).unwrap().host_config.unwrap();
        assert_eq!(host.privileged, Some(true));
        assert_eq!(host.pid_mode.as_deref(), Some("host"));
    }

    #[test]
    fn restart_policy_maps_unless_stopped() {
        let mut run = ContainerRun::new("img", "c");
        run.set_restart_policy("unless-stopped");

        let host = container_config(&run).unwrap().host_config.unwrap();
        assert_eq!(
            host.restart_policy.unwrap().name,
            Some(RestartPolicyNameEnum::UNLESS_STOPPED)
        );
    }

    #[test]
    fn unknown_restart_policy_is_an_error() {
        let mut run = ContainerRun::new("img", "c");
        run.set_restart_policy("sometimes");
        assert!(container_config(&run).is_err());
    }

    #[test]
    fn command_args_land_in_cmd_not_flags() {
        let mut run = ContainerRun::new("prom/node-exporter:latest", "netflux5g-node-exporter");
        run.add_command_arg("--path.rootfs=/host");

        let config = container_config(&run).unwrap();
        assert_eq!(config.cmd, Some(vec!["--path.rootfs=/host".to_string()]));
    }

    #[test]
    fn volumes_become_binds_verbatim() {
        let mut run = ContainerRun::new("img", "c");
        run.add_volume("/:/host:ro,rslave");

        let host = container_config(&run).unwrap().host_config.unwrap();
        assert_eq!(host.binds, Some(vec!["/:/host:ro,rslave".to_string()]));
    }
}
