use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::driver::{self, OperationSlot, TerminalNotices};
use super::stack::{NETWORK_NAME, WEBSHARK_CONTAINER, WEBSHARK_IMAGE, WEBSHARK_PORT};
use super::{CancelToken, DeployEvent, Operation, Outcome};
use crate::config::{DeployConfig, Timings};
use crate::docker::{ContainerRun, ContainerRuntime};
use crate::frontend::FrontEnd;
use crate::network::NetworkManager;

/// Runs one webshark operation on its own task. The packet analyzer is a
/// single container, so deployment is build-or-reuse, replace, run, verify.
pub struct PacketAnalyzerWorker {
    runtime: Arc<dyn ContainerRuntime>,
    timings: Timings,
    events: mpsc::UnboundedSender<DeployEvent>,
    cancel: CancelToken,
    container_name: String,
    network: String,
    webshark_dir: Option<PathBuf>,
    captures_path: Option<PathBuf>,
}

impl PacketAnalyzerWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        timings: Timings,
        events: mpsc::UnboundedSender<DeployEvent>,
        cancel: CancelToken,
        webshark_dir: Option<PathBuf>,
        captures_path: Option<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            timings,
            events,
            cancel,
            container_name: WEBSHARK_CONTAINER.to_string(),
            network: NETWORK_NAME.to_string(),
            webshark_dir,
            captures_path,
        }
    }

    pub async fn run(self, operation: Operation) {
        let result = match operation {
            Operation::Deploy => self.deploy().await,
            // The analyzer has no separate cleanup; removal is implied by stop.
            Operation::Stop | Operation::Cleanup => self.stop().await,
        };

        match result {
            Ok(Some(outcome)) => {
                let _ = self.events.send(DeployEvent::Finished(outcome));
            }
            Ok(None) => debug!("Webshark {:?} cancelled before completion", operation),
            Err(e) => {
                let _ = self
                    .events
                    .send(DeployEvent::Finished(Outcome::failure(format!("{e:#}"))));
            }
        }
    }

    fn progress(&self, percent: u8) {
        let _ = self.events.send(DeployEvent::Progress(percent));
    }

    fn status(&self, text: &str) {
        let _ = self.events.send(DeployEvent::Status(text.to_string()));
    }

    async fn deploy(&self) -> Result<Option<Outcome>> {
        self.status("Checking if Webshark image exists...");
        self.progress(10);

        if !self.runtime.image_exists(WEBSHARK_IMAGE).await {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            let context = self
                .webshark_dir
                .as_ref()
                .ok_or_else(|| anyhow!("Webshark directory not found"))?;
            self.status("Building Webshark image (this may take a few minutes)...");
            self.progress(20);
            self.runtime.build_image(WEBSHARK_IMAGE, context).await?;
        }

        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        if self.runtime.container_exists(&self.container_name).await {
            self.status("Removing existing container...");
            self.progress(30);
            self.runtime.stop_container(&self.container_name).await?;
        }

        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let run = self.build_run();
        self.status("Deploying Webshark container...");
        self.progress(50);
        if let Err(e) = self.runtime.run_container(&run).await {
            return Ok(Some(Outcome::failure(format!(
                "Failed to deploy container: {e:#}"
            ))));
        }

        self.status("Verifying container is running...");
        self.progress(90);
        tokio::time::sleep(self.timings.verify_settle).await;

        let running = self
            .runtime
            .is_container_running(&self.container_name)
            .await
            .unwrap_or(false);
        if running {
            self.progress(100);
            return Ok(Some(Outcome::success(format!(
                "Webshark container '{}' deployed successfully.\n\
                 Access at: http://localhost:8085/webshark/",
                self.container_name
            ))));
        }

        // Surface the tail of the container logs in the failure message so
        // the user does not have to reach for the docker CLI.
        let outcome = match self.runtime.container_logs(&self.container_name, Some(50)).await {
            Ok(logs) => {
                let tail: String = logs.chars().take(500).collect();
                Outcome::failure(format!(
                    "Container started but is not running properly.\nLogs: {tail}..."
                ))
            }
            Err(_) => Outcome::failure(
                "Container started but is not running properly. Check Docker logs manually.",
            ),
        };
        Ok(Some(outcome))
    }

    async fn stop(&self) -> Result<Option<Outcome>> {
        self.status("Stopping Webshark container...");
        self.progress(10);

        let running = self
            .runtime
            .is_container_running(&self.container_name)
            .await
            .unwrap_or(false);
        if !running {
            self.progress(100);
            return Ok(Some(Outcome::success("Webshark container is not running.")));
        }

        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        self.progress(50);
        self.runtime.stop_container(&self.container_name).await?;

        self.status("Verifying container is stopped...");
        self.progress(90);
        tokio::time::sleep(self.timings.stop_settle).await;

        self.progress(100);
        Ok(Some(Outcome::success(format!(
            "Webshark container '{}' stopped successfully.",
            self.container_name
        ))))
    }

    fn build_run(&self) -> ContainerRun {
        let mut run = ContainerRun::new(WEBSHARK_IMAGE, self.container_name.as_str());
        run.set_network(self.network.as_str());
        run.add_port(WEBSHARK_PORT);

        match &self.captures_path {
            Some(path) if path.exists() => {
                let mount = format!("{}:/captures", path.display());
                debug!("Mounting captures directory: {mount}");
                run.add_volume(mount);
            }
            _ => {
                warn!("Captures path not found, container will use internal directory");
            }
        }

        run.add_env("SHARKD_SOCKET=/captures/sharkd.sock");
        run.add_env("CAPTURES_PATH=/captures/");
        run.set_restart_policy("unless-stopped");
        run
    }
}

/// Mediates between the front-end and the webshark worker.
pub struct PacketAnalyzerManager {
    runtime: Arc<dyn ContainerRuntime>,
    frontend: Arc<dyn FrontEnd>,
    network: Option<Arc<NetworkManager>>,
    config: DeployConfig,
    slot: OperationSlot,
}

impl PacketAnalyzerManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        frontend: Arc<dyn FrontEnd>,
        network: Option<Arc<NetworkManager>>,
        config: DeployConfig,
    ) -> Self {
        Self {
            runtime,
            frontend,
            network,
            config,
            slot: OperationSlot::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    pub fn request_cancel(&self) {
        self.slot.request_cancel();
    }

    pub async fn deploy_webshark(&self) {
        if self.slot.is_running() {
            self.frontend.notify_warning(
                "Operation in Progress",
                "Another deployment operation is already in progress. Please wait for it to complete.",
            );
            return;
        }

        let running = self
            .runtime
            .is_container_running(WEBSHARK_CONTAINER)
            .await
            .unwrap_or(false);
        if running {
            self.frontend.notify_info(
                "Webshark Running",
                "Webshark packet analyzer is already running on port 8085",
            );
            return;
        }

        let captures_path = match self.config.captures_dir() {
            Some(path) => path,
            None => {
                self.frontend.notify_warning(
                    "Configuration Error",
                    "Could not find webshark captures directory",
                );
                return;
            }
        };

        if !driver::check_docker_available(&self.runtime, &self.frontend).await {
            return;
        }

        if let Some(network) = &self.network {
            if !network.prompt_create_network().await {
                self.frontend
                    .set_status("Webshark deployment cancelled - netflux5g network required");
                return;
            }
        }

        self.start_operation(Operation::Deploy, Some(captures_path))
            .await;
    }

    /// Prompt-free deployment for automation and scripting: no dialogs, no
    /// progress surface, no single-flight slot. Returns whether the
    /// container is running afterwards.
    pub async fn deploy_webshark_sync(&self) -> bool {
        debug!("Starting synchronous Webshark deployment");

        let captures_path = match self.config.captures_dir() {
            Some(path) => path,
            None => {
                error!("Could not find webshark captures directory");
                return false;
            }
        };

        let (events, mut receiver) = mpsc::unbounded_channel();
        let worker = PacketAnalyzerWorker::new(
            self.runtime.clone(),
            self.config.timings,
            events,
            CancelToken::new(),
            self.config.webshark_dir(),
            Some(captures_path),
        );
        worker.run(Operation::Deploy).await;

        while let Some(event) = receiver.recv().await {
            if let DeployEvent::Finished(outcome) = event {
                if !outcome.success {
                    error!("Failed to deploy Webshark: {}", outcome.message);
                }
                return outcome.success;
            }
        }
        false
    }

    pub async fn stop_webshark(&self) {
        if self.slot.is_running() {
            self.frontend.notify_warning(
                "Operation in Progress",
                "Another deployment operation is already in progress. Please wait for it to complete.",
            );
            return;
        }

        let running = self
            .runtime
            .is_container_running(WEBSHARK_CONTAINER)
            .await
            .unwrap_or(false);
        if !running {
            self.frontend.notify_info(
                "Webshark Not Running",
                "Webshark packet analyzer is not currently running",
            );
            return;
        }

        let confirmed = self.frontend.confirm(
            "Stop Webshark",
            "Are you sure you want to stop the Webshark packet analyzer?",
            false,
        );
        if !confirmed {
            return;
        }

        self.start_operation(Operation::Stop, None).await;
    }

    async fn start_operation(&self, operation: Operation, captures_path: Option<PathBuf>) {
        let notices = TerminalNotices {
            success_title: "Success",
            failure_title: "Webshark Operation Failed",
            cancel_title: "Cancelled",
            cancel_text: "Webshark operation was cancelled",
            success_status: Some("Webshark deployment completed"),
            failure_status: Some("Webshark operation failed"),
            cancel_status: Some("Webshark operation cancelled"),
        };

        let runtime = self.runtime.clone();
        let timings = self.config.timings;
        let webshark_dir = self.config.webshark_dir();

        driver::run_to_completion(
            &self.slot,
            &self.frontend,
            "Webshark Operation",
            "Webshark operation in progress...",
            timings.cancel_grace,
            "Another deployment operation is already in progress. Please wait for it to complete.",
            &notices,
            move |events, cancel| {
                tokio::spawn(
                    PacketAnalyzerWorker::new(
                        runtime,
                        timings,
                        events,
                        cancel,
                        webshark_dir,
                        captures_path,
                    )
                    .run(operation),
                )
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use tokio::sync::mpsc;

    struct NullRuntime;

    #[async_trait]
    impl ContainerRuntime for NullRuntime {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        async fn container_exists(&self, _name: &str) -> bool {
            false
        }
        async fn is_container_running(&self, _name: &str) -> Result<bool> {
            Ok(false)
        }
        async fn image_exists(&self, _image: &str) -> bool {
            false
        }
        async fn network_exists(&self, _name: &str) -> bool {
            false
        }
        async fn pull_image(&self, _image: &str) -> Result<()> {
            Ok(())
        }
        async fn build_image(&self, _image: &str, _context: &Path) -> Result<()> {
            Ok(())
        }
        async fn stop_container(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn create_network(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn remove_network(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn container_logs(&self, _name: &str, _tail: Option<usize>) -> Result<String> {
            Ok(String::new())
        }
        async fn run_container(&self, _run: &ContainerRun) -> Result<()> {
            Ok(())
        }
    }

    fn worker(captures: Option<PathBuf>) -> PacketAnalyzerWorker {
        let (events, _receiver) = mpsc::unbounded_channel();
        PacketAnalyzerWorker::new(
            Arc::new(NullRuntime),
            Timings::none(),
            events,
            CancelToken::new(),
            None,
            captures,
        )
    }

    #[test]
    fn run_spec_carries_fixed_env_and_port() {
        let run = worker(None).build_run();
        assert_eq!(run.image, WEBSHARK_IMAGE);
        assert_eq!(run.name, WEBSHARK_CONTAINER);
        assert_eq!(run.network.as_deref(), Some(NETWORK_NAME));
        assert_eq!(run.ports, vec!["8085:8085"]);
        assert_eq!(
            run.env,
            vec!["SHARKD_SOCKET=/captures/sharkd.sock", "CAPTURES_PATH=/captures/"]
        );
        assert_eq!(run.restart_policy.as_deref(), Some("unless-stopped"));
    }

    #[test]
    fn missing_captures_path_skips_the_mount() {
        let run = worker(Some(PathBuf::from("/nonexistent/captures"))).build_run();
        assert!(run.volumes.is_empty());
    }

    #[test]
    fn existing_captures_path_is_mounted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let run = worker(Some(tmp.path().to_path_buf())).build_run();
        assert_eq!(run.volumes, vec![format!("{}:/captures", tmp.path().display())]);
    }
}
