use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::driver::{self, OperationSlot, TerminalNotices};
use super::stack::{ContainerSpec, MonitoringStack};
use super::{CancelToken, DeployEvent, Operation, Outcome};
use crate::config::Timings;
use crate::docker::{ContainerRun, ContainerRuntime};
use crate::frontend::FrontEnd;
use crate::network::NetworkManager;

/// Runs one monitoring operation to completion on its own task, emitting
/// progress and status events and exactly one terminal outcome. Every fault
/// inside the operation is absorbed here; a cancelled run emits nothing.
pub struct MonitoringWorker {
    runtime: Arc<dyn ContainerRuntime>,
    stack: Arc<MonitoringStack>,
    timings: Timings,
    events: mpsc::UnboundedSender<DeployEvent>,
    cancel: CancelToken,
}

impl MonitoringWorker {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        stack: Arc<MonitoringStack>,
        timings: Timings,
        events: mpsc::UnboundedSender<DeployEvent>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            runtime,
            stack,
            timings,
            events,
            cancel,
        }
    }

    pub async fn run(self, operation: Operation) {
        let result = match operation {
            Operation::Deploy => self.deploy().await,
            Operation::Stop => self.stop().await,
            Operation::Cleanup => self.cleanup().await,
        };

        match result {
            Ok(Some(outcome)) => {
                let _ = self.events.send(DeployEvent::Finished(outcome));
            }
            Ok(None) => debug!("Monitoring {:?} cancelled before completion", operation),
            Err(e) => {
                let message = match operation {
                    Operation::Deploy => format!("Deployment failed: {e:#}"),
                    Operation::Stop => format!("{e:#}"),
                    Operation::Cleanup => format!("Cleanup failed: {e:#}"),
                };
                let _ = self
                    .events
                    .send(DeployEvent::Finished(Outcome::failure(message)));
            }
        }
    }

    fn progress(&self, percent: u8) {
        let _ = self.events.send(DeployEvent::Progress(percent));
    }

    fn status(&self, text: &str) {
        let _ = self.events.send(DeployEvent::Status(text.to_string()));
    }

    /// `Ok(None)` means the run observed cancellation and must emit nothing.
    async fn deploy(&self) -> Result<Option<Outcome>> {
        self.status("Starting monitoring deployment...");
        self.progress(10);

        // specs is never empty for the fixed table, but it is a public field.
        let step = (80 / self.stack.specs.len().max(1)) as u8;
        let mut current: u8 = 10;

        for spec in &self.stack.specs {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let full_name = self.stack.full_name(&spec.role);
            self.progress(current);
            self.status(&format!("Checking if {} container exists...", spec.role));

            if self.runtime.container_exists(&full_name).await {
                self.status(&format!("Stopping existing {} container...", spec.role));
                self.runtime.stop_container(&full_name).await?;
            }

            if !self.runtime.image_exists(&spec.image).await {
                self.status(&format!("Pulling image {}...", spec.image));
                self.runtime.pull_image(&spec.image).await?;
            }

            let run = build_run(spec, &full_name, &self.stack.network);
            self.status(&format!("Deploying {}...", spec.role));
            self.runtime.run_container(&run).await?;
            current += step;
        }

        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        self.status("Waiting for containers to be ready...");
        self.progress(90);
        tokio::time::sleep(self.timings.deploy_settle).await;

        // Individual containers failing to come up is not fatal; the outcome
        // message enumerates them.
        let mut failed = Vec::new();
        for spec in &self.stack.specs {
            let full_name = self.stack.full_name(&spec.role);
            let running = self
                .runtime
                .is_container_running(&full_name)
                .await
                .unwrap_or(false);
            if !running {
                failed.push(spec.role.clone());
            }
        }
        if !failed.is_empty() {
            warn!("Some containers failed to start: {:?}", failed);
        }

        self.progress(100);
        Ok(Some(Outcome::success(deploy_message(&failed))))
    }

    async fn stop(&self) -> Result<Option<Outcome>> {
        let step = (80 / self.stack.specs.len().max(1)) as u8;
        let mut current: u8 = 10;

        for spec in &self.stack.specs {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            current += step;
            self.status(&format!("Stopping {}...", spec.role));
            self.progress(current);

            let full_name = self.stack.full_name(&spec.role);
            if self.runtime.container_exists(&full_name).await {
                self.runtime.stop_container(&full_name).await?;
            }
        }

        self.progress(100);
        Ok(Some(Outcome::success(
            "All monitoring containers stopped successfully.",
        )))
    }

    // Cleanup deliberately performs the same container-stop traversal as
    // stop; no volume or image removal is implied.
    async fn cleanup(&self) -> Result<Option<Outcome>> {
        self.status("Cleaning up monitoring containers...");

        for spec in &self.stack.specs {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            self.status(&format!("Removing {}...", spec.role));

            let full_name = self.stack.full_name(&spec.role);
            if self.runtime.container_exists(&full_name).await {
                self.runtime.stop_container(&full_name).await?;
            }
        }

        self.progress(100);
        Ok(Some(Outcome::success("Monitoring stack completely removed")))
    }
}

fn build_run(spec: &ContainerSpec, full_name: &str, network: &str) -> ContainerRun {
    let mut run = ContainerRun::new(spec.image.as_str(), full_name);
    run.set_network(network);

    for port in &spec.ports {
        run.add_port(port.as_str());
    }
    for volume in &spec.volumes {
        run.add_volume(volume.as_str());
    }
    for env in &spec.env {
        run.add_env(env.as_str());
    }
    if spec.privileged {
        run.add_extra_flag("--privileged");
    }
    if let Some(mode) = &spec.pid_mode {
        run.add_extra_flag(format!("--pid={mode}"));
    }

    // node-exporter's entrypoint expects its extra arguments itself; for
    // every other role they are docker run flags.
    if spec.role == "node-exporter" {
        for arg in &spec.extra_args {
            run.add_command_arg(arg.as_str());
        }
    } else {
        for arg in &spec.extra_args {
            run.add_extra_flag(arg.as_str());
        }
    }

    run
}

fn deploy_message(failed: &[String]) -> String {
    let failed_list = if failed.is_empty() {
        "None".to_string()
    } else {
        failed.join(", ")
    };

    format!(
        "Monitoring stack deployed successfully!\n\n\
         Access URLs:\n\
         - Grafana: http://localhost:3000 (admin/admin)\n\
         - Prometheus: http://localhost:9090\n\
         - Alertmanager: http://localhost:9093\n\
         - cAdvisor: http://localhost:8080\n\
         - Node Exporter: http://localhost:9100/metrics\n\
         - Blackbox Exporter: http://localhost:9115\n\n\
         Failed containers: {failed_list}"
    )
}

/// Mediates between the front-end and the monitoring worker: precondition
/// checks, confirmations, single-flight enforcement, progress surface and
/// terminal notices.
pub struct MonitoringManager {
    runtime: Arc<dyn ContainerRuntime>,
    frontend: Arc<dyn FrontEnd>,
    network: Option<Arc<NetworkManager>>,
    stack: Arc<MonitoringStack>,
    timings: Timings,
    slot: OperationSlot,
}

impl MonitoringManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        frontend: Arc<dyn FrontEnd>,
        network: Option<Arc<NetworkManager>>,
        stack: MonitoringStack,
        timings: Timings,
    ) -> Self {
        Self {
            runtime,
            frontend,
            network,
            stack: Arc::new(stack),
            timings,
            slot: OperationSlot::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    /// Cancel the in-flight operation, if any. Cooperative; the driver
    /// aborts the worker after the grace period.
    pub fn request_cancel(&self) {
        self.slot.request_cancel();
    }

    pub async fn deploy_monitoring(&self) {
        if !driver::check_docker_available(&self.runtime, &self.frontend).await {
            return;
        }

        if let Some(network) = &self.network {
            if !network.prompt_create_network().await {
                self.frontend
                    .set_status("Monitoring deployment cancelled - netflux5g network required");
                return;
            }
        } else {
            warn!("Docker network manager not available, proceeding without network check");
        }

        let running = self.running_monitoring_containers().await;
        if !running.is_empty() {
            let confirmed = self.frontend.confirm(
                "Monitoring Already Running",
                &format!(
                    "Some monitoring containers are already running:\n{}\n\n\
                     Do you want to restart the monitoring stack?",
                    running.join(", ")
                ),
                false,
            );
            if !confirmed {
                return;
            }
        }

        let confirmed = self.frontend.confirm(
            "Deploy Monitoring Stack",
            "This will deploy the monitoring stack:\n\n\
             Services to be deployed:\n\
             - Prometheus (metrics collection) - port 9090\n\
             - Grafana (visualization) - port 3000\n\
             - Node Exporter (system metrics) - port 9100\n\
             - cAdvisor (container metrics) - port 8080\n\
             - Blackbox Exporter (network probing) - port 9115\n\
             - Alertmanager (alert handling) - port 9093\n\n\
             Access URLs after deployment:\n\
             - Grafana: http://localhost:3000 (admin/admin)\n\
             - Prometheus: http://localhost:9090\n\
             - Alertmanager: http://localhost:9093\n\n\
             Do you want to continue?",
            true,
        );
        if !confirmed {
            return;
        }

        self.start_operation(Operation::Deploy).await;
    }

    pub async fn stop_monitoring(&self) {
        debug!("Stop Monitoring triggered");

        if !driver::check_docker_available(&self.runtime, &self.frontend).await {
            return;
        }

        let existing = self.existing_monitoring_containers().await;
        if existing.is_empty() {
            self.frontend.notify_info(
                "No Monitoring Containers",
                &format!(
                    "No monitoring containers found with prefix '{}'.",
                    self.stack.prefix
                ),
            );
            return;
        }

        let confirmed = self.frontend.confirm(
            "Stop Monitoring Stack",
            &format!(
                "This will stop all monitoring containers:\n\n\
                 Found containers: {}\n\n\
                 The containers will be stopped but no data will be lost.\n\
                 You can restart them later with 'Deploy Monitoring'.\n\n\
                 Are you sure you want to continue?",
                existing.join(", ")
            ),
            false,
        );
        if !confirmed {
            return;
        }

        self.start_operation(Operation::Stop).await;
    }

    pub async fn cleanup_monitoring(&self) {
        if !driver::check_docker_available(&self.runtime, &self.frontend).await {
            return;
        }

        let existing = self.existing_monitoring_containers().await;
        if existing.is_empty() {
            self.frontend.notify_info(
                "No Monitoring Containers",
                &format!(
                    "No monitoring containers found with prefix '{}'.",
                    self.stack.prefix
                ),
            );
            return;
        }

        let confirmed = self.frontend.confirm(
            "Remove Monitoring Stack",
            &format!(
                "This will stop and remove all monitoring containers:\n\n\
                 Found containers: {}\n\n\
                 Are you sure you want to continue?",
                existing.join(", ")
            ),
            false,
        );
        if !confirmed {
            return;
        }

        self.start_operation(Operation::Cleanup).await;
    }

    async fn running_monitoring_containers(&self) -> Vec<String> {
        let mut running = Vec::new();
        for spec in &self.stack.specs {
            let full_name = self.stack.full_name(&spec.role);
            if self
                .runtime
                .is_container_running(&full_name)
                .await
                .unwrap_or(false)
            {
                running.push(spec.role.clone());
            }
        }
        running
    }

    async fn existing_monitoring_containers(&self) -> Vec<String> {
        let mut existing = Vec::new();
        for spec in &self.stack.specs {
            let full_name = self.stack.full_name(&spec.role);
            if self.runtime.container_exists(&full_name).await {
                existing.push(spec.role.clone());
            }
        }
        existing
    }

    async fn start_operation(&self, operation: Operation) {
        let notices = TerminalNotices {
            success_title: "Monitoring Operation Complete",
            failure_title: "Monitoring Operation Failed",
            cancel_title: "Cancelled",
            cancel_text: "Monitoring operation was cancelled",
            success_status: None,
            failure_status: None,
            cancel_status: None,
        };

        let runtime = self.runtime.clone();
        let stack = self.stack.clone();
        let timings = self.timings;

        driver::run_to_completion(
            &self.slot,
            &self.frontend,
            "Monitoring Operation",
            "Monitoring operation in progress...",
            timings.cancel_grace,
            "A monitoring operation is already in progress.",
            &notices,
            move |events, cancel| {
                tokio::spawn(
                    MonitoringWorker::new(runtime, stack, timings, events, cancel).run(operation),
                )
            },
        )
        .await;
    }
}
