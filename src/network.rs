use std::sync::Arc;
use tracing::{debug, error};

use crate::deploy::NETWORK_NAME;
use crate::docker::ContainerRuntime;
use crate::frontend::FrontEnd;

/// Manager for the shared `netflux5g` Docker network that all managed
/// containers join.
pub struct NetworkManager {
    runtime: Arc<dyn ContainerRuntime>,
    frontend: Arc<dyn FrontEnd>,
}

impl NetworkManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, frontend: Arc<dyn FrontEnd>) -> Self {
        Self { runtime, frontend }
    }

    pub async fn network_exists(&self) -> bool {
        self.runtime.network_exists(NETWORK_NAME).await
    }

    /// Create the shared network if it is missing. No user interaction.
    pub async fn ensure_network(&self) -> anyhow::Result<()> {
        if self.network_exists().await {
            debug!("{} network already exists", NETWORK_NAME);
            return Ok(());
        }

        debug!("Creating {} network for service deployments", NETWORK_NAME);
        self.runtime.create_network(NETWORK_NAME).await
    }

    /// Ask the user to create the shared network when it is missing.
    /// Returns true when the network exists afterwards.
    pub async fn prompt_create_network(&self) -> bool {
        if self.network_exists().await {
            return true;
        }

        let wanted = self.frontend.confirm(
            "NetFlux5G Network Required",
            &format!(
                "The '{NETWORK_NAME}' Docker network is required for deploying services \
                 but does not exist.\n\n\
                 This network is used by:\n\
                 - Monitoring stack (Prometheus, Grafana, etc.)\n\
                 - Webshark packet analyzer\n\n\
                 Do you want to create the '{NETWORK_NAME}' network now?"
            ),
            true,
        );
        if !wanted {
            return false;
        }

        match self.runtime.create_network(NETWORK_NAME).await {
            Ok(()) => {
                self.frontend.notify_info(
                    "Network Created",
                    &format!(
                        "The '{NETWORK_NAME}' Docker network has been created successfully.\n\n\
                         All service containers will now connect to this network."
                    ),
                );
                true
            }
            Err(e) => {
                error!("Failed to create Docker network: {e:#}");
                self.frontend.notify_error(
                    "Network Creation Failed",
                    &format!("Failed to create the '{NETWORK_NAME}' network: {e:#}"),
                );
                false
            }
        }
    }

    /// Interactive creation used by the CLI `network create` subcommand.
    pub async fn create_network(&self) -> bool {
        if self.network_exists().await {
            self.frontend.notify_info(
                "Network Exists",
                &format!(
                    "The Docker network '{NETWORK_NAME}' already exists and is ready for use."
                ),
            );
            return true;
        }

        match self.runtime.create_network(NETWORK_NAME).await {
            Ok(()) => {
                self.frontend.set_status(&format!(
                    "Docker network '{NETWORK_NAME}' created successfully"
                ));
                self.frontend.notify_info(
                    "Network Created",
                    &format!(
                        "The Docker network '{NETWORK_NAME}' has been created successfully.\n\n\
                         Network Type: Bridge\n\
                         Network Name: {NETWORK_NAME}"
                    ),
                );
                true
            }
            Err(e) => {
                self.frontend.notify_error(
                    "Network Creation Failed",
                    &format!("Failed to create Docker network '{NETWORK_NAME}':\n\n{e:#}"),
                );
                false
            }
        }
    }

    /// Interactive deletion used by the CLI `network delete` subcommand.
    pub async fn delete_network(&self) -> bool {
        if !self.network_exists().await {
            self.frontend.notify_info(
                "Network Not Found",
                &format!("The Docker network '{NETWORK_NAME}' does not exist."),
            );
            return true;
        }

        let confirmed = self.frontend.confirm(
            "Confirm Deletion",
            &format!(
                "Are you sure you want to delete the Docker network '{NETWORK_NAME}'?\n\n\
                 This will disconnect all NetFlux5G services currently connected to it.\n\
                 You should stop all services before deleting the network."
            ),
            false,
        );
        if !confirmed {
            self.frontend.set_status("Docker network deletion cancelled");
            return false;
        }

        match self.runtime.remove_network(NETWORK_NAME).await {
            Ok(()) => {
                self.frontend.notify_info(
                    "Network Deleted",
                    &format!(
                        "The Docker network '{NETWORK_NAME}' has been deleted successfully."
                    ),
                );
                true
            }
            Err(e) => {
                self.frontend.notify_error(
                    "Network Deletion Error",
                    &format!("Error deleting Docker network '{NETWORK_NAME}':\n\n{e:#}"),
                );
                false
            }
        }
    }
}
