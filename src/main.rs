use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use netflux5g_deploy::config::DeployConfig;
use netflux5g_deploy::deploy::{MonitoringManager, MonitoringStack, PacketAnalyzerManager};
use netflux5g_deploy::docker::{ContainerRuntime, DockerClient, DockerConfig};
use netflux5g_deploy::frontend::{install_cancel_handler, ConsoleFrontEnd, FrontEnd};
use netflux5g_deploy::logging;
use netflux5g_deploy::network::NetworkManager;

#[derive(Parser)]
#[command(name = "netflux5g-deploy")]
#[command(about = "NetFlux5G deployment manager - monitoring stack and Webshark packet analyzer", long_about = None)]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Docker socket path (defaults to the platform socket)
    #[arg(long, env = "NETFLUX5G_DOCKER_SOCKET", global = true)]
    docker_socket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the monitoring stack (Prometheus, Grafana, exporters)
    Monitoring {
        #[command(subcommand)]
        action: MonitoringAction,
    },

    /// Manage the Webshark packet analyzer container
    Webshark {
        #[command(subcommand)]
        action: WebsharkAction,
    },

    /// Manage the shared netflux5g Docker network
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
}

#[derive(Subcommand)]
enum MonitoringAction {
    /// Deploy the full monitoring stack
    Deploy,
    /// Stop all monitoring containers
    Stop,
    /// Stop and remove all monitoring containers
    Cleanup,
}

#[derive(Subcommand)]
enum WebsharkAction {
    /// Deploy the Webshark container
    Deploy,
    /// Stop the Webshark container
    Stop,
}

#[derive(Subcommand)]
enum NetworkAction {
    /// Create the netflux5g bridge network
    Create,
    /// Delete the netflux5g bridge network
    Delete,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = DeployConfig::from_env();

    let _ = logging::init_logging(&config.log_dir, "netflux5g-deploy");
    install_cancel_handler();

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerClient::connect(DockerConfig {
        socket_path: cli.docker_socket.clone(),
    })?);
    let frontend: Arc<dyn FrontEnd> = Arc::new(ConsoleFrontEnd::new(cli.yes));
    let network = Arc::new(NetworkManager::new(runtime.clone(), frontend.clone()));

    match cli.command {
        Commands::Monitoring { action } => {
            let stack = MonitoringStack::new(&config.monitoring_dir());
            let manager = MonitoringManager::new(
                runtime,
                frontend,
                Some(network),
                stack,
                config.timings,
            );
            match action {
                MonitoringAction::Deploy => manager.deploy_monitoring().await,
                MonitoringAction::Stop => manager.stop_monitoring().await,
                MonitoringAction::Cleanup => manager.cleanup_monitoring().await,
            }
        }
        Commands::Webshark { action } => {
            let manager =
                PacketAnalyzerManager::new(runtime, frontend, Some(network), config.clone());
            match action {
                WebsharkAction::Deploy => manager.deploy_webshark().await,
                WebsharkAction::Stop => manager.stop_webshark().await,
            }
        }
        Commands::Network { action } => {
            let ok = match action {
                NetworkAction::Create => network.create_network().await,
                NetworkAction::Delete => network.delete_network().await,
            };
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
