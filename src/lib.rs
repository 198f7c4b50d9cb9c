pub mod config;
pub mod deploy;
pub mod docker;
pub mod frontend;
pub mod logging;
pub mod network;

pub use config::{DeployConfig, Timings};
pub use deploy::{CancelToken, DeployEvent, Operation, Outcome};
pub use docker::{ContainerRun, ContainerRuntime, DockerClient};
pub use frontend::{FrontEnd, ProgressSurface};
