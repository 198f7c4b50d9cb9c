mod client;
mod run;
mod runtime;

pub use client::{DockerClient, DockerConfig};
pub use run::{ContainerRun, RunSpecError};
pub use runtime::ContainerRuntime;
