use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunSpecError {
    #[error("invalid port mapping '{0}', expected 'host:container'")]
    InvalidPortMapping(String),
    #[error("unknown restart policy '{0}'")]
    UnknownRestartPolicy(String),
}

/// One container run invocation, composed by a worker and executed by the
/// runtime facade. Ports are `host:container` strings, volumes are
/// `host:container[:mode]` strings and env entries are `KEY=VALUE` strings,
/// mirroring the docker CLI forms they stand in for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRun {
    pub image: String,
    pub name: String,
    pub network: Option<String>,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub env: Vec<String>,
    pub extra_flags: Vec<String>,
    pub command: Vec<String>,
    pub restart_policy: Option<String>,
    pub privileged: bool,
    pub pid_mode: Option<String>,
}

impl ContainerRun {
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_network(&mut self, network: impl Into<String>) -> &mut Self {
        self.network = Some(network.into());
        self
    }

    pub fn add_port(&mut self, mapping: impl Into<String>) -> &mut Self {
        self.ports.push(mapping.into());
        self
    }

    pub fn add_volume(&mut self, mount: impl Into<String>) -> &mut Self {
        self.volumes.push(mount.into());
        self
    }

    pub fn add_env(&mut self, assignment: impl Into<String>) -> &mut Self {
        self.env.push(assignment.into());
        self
    }

    /// Extra docker run flag, e.g. `--privileged`. The facade translates the
    /// flags it knows and warns about the rest.
    pub fn add_extra_flag(&mut self, flag: impl Into<String>) -> &mut Self {
        self.extra_flags.push(flag.into());
        self
    }

    /// Argument handed to the container's own entrypoint, not to docker.
    pub fn add_command_arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.command.push(arg.into());
        self
    }

    pub fn set_restart_policy(&mut self, policy: impl Into<String>) -> &mut Self {
        self.restart_policy = Some(policy.into());
        self
    }

    pub fn set_privileged(&mut self, privileged: bool) -> &mut Self {
        self.privileged = privileged;
        self
    }

    pub fn set_pid_mode(&mut self, mode: impl Into<String>) -> &mut Self {
        self.pid_mode = Some(mode.into());
        self
    }
}

/// Split a `host:container` published-port mapping.
pub(crate) fn parse_port_mapping(mapping: &str) -> Result<(String, String), RunSpecError> {
    match mapping.split_once(':') {
        Some((host, container)) if !host.is_empty() && !container.is_empty() => {
            Ok((host.to_string(), container.to_string()))
        }
        _ => Err(RunSpecError::InvalidPortMapping(mapping.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_repeated_entries() {
        let mut run = ContainerRun::new("prom/prometheus", "netflux5g-prometheus");
        run.set_network("netflux5g")
            .add_port("9090:9090")
            .add_volume("/tmp/prometheus.yml:/etc/prometheus/prometheus.yml")
            .add_env("A=1")
            .add_env("B=2");

        assert_eq!(run.network.as_deref(), Some("netflux5g"));
        assert_eq!(run.ports, vec!["9090:9090"]);
        assert_eq!(run.env, vec!["A=1", "B=2"]);
        assert!(run.command.is_empty());
        assert!(!run.privileged);
    }

    #[test]
    fn port_mapping_parses_host_and_container() {
        assert_eq!(
            parse_port_mapping("8085:8085").unwrap(),
            ("8085".to_string(), "8085".to_string())
        );
    }

    #[test]
    fn malformed_port_mapping_is_rejected() {
        assert!(parse_port_mapping("8085").is_err());
        assert!(parse_port_mapping(":8085").is_err());
        assert!(parse_port_mapping("8085:").is_err());
    }
}
