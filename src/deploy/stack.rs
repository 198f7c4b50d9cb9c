use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed prefix for every managed container name.
pub const CONTAINER_PREFIX: &str = "netflux5g";
/// The shared bridge network every managed container joins.
pub const NETWORK_NAME: &str = "netflux5g";

pub const WEBSHARK_CONTAINER: &str = "netflux5g-webshark";
pub const WEBSHARK_IMAGE: &str = "adaptive/netflux5g-webshark:latest";
pub const WEBSHARK_PORT: &str = "8085:8085";

/// Static description of one managed container. Built once at startup and
/// read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub role: String,
    pub image: String,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub env: Vec<String>,
    /// Extra arguments. For node-exporter these are container command
    /// arguments (its entrypoint expects `--path.rootfs=/host` itself);
    /// for every other role they are docker run flags.
    pub extra_args: Vec<String>,
    pub privileged: bool,
    pub pid_mode: Option<String>,
}

impl ContainerSpec {
    fn new(role: &str, image: &str) -> Self {
        Self {
            role: role.to_string(),
            image: image.to_string(),
            ports: Vec::new(),
            volumes: Vec::new(),
            env: Vec::new(),
            extra_args: Vec::new(),
            privileged: false,
            pid_mode: None,
        }
    }
}

/// The monitoring deployment target: the fixed prefix and network plus the
/// ordered table of container specifications. Iteration order is the
/// deployment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStack {
    pub prefix: String,
    pub network: String,
    pub specs: Vec<ContainerSpec>,
}

impl MonitoringStack {
    /// Build the table with host-side mount paths rooted at the monitoring
    /// assets directory.
    pub fn new(monitoring_dir: &Path) -> Self {
        let assets = |rel: &str, container: &str| {
            format!("{}:{}", monitoring_dir.join(rel).display(), container)
        };

        let mut prometheus = ContainerSpec::new("prometheus", "prom/prometheus");
        prometheus.ports.push("9090:9090".to_string());
        prometheus.volumes.push(assets(
            "prometheus/prometheus.yml",
            "/etc/prometheus/prometheus.yml",
        ));
        prometheus.volumes.push(assets(
            "prometheus/alert_rules.yml",
            "/etc/prometheus/alert_rules.yml",
        ));

        let mut grafana = ContainerSpec::new("grafana", "grafana/grafana");
        grafana.ports.push("3000:3000".to_string());
        grafana.volumes.push(assets(
            "grafana/datasources.yml",
            "/etc/grafana/provisioning/datasources/datasources.yml",
        ));
        grafana.volumes.push(assets(
            "grafana/dashboard.json",
            "/var/lib/grafana/dashboards/dashboard.json",
        ));
        grafana.volumes.push(assets(
            "grafana/default.yaml",
            "/etc/grafana/provisioning/dashboards/default.yaml",
        ));
        grafana
            .env
            .push("GF_PATHS_PROVISIONING=/etc/grafana/provisioning".to_string());
        grafana.env.push("DS_PROMETHEUS=prometheus".to_string());

        let mut node_exporter = ContainerSpec::new("node-exporter", "prom/node-exporter:latest");
        node_exporter.ports.push("9100:9100".to_string());
        node_exporter.volumes.push("/:/host:ro,rslave".to_string());
        node_exporter
            .extra_args
            .push("--path.rootfs=/host".to_string());
        node_exporter.pid_mode = Some("host".to_string());

        let mut cadvisor = ContainerSpec::new("cadvisor", "gcr.io/cadvisor/cadvisor:latest");
        cadvisor.ports.push("8080:8080".to_string());
        cadvisor.volumes.push("/:/rootfs:ro".to_string());
        cadvisor.volumes.push("/var/run:/var/run:ro".to_string());
        cadvisor.volumes.push("/sys:/sys:ro".to_string());
        cadvisor
            .volumes
            .push("/var/lib/docker/:/var/lib/docker:ro".to_string());
        cadvisor.volumes.push("/dev/disk/:/dev/disk:ro".to_string());
        cadvisor.privileged = true;

        let mut blackbox =
            ContainerSpec::new("blackbox-exporter", "prom/blackbox-exporter:latest");
        blackbox.ports.push("9115:9115".to_string());
        blackbox.volumes.push(assets(
            "blackbox/config.yml",
            "/etc/blackbox_exporter/config.yml",
        ));

        let mut alertmanager = ContainerSpec::new("alertmanager", "prom/alertmanager:latest");
        alertmanager.ports.push("9093:9093".to_string());
        alertmanager.volumes.push(assets(
            "prometheus/alertmanager.yml",
            "/etc/alertmanager/alertmanager.yml",
        ));

        Self {
            prefix: CONTAINER_PREFIX.to_string(),
            network: NETWORK_NAME.to_string(),
            specs: vec![
                prometheus,
                grafana,
                node_exporter,
                cadvisor,
                blackbox,
                alertmanager,
            ],
        }
    }

    pub fn full_name(&self, role: &str) -> String {
        format!("{}-{}", self.prefix, role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn stack() -> MonitoringStack {
        MonitoringStack::new(&PathBuf::from("/opt/netflux5g/automation/monitoring"))
    }

    #[test]
    fn table_order_is_fixed() {
        let stack = stack();
        let roles: Vec<&str> = stack.roles().collect();
        assert_eq!(
            roles,
            vec![
                "prometheus",
                "grafana",
                "node-exporter",
                "cadvisor",
                "blackbox-exporter",
                "alertmanager",
            ]
        );
    }

    #[test]
    fn published_ports_match_the_contract() {
        let stack = stack();
        let ports: Vec<&str> = stack
            .specs
            .iter()
            .map(|s| s.ports[0].as_str())
            .collect();
        assert_eq!(
            ports,
            vec![
                "9090:9090",
                "3000:3000",
                "9100:9100",
                "8080:8080",
                "9115:9115",
                "9093:9093",
            ]
        );
    }

    #[test]
    fn full_names_carry_the_fixed_prefix() {
        assert_eq!(stack().full_name("prometheus"), "netflux5g-prometheus");
        assert_eq!(WEBSHARK_CONTAINER, "netflux5g-webshark");
    }

    #[test]
    fn node_exporter_keeps_rootfs_arg_and_host_pid() {
        let stack = stack();
        let node = &stack.specs[2];
        assert_eq!(node.extra_args, vec!["--path.rootfs=/host"]);
        assert_eq!(node.pid_mode.as_deref(), Some("host"));
        assert_eq!(node.volumes, vec!["/:/host:ro,rslave"]);
    }

    #[test]
    fn cadvisor_is_privileged_with_read_only_mounts() {
        let stack = stack();
        let cadvisor = &stack.specs[3];
        assert!(cadvisor.privileged);
        assert_eq!(cadvisor.volumes.len(), 5);
        assert!(cadvisor.volumes.iter().all(|v| v.ends_with(":ro")));
    }

    #[test]
    fn grafana_mounts_are_rooted_at_the_monitoring_dir() {
        let stack = stack();
        let grafana = &stack.specs[1];
        assert!(grafana.volumes[0].starts_with("/opt/netflux5g/automation/monitoring/grafana/"));
        assert_eq!(
            grafana.env,
            vec![
                "GF_PATHS_PROVISIONING=/etc/grafana/provisioning",
                "DS_PROMETHEUS=prometheus",
            ]
        );
    }
}
