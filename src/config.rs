use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// Settle delays and the cancellation grace period. The external runtime
/// does not expose readiness, so a fixed wait precedes every verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timings {
    /// Wait after the monitoring stack has been started, before verification.
    pub deploy_settle: Duration,
    /// Wait after a single container start, before verification.
    pub verify_settle: Duration,
    /// Wait after a container stop, before reporting.
    pub stop_settle: Duration,
    /// How long a cancelled worker may keep running before it is aborted.
    pub cancel_grace: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            deploy_settle: Duration::from_secs(5),
            verify_settle: Duration::from_secs(2),
            stop_settle: Duration::from_secs(1),
            cancel_grace: Duration::from_secs(3),
        }
    }
}

impl Timings {
    /// All-zero timings, for tests.
    pub fn none() -> Self {
        Self {
            deploy_settle: Duration::ZERO,
            verify_settle: Duration::ZERO,
            stop_settle: Duration::ZERO,
            cancel_grace: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Directory holding the monitoring assets and the webshark build context.
    pub automation_dir: PathBuf,
    pub log_dir: String,
    pub timings: Timings,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            automation_dir: PathBuf::from("automation"),
            log_dir: "logs".to_string(),
            timings: Timings::default(),
        }
    }
}

impl DeployConfig {
    pub fn from_env() -> Self {
        Self {
            automation_dir: std::env::var("NETFLUX5G_AUTOMATION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("automation")),
            log_dir: std::env::var("NETFLUX5G_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            timings: Timings::default(),
        }
    }

    pub fn monitoring_dir(&self) -> PathBuf {
        self.automation_dir.join("monitoring")
    }

    /// The webshark build context, valid only when it carries a Dockerfile.
    pub fn webshark_dir(&self) -> Option<PathBuf> {
        let dir = self.automation_dir.join("webshark");
        if dir.is_dir() && dir.join("Dockerfile").is_file() {
            Some(dir)
        } else {
            debug!("Webshark directory not found at {:?}", dir);
            None
        }
    }

    /// The captures directory mounted into the webshark container. Created
    /// on demand; `None` when it cannot be created or is not writable.
    pub fn captures_dir(&self) -> Option<PathBuf> {
        let dir = self.automation_dir.join("webshark").join("captures");

        if !dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!("Failed to create captures directory {:?}: {}", dir, e);
                return None;
            }
            debug!("Created captures directory: {:?}", dir);
        }

        if !dir_writable(&dir) {
            error!("Captures directory is not writable: {:?}", dir);
            return None;
        }

        Some(absolute(&dir))
    }
}

fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(".netflux5g-write-probe");
    match std::fs::File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
