mod analyzer;
mod driver;
mod monitoring;
mod stack;

pub use analyzer::{PacketAnalyzerManager, PacketAnalyzerWorker};
pub use monitoring::{MonitoringManager, MonitoringWorker};
pub use stack::{ContainerSpec, MonitoringStack, CONTAINER_PREFIX, NETWORK_NAME};
pub use stack::{WEBSHARK_CONTAINER, WEBSHARK_IMAGE, WEBSHARK_PORT};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The operations a deployment worker can run. Exactly one may be in flight
/// per manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Deploy,
    Stop,
    Cleanup,
}

/// Terminal result of one worker run, delivered exactly once unless the run
/// was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Events a worker emits towards its manager, in order. Progress is
/// monotonically non-decreasing and `Finished` is always last.
#[derive(Debug, Clone)]
pub enum DeployEvent {
    Progress(u8),
    Status(String),
    Finished(Outcome),
}

/// Cooperative cancellation flag, checked by workers at defined points
/// between steps. Cancelling never interrupts an in-progress runtime call
/// and never rolls back side effects already applied.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
