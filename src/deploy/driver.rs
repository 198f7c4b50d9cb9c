use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CancelToken, DeployEvent};
use crate::docker::ContainerRuntime;
use crate::frontend::FrontEnd;

/// Single-flight guard for one manager instance. Check-and-set under the
/// lock; only an idle slot permits starting a new operation.
#[derive(Default)]
pub(crate) struct OperationSlot {
    running: Mutex<bool>,
    cancel: Mutex<Option<CancelToken>>,
}

impl OperationSlot {
    pub(crate) fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn try_begin(&self) -> bool {
        let mut running = self.running.lock().unwrap();
        if *running {
            false
        } else {
            *running = true;
            true
        }
    }

    fn set_cancel(&self, token: CancelToken) {
        *self.cancel.lock().unwrap() = Some(token);
    }

    /// Cancel the in-flight operation's token, if any.
    pub(crate) fn request_cancel(&self) {
        if let Some(token) = self.cancel.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    fn finish(&self) {
        *self.running.lock().unwrap() = false;
        self.cancel.lock().unwrap().take();
    }
}

/// Notice texts for the three terminal states of one manager's operations.
pub(crate) struct TerminalNotices {
    pub success_title: &'static str,
    pub failure_title: &'static str,
    pub cancel_title: &'static str,
    pub cancel_text: &'static str,
    pub success_status: Option<&'static str>,
    pub failure_status: Option<&'static str>,
    pub cancel_status: Option<&'static str>,
}

/// Docker availability precondition shared by both managers.
pub(crate) async fn check_docker_available(
    runtime: &Arc<dyn ContainerRuntime>,
    frontend: &Arc<dyn FrontEnd>,
) -> bool {
    match runtime.ping().await {
        Ok(()) => true,
        Err(e) => {
            frontend.notify_error(
                "Docker Not Available",
                &format!(
                    "Docker is not available or not running. Please install Docker and \
                     ensure it's running.\n\n{e:#}"
                ),
            );
            false
        }
    }
}

/// Run one worker to its terminal state: create the progress surface, spawn
/// the worker, forward its events, watch for user cancellation, and emit
/// exactly one terminal notice. The surface is always closed before the
/// notice is shown.
pub(crate) async fn run_to_completion<F>(
    slot: &OperationSlot,
    frontend: &Arc<dyn FrontEnd>,
    title: &str,
    label: &str,
    cancel_grace: Duration,
    busy_text: &str,
    notices: &TerminalNotices,
    spawn: F,
) where
    F: FnOnce(mpsc::UnboundedSender<DeployEvent>, CancelToken) -> JoinHandle<()>,
{
    if !slot.try_begin() {
        warn!("{busy_text}");
        frontend.notify_warning("Operation in Progress", busy_text);
        return;
    }

    let surface = frontend.progress_surface(title, label);
    let (events, mut receiver) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    slot.set_cancel(cancel.clone());

    let mut handle = spawn(events, cancel.clone());
    let abort = handle.abort_handle();

    let mut outcome = None;
    let mut user_cancelled = false;
    let mut cancel_poll = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Some(DeployEvent::Progress(percent)) => surface.set_progress(percent),
                Some(DeployEvent::Status(text)) => surface.set_label(&text),
                Some(DeployEvent::Finished(result)) => {
                    outcome = Some(result);
                    break;
                }
                // Channel closed without a terminal event: the worker
                // observed cancellation and returned silently.
                None => break,
            },
            _ = cancel_poll.tick() => {
                if surface.cancel_requested() && !cancel.is_cancelled() {
                    debug!("Cancellation requested for '{title}'");
                    cancel.cancel();
                    user_cancelled = true;
                    break;
                }
            }
        }
    }

    if user_cancelled {
        // Cooperative first; abort once the grace period elapses. Aborting
        // may leave the external runtime in a partially-applied state and
        // nothing rolls that back.
        if tokio::time::timeout(cancel_grace, &mut handle).await.is_err() {
            warn!("Worker did not observe cancellation within {cancel_grace:?}, aborting");
            abort.abort();
        }
    } else if tokio::time::timeout(Duration::from_secs(3), &mut handle)
        .await
        .is_err()
    {
        warn!("Worker did not exit promptly after its terminal event, aborting");
        abort.abort();
    }

    surface.close();
    slot.finish();

    match outcome {
        Some(result) if result.success => {
            frontend.notify_info(notices.success_title, &result.message);
            if let Some(status) = notices.success_status {
                frontend.set_status(status);
            }
        }
        Some(result) => {
            frontend.notify_error(notices.failure_title, &result.message);
            if let Some(status) = notices.failure_status {
                frontend.set_status(status);
            }
        }
        None => {
            frontend.notify_info(notices.cancel_title, notices.cancel_text);
            if let Some(status) = notices.cancel_status {
                frontend.set_status(status);
            }
        }
    }

    frontend.refresh();
}
