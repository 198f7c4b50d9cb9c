//! Shared fakes for the integration tests: a recording container runtime
//! and a scripted front-end, so manager flows run without a Docker daemon.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netflux5g_deploy::docker::{ContainerRun, ContainerRuntime};
use netflux5g_deploy::frontend::{FrontEnd, ProgressSurface};

/// Every runtime call a test can assert on, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    ContainerExists(String),
    IsRunning(String),
    ImageExists(String),
    NetworkExists(String),
    PullImage(String),
    BuildImage(String),
    StopContainer(String),
    CreateNetwork(String),
    RemoveNetwork(String),
    Logs(String),
    Run(String),
}

type RunHook = Box<dyn Fn(usize) + Send + Sync>;

/// In-memory container engine. Containers, images and networks are plain
/// string sets; `run_container` and `stop_container` mutate them the way
/// the real engine would.
#[derive(Default)]
pub struct RecordingRuntime {
    pub calls: Mutex<Vec<Call>>,
    pub runs: Mutex<Vec<ContainerRun>>,
    pub existing: Mutex<HashSet<String>>,
    pub running: Mutex<HashSet<String>>,
    pub images: Mutex<HashSet<String>>,
    pub networks: Mutex<HashSet<String>>,
    /// Containers that stay stopped after a successful `run_container`.
    pub broken: Mutex<HashSet<String>>,
    pub logs_response: Mutex<String>,
    pub ping_fails: AtomicBool,
    pub run_delay: Mutex<Duration>,
    run_count: AtomicUsize,
    on_run: Mutex<Option<RunHook>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(self, name: &str) -> Self {
        self.networks.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.images.lock().unwrap().insert(image.to_string());
        self
    }

    pub fn with_container(self, name: &str, running: bool) -> Self {
        self.existing.lock().unwrap().insert(name.to_string());
        if running {
            self.running.lock().unwrap().insert(name.to_string());
        }
        self
    }

    /// Hook invoked after each successful `run_container`, with the
    /// 1-based count of runs so far. Used to trigger cancellation at a
    /// deterministic point.
    pub fn set_on_run(&self, hook: RunHook) {
        *self.on_run.lock().unwrap() = Some(hook);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn run_names(&self) -> Vec<String> {
        self.runs.lock().unwrap().iter().map(|r| r.name.clone()).collect()
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn ping(&self) -> Result<()> {
        self.record(Call::Ping);
        if self.ping_fails.load(Ordering::SeqCst) {
            Err(anyhow!("connection refused"))
        } else {
            Ok(())
        }
    }

    async fn container_exists(&self, name: &str) -> bool {
        self.record(Call::ContainerExists(name.to_string()));
        self.existing.lock().unwrap().contains(name)
    }

    async fn is_container_running(&self, name: &str) -> Result<bool> {
        self.record(Call::IsRunning(name.to_string()));
        Ok(self.running.lock().unwrap().contains(name))
    }

    async fn image_exists(&self, image: &str) -> bool {
        self.record(Call::ImageExists(image.to_string()));
        self.images.lock().unwrap().contains(image)
    }

    async fn network_exists(&self, name: &str) -> bool {
        self.record(Call::NetworkExists(name.to_string()));
        self.networks.lock().unwrap().contains(name)
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.record(Call::PullImage(image.to_string()));
        self.images.lock().unwrap().insert(image.to_string());
        Ok(())
    }

    async fn build_image(&self, image: &str, _context: &Path) -> Result<()> {
        self.record(Call::BuildImage(image.to_string()));
        self.images.lock().unwrap().insert(image.to_string());
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        self.record(Call::StopContainer(name.to_string()));
        self.existing.lock().unwrap().remove(name);
        self.running.lock().unwrap().remove(name);
        Ok(())
    }

    async fn create_network(&self, name: &str) -> Result<()> {
        self.record(Call::CreateNetwork(name.to_string()));
        self.networks.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        self.record(Call::RemoveNetwork(name.to_string()));
        self.networks.lock().unwrap().remove(name);
        Ok(())
    }

    async fn container_logs(&self, name: &str, _tail: Option<usize>) -> Result<String> {
        self.record(Call::Logs(name.to_string()));
        Ok(self.logs_response.lock().unwrap().clone())
    }

    async fn run_container(&self, run: &ContainerRun) -> Result<()> {
        let delay = *self.run_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.record(Call::Run(run.name.clone()));
        self.runs.lock().unwrap().push(run.clone());
        self.existing.lock().unwrap().insert(run.name.clone());
        if !self.broken.lock().unwrap().contains(&run.name) {
            self.running.lock().unwrap().insert(run.name.clone());
        }

        let count = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = self.on_run.lock().unwrap().as_ref() {
            hook(count);
        }
        Ok(())
    }
}

/// Progress surface that records everything pushed at it.
#[derive(Default)]
pub struct TestSurface {
    pub progress: Mutex<Vec<u8>>,
    pub labels: Mutex<Vec<String>>,
    pub closes: AtomicUsize,
    pub last_percent: AtomicU8,
    cancel: AtomicBool,
}

impl TestSurface {
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl ProgressSurface for TestSurface {
    fn set_progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
        self.last_percent.store(percent, Ordering::SeqCst);
    }

    fn set_label(&self, text: &str) {
        self.labels.lock().unwrap().push(text.to_string());
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Front-end with a scripted queue of confirmation answers. An empty queue
/// answers with the dialog's default, so happy paths need no scripting.
#[derive(Default)]
pub struct ScriptedFrontEnd {
    pub answers: Mutex<Vec<bool>>,
    pub confirms: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<(String, String)>>,
    pub warnings: Mutex<Vec<(String, String)>>,
    pub errors: Mutex<Vec<(String, String)>>,
    pub statuses: Mutex<Vec<String>>,
    pub surface: Arc<TestSurface>,
}

impl ScriptedFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: &[bool]) -> Self {
        let frontend = Self::default();
        *frontend.answers.lock().unwrap() = answers.to_vec();
        frontend
    }

    pub fn info_titles(&self) -> Vec<String> {
        self.infos.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn last_info(&self) -> Option<(String, String)> {
        self.infos.lock().unwrap().last().cloned()
    }

    pub fn last_error(&self) -> Option<(String, String)> {
        self.errors.lock().unwrap().last().cloned()
    }
}

impl FrontEnd for ScriptedFrontEnd {
    fn confirm(&self, title: &str, _text: &str, default_yes: bool) -> bool {
        self.confirms.lock().unwrap().push(title.to_string());
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            default_yes
        } else {
            answers.remove(0)
        }
    }

    fn notify_info(&self, title: &str, text: &str) {
        self.infos
            .lock()
            .unwrap()
            .push((title.to_string(), text.to_string()));
    }

    fn notify_warning(&self, title: &str, text: &str) {
        self.warnings
            .lock()
            .unwrap()
            .push((title.to_string(), text.to_string()));
    }

    fn notify_error(&self, title: &str, text: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((title.to_string(), text.to_string()));
    }

    fn set_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    fn progress_surface(&self, _title: &str, _label: &str) -> Arc<dyn ProgressSurface> {
        self.surface.clone()
    }
}
