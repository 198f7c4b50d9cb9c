mod console;

pub use console::{install_cancel_handler, ConsoleFrontEnd};

use std::sync::Arc;

/// Progress surface for one in-flight operation. Its lifetime is scoped to
/// exactly one operation run: created at start, closed at the terminal event
/// or on cancellation. `close` must be safe to call more than once.
pub trait ProgressSurface: Send + Sync {
    fn set_progress(&self, percent: u8);

    fn set_label(&self, text: &str);

    /// Tear the surface down. Idempotent.
    fn close(&self);

    /// Whether the user asked to cancel the operation.
    fn cancel_requested(&self) -> bool;
}

/// Dialog and notification surface of the owning front-end. The deployment
/// managers only ever talk to the user through this contract.
pub trait FrontEnd: Send + Sync {
    /// Modal yes/no question. `default_yes` is the pre-selected answer.
    fn confirm(&self, title: &str, text: &str, default_yes: bool) -> bool;

    fn notify_info(&self, title: &str, text: &str);

    fn notify_warning(&self, title: &str, text: &str);

    fn notify_error(&self, title: &str, text: &str);

    /// Non-modal status line, e.g. the canvas status bar.
    fn set_status(&self, text: &str);

    /// Hook for refreshing dependent front-end state after an operation.
    fn refresh(&self) {}

    fn progress_surface(&self, title: &str, label: &str) -> Arc<dyn ProgressSurface>;
}
