use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{FrontEnd, ProgressSurface};

/// Ctrl-C doubles as the cancel signal for whichever operation is showing a
/// progress surface.
static CANCEL_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl-C handler once, early in `main`.
pub fn install_cancel_handler() {
    let _ = ctrlc::set_handler(|| {
        CANCEL_REQUESTED.store(true, Ordering::SeqCst);
    });
}

/// Terminal rendition of the front-end contract used by the CLI binary.
pub struct ConsoleFrontEnd {
    assume_yes: bool,
}

impl ConsoleFrontEnd {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl FrontEnd for ConsoleFrontEnd {
    fn confirm(&self, title: &str, text: &str, default_yes: bool) -> bool {
        println!("\n== {title} ==\n{text}");

        if self.assume_yes {
            println!("(auto-confirmed by --yes)");
            return true;
        }

        let prompt = if default_yes { "[Y/n]" } else { "[y/N]" };
        print!("{prompt} ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }

        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            "" => default_yes,
            _ => false,
        }
    }

    fn notify_info(&self, title: &str, text: &str) {
        println!("\n[{title}]\n{text}\n");
    }

    fn notify_warning(&self, title: &str, text: &str) {
        warn!("{title}: {text}");
        println!("\n[WARNING: {title}]\n{text}\n");
    }

    fn notify_error(&self, title: &str, text: &str) {
        error!("{title}: {text}");
        println!("\n[ERROR: {title}]\n{text}\n");
    }

    fn set_status(&self, text: &str) {
        info!("{text}");
    }

    fn progress_surface(&self, title: &str, label: &str) -> Arc<dyn ProgressSurface> {
        CANCEL_REQUESTED.store(false, Ordering::SeqCst);
        println!("\n== {title} ==");
        println!("  0% {label}");
        Arc::new(ConsoleProgress {
            percent: AtomicU8::new(0),
            closed: AtomicBool::new(false),
        })
    }
}

struct ConsoleProgress {
    percent: AtomicU8,
    closed: AtomicBool,
}

impl ProgressSurface for ConsoleProgress {
    fn set_progress(&self, percent: u8) {
        self.percent.store(percent, Ordering::SeqCst);
        println!("{percent:3}%");
    }

    fn set_label(&self, text: &str) {
        let percent = self.percent.load(Ordering::SeqCst);
        println!("{percent:3}% {text}");
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            println!("done.");
        }
    }

    fn cancel_requested(&self) -> bool {
        CANCEL_REQUESTED.load(Ordering::SeqCst)
    }
}
