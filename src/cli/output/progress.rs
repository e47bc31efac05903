//! Progress bars for batched steps, driven by executor events.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::services::BatchEvent;

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg} (ETA: {eta})";
const PROGRESS_CHARS: &str = "█▓▒░ ";

/// Standard progress bar with ETA.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS);
    let pb = ProgressBar::new(total);
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Extension trait for ProgressBar to add common utility methods
pub trait ProgressBarExt {
    fn finish_success(&self, message: impl Into<String>);
    fn finish_error(&self, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.abandon_with_message(format!("✗ {}", message.into()));
    }
}

/// Renders [`BatchEvent`]s as one progress bar per step.
pub struct ProgressReporter {
    handle: JoinHandle<usize>,
}

impl ProgressReporter {
    /// Start rendering on stderr. Events stop once every sender is dropped.
    pub fn spawn() -> (mpsc::UnboundedSender<BatchEvent>, Self) {
        Self::spawn_on(MultiProgress::with_draw_target(ProgressDrawTarget::stderr()))
    }

    /// Start with output suppressed.
    pub fn hidden() -> (mpsc::UnboundedSender<BatchEvent>, Self) {
        Self::spawn_on(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    fn spawn_on(multi: MultiProgress) -> (mpsc::UnboundedSender<BatchEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drive(rx, multi));
        (tx, Self { handle })
    }

    /// Wait for the event stream to close and return how many steps were
    /// rendered. Gives up after a short grace period if a sender is still
    /// alive.
    pub async fn finish(self) -> usize {
        let mut handle = self.handle;
        match tokio::time::timeout(Duration::from_secs(2), &mut handle).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                handle.abort();
                0
            }
        }
    }
}

async fn drive(mut rx: mpsc::UnboundedReceiver<BatchEvent>, multi: MultiProgress) -> usize {
    let mut bar: Option<ProgressBar> = None;
    let mut steps = 0;
    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::Started { step, total, .. } => {
                let pb = multi.add(create_progress_bar(u64::try_from(total).unwrap_or(u64::MAX)));
                pb.set_message(step);
                bar = Some(pb);
                steps += 1;
            }
            BatchEvent::UnitSettled { label, success, .. } => {
                if let Some(pb) = &bar {
                    pb.inc(1);
                    if !success {
                        pb.println(format!("failed: {label}"));
                    }
                }
            }
            BatchEvent::Finished { outcome } => {
                if let Some(pb) = bar.take() {
                    if outcome.aborted {
                        pb.finish_error(format!("aborted after {}/{}", outcome.completed, outcome.total));
                    } else {
                        pb.finish_success(format!("{} done", outcome.completed));
                    }
                }
            }
            BatchEvent::BatchStarted { .. } | BatchEvent::BatchSettled { .. } => {}
        }
    }
    steps
}
