use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use crate::models::{ExtractionOutcome, ExtractionResult};

const BAR_TEMPLATE: &str = "{spinner:.blue} {prefix:>10.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} {wide_msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const BAR_CHARS: &str = "█▓▒░  ";

/// Observer notified as the engine works through an archive
///
/// Every method has a no-op default so observers only implement what they
/// display.
pub trait ExtractionProgress: Send + Sync {
    /// Listing finished; `found` entries passed the filter
    fn on_start(&self, _archive_path: &Path, _found: usize) {}

    /// One matching entry was handled
    fn on_entry(&self, _relative_path: &str, _outcome: &ExtractionOutcome) {}

    /// The run completed and `result` is about to be returned
    fn on_finish(&self, _result: &ExtractionResult) {}
}

/// Progress observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ExtractionProgress for SilentProgress {}

/// Terminal progress bar on stderr
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.tick_chars(TICK).progress_chars(BAR_CHARS));
        }
        bar.set_prefix("Extracting");
        Self { bar }
    }

    /// A reporter that never draws, for quiet or machine-readable output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ProgressBarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionProgress for ProgressBarReporter {
    fn on_start(&self, _archive_path: &Path, found: usize) {
        self.bar.set_length(found as u64);
        self.bar.set_position(0);
    }

    fn on_entry(&self, relative_path: &str, outcome: &ExtractionOutcome) {
        let status = match outcome {
            ExtractionOutcome::Extracted => "extracted",
            ExtractionOutcome::SkippedExisting => "skipped",
            ExtractionOutcome::Failed(_) => "failed",
        };
        self.bar.set_message(format!("{} {}", status, relative_path));
        self.bar.inc(1);
    }

    fn on_finish(&self, _result: &ExtractionResult) {
        self.bar.finish_and_clear();
    }
}
