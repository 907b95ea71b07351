//! Progress reporting utilities using indicatif.
//!
//! The pipeline reports through the [`ProgressCallback`] trait; [`Progress`]
//! is the terminal implementation used by the CLI. Library callers (tests,
//! other front ends) can plug in their own implementation.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for directory scanning.
pub const PHASE_SCAN: &str = "scan";
/// Phase name for content hashing.
pub const PHASE_HASH: &str = "hash";

/// Progress callback for the duplicate-finding pipeline.
///
/// Implement this trait to receive progress updates. Hashing progress is
/// throttled by the coordinator, so `on_progress` is cheap to implement
/// with direct UI updates.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_SCAN`] or [`PHASE_HASH`])
    /// * `total` - Number of items to process, `0` if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called with the number of completed items and the running total.
    fn on_progress(&self, completed: usize, total: usize);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    scan: Mutex<Option<ProgressBar>>,
    hash: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use picdupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            scan: Mutex::new(None),
            hash: Mutex::new(None),
            quiet,
        }
    }

    fn scan_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} images")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn hash_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_SCAN => Some(&self.scan),
            PHASE_HASH => Some(&self.hash),
            _ => None,
        }
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        for slot in [&self.hash, &self.scan] {
            if let Ok(guard) = slot.lock() {
                if let Some(pb) = guard.as_ref() {
                    f(pb);
                    return;
                }
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        let Some(slot) = self.slot(phase) else {
            return;
        };

        let pb = if phase == PHASE_SCAN {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::scan_style());
            pb.set_message("Scanning");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::hash_style());
            pb.set_message("Hashing");
            pb
        };

        if let Ok(mut guard) = slot.lock() {
            *guard = Some(pb);
        }
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if self.quiet {
            return;
        }
        self.with_active(|pb| {
            if total > 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(completed as u64);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        let Some(slot) = self.slot(phase) else {
            return;
        };
        if let Some(pb) = slot.lock().ok().and_then(|mut guard| guard.take()) {
            let done = if phase == PHASE_SCAN {
                "Scan complete"
            } else {
                "Hashing complete"
            };
            pb.finish_with_message(done);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.with_active(|pb| pb.set_message(message.to_string()));
    }
}
