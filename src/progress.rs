//! Progress reporting utilities using indicatif.
//!
//! [`Progress`] implements [`ProgressCallback`] and draws one bar per
//! pipeline phase (`probe`, `hash`, `sample`, `dispose`). It is silent in
//! quiet mode and in JSON/CSV output modes.
//!
//! # Accessible Mode
//!
//! When accessible mode is enabled, bars use plain ASCII and no spinner.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for engine and disposal phases.
///
/// Implement this trait to receive progress updates during a run.
/// Implementations are called from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "hash", "sample")
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    active: Mutex<Option<String>>,
    quiet: bool,
    accessible: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediadupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_accessible(quiet, false)
    }

    /// Create a new progress reporter with accessible mode.
    #[must_use]
    pub fn with_accessible(quiet: bool, accessible: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            quiet,
            accessible,
        }
    }

    /// Check if accessible mode is enabled.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    fn bar_style(&self, throughput: bool) -> ProgressStyle {
        let template = match (self.accessible, throughput) {
            (true, false) => "[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}",
            (true, true) => "[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg} {per_sec}",
            (false, false) => {
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})"
            }
            (false, true) => {
                "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} {per_sec} (ETA: {eta})"
            }
        };
        let chars = if self.accessible { "#>-" } else { "█>-" };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(chars)
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        let Ok(active) = self.active.lock() else {
            return;
        };
        let Some(ref phase) = *active else {
            return;
        };
        if let Ok(bars) = self.bars.lock() {
            if let Some(pb) = bars.get(phase) {
                f(pb);
            }
        }
    }
}

fn phase_label(phase: &str) -> &str {
    match phase {
        "probe" => "Probing",
        "hash" => "Hashing",
        "sample" => "Sampling frames",
        "dispose" => "Disposing",
        other => other,
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(self.bar_style(phase == "hash"));
        pb.set_message(phase_label(phase).to_string());

        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(phase.to_string(), pb);
        }
        if let Ok(mut active) = self.active.lock() {
            *active = Some(phase.to_string());
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        let message = truncate_path(path, 30);
        self.with_active(|pb| {
            pb.set_position(current as u64);
            pb.set_message(message);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let finished = self.bars.lock().ok().and_then(|mut bars| bars.remove(phase));
        if let Some(pb) = finished {
            pb.finish_with_message(format!("{} complete", phase_label(phase)));
        }
        if let Ok(mut active) = self.active.lock() {
            if active.as_deref() == Some(phase) {
                *active = None;
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        let message = message.to_string();
        self.with_active(|pb| pb.set_message(message));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.len() >= max_len {
        let start = file_name
            .char_indices()
            .map(|(i, _)| i)
            .find(|&i| file_name.len() - i <= max_len - 3)
            .unwrap_or(0);
        return format!("...{}", &file_name[start..]);
    }

    format!(".../{}", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_path_unchanged() {
        assert_eq!(truncate_path("/a/b.mp4", 30), "/a/b.mp4");
    }

    #[test]
    fn test_truncate_keeps_file_name() {
        let path = "/very/long/directory/structure/that/goes/on/clip.mp4";
        assert_eq!(truncate_path(path, 30), ".../clip.mp4");
    }

    #[test]
    fn test_truncate_long_file_name() {
        let name = "a".repeat(50);
        let truncated = truncate_path(&format!("/x/{}", name), 30);
        assert!(truncated.starts_with("..."));
        assert_eq!(truncated.len(), 30);
    }

    #[test]
    fn test_quiet_progress_ignores_events() {
        let progress = Progress::new(true);
        progress.on_phase_start("hash", 10);
        progress.on_progress(1, "/a");
        progress.on_phase_end("hash");
        assert!(progress.bars.lock().unwrap().is_empty());
    }

    #[test]
    fn test_phase_lifecycle() {
        let progress = Progress::with_accessible(false, true);
        assert!(progress.is_accessible());
        progress.on_phase_start("sample", 3);
        progress.on_progress(2, "/clip.mp4");
        progress.on_message("frames");
        progress.on_phase_end("sample");
        assert!(progress.bars.lock().unwrap().is_empty());
        assert!(progress.active.lock().unwrap().is_none());
    }
}
