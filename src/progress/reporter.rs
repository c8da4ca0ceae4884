//! Progress sinks
//!
//! The hasher reports `(label, percent)` pairs through a sink passed in by
//! the caller. Sinks are purely observational and may be shared between
//! concurrent hash operations, so they must be `Send + Sync`.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Receiver of progress updates
pub trait ProgressSink: Send + Sync {
    /// Report `percent` (0..=100) complete for the operation named `label`
    fn report(&self, label: &str, percent: u8);
}

/// Discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _label: &str, _percent: u8) {}
}

/// Forwards updates to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, label: &str, percent: u8) {
        tracing::debug!(label, percent, "hash progress");
    }
}

/// Records every update; handy for tests and for callers polling status
#[derive(Debug, Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<(String, u8)>>,
}

impl RecordingProgress {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all updates received so far
    pub fn updates(&self) -> Vec<(String, u8)> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// Last percentage reported for `label`
    pub fn last_percent(&self, label: &str) -> Option<u8> {
        self.updates()
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, p)| *p)
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, label: &str, percent: u8) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push((label.to_string(), percent));
        }
    }
}

/// Terminal progress bars, one per label
pub struct ProgressReporter {
    /// Multi-progress container
    multi: MultiProgress,
    /// Bars of unfinished labels
    bars: Mutex<HashMap<String, ProgressBar>>,
    /// Bar style shared by all bars
    style: ProgressStyle,
    /// Is progress enabled
    enabled: AtomicBool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.green/white}] {pos:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            style,
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a disabled progress reporter (for quiet mode)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Check if progress is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Abandon every unfinished bar, e.g. after a failure
    pub fn abandon_all(&self) {
        if let Ok(bars) = self.bars.lock() {
            for bar in bars.values().filter(|b| !b.is_finished()) {
                bar.abandon();
            }
        }
    }

    fn bar_for(&self, label: &str) -> Option<ProgressBar> {
        let mut bars = self.bars.lock().ok()?;
        let bar = bars.entry(label.to_string()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(100));
            bar.set_style(self.style.clone());
            bar.set_prefix("Hash");
            bar.set_message(truncate_label(label));
            bar
        });
        Some(bar.clone())
    }

    /// Drop a completed bar so finished files are not redrawn
    fn finish_bar(&self, label: &str) {
        let bar = match self.bars.lock() {
            Ok(mut bars) => bars.remove(label),
            Err(_) => None,
        };
        if let Some(bar) = bar {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&self, label: &str, percent: u8) {
        if !self.is_enabled() {
            return;
        }
        if percent >= 100 {
            self.finish_bar(label);
        } else if let Some(bar) = self.bar_for(label) {
            bar.set_position(u64::from(percent));
        }
    }
}

/// Truncate long labels from the left, keeping the file name visible
fn truncate_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() > 60 {
        let tail: String = chars[chars.len() - 57..].iter().collect();
        format!("...{}", tail)
    } else {
        label.to_string()
    }
}
