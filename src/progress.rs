// Thread-safe run counters plus the terminal progress display.
// The counters are the source of truth; the indicatif bars only mirror them and
// a drawing problem never touches the counts.
use std::sync::{Arc, Mutex};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;

/// Try to enable ANSI escape sequence support on Windows consoles.
/// Returns true if enabling succeeded (or platform likely already supports ANSI), false otherwise.
#[cfg(windows)]
pub fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

#[cfg(not(windows))]
pub fn try_enable_ansi_on_windows() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    pub fn attempted(&self) -> u64 {
        self.completed + self.failed
    }
}

#[derive(Default)]
struct Tally {
    completed: u64,
    failed: u64,
}

pub struct ProgressReporter {
    total: u64,
    tally: Mutex<Tally>,
    mp: Arc<MultiProgress>,
    header: ProgressBar,
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Reporter that draws a header line and a total bar on stderr.
    pub fn new(total: u64) -> Self {
        Self::with_draw_target(total, ProgressDrawTarget::stderr())
    }

    /// Reporter that keeps counts but draws nothing (quiet mode, tests).
    pub fn hidden(total: u64) -> Self {
        Self::with_draw_target(total, ProgressDrawTarget::hidden())
    }

    fn with_draw_target(total: u64, target: ProgressDrawTarget) -> Self {
        let mp = Arc::new(MultiProgress::with_draw_target(target));
        let header = mp.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{msg}") {
            header.set_style(style);
        }
        let bar = mp.add(ProgressBar::new(total));
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { total, tally: Mutex::new(Tally::default()), mp, header, bar }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// One-line startup summary shown above the bar.
    pub fn set_header(&self, bucket: &str, workers: usize) {
        let bucket_field = format!("{:<32}", format!("Bucket:{}", bucket));
        let worker_field = format!("{:<12}", format!("Worker:{}", workers));
        let total_field = format!("{:<12}", format!("Total:{}", self.total));
        let msg = if try_enable_ansi_on_windows() {
            format!("{}    {}    {}", bucket_field.green(), worker_field.cyan(), total_field.yellow())
        } else {
            format!("{}    {}    {}", bucket_field, worker_field, total_field)
        };
        self.header.set_message(msg);
    }

    pub fn report_success(&self) {
        if !self.bump(|t| t.completed += 1) {
            return;
        }
        self.bar.inc(1);
    }

    /// Count a failure and print it above the bar; the bar itself does not move.
    pub fn report_failure(&self, key: &str, reason: &str) {
        if !self.bump(|t| t.failed += 1) {
            return;
        }
        self.bar.println(format!("failed {}: {}", key, reason));
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let t = self.lock();
        ProgressSnapshot { completed: t.completed, failed: t.failed, total: self.total }
    }

    /// Clear the bars once all workers are done.
    pub fn finish(&self) {
        self.header.finish_and_clear();
        self.bar.finish_and_clear();
        let _ = self.mp.clear();
    }

    // Applies `f` unless the tally is already full; returns whether it counted.
    fn bump(&self, f: impl FnOnce(&mut Tally)) -> bool {
        let mut t = self.lock();
        if t.completed + t.failed >= self.total {
            tracing::warn!("progress over-reported: total={} already reached", self.total);
            return false;
        }
        f(&mut t);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tally> {
        // counts stay valid even if a holder panicked
        self.tally.lock().unwrap_or_else(|p| p.into_inner())
    }
}
