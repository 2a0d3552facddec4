use owo_colors::OwoColorize;
use serde::Serialize;

use crate::ledger::FailureRecord;
use crate::progress::try_enable_ansi_on_windows;

pub const EXIT_OK: i32 = 0;
/// Some task failed or was never attempted.
pub const EXIT_FAILURES: i32 = 1;
/// The run could not start.
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The manifest listed no images; nothing was spawned.
    Empty,
    /// Dry run: manifest loaded and sized, nothing fetched.
    Planned,
    Completed,
    CompletedWithFailures,
    /// Stopped through the cancel token before the queue drained.
    Cancelled,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Empty | RunOutcome::Planned | RunOutcome::Completed => EXIT_OK,
            RunOutcome::CompletedWithFailures | RunOutcome::Cancelled => EXIT_FAILURES,
        }
    }
}

/// What the caller sees once a run is over.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub not_attempted: u64,
    pub workers: usize,
    pub elapsed_secs: f64,
    pub outcome: RunOutcome,
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    pub(crate) fn empty(outcome: RunOutcome, total: u64, workers: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            not_attempted: total,
            workers,
            elapsed_secs: 0.0,
            outcome,
            failures: Vec::new(),
        }
    }

    /// True when any key needs another run: failed or never attempted.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.key.as_str())
    }

    /// Human-readable summary; always printed, even when every task failed.
    pub fn print_human(&self) {
        print!("{}", self.render_human(try_enable_ansi_on_windows()));
    }

    fn render_human(&self, colored: bool) -> String {
        let rate = if self.elapsed_secs > 0.0 { self.completed as f64 / self.elapsed_secs } else { 0.0 };
        let head = match self.outcome {
            RunOutcome::Empty => "No images listed in manifest".to_string(),
            RunOutcome::Planned => {
                format!("Dry run: {} images would be fetched by {} workers", self.total, self.workers)
            }
            _ => format!(
                "Downloaded {}/{} images ({} failed, {} not attempted) in {:.2}s with {} workers ({:.1} img/s)",
                self.completed,
                self.total,
                self.failed,
                self.not_attempted,
                self.elapsed_secs,
                self.workers,
                rate
            ),
        };
        let mut out = match self.outcome {
            RunOutcome::CompletedWithFailures | RunOutcome::Cancelled if colored => {
                format!("{}\n", head.yellow())
            }
            RunOutcome::Completed if colored => format!("{}\n", head.green()),
            _ => format!("{}\n", head),
        };
        for f in &self.failures {
            let mark = if colored { "✗".red().to_string() } else { "✗".to_string() };
            out.push_str(&format!("  {} {}: {}\n", mark, f.key, f.reason));
        }
        out
    }
}
