//! Run lifecycle: load -> size -> spawn -> join -> summarize.
//!
//! The [`Orchestrator`] is the only piece that talks to the caller. Fatal
//! precondition failures (manifest, configuration, output directory) come
//! back as [`RunError`] before any download starts; per-task failures only
//! ever show up inside the [`RunSummary`].
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::RunError;
use crate::ledger::FailureLedger;
use crate::manifest;
use crate::pool::{CancelToken, WorkerPoolCtx, run_workers};
use crate::progress::ProgressReporter;
use crate::queue::WorkQueue;
use crate::sizing::{choose_worker_count, resolve_max_workers};
use crate::store::StoreClient;
use crate::summary::{RunOutcome, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ManifestLoaded,
    Sizing,
    Running,
    Summarizing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub bucket: String,
    /// Worker ceiling; `None` means the default ceiling.
    pub max_workers: Option<usize>,
    pub show_progress: bool,
    /// Load and size only; no directories created, nothing fetched.
    pub dry_run: bool,
    /// Only run tasks whose key is in this set (re-drive of a failure file).
    pub only_keys: Option<HashSet<String>>,
}

pub struct Orchestrator {
    store: Arc<dyn StoreClient>,
    opts: RunOptions,
    cancel: CancelToken,
    history: Vec<RunState>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn StoreClient>, opts: RunOptions) -> Self {
        Self { store, opts, cancel: CancelToken::new(), history: vec![RunState::Idle] }
    }

    /// Token that stops workers before their next dequeue. It is cleared when
    /// a run returns, so a cancelled orchestrator can run again.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Idle)
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn run(&mut self, manifest_path: &Path, dest_root: &Path) -> Result<RunSummary, RunError> {
        self.history.truncate(1);
        let result = self.run_inner(manifest_path, dest_root);
        self.cancel.reset();
        match result {
            Ok(summary) => {
                self.enter(RunState::Done);
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("run aborted before any transfer: {}", e);
                self.enter(RunState::Failed);
                Err(e)
            }
        }
    }

    fn run_inner(&mut self, manifest_path: &Path, dest_root: &Path) -> Result<RunSummary, RunError> {
        let max_workers = resolve_max_workers(self.opts.max_workers)?;
        let tasks = match &self.opts.only_keys {
            Some(keys) => manifest::load_filtered(manifest_path, keys)?,
            None => manifest::load(manifest_path)?,
        };
        self.enter(RunState::ManifestLoaded);
        let total = tasks.len();
        tracing::info!("manifest {}: {} images", manifest_path.display(), total);

        if !self.opts.dry_run {
            std::fs::create_dir_all(dest_root)
                .map_err(|source| RunError::OutputDir { path: dest_root.to_path_buf(), source })?;
        }
        if tasks.is_empty() {
            self.enter(RunState::Summarizing);
            return Ok(RunSummary::empty(RunOutcome::Empty, 0, 0));
        }

        self.enter(RunState::Sizing);
        let workers = choose_worker_count(total, max_workers);
        tracing::info!("sizing: {} workers for {} tasks (ceiling {})", workers, total, max_workers);
        if self.opts.dry_run {
            self.enter(RunState::Summarizing);
            return Ok(RunSummary::empty(RunOutcome::Planned, total as u64, workers));
        }

        // fully populated and sealed before the first worker exists
        let queue = Arc::new(WorkQueue::from_tasks(tasks));
        let reporter = Arc::new(if self.opts.show_progress {
            ProgressReporter::new(total as u64)
        } else {
            ProgressReporter::hidden(total as u64)
        });
        reporter.set_header(&self.opts.bucket, workers);
        let ledger = FailureLedger::new();

        self.enter(RunState::Running);
        let start = Instant::now();
        let metrics = run_workers(WorkerPoolCtx {
            workers,
            queue: queue.clone(),
            store: self.store.clone(),
            bucket: self.opts.bucket.clone(),
            dest_root: dest_root.to_path_buf(),
            reporter: reporter.clone(),
            ledger: ledger.clone(),
            cancel: self.cancel.clone(),
        });
        let elapsed = start.elapsed();
        reporter.finish();
        // leftovers from a cancel, a failed spawn or a dead worker
        let mut leftover = 0usize;
        while let Some(task) = queue.try_dequeue() {
            ledger.record_not_attempted(task.source_key());
            leftover += 1;
        }
        if leftover > 0 {
            tracing::info!("{} tasks were never attempted", leftover);
        }

        self.enter(RunState::Summarizing);
        let snap = reporter.snapshot();
        let failures = ledger.into_records();
        let not_attempted = snap.total - snap.attempted();
        tracing::debug!(
            "joined {} workers; attempted per worker: {:?}",
            metrics.len(),
            metrics.iter().map(|m| m.attempted).collect::<Vec<_>>()
        );
        let outcome = if not_attempted > 0 && self.cancel.is_cancelled() {
            RunOutcome::Cancelled
        } else if snap.failed > 0 || not_attempted > 0 {
            RunOutcome::CompletedWithFailures
        } else {
            RunOutcome::Completed
        };
        Ok(RunSummary {
            total: snap.total,
            completed: snap.completed,
            failed: snap.failed,
            not_attempted,
            workers,
            elapsed_secs: elapsed.as_secs_f64(),
            outcome,
            failures,
        })
    }

    fn enter(&mut self, next: RunState) {
        tracing::debug!("run state {:?} -> {:?}", self.state(), next);
        self.history.push(next);
    }
}
