// Worker pool: N OS threads draining one shared queue.
// Workers never talk to each other; they only touch the queue, the progress
// reporter and the failure ledger.
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::TransferError;
use crate::ledger::FailureLedger;
use crate::manifest::TransferTask;
use crate::paths::display_path;
use crate::progress::ProgressReporter;
use crate::queue::WorkQueue;
use crate::store::StoreClient;

/// Shared stop flag. Workers check it before every dequeue; a task already in
/// flight is finished and reported normally.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct WorkerPoolCtx {
    pub workers: usize,
    pub queue: Arc<WorkQueue>,
    pub store: Arc<dyn StoreClient>,
    pub bucket: String,
    pub dest_root: PathBuf,
    pub reporter: Arc<ProgressReporter>,
    pub ledger: FailureLedger,
    pub cancel: CancelToken,
}

#[derive(Clone, Default, Debug)]
pub struct WorkerMetrics {
    pub worker_id: usize,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

/// Spawn `ctx.workers` threads and block until every one of them has found
/// the queue empty (or the run cancelled) and exited.
pub fn run_workers(ctx: WorkerPoolCtx) -> Vec<WorkerMetrics> {
    let WorkerPoolCtx { workers, queue, store, bucket, dest_root, reporter, ledger, cancel } = ctx;
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let queue = queue.clone();
        let store = store.clone();
        let bucket = bucket.clone();
        let dest_root = dest_root.clone();
        let reporter = reporter.clone();
        let ledger = ledger.clone();
        let cancel = cancel.clone();
        let builder = std::thread::Builder::new().name(format!("imgpull-worker-{}", worker_id));
        let spawned = builder.spawn(move || {
            let start = Instant::now();
            let mut m = WorkerMetrics { worker_id, ..Default::default() };
            while !cancel.is_cancelled() {
                let Some(task) = queue.try_dequeue() else {
                    break;
                };
                m.attempted += 1;
                tracing::debug!("[worker {}] fetching {}", worker_id, task.source_key());
                match process_task(&task, store.as_ref(), &bucket, &dest_root) {
                    Ok(()) => {
                        m.succeeded += 1;
                        reporter.report_success();
                    }
                    Err(e) => {
                        // record and keep draining: one bad object must not retire the worker
                        m.failed += 1;
                        report_task_failure(worker_id, &task, &e, &ledger, &reporter);
                    }
                }
            }
            m.elapsed = start.elapsed();
            tracing::debug!(
                "[worker {}] exiting: attempted={} ok={} failed={} in {:.2}s",
                worker_id,
                m.attempted,
                m.succeeded,
                m.failed,
                m.elapsed.as_secs_f64()
            );
            m
        });
        match spawned {
            Ok(h) => handles.push(h),
            // remaining workers still drain the whole queue
            Err(e) => tracing::warn!("could not spawn worker {}: {}", worker_id, e),
        }
    }

    let mut metrics = Vec::with_capacity(handles.len());
    for h in handles {
        match h.join() {
            Ok(m) => metrics.push(m),
            Err(_) => tracing::warn!("a worker thread panicked outside a fetch"),
        }
    }
    metrics
}

// The reporter is the only inline output for a failed task; the log line stays
// at debug so it never lands on the stream the bars are drawn on.
fn report_task_failure(
    worker_id: usize,
    task: &TransferTask,
    err: &TransferError,
    ledger: &FailureLedger,
    reporter: &ProgressReporter,
) {
    tracing::debug!("[worker {}] {} failed: {}", worker_id, task.source_key(), err);
    ledger.record(task.source_key(), err);
    reporter.report_failure(task.source_key(), &err.to_string());
}

// Create the destination's parent directories, then hand off to the store.
fn process_task(
    task: &TransferTask,
    store: &dyn StoreClient,
    bucket: &str,
    dest_root: &Path,
) -> Result<(), TransferError> {
    let dest = dest_root.join(task.dest_relative_path());
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TransferError::DirectoryCreation {
            path: display_path(parent).to_string(),
            message: e.to_string(),
        })?;
    }
    match catch_unwind(AssertUnwindSafe(|| store.fetch(bucket, task.source_key(), &dest))) {
        Ok(res) => res,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(TransferError::NetworkFailure(format!("worker panicked: {}", msg)))
        }
    }
}
