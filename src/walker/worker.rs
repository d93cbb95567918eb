//! Worker thread logic for parallel file aggregation
//!
//! Each worker:
//! - Pulls file tasks from the shared queue
//! - Appends the file to the shared output
//! - Logs and counts failures without stopping
//! - Exits once the queue is closed and drained, or on shutdown

use crate::error::{FileOutcome, WorkerError};
use crate::output::OutputHandle;
use crate::walker::queue::{FileQueueReceiver, FileTask};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Files appended
    pub files_appended: AtomicU64,

    /// Content bytes appended
    pub bytes_appended: AtomicU64,

    /// Files that failed
    pub errors: AtomicU64,

    /// Tasks dropped because of shutdown
    pub skipped: AtomicU64,

    /// Set while a task is being processed
    pub busy: AtomicBool,
}

impl WorkerStats {
    fn record_file(&self, bytes: u64) {
        self.files_appended.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Totals across all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolTotals {
    pub files: u64,
    pub bytes: u64,
    pub errors: u64,
    pub skipped: u64,
    pub active: usize,
}

/// A worker thread that appends queued files
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        queue_rx: FileQueueReceiver,
        output: OutputHandle,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("aggregate-{}", id))
            .spawn(move || worker_loop(id, queue_rx, output, shutdown, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    ///
    /// Statistics stay readable afterwards.
    pub fn join(&mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    queue_rx: FileQueueReceiver,
    output: OutputHandle,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    while let Some(task) = queue_rx.recv() {
        stats.busy.store(true, Ordering::Relaxed);
        let outcome = process_file(id, &task, &output, &shutdown);
        stats.busy.store(false, Ordering::Relaxed);

        match outcome {
            FileOutcome::Appended { path, bytes } => {
                stats.record_file(bytes);
                debug!(worker = id, path = %path.display(), bytes = bytes, "File appended");
            }
            FileOutcome::Skipped { path, reason } => {
                stats.record_skip();
                debug!(worker = id, path = %path.display(), reason = %reason, "File skipped");
            }
            FileOutcome::Failed { error } => {
                stats.record_error();
                if error.is_output_failure() {
                    error!(worker = id, error = %error, "Error writing to output");
                } else {
                    warn!(worker = id, error = %error, "Error appending file");
                }
            }
        }
    }

    debug!(
        worker = id,
        files = stats.files_appended.load(Ordering::Relaxed),
        errors = stats.errors.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Process a single file task
fn process_file(
    worker_id: usize,
    task: &FileTask,
    output: &OutputHandle,
    shutdown: &AtomicBool,
) -> FileOutcome {
    // Keep draining on shutdown so the walker never blocks, but do no work
    if shutdown.load(Ordering::Relaxed) {
        return FileOutcome::Skipped {
            path: task.path.clone(),
            reason: "Shutdown requested".into(),
        };
    }

    info!(worker = worker_id, path = %task.path.display(), "Processing file");

    match output.append_file(&task.path) {
        Ok(bytes) => FileOutcome::Appended {
            path: task.path.clone(),
            bytes,
        },
        Err(error) => FileOutcome::Failed { error },
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> PoolTotals {
    let mut totals = PoolTotals::default();

    for worker in workers {
        totals.files += worker.stats.files_appended.load(Ordering::Relaxed);
        totals.bytes += worker.stats.bytes_appended.load(Ordering::Relaxed);
        totals.errors += worker.stats.errors.load(Ordering::Relaxed);
        totals.skipped += worker.stats.skipped.load(Ordering::Relaxed);
        if worker.stats.busy.load(Ordering::Relaxed) {
            totals.active += 1;
        }
    }

    totals
}
