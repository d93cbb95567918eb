//! Aggregation coordinator - orchestrates the walk and the worker pool
//!
//! The coordinator is responsible for:
//! - Creating the output file and the bounded file queue
//! - Spawning the workers
//! - Running the input walker as the single producer
//! - Closing the queue and joining every worker
//! - Flushing and closing the output, then reporting final statistics

use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::output::{AggregationWriter, OutputStats};
use crate::walker::queue::{FileQueue, FileTask, QueueStats, SendFailure};
use crate::walker::tree::{InputWalker, WalkStats};
use crate::walker::worker::{aggregate_stats, Worker};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed aggregation run
#[derive(Debug, Clone)]
pub struct AggregateResult {
    /// Combined output file
    pub output_path: PathBuf,

    /// Files accepted by the walker
    pub files_walked: u64,

    /// Files appended to the output
    pub files_appended: u64,

    /// Files that could not be appended
    pub files_failed: u64,

    /// Content bytes appended
    pub total_bytes: u64,

    /// Directories pruned by exclude-folder rules
    pub dirs_excluded: u64,

    /// Files dropped by exclude-file rules
    pub files_excluded: u64,

    /// Entries the walker could not read
    pub walk_errors: u64,

    /// Input roots that were skipped
    pub roots_skipped: u64,

    /// Queued files dropped because of shutdown
    pub files_skipped: u64,

    /// Worker threads that panicked
    pub worker_panics: u64,

    /// Time taken for the run
    pub duration: Duration,

    /// Whether the run completed (vs was interrupted)
    pub completed: bool,
}

impl AggregateResult {
    /// Per-item problems of any kind
    pub fn errors(&self) -> u64 {
        self.files_failed + self.walk_errors + self.roots_skipped + self.worker_panics
    }
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct AggregateProgress {
    /// Files accepted by the walker
    pub files_walked: u64,

    /// Files appended so far
    pub files_appended: u64,

    /// Bytes appended so far
    pub bytes: u64,

    /// Exclusions so far
    pub excluded: u64,

    /// Errors so far
    pub errors: u64,

    /// Tasks waiting in the queue
    pub queue_size: u64,

    /// Total workers
    pub total_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl AggregateProgress {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files_appended as f64 / secs
        } else {
            0.0
        }
    }
}

/// Read-only view of a running aggregation (for progress display)
#[derive(Clone)]
pub struct ProgressProbe {
    walk: Arc<WalkStats>,
    output: Arc<OutputStats>,
    queue: Arc<QueueStats>,
    workers: usize,
    start: Instant,
}

impl ProgressProbe {
    /// Take a snapshot of the current counters
    pub fn snapshot(&self) -> AggregateProgress {
        let enqueued = self.queue.enqueued.load(Ordering::Relaxed);
        let dequeued = self.queue.dequeued.load(Ordering::Relaxed);

        AggregateProgress {
            files_walked: self.walk.files_emitted(),
            files_appended: self.output.files_appended(),
            bytes: self.output.bytes_copied(),
            excluded: self.walk.excluded(),
            errors: self.walk.errors() + self.walk.roots_skipped() + self.output.files_failed(),
            queue_size: enqueued.saturating_sub(dequeued),
            total_workers: self.workers,
            elapsed: self.start.elapsed(),
        }
    }
}

/// Coordinates the walk and the parallel aggregation
pub struct AggregateCoordinator {
    /// Configuration
    config: Arc<ResolvedConfig>,

    /// Pending-file queue
    queue: FileQueue,

    /// Output file owner
    writer: AggregationWriter,

    /// Walk counters
    walk_stats: Arc<WalkStats>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,

    /// Creation time
    start_time: Instant,
}

impl AggregateCoordinator {
    /// Create a new coordinator
    ///
    /// Validates the config and creates (truncates) the output file. Both are
    /// whole-run preconditions, so failures here are fatal.
    pub fn new(config: ResolvedConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let writer = AggregationWriter::create(&config.output_path)?;
        let queue = FileQueue::new(config.queue_size);

        Ok(Self {
            config,
            queue,
            writer,
            walk_stats: Arc::new(WalkStats::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            start_time: Instant::now(),
        })
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Get a probe for progress reporting
    pub fn progress_probe(&self) -> ProgressProbe {
        ProgressProbe {
            walk: Arc::clone(&self.walk_stats),
            output: self.writer.stats(),
            queue: self.queue.stats(),
            workers: self.config.worker_count,
            start: self.start_time,
        }
    }

    /// Run the aggregation to completion
    pub fn run(self) -> Result<AggregateResult> {
        let start_time = Instant::now();
        let Self {
            config,
            queue,
            writer,
            walk_stats,
            shutdown,
            ..
        } = self;

        info!(
            output = %config.output_path.display(),
            roots = config.input_dirs.len(),
            workers = config.worker_count,
            "Starting aggregation"
        );

        // Spawn workers
        let mut workers = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            match Worker::spawn(id + 1, queue.receiver(), writer.handle(), Arc::clone(&shutdown)) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Let the ones already running drain out before bailing
                    shutdown.store(true, Ordering::SeqCst);
                    drop(queue);
                    join_workers(&mut workers);
                    return Err(e.into());
                }
            }
        }
        debug!(count = workers.len(), "Workers spawned");

        // Producer: walk every root and feed the queue
        let sender = queue.into_sender();
        let walker = InputWalker::new(
            config.input_dirs.clone(),
            Arc::new(config.matcher()),
            Arc::clone(&walk_stats),
            Arc::clone(&shutdown),
        );

        for path in walker {
            match sender.send(FileTask::new(path), &shutdown) {
                Ok(()) => {}
                Err(SendFailure::Shutdown) => {
                    info!("Shutdown signal received, stopping walk");
                    break;
                }
                Err(SendFailure::Disconnected) => {
                    warn!("All workers have exited, stopping walk");
                    break;
                }
            }
        }

        // Closing the queue lets workers exit once it is drained
        drop(sender);
        debug!("Walk finished, waiting for workers");

        let worker_panics = join_workers(&mut workers);
        let totals = aggregate_stats(&workers);

        let summary = writer.finish()?;
        let duration = start_time.elapsed();
        let completed = !shutdown.load(Ordering::SeqCst);

        let result = AggregateResult {
            output_path: config.output_path.clone(),
            files_walked: walk_stats.files_emitted(),
            files_appended: summary.files_appended,
            files_failed: summary.files_failed,
            total_bytes: summary.bytes_copied,
            dirs_excluded: walk_stats.dirs_excluded.load(Ordering::Relaxed),
            files_excluded: walk_stats.files_excluded.load(Ordering::Relaxed),
            walk_errors: walk_stats.errors(),
            roots_skipped: walk_stats.roots_skipped(),
            files_skipped: totals.skipped,
            worker_panics,
            duration,
            completed,
        };

        info!(
            files = result.files_appended,
            bytes = result.total_bytes,
            errors = result.errors(),
            duration_ms = duration.as_millis() as u64,
            "Aggregation completed"
        );

        Ok(result)
    }
}

/// Join all worker threads, returning how many panicked
fn join_workers(workers: &mut [Worker]) -> u64 {
    let mut panics = 0;
    for worker in workers.iter_mut() {
        if let Err(e) = worker.join() {
            warn!(error = %e, "Worker failed to join cleanly");
            panics += 1;
        }
    }
    panics
}
