//! Bounded file queue with backpressure
//!
//! The walker pushes accepted file paths; workers pop them. When the queue
//! is full the walker blocks until a worker frees a slot. Dropping the last
//! sender closes the queue: workers drain what is left and then see `None`.

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked send waits before re-checking shutdown
const SEND_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A file waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Absolute path of the file
    pub path: PathBuf,
}

impl FileTask {
    /// Create a new file task
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Why a task could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Every receiver is gone
    Disconnected,

    /// Shutdown was requested while waiting for space
    Shutdown,
}

/// Statistics for the file queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,

    /// Number of times the walker had to wait for space
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (dequeued tasks)
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

/// Bounded FIFO of file tasks
pub struct FileQueue {
    sender: Sender<FileTask>,
    receiver: Receiver<FileTask>,
    stats: Arc<QueueStats>,
}

impl FileQueue {
    /// Create a new queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> FileQueueReceiver {
        FileQueueReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Split into the producer side, closing the queue once it is dropped
    ///
    /// Receivers must be taken before calling this.
    pub fn into_sender(self) -> FileQueueSender {
        FileQueueSender {
            sender: self.sender,
            stats: self.stats,
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

/// Producer handle
pub struct FileQueueSender {
    sender: Sender<FileTask>,
    stats: Arc<QueueStats>,
}

impl FileQueueSender {
    /// Send a task, blocking while the queue is full
    ///
    /// Gives up with [`SendFailure::Shutdown`] if `shutdown` is raised while
    /// waiting.
    pub fn send(&self, task: FileTask, shutdown: &AtomicBool) -> Result<(), SendFailure> {
        let mut task = match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                return Err(SendFailure::Disconnected)
            }
            Err(crossbeam_channel::TrySendError::Full(task)) => task,
        };

        self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Err(SendFailure::Shutdown);
            }

            match self.sender.send_timeout(task, SEND_POLL_INTERVAL) {
                Ok(()) => {
                    self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(SendTimeoutError::Timeout(t)) => task = t,
                Err(SendTimeoutError::Disconnected(_)) => return Err(SendFailure::Disconnected),
            }
        }
    }
}

/// Consumer handle
#[derive(Clone)]
pub struct FileQueueReceiver {
    receiver: Receiver<FileTask>,
    stats: Arc<QueueStats>,
}

impl FileQueueReceiver {
    /// Receive a task from the queue
    ///
    /// Blocks until a task is available. Returns `None` once the queue is
    /// closed and drained.
    pub fn recv(&self) -> Option<FileTask> {
        match self.receiver.recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Try to receive a task without blocking
    pub fn try_recv(&self) -> Option<FileTask> {
        match self.receiver.try_recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn task(p: &str) -> FileTask {
        FileTask::new(PathBuf::from(p))
    }

    #[test]
    fn test_queue_fifo() {
        let queue = FileQueue::new(10);
        let receiver = queue.receiver();
        let sender = queue.into_sender();
        let shutdown = AtomicBool::new(false);

        sender.send(task("/a"), &shutdown).unwrap();
        sender.send(task("/b"), &shutdown).unwrap();
        assert_eq!(receiver.len(), 2);

        assert_eq!(receiver.recv().unwrap().path, PathBuf::from("/a"));
        assert_eq!(receiver.recv().unwrap().path, PathBuf::from("/b"));
        assert!(receiver.try_recv().is_none());
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_queue_closes_when_sender_dropped() {
        let queue = FileQueue::new(4);
        let receiver = queue.receiver();
        let sender = queue.into_sender();
        let shutdown = AtomicBool::new(false);

        sender.send(task("/last"), &shutdown).unwrap();
        drop(sender);

        // Remaining work is still drained before the close is observed
        assert_eq!(receiver.recv().unwrap().path, PathBuf::from("/last"));
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn test_queue_backpressure_blocks_until_space() {
        let queue = FileQueue::new(1);
        let stats = queue.stats();
        let receiver = queue.receiver();
        let sender = queue.into_sender();
        let shutdown = AtomicBool::new(false);

        sender.send(task("/1"), &shutdown).unwrap();

        let consumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let mut seen = Vec::new();
            while let Some(t) = receiver.recv() {
                seen.push(t.path);
            }
            seen
        });

        // Queue is full: this waits for the consumer
        sender.send(task("/2"), &shutdown).unwrap();
        drop(sender);

        let seen = consumer.join().unwrap();
        assert_eq!(seen, vec![PathBuf::from("/1"), PathBuf::from("/2")]);
        assert_eq!(stats.backpressure_count(), 1);
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 2);
        assert_eq!(stats.throughput(), 2);
    }

    #[test]
    fn test_send_gives_up_on_shutdown() {
        let queue = FileQueue::new(1);
        let _receiver = queue.receiver();
        let sender = queue.into_sender();
        let shutdown = AtomicBool::new(false);

        sender.send(task("/1"), &shutdown).unwrap();
        shutdown.store(true, Ordering::SeqCst);
        assert_eq!(
            sender.send(task("/2"), &shutdown),
            Err(SendFailure::Shutdown)
        );
    }

    #[test]
    fn test_send_without_receivers() {
        let queue = FileQueue::new(1);
        let sender = queue.into_sender();
        let shutdown = AtomicBool::new(false);
        assert_eq!(
            sender.send(task("/x"), &shutdown),
            Err(SendFailure::Disconnected)
        );
    }
}
