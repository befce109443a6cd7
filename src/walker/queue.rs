//! Job queue with backpressure support
//!
//! This module provides the bounded queue of pending directory jobs shared
//! by every worker. When the queue is full a worker keeps the job on its
//! own backlog and processes it itself instead of blocking, so a pool of
//! workers can never deadlock waiting on each other to make room.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A directory waiting to be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirJob {
    /// Full path to the directory
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,
}

impl DirJob {
    /// Create a new directory job
    pub fn new(path: impl Into<PathBuf>, depth: u32) -> Self {
        Self {
            path: path.into(),
            depth,
        }
    }

    /// Create the root job
    pub fn root(path: impl Into<PathBuf>) -> Self {
        Self::new(path, 0)
    }

    /// Job for a subdirectory of this one
    pub fn child(&self, path: PathBuf) -> Self {
        Self::new(path, self.depth + 1)
    }
}

/// Statistics for the job queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Jobs placed on the shared queue
    pub enqueued: AtomicU64,

    /// Jobs kept on a worker backlog because the queue was full
    pub backlogged: AtomicU64,
}

impl QueueStats {
    /// Jobs placed on the shared queue
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Jobs that went to a worker backlog
    pub fn backlog_count(&self) -> u64 {
        self.backlogged.load(Ordering::Relaxed)
    }
}

/// Bounded queue of directory jobs
pub struct JobQueue {
    /// Sender for adding jobs
    sender: Sender<DirJob>,

    /// Receiver for taking jobs
    receiver: Receiver<DirJob>,

    /// Number of workers currently processing a job
    active_workers: Arc<AtomicUsize>,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl JobQueue {
    /// Create a new job queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            active_workers: Arc::new(AtomicUsize::new(0)),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender for this queue (clone for each worker)
    pub fn sender(&self) -> JobSender {
        JobSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> JobReceiver {
        JobReceiver {
            receiver: self.receiver.clone(),
            active_workers: Arc::clone(&self.active_workers),
        }
    }

    /// Number of workers currently processing a job
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Seed the queue with the root directory
    pub fn seed(&self, root: impl Into<PathBuf>) -> Result<(), TrySendError<DirJob>> {
        self.sender.try_send(DirJob::root(root))?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Handle for sending jobs to the queue
#[derive(Clone)]
pub struct JobSender {
    sender: Sender<DirJob>,
    stats: Arc<QueueStats>,
}

impl JobSender {
    /// Offer a job to the queue without blocking
    ///
    /// Hands the job back if the queue is full (or closed) so the caller
    /// can keep it on its backlog.
    pub fn offer(&self, job: DirJob) -> Result<(), DirJob> {
        match self.sender.try_send(job) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => {
                self.stats.backlogged.fetch_add(1, Ordering::Relaxed);
                Err(job)
            }
        }
    }
}

/// Handle for receiving jobs from the queue
#[derive(Clone)]
pub struct JobReceiver {
    receiver: Receiver<DirJob>,
    active_workers: Arc<AtomicUsize>,
}

impl JobReceiver {
    /// Receive a job, giving up after `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DirJob> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Mark this worker as active
    pub fn begin_work(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark this worker as idle
    pub fn end_work(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard for marking a worker as active
pub struct WorkGuard<'a> {
    receiver: &'a JobReceiver,
}

impl<'a> WorkGuard<'a> {
    /// Create a new work guard (marks worker as active)
    pub fn new(receiver: &'a JobReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}
