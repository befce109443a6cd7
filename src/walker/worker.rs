//! Worker thread logic for parallel directory scanning
//!
//! Each worker:
//! - Pulls directory jobs from the shared queue (or its own backlog)
//! - Announces the directory on the Information stream
//! - Lists it with the directory lister
//! - Counts and pushes subdirectories back as new jobs
//! - Sends accepted files to the Results stream
//! - Sends listing failures to the Errors stream
//! - Marks the job done on the pending-work counter

use crate::error::{JobOutcome, ListError, WorkerError};
use crate::fs::identity::FileIdentity;
use crate::fs::lister::list_directory;
use crate::validator::{ExcludePatterns, Validator};
use crate::walker::events::{AbortHandle, EventSenders, ProgressEvent};
use crate::walker::pending::PendingWork;
use crate::walker::queue::{DirJob, JobReceiver, JobSender, WorkGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How long an idle worker waits on the queue before rechecking shutdown
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories listed
    pub dirs_processed: AtomicU64,

    /// Files delivered on Results
    pub files_found: AtomicU64,

    /// Bytes delivered (sum of file sizes)
    pub bytes_found: AtomicU64,

    /// Files rejected by the validator
    pub rejected: AtomicU64,

    /// Entries skipped by the lister
    pub skipped: AtomicU64,

    /// Subdirectories not descended (depth limit or exclusion)
    pub pruned: AtomicU64,

    /// Directories that failed to list
    pub errors: AtomicU64,
}

impl WorkerStats {
    fn record_dir(&self) {
        self.dirs_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_file(&self, bytes: u64) {
        self.files_found.fetch_add(1, Ordering::Relaxed);
        self.bytes_found.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_rejected(&self, count: u64) {
        self.rejected.fetch_add(count, Ordering::Relaxed);
    }

    fn record_skipped(&self, count: u64) {
        self.skipped.fetch_add(count, Ordering::Relaxed);
    }

    fn record_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Totals across all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerTotals {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub pruned: u64,
    pub errors: u64,
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(stats: &[Arc<WorkerStats>]) -> WorkerTotals {
    stats.iter().fold(WorkerTotals::default(), |mut t, s| {
        t.dirs += s.dirs_processed.load(Ordering::Relaxed);
        t.files += s.files_found.load(Ordering::Relaxed);
        t.bytes += s.bytes_found.load(Ordering::Relaxed);
        t.rejected += s.rejected.load(Ordering::Relaxed);
        t.skipped += s.skipped.load(Ordering::Relaxed);
        t.pruned += s.pruned.load(Ordering::Relaxed);
        t.errors += s.errors.load(Ordering::Relaxed);
        t
    })
}

/// State shared read-only by every worker of one scanner
pub(crate) struct WorkerContext {
    pub validator: Arc<dyn Validator>,
    pub identity: Arc<dyn FileIdentity>,
    pub pending: Arc<PendingWork>,
    pub abort: AbortHandle,
    pub recursive: Arc<AtomicBool>,
    pub max_depth: Option<u32>,
    pub exclude_dirs: ExcludePatterns,
}

impl WorkerContext {
    /// Whether a discovered subdirectory becomes a job
    fn should_descend(&self, job: &DirJob) -> bool {
        if let Some(max) = self.max_depth {
            if job.depth > max {
                return false;
            }
        }
        !self.exclude_dirs.is_excluded(&job.path)
    }
}

/// A worker thread that processes directory jobs
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
    pub(crate) fn spawn(
        id: usize,
        ctx: Arc<WorkerContext>,
        queue_rx: JobReceiver,
        queue_tx: JobSender,
        events: EventSenders,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || worker_loop(id, ctx, queue_rx, queue_tx, events, shutdown, stats_clone))
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

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
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
    ctx: Arc<WorkerContext>,
    queue_rx: JobReceiver,
    queue_tx: JobSender,
    events: EventSenders,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    // Jobs that did not fit on the shared queue; always drained first
    let mut backlog: Vec<DirJob> = Vec::new();

    loop {
        let job = match backlog.pop() {
            Some(job) => job,
            None => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match queue_rx.recv_timeout(IDLE_POLL) {
                    Some(job) => job,
                    None => continue,
                }
            }
        };

        // Mark as actively working
        let _guard = WorkGuard::new(&queue_rx);

        let outcome = process_job(id, &job, &ctx, &queue_tx, &mut backlog, &events, &stats);

        // This job's own listing is over, whatever its children do
        ctx.pending.done();

        match &outcome {
            JobOutcome::Listed { path, files, subdirs } => {
                trace!(worker = id, path = %path.display(), files, subdirs, "Directory listed");
            }
            JobOutcome::Cancelled { path } => {
                trace!(worker = id, path = %path.display(), "Directory dropped after abort");
            }
            JobOutcome::Failed { path, reason } => {
                warn!(worker = id, path = %path.display(), reason = %reason, "Directory failed");
            }
        }
    }

    info!(
        worker = id,
        dirs = stats.dirs_processed.load(Ordering::Relaxed),
        files = stats.files_found.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Process a single directory job
fn process_job(
    worker_id: usize,
    job: &DirJob,
    ctx: &WorkerContext,
    queue_tx: &JobSender,
    backlog: &mut Vec<DirJob>,
    events: &EventSenders,
    stats: &WorkerStats,
) -> JobOutcome {
    if ctx.abort.is_aborted() {
        return JobOutcome::Cancelled {
            path: job.path.clone(),
        };
    }

    let announced = events.progress(ProgressEvent {
        directory: job.path.clone(),
        worker: worker_id,
    });
    if !announced {
        trace!(worker = worker_id, "Information stream closed");
    }

    let listing = match list_directory(&job.path, ctx.validator.as_ref(), ctx.identity.as_ref()) {
        Ok(listing) => listing,
        Err(e) => {
            stats.record_error();
            let err = ListError::new(job.path.clone(), e);
            let reason = err.to_string();
            if events.errors.send(err).is_err() {
                debug!(worker = worker_id, "Errors stream closed");
            }
            return JobOutcome::Failed {
                path: job.path.clone(),
                reason,
            };
        }
    };

    stats.record_dir();
    stats.record_rejected(listing.rejected);
    stats.record_skipped(listing.skipped);

    let file_count = listing.files.len();
    let subdir_count = listing.dirs.len();

    if ctx.recursive.load(Ordering::Relaxed) {
        for dir in listing.dirs {
            if ctx.abort.is_aborted() {
                break;
            }

            let child = job.child(dir);
            if !ctx.should_descend(&child) {
                stats.record_pruned();
                continue;
            }

            // Count first, then publish
            ctx.pending.add(1);
            if let Err(child) = queue_tx.offer(child) {
                trace!(
                    worker = worker_id,
                    path = %child.path.display(),
                    "Queue full, keeping job on local backlog"
                );
                backlog.push(child);
            }
        }
    }

    for file in listing.files {
        let size = file.size;
        if events.results.send(file).is_err() {
            debug!(worker = worker_id, "Results stream closed");
            break;
        }
        stats.record_file(size);
    }

    JobOutcome::Listed {
        path: job.path.clone(),
        files: file_count,
        subdirs: subdir_count,
    }
}
