//! Scanner - orchestrates a concurrent directory scan
//!
//! The scanner is responsible for:
//! - Owning the job queue, pending-work counter and event streams
//! - Starting the fixed worker pool
//! - Validating and seeding the scan root
//! - Running the completion watcher that emits Finished exactly once
//! - Tearing the pool and streams down once
//!
//! A scanner runs a single scan. Create a fresh one for every scan.

use crate::config::ScanConfig;
use crate::error::{ConfigError, ListError, Result, ScanError};
use crate::fs::identity::{FileIdentity, PlatformIdentity};
use crate::fs::lister::ensure_directory;
use crate::fs::types::FileRecord;
use crate::validator::{AcceptAll, Validator};
use crate::walker::events::{
    channels, AbortHandle, EventSenders, EventStreams, ProgressEvent, ProgressMode, ScanEvent,
    ScanSummary,
};
use crate::walker::pending::PendingWork;
use crate::walker::queue::{JobQueue, QueueStats};
use crate::walker::worker::{aggregate_stats, Worker, WorkerContext, WorkerStats};
use chrono::{DateTime, Utc};
use crossbeam_channel::{select, Receiver};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Poll interval while waiting for the consumer to drain buffered output
const DRAIN_POLL: Duration = Duration::from_millis(1);

/// How often the watcher rechecks shutdown while work is pending
const WATCH_POLL: Duration = Duration::from_millis(100);

/// Snapshot of a running scan, for progress display
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Directories listed
    pub dirs: u64,

    /// Files delivered
    pub files: u64,

    /// Bytes delivered
    pub bytes: u64,

    /// Directories that failed to list
    pub errors: u64,

    /// Jobs waiting on the shared queue
    pub queue_size: usize,

    /// Jobs not yet fully listed
    pub pending: u64,

    /// Workers currently processing a job
    pub active_workers: usize,

    /// Total workers
    pub total_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

/// Concurrent directory scanner
///
/// ```no_run
/// use dirscan::{ScanConfig, Scanner, validator::RegularFilesOnly};
///
/// let mut scanner = Scanner::new(ScanConfig::default());
/// scanner.init(4, RegularFilesOnly)?;
/// scanner.scan_directory("/var/log")?;
///
/// let summary = scanner.drain(|event| println!("{:?}", event))?;
/// println!("{} files", summary.files);
/// scanner.close()?;
/// # Ok::<(), dirscan::ScanError>(())
/// ```
pub struct Scanner {
    /// Configuration
    config: Arc<ScanConfig>,

    /// Job queue for directories
    queue: JobQueue,

    /// Outstanding jobs
    pending: Arc<PendingWork>,

    /// Sending side of the streams (cloned into workers and watcher)
    ///
    /// Dropped by `close`, which disconnects the streams once the workers
    /// and watcher have exited.
    senders: Option<EventSenders>,

    /// Receiving side of the streams
    streams: Option<EventStreams>,

    /// File validator
    validator: Arc<dyn Validator>,

    /// Identifier lookup
    identity: Arc<dyn FileIdentity>,

    /// Worker threads
    workers: Vec<Worker>,

    /// Per-worker statistics
    worker_stats: Vec<Arc<WorkerStats>>,

    /// Completion watcher thread
    watcher: Option<JoinHandle<()>>,

    /// Cancellation intake
    abort: AbortHandle,

    /// Stops idle workers
    shutdown: Arc<AtomicBool>,

    /// Descend into subdirectories
    recursive: Arc<AtomicBool>,

    /// Scan lifecycle flags
    initialized: bool,
    started: bool,
    finished: Arc<AtomicBool>,
    closed: bool,

    /// Scan start time
    start_time: Option<Instant>,
}

impl Scanner {
    /// Create a new scanner
    ///
    /// No threads start until `init`. The default validator accepts every
    /// file.
    pub fn new(config: ScanConfig) -> Self {
        let queue = JobQueue::new(config.queue_size);
        let (senders, streams) = channels(
            config.results_buffer,
            config.errors_buffer,
            config.progress_mode,
        );

        Self {
            config: Arc::new(config),
            queue,
            pending: Arc::new(PendingWork::new()),
            senders: Some(senders),
            streams: Some(streams),
            validator: Arc::new(AcceptAll),
            identity: Arc::new(PlatformIdentity),
            workers: Vec::new(),
            worker_stats: Vec::new(),
            watcher: None,
            abort: AbortHandle::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            recursive: Arc::new(AtomicBool::new(true)),
            initialized: false,
            started: false,
            finished: Arc::new(AtomicBool::new(false)),
            closed: false,
            start_time: None,
        }
    }

    /// Replace the identifier lookup (call before `init`)
    pub fn with_identity(mut self, identity: impl FileIdentity + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    /// Start `worker_count` workers using `validator` to select files
    ///
    /// Must be called exactly once, before `scan_directory`. Any positive
    /// count is accepted.
    pub fn init(&mut self, worker_count: usize, validator: impl Validator + 'static) -> Result<()> {
        if self.initialized {
            return Err(ScanError::AlreadyInitialized);
        }

        if worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount {
                count: worker_count,
                max: ScanConfig::MAX_WORKERS,
            }
            .into());
        }

        let senders = self.senders.clone().ok_or(ScanError::AlreadyClosed)?;
        self.validator = Arc::new(validator);

        let ctx = Arc::new(WorkerContext {
            validator: Arc::clone(&self.validator),
            identity: Arc::clone(&self.identity),
            pending: Arc::clone(&self.pending),
            abort: self.abort.clone(),
            recursive: Arc::clone(&self.recursive),
            max_depth: self.config.max_depth,
            exclude_dirs: self.config.exclude_dirs.clone(),
        });

        for id in 0..worker_count {
            let worker = Worker::spawn(
                id,
                Arc::clone(&ctx),
                self.queue.receiver(),
                self.queue.sender(),
                senders.clone(),
                Arc::clone(&self.shutdown),
            );

            match worker {
                Ok(worker) => {
                    self.worker_stats.push(worker.stats());
                    self.workers.push(worker);
                }
                Err(e) => {
                    let _ = self.stop_workers();
                    return Err(e.into());
                }
            }
        }

        self.initialized = true;
        info!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Start the worker count given in the configuration
    pub fn init_from_config(&mut self, validator: impl Validator + 'static) -> Result<()> {
        self.init(self.config.worker_count, validator)
    }

    /// Only report the root's own files; do not descend
    pub fn set_recursive(&mut self, recursive: bool) {
        self.recursive.store(recursive, Ordering::Relaxed);
    }

    /// Start scanning `root` in the background
    ///
    /// Fails synchronously, before any worker touches the tree, if the
    /// scanner is not initialized, has already scanned, or `root` is not an
    /// existing directory.
    pub fn scan_directory(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();

        if !self.initialized {
            return Err(ScanError::NotInitialized);
        }
        if self.finished.load(Ordering::SeqCst) {
            return Err(ScanError::AlreadyFinished);
        }
        if self.started {
            return Err(ScanError::AlreadyStarted);
        }

        ensure_directory(root).map_err(|reason| ScanError::InvalidRoot {
            path: root.to_path_buf(),
            reason,
        })?;

        let start_time = Instant::now();
        let started_at = Utc::now();
        self.start_time = Some(start_time);
        self.started = true;

        info!(
            root = %root.display(),
            workers = self.workers.len(),
            recursive = self.recursive.load(Ordering::Relaxed),
            "Starting scan"
        );

        // Count the root before any worker can see it
        self.pending.add(1);
        if self.queue.seed(root).is_err() {
            self.pending.done();
            return Err(ScanError::ChannelClosed);
        }

        self.spawn_watcher(start_time, started_at)
    }

    /// Spawn the completion watcher
    fn spawn_watcher(&mut self, start_time: Instant, started_at: DateTime<Utc>) -> Result<()> {
        let pending = Arc::clone(&self.pending);
        let senders = self.senders.clone().ok_or(ScanError::AlreadyClosed)?;
        let stats = self.worker_stats.clone();
        let queue_stats = self.queue.stats();
        let finished = Arc::clone(&self.finished);
        let abort = self.abort.clone();
        let shutdown = Arc::clone(&self.shutdown);

        // A rendezvous Information channel never buffers anything, and
        // holding a receiver would keep blocked workers from noticing drop
        let stale_progress = match self.config.progress_mode {
            ProgressMode::Blocking => None,
            ProgressMode::BestEffort { .. } => {
                self.streams.as_ref().map(|s| s.information.clone())
            }
        };

        let handle = thread::Builder::new()
            .name("walker-watcher".into())
            .spawn(move || {
                watch_completion(
                    pending,
                    senders,
                    stats,
                    queue_stats,
                    finished,
                    abort,
                    shutdown,
                    stale_progress,
                    start_time,
                    started_at,
                )
            })
            .map_err(ScanError::Io)?;

        self.watcher = Some(handle);
        Ok(())
    }

    /// Files accepted by the validator
    pub fn results(&self) -> &Receiver<FileRecord> {
        &self.streams().results
    }

    /// Directories that could not be listed
    pub fn errors(&self) -> &Receiver<ListError> {
        &self.streams().errors
    }

    /// Directories as workers start on them
    pub fn information(&self) -> &Receiver<ProgressEvent> {
        &self.streams().information
    }

    /// Fires exactly once, after all other events
    pub fn finished(&self) -> &Receiver<ScanSummary> {
        &self.streams().finished
    }

    fn streams(&self) -> &EventStreams {
        // Only `Drop` takes the streams
        match &self.streams {
            Some(streams) => streams,
            None => unreachable!("event streams accessed during drop"),
        }
    }

    /// Request cancellation
    pub fn abort(&self) {
        info!("Abort requested");
        self.abort.abort();
    }

    /// Cloneable cancellation handle (for signal handlers)
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Whether the Finished event has been emitted
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Consume every stream until Finished, handing events to `handler`
    pub fn drain(&self, mut handler: impl FnMut(ScanEvent)) -> Result<ScanSummary> {
        if !self.started {
            return Err(ScanError::NotInitialized);
        }

        if self.closed {
            return Err(ScanError::AlreadyClosed);
        }
        let streams = self.streams();

        loop {
            select! {
                recv(streams.results) -> msg => match msg {
                    Ok(record) => handler(ScanEvent::File(record)),
                    Err(_) => return Err(ScanError::ChannelClosed),
                },
                recv(streams.errors) -> msg => match msg {
                    Ok(err) => handler(ScanEvent::Error(err)),
                    Err(_) => return Err(ScanError::ChannelClosed),
                },
                recv(streams.information) -> msg => match msg {
                    Ok(event) => handler(ScanEvent::Progress(event)),
                    Err(_) => return Err(ScanError::ChannelClosed),
                },
                recv(streams.finished) -> msg => {
                    return msg.map_err(|_| ScanError::ChannelClosed);
                },
            }
        }
    }

    /// Get a progress snapshot
    pub fn progress(&self) -> ScanProgress {
        let totals = aggregate_stats(&self.worker_stats);
        ScanProgress {
            dirs: totals.dirs,
            files: totals.files,
            bytes: totals.bytes,
            errors: totals.errors,
            queue_size: self.queue.len(),
            pending: self.pending.count(),
            active_workers: self.queue.active_workers(),
            total_workers: self.workers.len(),
            elapsed: self.start_time.map(|t| t.elapsed()).unwrap_or_default(),
        }
    }

    /// Stop the workers and release the streams
    ///
    /// Allowed once, and only after Finished has fired.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(ScanError::AlreadyClosed);
        }
        if !self.finished.load(Ordering::SeqCst) {
            return Err(ScanError::NotFinished);
        }

        self.closed = true;

        if let Some(watcher) = self.watcher.take() {
            if watcher.join().is_err() {
                warn!("Completion watcher panicked");
            }
        }

        let result = self.stop_workers();
        self.senders = None;
        debug!("Scanner closed");
        result
    }

    /// Signal shutdown and join all workers
    fn stop_workers(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);

        let mut first_error = None;
        for worker in std::mem::take(&mut self.workers) {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker failed to join cleanly");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        // Unblock workers stuck on full streams, then let them drain
        self.abort.abort();
        self.streams = None;
        let _ = self.stop_workers();

        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

/// Wait for the pending-work counter to reach zero, then emit Finished
#[allow(clippy::too_many_arguments)]
fn watch_completion(
    pending: Arc<PendingWork>,
    senders: EventSenders,
    stats: Vec<Arc<WorkerStats>>,
    queue_stats: Arc<QueueStats>,
    finished: Arc<AtomicBool>,
    abort: AbortHandle,
    shutdown: Arc<AtomicBool>,
    stale_progress: Option<Receiver<ProgressEvent>>,
    start_time: Instant,
    started_at: DateTime<Utc>,
) {
    // Shutdown before completion only happens when the scanner is dropped
    while !pending.wait_timeout(WATCH_POLL) {
        if shutdown.load(Ordering::SeqCst) {
            debug!("Scanner dropped before completion");
            return;
        }
    }

    // Consumer must have taken every result and error before Finished
    while !senders.outputs_drained() {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep(DRAIN_POLL);
    }

    // Progress is advisory; do not let stale events trail Finished
    if let Some(info) = stale_progress {
        while info.try_recv().is_ok() {}
    }

    let totals = aggregate_stats(&stats);
    let summary = ScanSummary {
        dirs: totals.dirs,
        files: totals.files,
        bytes: totals.bytes,
        rejected: totals.rejected,
        skipped: totals.skipped,
        pruned: totals.pruned,
        errors: totals.errors,
        progress_dropped: senders.progress_dropped.load(Ordering::Relaxed),
        backlogged: queue_stats.backlog_count(),
        started_at,
        duration: start_time.elapsed(),
        completed: !abort.is_aborted(),
    };

    finished.store(true, Ordering::SeqCst);

    info!(
        dirs = summary.dirs,
        files = summary.files,
        bytes = summary.bytes,
        errors = summary.errors,
        completed = summary.completed,
        duration_ms = summary.duration.as_millis() as u64,
        "Scan finished"
    );

    if senders.finished.send(summary).is_err() {
        debug!("Finished stream closed before completion");
    }
}
