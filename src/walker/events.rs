//! Event streams between the workers and the consumer
//!
//! Streams:
//! - Results: one `FileRecord` per accepted file
//! - Errors: one `ListError` per directory that could not be listed
//! - Information: one `ProgressEvent` per directory a worker starts on
//! - Finished: exactly one `ScanSummary`, after everything else
//!
//! Results and Errors are bounded and block the sending worker while full,
//! so the consumer must keep draining both.
//!
//! Information depends on `ProgressMode`. In `Blocking` mode it is a
//! rendezvous channel: every worker stalls on its next directory until the
//! consumer takes the event. A consumer that stops reading Information in
//! this mode stalls the whole scan. `BestEffort` (the default) buffers a
//! few events and drops the rest.

use crate::error::ListError;
use crate::fs::types::FileRecord;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How progress events are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Unbuffered; each worker waits for the consumer to take its event
    Blocking,

    /// Buffered up to `capacity`; further events are dropped
    BestEffort { capacity: usize },
}

impl Default for ProgressMode {
    fn default() -> Self {
        ProgressMode::BestEffort { capacity: 256 }
    }
}

/// A worker started listing a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Directory being listed
    pub directory: PathBuf,

    /// Worker listing it
    pub worker: usize,
}

/// Final totals, delivered once on the Finished stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Directories listed
    pub dirs: u64,

    /// Files reported on Results
    pub files: u64,

    /// Sum of reported file sizes
    pub bytes: u64,

    /// Files rejected by the validator
    pub rejected: u64,

    /// Entries skipped (metadata or identifier unavailable)
    pub skipped: u64,

    /// Subdirectories not descended (depth limit or exclusion)
    pub pruned: u64,

    /// Directories that failed to list
    pub errors: u64,

    /// Progress events dropped in best-effort mode
    pub progress_dropped: u64,

    /// Subdirectories kept on a worker backlog because the queue was full
    pub backlogged: u64,

    /// When the scan started
    pub started_at: DateTime<Utc>,

    /// Time from scan start to Finished
    pub duration: Duration,

    /// False if the scan was aborted before the tree was exhausted
    pub completed: bool,
}

impl ScanSummary {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

/// Any event a consumer can receive
#[derive(Debug)]
pub enum ScanEvent {
    /// A file was accepted
    File(FileRecord),

    /// A directory could not be listed
    Error(ListError),

    /// A worker started on a directory
    Progress(ProgressEvent),
}

/// Cooperative cancellation shared by the scanner and its workers
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the scan stop as soon as possible
    ///
    /// Workers stop listing directories and stop enqueuing children; jobs
    /// already queued are drained without being listed, so Finished still
    /// fires.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Sending side of the streams, shared by workers and the watcher
#[derive(Clone)]
pub(crate) struct EventSenders {
    pub results: Sender<FileRecord>,
    pub errors: Sender<ListError>,
    pub information: Sender<ProgressEvent>,
    pub finished: Sender<ScanSummary>,
    pub progress_mode: ProgressMode,
    pub progress_dropped: Arc<AtomicU64>,
}

impl EventSenders {
    /// Emit a progress event according to the progress mode
    ///
    /// Returns false if the consumer side is gone.
    pub fn progress(&self, event: ProgressEvent) -> bool {
        match self.progress_mode {
            ProgressMode::Blocking => self.information.send(event).is_ok(),
            ProgressMode::BestEffort { .. } => match self.information.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.progress_dropped.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            },
        }
    }

    /// True once the consumer has taken every buffered result and error
    pub fn outputs_drained(&self) -> bool {
        self.results.is_empty() && self.errors.is_empty()
    }
}

/// Receiving side of the streams, owned by the scanner
pub(crate) struct EventStreams {
    pub results: Receiver<FileRecord>,
    pub errors: Receiver<ListError>,
    pub information: Receiver<ProgressEvent>,
    pub finished: Receiver<ScanSummary>,
}

/// Create all streams
pub(crate) fn channels(
    results_buffer: usize,
    errors_buffer: usize,
    progress_mode: ProgressMode,
) -> (EventSenders, EventStreams) {
    let (results_tx, results_rx) = bounded(results_buffer);
    let (errors_tx, errors_rx) = bounded(errors_buffer);
    let info_capacity = match progress_mode {
        ProgressMode::Blocking => 0,
        ProgressMode::BestEffort { capacity } => capacity,
    };
    let (info_tx, info_rx) = bounded(info_capacity);
    let (finished_tx, finished_rx) = bounded(1);

    let senders = EventSenders {
        results: results_tx,
        errors: errors_tx,
        information: info_tx,
        finished: finished_tx,
        progress_mode,
        progress_dropped: Arc::new(AtomicU64::new(0)),
    };

    let streams = EventStreams {
        results: results_rx,
        errors: errors_rx,
        information: info_rx,
        finished: finished_rx,
    };

    (senders, streams)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(dir: &str) -> ProgressEvent {
        ProgressEvent {
            directory: PathBuf::from(dir),
            worker: 0,
        }
    }

    #[test]
    fn test_best_effort_progress_drops_when_full() {
        let (senders, streams) = channels(4, 4, ProgressMode::BestEffort { capacity: 1 });

        assert!(senders.progress(event("/a")));
        assert!(senders.progress(event("/b")));
        assert_eq!(senders.progress_dropped.load(Ordering::Relaxed), 1);

        assert_eq!(streams.information.try_recv().unwrap().directory, PathBuf::from("/a"));
        assert!(streams.information.try_recv().is_err());
    }

    #[test]
    fn test_progress_reports_disconnect() {
        let (senders, streams) = channels(4, 4, ProgressMode::default());
        drop(streams);
        assert!(!senders.progress(event("/a")));
    }

    #[test]
    fn test_blocking_progress_rendezvous() {
        let (senders, streams) = channels(4, 4, ProgressMode::Blocking);

        let sender = std::thread::spawn(move || senders.progress(event("/a")));
        let received = streams.information.recv().unwrap();

        assert_eq!(received.directory, PathBuf::from("/a"));
        assert!(sender.join().unwrap());
    }

    #[test]
    fn test_abort_handle_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_aborted());
        handle.abort();
        assert!(clone.is_aborted());
    }

    #[test]
    fn test_summary_rate() {
        let summary = ScanSummary {
            dirs: 10,
            files: 1000,
            bytes: 0,
            rejected: 0,
            skipped: 0,
            pruned: 0,
            errors: 0,
            progress_dropped: 0,
            backlogged: 0,
            started_at: Utc::now(),
            duration: Duration::from_secs(10),
            completed: true,
        };
        assert!((summary.files_per_second() - 100.0).abs() < 0.1);
    }
}
