//! Error types for dirscan
//!
//! This module defines the error hierarchy:
//! - Configuration errors (bad worker count, queue size, patterns)
//! - Scanner lifecycle errors (scan before init, close before finish)
//! - Root validation errors
//! - Recoverable per-directory listing errors
//! - Worker thread errors
//!
//! Only configuration, lifecycle and root errors are returned from the
//! scanner's operations. Listing errors travel on the Errors stream and
//! never stop a scan.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for dirscan
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `scan_directory` called before `init`
    #[error("Scanner not initialized: call init() first")]
    NotInitialized,

    /// `init` called twice on the same scanner
    #[error("Scanner already initialized: use a fresh scanner per scan")]
    AlreadyInitialized,

    /// A scan is already running on this scanner
    #[error("A scan is already in progress on this scanner")]
    AlreadyStarted,

    /// The scan on this scanner already finished
    #[error("Scan already finished: use a fresh scanner per scan")]
    AlreadyFinished,

    /// `close` called before the Finished event fired
    #[error("Cannot close scanner before the scan has finished")]
    NotFinished,

    /// `close` called twice
    #[error("Scanner already closed")]
    AlreadyClosed,

    /// Root path missing or not a directory
    #[error("Invalid scan root '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid stream buffer size
    #[error("Invalid {stream} buffer size {size}: must be at least {min}")]
    InvalidBufferSize {
        stream: &'static str,
        size: usize,
        min: usize,
    },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker thread could not be spawned
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// A directory that could not be opened or enumerated
///
/// Delivered on the scanner's Errors stream. The rest of the tree is
/// still walked.
#[derive(Error, Debug)]
#[error("Failed to read directory '{}': {source}", path.display())]
pub struct ListError {
    /// Directory that failed
    pub path: PathBuf,

    /// Underlying I/O error
    #[source]
    pub source: io::Error,
}

impl ListError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// Kind of the underlying I/O error
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Directory was not readable by this process
    pub fn is_permission_denied(&self) -> bool {
        self.kind() == io::ErrorKind::PermissionDenied
    }

    /// Directory vanished between discovery and listing
    pub fn is_not_found(&self) -> bool {
        self.kind() == io::ErrorKind::NotFound
    }
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Represents the outcome of processing a single directory job
#[derive(Debug)]
pub enum JobOutcome {
    /// Directory listed
    Listed {
        path: PathBuf,
        files: usize,
        subdirs: usize,
    },

    /// Listing failed; the error was forwarded to the Errors stream
    Failed { path: PathBuf, reason: String },

    /// Cancellation was requested before the directory was listed
    Cancelled { path: PathBuf },
}
