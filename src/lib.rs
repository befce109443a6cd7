//! dirscan - Concurrent Directory Scanner
//!
//! Recursively enumerates a directory tree with a fixed pool of worker
//! threads and streams every file accepted by a caller-supplied validator
//! while the walk is still running.
//!
//! # Features
//!
//! - **Streaming Results**: files arrive on a channel as soon as their
//!   directory is listed; there is no wait for the whole tree.
//!
//! - **Fixed Worker Pool**: N threads share one bounded job queue and
//!   re-enqueue the subdirectories they discover.
//!
//! - **Reliable Completion**: a pending-work counter detects the end of an
//!   arbitrarily wide and deep walk and fires Finished exactly once.
//!
//! - **Isolated Failures**: an unreadable directory is reported on the
//!   Errors stream and the rest of the tree is still scanned.
//!
//! - **Cooperative Abort**: workers stop listing and stop fanning out,
//!   and Finished still fires.
//!
//! # Example
//!
//! ```no_run
//! use dirscan::{ScanConfig, ScanEvent, Scanner};
//!
//! let mut scanner = Scanner::new(ScanConfig::default());
//! scanner.init(8, |_: &std::path::Path, m: &std::fs::Metadata| m.len() > 0)?;
//! scanner.scan_directory("/home")?;
//!
//! let summary = scanner.drain(|event| {
//!     if let ScanEvent::File(file) = event {
//!         println!("{} {}", file.size, file.path.display());
//!     }
//! })?;
//! scanner.close()?;
//! println!("{} files, {} bytes", summary.files, summary.bytes);
//! # Ok::<(), dirscan::ScanError>(())
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod progress;
pub mod validator;
pub mod walker;

pub use config::{CliArgs, ScanConfig};
pub use error::{ConfigError, ListError, Result, ScanError};
pub use fs::{FileId, FileIdentity, FileRecord};
pub use validator::Validator;
pub use walker::{AbortHandle, ProgressEvent, ProgressMode, ScanEvent, ScanSummary, Scanner};
