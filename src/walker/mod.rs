//! Concurrent directory walker
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │        Scanner          │
//!                     │  - seeds root job       │
//!                     │  - completion watcher   │
//!                     └───────────┬─────────────┘
//!                                 │
//!                     ┌───────────▼─────────────┐
//!                     │   Job Queue (bounded)   │◄──── subdirectories
//!                     └───────────┬─────────────┘          │
//!       ┌─────────────────────────┼─────────────────────────┤
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────┴─────┐
//! │  Worker 0 │             │  Worker 1 │             │  Worker N │
//! │  readdir  │             │  readdir  │             │  readdir  │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └──────── Results / Errors / Information ──────────┘
//!                                 │
//!                            Consumer ──── Finished (once)
//! ```
//!
//! A pending-work counter tracks every job not yet fully listed. Workers
//! count a subdirectory before publishing it and mark their own job done
//! only after listing it, so the counter reaches zero exactly when the
//! tree is exhausted.

pub mod coordinator;
pub mod events;
pub mod pending;
pub mod queue;
pub mod worker;

pub use coordinator::{ScanProgress, Scanner};
pub use events::{AbortHandle, ProgressEvent, ProgressMode, ScanEvent, ScanSummary};
pub use pending::PendingWork;
pub use queue::{DirJob, JobQueue};
pub use worker::{WorkerStats, WorkerTotals};
