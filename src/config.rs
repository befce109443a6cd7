//! Configuration types for dirscan
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime scanner configuration with validation

use crate::error::ConfigError;
use crate::validator::{All, ExcludePatterns, MinSize, RegularFilesOnly};
use crate::walker::events::ProgressMode;
use clap::Parser;
use std::path::PathBuf;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Minimum Results/Errors buffer
const MIN_BUFFER: usize = 1;

/// Default job queue capacity
const DEFAULT_QUEUE_SIZE: usize = 65_536;

/// Concurrent directory scanner
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dirscan",
    version,
    about = "Concurrent directory scanner that streams matching files while it walks",
    long_about = "Walks a directory tree with a fixed pool of worker threads and reports \
                  every file accepted by the configured filters as soon as it is found.\n\n\
                  Symlinks are reported as entries but never followed.",
    after_help = "EXAMPLES:\n    \
        dirscan /var/log --list\n    \
        dirscan ~/src -w 16 --exclude '/target$' --exclude '/\\.git$' --top 20\n    \
        dirscan /data --regular-only --min-size 1048576 -q"
)]
pub struct CliArgs {
    /// Directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Job queue size (pending directories held in memory)
    #[arg(long, default_value_t = DEFAULT_QUEUE_SIZE, value_name = "NUM")]
    pub queue_size: usize,

    /// Results stream buffer size
    #[arg(long, default_value = "1024", value_name = "NUM")]
    pub results_buffer: usize,

    /// Maximum directory depth below ROOT (unlimited if not set)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<u32>,

    /// Skip paths matching pattern, files and directories alike (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Report regular files only (no symlinks, devices, sockets)
    #[arg(long)]
    pub regular_only: bool,

    /// Only report files of at least this many bytes
    #[arg(long, value_name = "BYTES")]
    pub min_size: Option<u64>,

    /// Only scan ROOT itself, not its subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Deliver every progress event, waiting for the display to take it
    #[arg(long)]
    pub blocking_progress: bool,

    /// Print every reported file
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Print the N largest files after the scan
    #[arg(short = 'n', long, value_name = "N")]
    pub top: Option<usize>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show directory errors and debug logs)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Build the file validator selected by the flags
    pub fn validator(&self) -> Result<All, ConfigError> {
        let mut validator = All::new();

        if self.regular_only {
            validator = validator.with(RegularFilesOnly);
        }
        if let Some(min) = self.min_size {
            validator = validator.with(MinSize(min));
        }
        if !self.exclude_patterns.is_empty() {
            validator = validator.with(ExcludePatterns::new(&self.exclude_patterns)?);
        }

        Ok(validator)
    }
}

fn default_workers() -> usize {
    // Directory listing is I/O bound
    num_cpus::get() * 2
}

/// Validated scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of worker threads
    pub worker_count: usize,

    /// Job queue capacity
    pub queue_size: usize,

    /// Results stream capacity
    pub results_buffer: usize,

    /// Errors stream capacity
    pub errors_buffer: usize,

    /// Information stream delivery
    pub progress_mode: ProgressMode,

    /// Maximum traversal depth (root = 0)
    pub max_depth: Option<u32>,

    /// Directories matching these are not descended
    pub exclude_dirs: ExcludePatterns,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            worker_count: default_workers(),
            queue_size: DEFAULT_QUEUE_SIZE,
            results_buffer: 1024,
            errors_buffer: 64,
            progress_mode: ProgressMode::default(),
            max_depth: None,
            exclude_dirs: ExcludePatterns::default(),
        }
    }
}

impl ScanConfig {
    /// Maximum worker count accepted by `validate`
    ///
    /// `Scanner::init` itself takes any positive count.
    pub const MAX_WORKERS: usize = 512;

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let progress_mode = if args.blocking_progress {
            ProgressMode::Blocking
        } else {
            ProgressMode::default()
        };

        Self {
            worker_count: args.workers,
            queue_size: args.queue_size,
            results_buffer: args.results_buffer,
            errors_buffer: ScanConfig::default().errors_buffer,
            progress_mode,
            max_depth: args.max_depth,
            exclude_dirs: ExcludePatterns::new(&args.exclude_patterns)?,
        }
        .validate()
    }

    /// Check limits, returning the config unchanged if they hold
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.worker_count == 0 || self.worker_count > Self::MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.worker_count,
                max: Self::MAX_WORKERS,
            });
        }

        if self.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: self.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        if self.results_buffer < MIN_BUFFER {
            return Err(ConfigError::InvalidBufferSize {
                stream: "results",
                size: self.results_buffer,
                min: MIN_BUFFER,
            });
        }

        if self.errors_buffer < MIN_BUFFER {
            return Err(ConfigError::InvalidBufferSize {
                stream: "errors",
                size: self.errors_buffer,
                min: MIN_BUFFER,
            });
        }

        Ok(self)
    }

    pub fn with_workers(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    pub fn with_results_buffer(mut self, size: usize) -> Self {
        self.results_buffer = size;
        self
    }

    pub fn with_progress_mode(mut self, mode: ProgressMode) -> Self {
        self.progress_mode = mode;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_exclude_dirs(mut self, patterns: ExcludePatterns) -> Self {
        self.exclude_dirs = patterns;
        self
    }
}
