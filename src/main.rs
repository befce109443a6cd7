//! dirscan - Concurrent Directory Scanner
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{select, tick};
use dirscan::config::{CliArgs, ScanConfig};
use dirscan::fs::FileRecord;
use dirscan::progress::{print_header, print_largest, print_summary, ProgressReporter};
use dirscan::walker::{ScanSummary, Scanner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = ScanConfig::from_args(&args).context("Invalid configuration")?;
    let validator = args.validator().context("Invalid configuration")?;
    if !args.quiet {
        print_header(&args.root, config.worker_count);
    }

    // Create and start the scanner
    let mut scanner = Scanner::new(config);
    scanner.set_recursive(!args.no_recursive);
    scanner
        .init_from_config(validator)
        .context("Failed to initialize scanner")?;

    // Setup signal handler for cooperative abort
    let abort = scanner.abort_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping scan...");
        abort.abort();
    })
    .context("Failed to set signal handler")?;

    scanner
        .scan_directory(&args.root)
        .with_context(|| format!("Cannot scan '{}'", args.root.display()))?;

    let progress = (!args.quiet).then(ProgressReporter::new);

    let mut largest = TopFiles::new(args.top.unwrap_or(0));
    let summary = consume(&scanner, &args, progress.as_ref(), &mut largest)?;

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }

    scanner.close().context("Failed to shut down scanner")?;

    if !args.quiet {
        print_summary(&summary);
    }
    print_largest(&largest.into_sorted());

    if !summary.completed {
        info!("Scan was aborted before completion");
    }

    if summary.errors > 0 {
        info!(errors = summary.errors, "Scan completed with errors");
    }

    Ok(())
}

/// Read every stream until Finished
fn consume(
    scanner: &Scanner,
    args: &CliArgs,
    progress: Option<&ProgressReporter>,
    largest: &mut TopFiles,
) -> Result<ScanSummary> {
    let ticker = tick(Duration::from_millis(200));
    let mut current: Option<PathBuf> = None;

    loop {
        select! {
            recv(scanner.results()) -> msg => {
                let file = msg.context("Results stream closed")?;
                if args.list {
                    let line = format!(
                        "{:04o}\t{}\t{}",
                        file.mode.permissions(),
                        file.size,
                        file.path.display()
                    );
                    match progress {
                        Some(p) => p.println(line),
                        None => println!("{}", line),
                    }
                }
                largest.offer(file);
            },
            recv(scanner.errors()) -> msg => {
                let err = msg.context("Errors stream closed")?;
                if args.verbose {
                    warn!(
                        path = %err.path.display(),
                        error = %err.source,
                        "Directory could not be read"
                    );
                }
            },
            recv(scanner.information()) -> msg => {
                if let Ok(event) = msg {
                    current = Some(event.directory);
                }
            },
            recv(ticker) -> _ => {
                if let Some(p) = progress {
                    p.update(&scanner.progress(), current.as_deref());
                }
            },
            recv(scanner.finished()) -> msg => {
                return msg.context("Finished stream closed");
            },
        }
    }
}

/// Upper bound on the largest-files buffer reserved up front
const MAX_TOP_PREALLOC: usize = 4096;

/// Keeps the N largest files seen
struct TopFiles {
    limit: usize,
    files: Vec<FileRecord>,
}

impl TopFiles {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            files: Vec::with_capacity(limit.saturating_mul(2).min(MAX_TOP_PREALLOC)),
        }
    }

    fn offer(&mut self, file: FileRecord) {
        if self.limit == 0 {
            return;
        }
        self.files.push(file);
        if self.files.len() >= self.limit.saturating_mul(2) {
            self.truncate();
        }
    }

    fn truncate(&mut self) {
        self.files.sort_unstable_by(|a, b| b.size.cmp(&a.size));
        self.files.truncate(self.limit);
    }

    /// Largest first
    fn into_sorted(mut self) -> Vec<FileRecord> {
        self.truncate();
        self.files
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dirscan=debug,warn")
    } else {
        EnvFilter::new("dirscan=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
