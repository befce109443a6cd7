//! Progress reporting for the scanner
//!
//! Provides a live spinner using indicatif and a final summary.

use crate::fs::types::FileRecord;
use crate::walker::{ScanProgress, ScanSummary};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let template = "{spinner:.green} [{elapsed_precise}] {msg}";
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress, current: Option<&Path>) {
        let bytes_str = format_size(progress.bytes, BINARY);
        let rate = progress.files_per_second();

        let mut msg = format!(
            "Dirs: {} | Files: {} | Size: {} | Rate: {:.0}/s | Pending: {} | Workers: {}/{}",
            format_number(progress.dirs),
            format_number(progress.files),
            bytes_str,
            rate,
            format_number(progress.pending),
            progress.active_workers,
            progress.total_workers,
        );

        if let Some(dir) = current {
            msg.push_str(&format!(" | {}", style(dir.display()).dim()));
        }

        self.bar.set_message(msg);
    }

    /// Print a line above the spinner
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line);
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the scan
pub fn print_header(root: &Path, workers: usize) {
    println!();
    println!(
        "{} {}",
        style("dirscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Root:").bold(), root.display());
    println!("  {} {}", style("Workers:").bold(), workers);
    println!();
}

/// Print a summary of the scan results
pub fn print_summary(summary: &ScanSummary) {
    let bytes_str = format_size(summary.bytes, BINARY);

    println!();
    if summary.completed {
        println!("{}", style("Scan Complete").green().bold());
    } else {
        println!("{}", style("Scan Aborted").yellow().bold());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(summary.dirs)
    );
    println!("  {} {}", style("Files:").bold(), format_number(summary.files));
    println!("  {} {}", style("Total Size:").bold(), bytes_str);
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        summary.duration.as_secs_f64(),
        summary.files_per_second()
    );
    if summary.rejected > 0 {
        println!(
            "  {} {}",
            style("Filtered:").bold(),
            format_number(summary.rejected)
        );
    }
    if summary.pruned > 0 {
        println!(
            "  {} {}",
            style("Pruned dirs:").bold(),
            format_number(summary.pruned)
        );
    }
    if summary.backlogged > 0 {
        println!(
            "  {} {}",
            style("Backlogged dirs:").bold(),
            format_number(summary.backlogged)
        );
    }
    if summary.skipped > 0 {
        println!(
            "  {} {}",
            style("Skipped:").yellow().bold(),
            format_number(summary.skipped)
        );
    }
    if summary.errors > 0 {
        println!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(summary.errors)
        );
    }
    println!();
}

/// Print the largest files, biggest first
pub fn print_largest(files: &[FileRecord]) {
    if files.is_empty() {
        return;
    }

    println!("{}", style("Largest Files").cyan().bold());
    println!("{}", style("─".repeat(50)).dim());
    for file in files {
        println!(
            "  {:>12}  {}",
            format_size(file.size, BINARY),
            file.path.display()
        );
    }
    println!();
}
