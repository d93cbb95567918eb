//! Progress reporting for the aggregator
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::walker::{AggregateProgress, AggregateResult, ProgressProbe};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often [`ProgressReporter::follow`] refreshes the message
const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

/// Progress reporter that displays aggregation status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,

    /// Stop signal
    stop: Arc<AtomicBool>,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner_style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner_style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Update the progress display
    pub fn update(&self, progress: &AggregateProgress) {
        let bytes_str = format_size(progress.bytes, BINARY);
        let rate = progress.files_per_second();

        let msg = format!(
            "Files: {}/{} | Size: {} | Rate: {:.0}/s | Queue: {} | Excluded: {} | Errors: {}",
            format_number(progress.files_appended),
            format_number(progress.files_walked),
            bytes_str,
            rate,
            progress.queue_size,
            format_number(progress.excluded),
            format_number(progress.errors),
        );

        self.bar.set_message(msg);
    }

    /// Keep the display in sync with `probe` until [`finish`](Self::finish)
    ///
    /// Blocks; run it on its own (scoped) thread.
    pub fn follow(&self, probe: &ProgressProbe) {
        while !self.stop.load(Ordering::SeqCst) {
            self.update(&probe.snapshot());
            thread::sleep(REFRESH_INTERVAL);
        }
    }

    /// Guard that stops [`follow`](Self::follow) when dropped
    ///
    /// Hold it on the thread that runs the work so a panic there still ends
    /// the follower and lets a surrounding `thread::scope` join.
    pub fn follow_guard(&self) -> FollowGuard<'_> {
        FollowGuard { reporter: self }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.stop.store(true, Ordering::SeqCst);
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.bar.finish_and_clear();
    }
}

/// Stops a [`ProgressReporter`] on drop, clearing it if it was never finished
pub struct FollowGuard<'a> {
    reporter: &'a ProgressReporter,
}

impl Drop for FollowGuard<'_> {
    fn drop(&mut self) {
        if self.reporter.bar.is_finished() {
            self.reporter.stop.store(true, Ordering::SeqCst);
        } else {
            self.reporter.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the aggregation results
pub fn print_summary(result: &AggregateResult) {
    let bytes_str = format_size(result.total_bytes, BINARY);
    let duration_secs = result.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        result.files_appended as f64 / duration_secs
    } else {
        0.0
    };

    let title = if result.completed {
        style("Aggregation Complete").green().bold()
    } else {
        style("Aggregation Interrupted").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Files:").bold(),
        format_number(result.files_appended)
    );
    println!("  {} {}", style("Total Size:").bold(), bytes_str);
    println!(
        "  {} {} dirs, {} files",
        style("Excluded:").bold(),
        format_number(result.dirs_excluded),
        format_number(result.files_excluded)
    );
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if result.errors() > 0 {
        println!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(result.errors())
        );
    }
    println!(
        "  {} {}",
        style("Output:").bold(),
        result.output_path.display()
    );
    println!();
}

/// Print a header at the start of the run
pub fn print_header(config: &str, roots: usize, workers: usize, output: &str) {
    println!();
    println!(
        "{} {}",
        style("onefile").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Config:").bold(), config);
    println!("  {} {}", style("Inputs:").bold(), roots);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}
