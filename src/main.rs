//! onefile - Configuration-driven file aggregator
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use onefile::config::{CliArgs, ResolvedConfig};
use onefile::progress::{print_header, print_summary, ProgressReporter};
use onefile::split::split_file;
use onefile::walker::{AggregateCoordinator, AggregateResult};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::thread;
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

    let config_display = args.config.display().to_string();

    // Load, resolve and validate config
    let config = ResolvedConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &config_display,
            config.input_dirs.len(),
            config.worker_count,
            &config.output_path.display().to_string(),
        );
    }

    let result = aggregate(&config)?;

    if config.show_progress {
        print_summary(&result);
    }

    info!(
        output = %result.output_path.display(),
        "All files have been combined"
    );

    if result.errors() > 0 {
        info!(errors = result.errors(), "Aggregation completed with errors");
    }

    if !config.split {
        return Ok(());
    }

    if !result.completed {
        warn!("Aggregation was interrupted, not splitting partial output");
        return Ok(());
    }

    let split = split_file(&result.output_path).with_context(|| {
        format!(
            "Error splitting the file '{}'",
            result.output_path.display()
        )
    })?;

    info!(
        part1 = %split.part1.display(),
        part2 = %split.part2.display(),
        lines = split.total_lines(),
        "The file has been split"
    );

    Ok(())
}

/// Run the aggregation phase, with a spinner unless quiet
fn aggregate(config: &ResolvedConfig) -> Result<AggregateResult> {
    // Create coordinator (creates the output file)
    let coordinator =
        AggregateCoordinator::new(config.clone()).context("Failed to initialize aggregator")?;

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    if !config.show_progress {
        return coordinator.run().context("Aggregation failed");
    }

    let reporter = ProgressReporter::new();
    reporter.set_status("Walking input directories...");
    let probe = coordinator.progress_probe();

    let result = thread::scope(|s| {
        let _stop_follow = reporter.follow_guard();
        s.spawn(|| reporter.follow(&probe));

        let result = coordinator.run();
        match &result {
            Ok(r) if r.completed => reporter.finish("Aggregation completed"),
            Ok(_) => reporter.finish("Aggregation interrupted"),
            Err(_) => reporter.finish_and_clear(),
        }
        result
    });

    result.context("Aggregation failed")
}

fn setup_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "onefile=debug,warn"
    } else {
        "onefile=info,warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
