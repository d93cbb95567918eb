//! Error types for onefile
//!
//! This module defines the error hierarchy for:
//! - Configuration loading and validation
//! - Output file creation and finalization
//! - Per-file aggregation failures (recoverable, logged by workers)
//! - Worker thread failures
//! - The post-aggregation split step
//!
//! Library code returns these structured errors; the binary wraps them with
//! anyhow context.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for an aggregation run
#[derive(Error, Debug)]
pub enum AggregateError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Output file errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Configuration file and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected shape
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    /// No input directories configured
    #[error("No input directories specified in the configuration")]
    NoInputDirs,

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Output directory could not be created
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Current directory could not be determined
    #[error("Failed to resolve config location '{path}': {source}")]
    Location {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors on the shared output file itself
#[derive(Error, Debug)]
pub enum OutputError {
    /// Output file could not be created or truncated
    #[error("Failed to create output file '{path}': {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Final flush failed
    #[error("Failed to flush output file '{path}': {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output handles were still alive when finishing
    #[error("Output file '{path}' still has active writers")]
    StillShared { path: PathBuf },
}

/// Failure to append a single source file
///
/// These are recoverable: the worker logs them and moves on.
#[derive(Error, Debug)]
pub enum AppendError {
    /// Source file could not be opened
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Source file could not be read
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing to the output failed
    #[error("Failed to write '{path}' to output: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AppendError {
    /// Path of the source file that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            AppendError::Open { path, .. } => path,
            AppendError::Read { path, .. } => path,
            AppendError::Write { path, .. } => path,
        }
    }

    /// Returns true if the failure was on the output side
    pub fn is_output_failure(&self) -> bool {
        matches!(self, AppendError::Write { .. })
    }
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

/// Errors from splitting the finished output
#[derive(Error, Debug)]
pub enum SplitError {
    /// Nothing to split
    #[error("The combined file '{path}' is empty")]
    Empty { path: PathBuf },

    /// Combined file could not be read
    #[error("Failed to read the combined file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A part file could not be written
    #[error("Failed to write to '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for AggregateError
pub type Result<T> = std::result::Result<T, AggregateError>;

/// Result type alias for AppendError
pub type AppendResult<T> = std::result::Result<T, AppendError>;

/// Outcome of processing a single file task
#[derive(Debug)]
pub enum FileOutcome {
    /// File was appended to the output
    Appended { path: PathBuf, bytes: u64 },

    /// Skipped because shutdown was requested
    Skipped { path: PathBuf, reason: String },

    /// Append failed
    Failed { error: AppendError },
}

impl FileOutcome {
    /// Returns true if this outcome represents success
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Appended { .. })
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &PathBuf {
        match self {
            FileOutcome::Appended { path, .. } => path,
            FileOutcome::Skipped { path, .. } => path,
            FileOutcome::Failed { error } => error.path(),
        }
    }
}
