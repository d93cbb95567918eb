//! onefile - Configuration-driven file aggregator
//!
//! Walks a set of input directories, skips excluded folders and files, and
//! concatenates every remaining file into one output file. Each file becomes
//! a labeled record. The finished output can optionally be split into two
//! halves by line count.
//!
//! # Features
//!
//! - **Subtree Exclusion**: An excluded folder is pruned before descending,
//!   so nothing beneath it is ever opened.
//!
//! - **Parallel Appending**: A fixed pool of worker threads reads source
//!   files concurrently; each file is written to the output as one
//!   uninterrupted record.
//!
//! - **Backpressure**: The walker feeds a bounded queue and blocks when the
//!   workers fall behind.
//!
//! - **Fault Tolerant**: Unreadable roots, entries and files are logged and
//!   skipped; only whole-run preconditions are fatal.
//!
//! # Architecture
//!
//! ```text
//! config.yaml ──► ResolvedConfig ──► AggregateCoordinator
//!                                         │
//!                     InputWalker ──► FileQueue ──► Workers ──► combined.txt
//!                                                                   │
//!                                                        split_file (optional)
//!                                                                   ▼
//!                                          combined_part1.txt  combined_part2.txt
//! ```
//!
//! # Example
//!
//! ```bash
//! # Use ./config.yaml
//! onefile
//!
//! # Explicit config, then split the result
//! onefile --config project.yaml --split
//! ```

pub mod config;
pub mod error;
pub mod matcher;
pub mod output;
pub mod progress;
pub mod split;
pub mod walker;

pub use config::{CliArgs, FileConfig, ResolvedConfig};
pub use error::{AggregateError, Result};
pub use matcher::PathMatcher;
pub use split::{split_file, SplitResult};
pub use walker::{AggregateCoordinator, AggregateResult};
