//! Parallel walk-and-aggregate pipeline
//!
//! # Architecture
//!
//! ```text
//!                 ┌─────────────────────────┐
//!                 │  AggregateCoordinator   │
//!                 │  InputWalker (producer) │
//!                 │  - prune excluded dirs  │
//!                 │  - drop excluded files  │
//!                 └───────────┬─────────────┘
//!                             │ FileTask
//!                             ▼
//!                 ┌─────────────────────────┐
//!                 │   FileQueue (bounded)   │
//!                 │  - blocks when full     │
//!                 └───────────┬─────────────┘
//!       ┌─────────────────────┼─────────────────────┐
//!       │                     │                     │
//! ┌─────▼─────┐         ┌─────▼─────┐         ┌─────▼─────┐
//! │  Worker 1 │         │  Worker 2 │         │  Worker N │
//! │  append   │         │  append   │         │  append   │
//! └─────┬─────┘         └─────┬─────┘         └─────┬─────┘
//!       └─────────────────────┼─────────────────────┘
//!                             ▼
//!                      shared output file
//! ```

pub mod coordinator;
pub mod queue;
pub mod tree;
pub mod worker;

pub use coordinator::{AggregateCoordinator, AggregateProgress, AggregateResult, ProgressProbe};
pub use queue::{FileQueue, FileTask};
pub use tree::{InputWalker, TreeWalker, WalkStats};
