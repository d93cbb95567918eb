//! Shared output stream for aggregated files
//!
//! Every worker holds a cloned [`OutputHandle`]; all of them point at one
//! buffered file behind one mutex.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐  ┌───────────┐         ┌───────────┐
//! │ Worker 1  │  │ Worker 2  │   ...   │ Worker N  │
//! │ read file │  │ read file │         │ read file │
//! └─────┬─────┘  └─────┬─────┘         └─────┬─────┘
//!       │ header+content+end-marker (one lock hold per file)
//!       └──────────────┼─────────────────────┘
//!                      ▼
//!        ┌──────────────────────────┐
//!        │ Mutex<BufWriter<File>>   │
//!        └────────────┬─────────────┘
//!                     ▼
//!              combined.txt
//! ```
//!
//! # Record format
//!
//! ```text
//! \n--- /abs/path ---\n
//! <raw bytes>
//! \n--- End of /abs/path ---\n\n
//! ```

pub mod writer;

pub use writer::{
    end_marker, error_marker, header_line, AggregationWriter, OutputHandle, OutputStats,
    OutputSummary, BUFFERED_APPEND_LIMIT,
};
