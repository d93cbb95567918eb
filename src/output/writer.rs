//! Aggregation writer
//!
//! Appends one labeled record per source file to the shared output. The
//! output lock is held for a whole record, so records from different workers
//! never interleave. Source reads of files up to [`BUFFERED_APPEND_LIMIT`]
//! happen before the lock is taken and therefore run concurrently.

use crate::error::{AppendError, AppendResult, OutputError};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Files at or below this size are read into memory before locking
pub const BUFFERED_APPEND_LIMIT: u64 = 8 * 1024 * 1024;

/// Chunk size when streaming large files under the lock
const STREAM_CHUNK: usize = 64 * 1024;

/// Output buffer size
const OUTPUT_BUFFER: usize = 256 * 1024;

type Sink = Arc<Mutex<BufWriter<File>>>;

/// Header line written before a file's content
pub fn header_line(path: &Path) -> String {
    format!("\n--- {} ---\n", path.display())
}

/// End-marker written after a file's content
pub fn end_marker(path: &Path) -> String {
    format!("\n--- End of {} ---\n\n", path.display())
}

/// Marker written in place of the end-marker when a streamed read fails
pub fn error_marker(path: &Path, error: &io::Error) -> String {
    format!("\n--- Error reading {}: {} ---\n\n", path.display(), error)
}

/// Statistics about appended files
#[derive(Debug, Default)]
pub struct OutputStats {
    /// Files fully appended
    pub files_appended: AtomicU64,

    /// Content bytes copied (headers and markers excluded)
    pub bytes_copied: AtomicU64,

    /// Files that failed to append
    pub files_failed: AtomicU64,
}

impl OutputStats {
    fn record_file(&self, bytes: u64) {
        self.files_appended.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Files appended so far
    pub fn files_appended(&self) -> u64 {
        self.files_appended.load(Ordering::Relaxed)
    }

    /// Content bytes copied so far
    pub fn bytes_copied(&self) -> u64 {
        self.bytes_copied.load(Ordering::Relaxed)
    }

    /// Failed files so far
    pub fn files_failed(&self) -> u64 {
        self.files_failed.load(Ordering::Relaxed)
    }
}

/// Final numbers once the output is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSummary {
    pub files_appended: u64,
    pub bytes_copied: u64,
    pub files_failed: u64,
}

/// Handle for appending to the shared output (clone for each worker)
#[derive(Clone)]
pub struct OutputHandle {
    sink: Sink,
    stats: Arc<OutputStats>,
}

impl OutputHandle {
    /// Append one source file as a labeled record
    ///
    /// Returns the number of content bytes copied. An open or read failure
    /// before anything is written leaves the output untouched.
    pub fn append_file(&self, path: &Path) -> AppendResult<u64> {
        let result = self.append_inner(path);
        match &result {
            Ok(bytes) => self.stats.record_file(*bytes),
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    fn append_inner(&self, path: &Path) -> AppendResult<u64> {
        let mut file = File::open(path).map_err(|source| AppendError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // Size is a hint only; a failed stat falls back to streaming
        let size = file.metadata().map(|m| m.len()).unwrap_or(u64::MAX);

        if size <= BUFFERED_APPEND_LIMIT {
            let mut content = Vec::with_capacity(size as usize);
            file.read_to_end(&mut content)
                .map_err(|source| AppendError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

            let mut out = self.sink.lock();
            write_record(&mut *out, path, &content).map_err(|source| AppendError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(content.len() as u64)
        } else {
            debug!(path = %path.display(), size = size, "Streaming large file");
            let mut out = self.sink.lock();
            stream_record(&mut *out, path, &mut file)
        }
    }

    /// Get output statistics
    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }
}

/// Write a full record for already-read content
fn write_record<W: Write>(out: &mut W, path: &Path, content: &[u8]) -> io::Result<()> {
    out.write_all(header_line(path).as_bytes())?;
    out.write_all(content)?;
    out.write_all(end_marker(path).as_bytes())?;
    Ok(())
}

/// Copy a reader into the output as a record, chunk by chunk
///
/// If the source fails after the header is out, an error marker closes the
/// record instead of the end-marker.
fn stream_record<W: Write, R: Read>(out: &mut W, path: &Path, src: &mut R) -> AppendResult<u64> {
    let write_err = |source| AppendError::Write {
        path: path.to_path_buf(),
        source,
    };

    out.write_all(header_line(path).as_bytes()).map_err(write_err)?;

    let mut buf = vec![0u8; STREAM_CHUNK];
    let mut copied = 0u64;

    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                warn!(path = %path.display(), error = %source, "Read failed mid-copy");
                out.write_all(error_marker(path, &source).as_bytes())
                    .map_err(write_err)?;
                return Err(AppendError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        out.write_all(&buf[..n]).map_err(write_err)?;
        copied += n as u64;
    }

    out.write_all(end_marker(path).as_bytes()).map_err(write_err)?;
    Ok(copied)
}

/// Owner of the output file
///
/// Created before workers start; [`finish`](Self::finish) flushes and closes
/// it once every handle has been dropped.
pub struct AggregationWriter {
    /// Output file path
    path: PathBuf,

    sink: Sink,

    stats: Arc<OutputStats>,
}

impl AggregationWriter {
    /// Create or truncate the output file
    pub fn create(path: &Path) -> Result<Self, OutputError> {
        let file = File::create(path).map_err(|source| OutputError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Output file created");

        Ok(Self {
            path: path.to_path_buf(),
            sink: Arc::new(Mutex::new(BufWriter::with_capacity(OUTPUT_BUFFER, file))),
            stats: Arc::new(OutputStats::default()),
        })
    }

    /// Get a handle for appending files
    pub fn handle(&self) -> OutputHandle {
        OutputHandle {
            sink: Arc::clone(&self.sink),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get output statistics
    pub fn stats(&self) -> Arc<OutputStats> {
        Arc::clone(&self.stats)
    }

    /// Flush and close the output
    ///
    /// All handles must have been dropped (workers joined) first.
    pub fn finish(self) -> Result<OutputSummary, OutputError> {
        let sink = Arc::try_unwrap(self.sink).map_err(|_| OutputError::StillShared {
            path: self.path.clone(),
        })?;

        let file = sink
            .into_inner()
            .into_inner()
            .map_err(|e| OutputError::Flush {
                path: self.path.clone(),
                source: e.into_error(),
            })?;
        drop(file);

        let summary = OutputSummary {
            files_appended: self.stats.files_appended(),
            bytes_copied: self.stats.bytes_copied(),
            files_failed: self.stats.files_failed(),
        };

        debug!(
            path = %self.path.display(),
            files = summary.files_appended,
            bytes = summary.bytes_copied,
            "Output closed"
        );

        Ok(summary)
    }
}
