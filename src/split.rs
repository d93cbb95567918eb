//! Split a finished output file into two halves by line count
//!
//! Runs once, after aggregation has finished and the output is closed.
//! Lines are handled as raw bytes, so content that is not valid UTF-8
//! passes through untouched.

use crate::error::SplitError;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The two files produced by a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    /// First half
    pub part1: PathBuf,

    /// Second half
    pub part2: PathBuf,

    /// Lines written to part1
    pub part1_lines: usize,

    /// Lines written to part2
    pub part2_lines: usize,
}

impl SplitResult {
    /// Lines across both parts
    pub fn total_lines(&self) -> usize {
        self.part1_lines + self.part2_lines
    }
}

/// Sibling paths `<stem>_part1<.ext>` and `<stem>_part2<.ext>`
///
/// A dot-name like `.combined` is all extension, so it becomes
/// `_part1.combined`.
pub fn part_paths(path: &Path) -> (PathBuf, PathBuf) {
    (part_path(path, "_part1"), part_path(path, "_part2"))
}

fn part_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path.file_name().unwrap_or_default();
    let mut part = OsString::new();

    match path.extension() {
        Some(ext) => {
            part.push(path.file_stem().unwrap_or_default());
            part.push(suffix);
            part.push(".");
            part.push(ext);
        }
        None if name.as_encoded_bytes().starts_with(b".") => {
            part.push(suffix);
            part.push(name);
        }
        None => {
            part.push(name);
            part.push(suffix);
        }
    }

    path.with_file_name(part)
}

/// Break content into lines
///
/// Lines end at `\n`; one trailing `\r` is dropped. A final newline does
/// not produce an extra empty line, but a final line without one is kept.
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    if content.is_empty() {
        return Vec::new();
    }

    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

fn write_lines(path: &Path, lines: &[&[u8]]) -> Result<(), SplitError> {
    let write_err = |source| SplitError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);

    for line in lines {
        writer.write_all(line).map_err(write_err)?;
        writer.write_all(b"\n").map_err(write_err)?;
    }

    writer.flush().map_err(write_err)?;
    Ok(())
}

/// Split `path` into two files of floor(n/2) and n - floor(n/2) lines
///
/// Fails with [`SplitError::Empty`] on a zero-line file, in which case no
/// part files are created. Every written line gets a trailing newline.
pub fn split_file(path: &Path) -> Result<SplitResult, SplitError> {
    let content = fs::read(path).map_err(|source| SplitError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let lines = split_lines(&content);
    let total = lines.len();
    if total == 0 {
        return Err(SplitError::Empty {
            path: path.to_path_buf(),
        });
    }

    let split_index = total / 2;
    let (part1, part2) = part_paths(path);

    debug!(
        path = %path.display(),
        total_lines = total,
        split_index = split_index,
        "Splitting combined file"
    );

    write_lines(&part1, &lines[..split_index])?;
    write_lines(&part2, &lines[split_index..])?;

    info!(
        part1 = %part1.display(),
        part2 = %part2.display(),
        "Split complete"
    );

    Ok(SplitResult {
        part1,
        part2,
        part1_lines: split_index,
        part2_lines: total - split_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_part_paths() {
        let (p1, p2) = part_paths(Path::new("/out/combined.txt"));
        assert_eq!(p1, PathBuf::from("/out/combined_part1.txt"));
        assert_eq!(p2, PathBuf::from("/out/combined_part2.txt"));

        let (p1, _) = part_paths(Path::new("/out/combined"));
        assert_eq!(p1, PathBuf::from("/out/combined_part1"));

        let (p1, _) = part_paths(Path::new("/out/archive.tar.gz"));
        assert_eq!(p1, PathBuf::from("/out/archive.tar_part1.gz"));
    }

    #[test]
    fn test_part_paths_dot_name() {
        let (p1, p2) = part_paths(Path::new("/out/.combined"));
        assert_eq!(p1, PathBuf::from("/out/_part1.combined"));
        assert_eq!(p2, PathBuf::from("/out/_part2.combined"));

        let (p1, _) = part_paths(Path::new("/out/.combined.txt"));
        assert_eq!(p1, PathBuf::from("/out/.combined_part1.txt"));
    }

    #[test]
    fn test_split_lines() {
        assert!(split_lines(b"").is_empty());
        assert_eq!(split_lines(b"a\nb\n"), vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(split_lines(b"a\r\nb"), vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(split_lines(b"\n"), vec![&b""[..]]);
        assert_eq!(split_lines(b"\n\nx"), vec![&b""[..], &b""[..], &b"x"[..]]);
    }

    #[test]
    fn test_split_odd_line_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("combined.txt");
        fs::write(&path, "1\n2\n3\n4\n5").unwrap();

        let result = split_file(&path).unwrap();
        assert_eq!(result.part1_lines, 2);
        assert_eq!(result.part2_lines, 3);
        assert_eq!(result.total_lines(), 5);

        assert_eq!(fs::read_to_string(&result.part1).unwrap(), "1\n2\n");
        // Missing final newline is added
        assert_eq!(fs::read_to_string(&result.part2).unwrap(), "3\n4\n5\n");
    }

    #[test]
    fn test_split_single_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.log");
        fs::write(&path, "only\n").unwrap();

        let result = split_file(&path).unwrap();
        assert_eq!(result.part1_lines, 0);
        assert_eq!(result.part2_lines, 1);
        assert_eq!(fs::read_to_string(&result.part1).unwrap(), "");
        assert_eq!(fs::read_to_string(&result.part2).unwrap(), "only\n");
    }

    #[test]
    fn test_split_empty_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("combined.txt");
        fs::write(&path, "").unwrap();

        let err = split_file(&path).unwrap_err();
        assert!(matches!(err, SplitError::Empty { .. }));

        let (p1, p2) = part_paths(&path);
        assert!(!p1.exists());
        assert!(!p2.exists());
    }

    #[test]
    fn test_split_missing_file() {
        let dir = tempdir().unwrap();
        let err = split_file(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, SplitError::Read { .. }));
    }

    #[test]
    fn test_split_preserves_binary_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, b"\xff\x00a\n\x01\xfe\n").unwrap();

        let result = split_file(&path).unwrap();
        assert_eq!(fs::read(&result.part1).unwrap(), b"\xff\x00a\n");
        assert_eq!(fs::read(&result.part2).unwrap(), b"\x01\xfe\n");
    }
}
