//! Directory tree walking with exclusion pruning
//!
//! [`TreeWalker`] lazily yields the included files under one root, depth
//! first. Excluded folders are pruned before descending, so nothing beneath
//! them is ever read. [`InputWalker`] chains several roots one after another.

use crate::matcher::PathMatcher;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counters shared by every walker of a run
#[derive(Debug, Default)]
pub struct WalkStats {
    /// Directories descended into
    pub dirs_visited: AtomicU64,

    /// Files handed to the consumer
    pub files_emitted: AtomicU64,

    /// Directories pruned by an exclude-folder rule
    pub dirs_excluded: AtomicU64,

    /// Files dropped by an exclude-file rule
    pub files_excluded: AtomicU64,

    /// Entries that could not be read
    pub errors: AtomicU64,

    /// Configured roots that were missing or not directories
    pub roots_skipped: AtomicU64,
}

impl WalkStats {
    /// Files emitted so far
    pub fn files_emitted(&self) -> u64 {
        self.files_emitted.load(Ordering::Relaxed)
    }

    /// Directories and files excluded so far
    pub fn excluded(&self) -> u64 {
        self.dirs_excluded.load(Ordering::Relaxed) + self.files_excluded.load(Ordering::Relaxed)
    }

    /// Walk errors so far
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Skipped roots so far
    pub fn roots_skipped(&self) -> u64 {
        self.roots_skipped.load(Ordering::Relaxed)
    }
}

/// Lazy depth-first walk of a single root
pub struct TreeWalker {
    inner: walkdir::IntoIter,
    matcher: Arc<PathMatcher>,
    stats: Arc<WalkStats>,
    shutdown: Arc<AtomicBool>,
}

impl TreeWalker {
    /// Create a walker for `root`
    ///
    /// Symlinks below the root are not followed; they are yielded as files.
    pub fn new(
        root: &Path,
        matcher: Arc<PathMatcher>,
        stats: Arc<WalkStats>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let inner = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Self {
            inner,
            matcher,
            stats,
            shutdown,
        }
    }
}

impl Iterator for TreeWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return None;
            }

            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!(path = %path, error = %e, "Error accessing path");
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if self.matcher.is_excluded_dir(entry.path()) {
                    info!(path = %entry.path().display(), "Excluding directory");
                    self.stats.dirs_excluded.fetch_add(1, Ordering::Relaxed);
                    self.inner.skip_current_dir();
                } else {
                    self.stats.dirs_visited.fetch_add(1, Ordering::Relaxed);
                }
                continue;
            }

            if self.matcher.is_excluded_file(entry.path()) {
                info!(path = %entry.path().display(), "Excluding file");
                self.stats.files_excluded.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            self.stats.files_emitted.fetch_add(1, Ordering::Relaxed);
            return Some(entry.into_path());
        }
    }
}

/// Why a configured root was not walked
fn check_root(root: &Path) -> Result<(), String> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err("not a directory".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Sequential walk over every configured root
///
/// Roots that are missing or not directories are logged and skipped.
/// Output of consecutive roots is simply concatenated.
pub struct InputWalker {
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<TreeWalker>,
    matcher: Arc<PathMatcher>,
    stats: Arc<WalkStats>,
    shutdown: Arc<AtomicBool>,
}

impl InputWalker {
    /// Create a walker over `roots`, in order
    pub fn new(
        roots: Vec<PathBuf>,
        matcher: Arc<PathMatcher>,
        stats: Arc<WalkStats>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            roots: roots.into_iter(),
            current: None,
            matcher,
            stats,
            shutdown,
        }
    }
}

impl Iterator for InputWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return None;
            }

            if let Some(walker) = self.current.as_mut() {
                if let Some(path) = walker.next() {
                    return Some(path);
                }
                self.current = None;
            }

            let root = self.roots.next()?;
            match check_root(&root) {
                Ok(()) => {
                    debug!(root = %root.display(), "Walking input directory");
                    self.current = Some(TreeWalker::new(
                        &root,
                        Arc::clone(&self.matcher),
                        Arc::clone(&self.stats),
                        Arc::clone(&self.shutdown),
                    ));
                }
                Err(reason) => {
                    warn!(root = %root.display(), reason = %reason, "Skipping input directory");
                    self.stats.roots_skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn walk(root: &Path, matcher: PathMatcher) -> (Vec<PathBuf>, Arc<WalkStats>) {
        let stats = Arc::new(WalkStats::default());
        let files = TreeWalker::new(
            root,
            Arc::new(matcher),
            Arc::clone(&stats),
            Arc::new(AtomicBool::new(false)),
        )
        .collect();
        (files, stats)
    }

    #[test]
    fn test_walk_all_files_depth_first() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.txt"));
        touch(&root.join("a/one.txt"));
        touch(&root.join("a/deep/two.txt"));

        let (files, stats) = walk(root, PathMatcher::default());
        assert_eq!(
            files,
            vec![
                root.join("a/deep/two.txt"),
                root.join("a/one.txt"),
                root.join("b.txt"),
            ]
        );
        assert_eq!(stats.files_emitted(), 3);
        assert_eq!(stats.dirs_visited.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_walk_prunes_excluded_subtree() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("x.txt"));
        touch(&root.join("skip/y.txt"));
        touch(&root.join("skip/nested/deeper/z.txt"));

        let matcher = PathMatcher::new([root.join("skip")], Vec::<PathBuf>::new());
        let (files, stats) = walk(root, matcher);

        assert_eq!(files, vec![root.join("x.txt")]);
        // Pruned once at the top, never descended
        assert_eq!(stats.dirs_excluded.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_walk_excluded_root() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("x.txt"));

        let matcher = PathMatcher::new([dir.path()], Vec::<PathBuf>::new());
        let (files, _) = walk(dir.path(), matcher);
        assert!(files.is_empty());
    }

    #[test]
    fn test_walk_drops_excluded_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("x.txt"));
        touch(&root.join("X.txt.keep"));

        let matcher = PathMatcher::new(Vec::<PathBuf>::new(), [root.join("x.txt")]);
        let (files, stats) = walk(root, matcher);

        assert_eq!(files, vec![root.join("X.txt.keep")]);
        assert_eq!(stats.files_excluded.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_walk_continues_after_entry_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/1.txt"));
        touch(&root.join("b/2.txt"));
        touch(&root.join("c.txt"));

        let stats = Arc::new(WalkStats::default());
        let mut walker = TreeWalker::new(
            root,
            Arc::new(PathMatcher::default()),
            Arc::clone(&stats),
            Arc::new(AtomicBool::new(false)),
        );
        assert_eq!(walker.next(), Some(root.join("a/1.txt")));

        // The root listing is already read; "b" now fails to open
        fs::remove_dir_all(root.join("b")).unwrap();

        let rest: Vec<PathBuf> = walker.collect();
        assert_eq!(rest, vec![root.join("c.txt")]);
        assert_eq!(stats.errors(), 1);
    }

    #[test]
    fn test_input_walker_skips_bad_roots() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        touch(&a.join("1.txt"));
        touch(&b.join("2.txt"));
        let file_root = dir.path().join("plain.txt");
        touch(&file_root);

        let stats = Arc::new(WalkStats::default());
        let files: Vec<PathBuf> = InputWalker::new(
            vec![a.clone(), dir.path().join("missing"), file_root, b.clone()],
            Arc::new(PathMatcher::default()),
            Arc::clone(&stats),
            Arc::new(AtomicBool::new(false)),
        )
        .collect();

        assert_eq!(files, vec![a.join("1.txt"), b.join("2.txt")]);
        assert_eq!(stats.roots_skipped(), 2);
    }

    #[test]
    fn test_input_walker_no_dedup() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("f.txt"));

        let files: Vec<PathBuf> = InputWalker::new(
            vec![dir.path().to_path_buf(), dir.path().to_path_buf()],
            Arc::new(PathMatcher::default()),
            Arc::new(WalkStats::default()),
            Arc::new(AtomicBool::new(false)),
        )
        .collect();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_walker_stops_on_shutdown() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("f.txt"));

        let files: Vec<PathBuf> = InputWalker::new(
            vec![dir.path().to_path_buf()],
            Arc::new(PathMatcher::default()),
            Arc::new(WalkStats::default()),
            Arc::new(AtomicBool::new(true)),
        )
        .collect();
        assert!(files.is_empty());
    }
}
