//! Exclusion matching for walked paths
//!
//! Two kinds of rules exist:
//! - exclude-folder: the folder and its whole subtree are skipped
//! - exclude-file: one exact file path is skipped
//!
//! All comparisons happen on lexically cleaned paths. There is no glob
//! support and comparison is case-sensitive.

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path
///
/// Collapses repeated separators, drops `.` segments and resolves `..`
/// against the preceding normal segment. A `..` directly above the root is
/// dropped; leading `..` on a relative path is kept. An empty result becomes
/// `.`. The filesystem is never consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                Some(Component::ParentDir) | Some(Component::CurDir) | None => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }

    out.into_iter().collect()
}

/// Compute the lexical path of `target` relative to `base`
///
/// Returns `None` when no relative path exists: one side absolute and the
/// other relative, differing prefixes (e.g. Windows drives), or a base that
/// climbs above where the target starts.
pub fn relative_path(base: &Path, target: &Path) -> Option<PathBuf> {
    relative_clean(&clean_path(base), &clean_path(target))
}

/// Same as [`relative_path`] but both inputs must already be cleaned
fn relative_clean(base: &Path, target: &Path) -> Option<PathBuf> {
    if base.is_absolute() != target.is_absolute() {
        return None;
    }

    let base: Vec<Component<'_>> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let target: Vec<Component<'_>> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(b, t)| b == t)
        .count();

    let base_rest = &base[common..];
    let target_rest = &target[common..];

    // Anything other than plain names left on the base side cannot be
    // walked back up with `..`.
    if base_rest.iter().any(|c| !matches!(c, Component::Normal(_))) {
        return None;
    }
    if target_rest
        .iter()
        .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return None;
    }

    let mut rel = PathBuf::new();
    for _ in base_rest {
        rel.push("..");
    }
    for comp in target_rest {
        rel.push(comp.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}

/// True if `candidate` equals `root` or lies beneath it (both cleaned)
fn within_subtree(root: &Path, candidate: &Path) -> bool {
    match relative_clean(root, candidate) {
        Some(rel) => !matches!(rel.components().next(), Some(Component::ParentDir)),
        None => false,
    }
}

/// Check whether `candidate` is any of `exclude_dirs` or inside one of them
pub fn is_excluded_dir<P: AsRef<Path>>(candidate: &Path, exclude_dirs: &[P]) -> bool {
    let candidate = clean_path(candidate);
    exclude_dirs
        .iter()
        .any(|dir| within_subtree(&clean_path(dir.as_ref()), &candidate))
}

/// Check whether `candidate` exactly matches one of `exclude_files`
pub fn is_excluded_file<P: AsRef<Path>>(candidate: &Path, exclude_files: &[P]) -> bool {
    let candidate = clean_path(candidate);
    exclude_files
        .iter()
        .any(|file| clean_path(file.as_ref()) == candidate)
}

/// Pre-cleaned exclusion rules shared by the walker
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    exclude_dirs: Vec<PathBuf>,
    exclude_files: Vec<PathBuf>,
}

impl PathMatcher {
    /// Build a matcher, cleaning every rule once up front
    pub fn new<D, F>(exclude_dirs: D, exclude_files: F) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<Path>,
        F: IntoIterator,
        F::Item: AsRef<Path>,
    {
        Self {
            exclude_dirs: exclude_dirs
                .into_iter()
                .map(|p| clean_path(p.as_ref()))
                .collect(),
            exclude_files: exclude_files
                .into_iter()
                .map(|p| clean_path(p.as_ref()))
                .collect(),
        }
    }

    /// Is this directory (or an ancestor) an exclude-folder rule?
    pub fn is_excluded_dir(&self, candidate: &Path) -> bool {
        if self.exclude_dirs.is_empty() {
            return false;
        }
        let candidate = clean_path(candidate);
        self.exclude_dirs
            .iter()
            .any(|dir| within_subtree(dir, &candidate))
    }

    /// Is this file an exact exclude-file rule?
    pub fn is_excluded_file(&self, candidate: &Path) -> bool {
        if self.exclude_files.is_empty() {
            return false;
        }
        let candidate = clean_path(candidate);
        self.exclude_files.iter().any(|file| *file == candidate)
    }

    /// Exclude-folder rules (cleaned)
    pub fn exclude_dirs(&self) -> &[PathBuf] {
        &self.exclude_dirs
    }

    /// Exclude-file rules (cleaned)
    pub fn exclude_files(&self) -> &[PathBuf] {
        &self.exclude_files
    }
}
