//! Configuration types for onefile
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The YAML configuration file shape
//! - Resolution of the file config into an immutable, validated runtime config

use crate::error::ConfigError;
use crate::matcher::{clean_path, PathMatcher};
use crate::split::part_paths;
use clap::Parser;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Output file name used when the config leaves it empty
pub const DEFAULT_OUTPUT: &str = "combined.txt";

/// Default number of aggregation workers
pub const DEFAULT_WORKERS: usize = 4;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 256;

/// Default capacity of the pending-file queue
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Combine the files of several directory trees into one text file
#[derive(Parser, Debug, Clone)]
#[command(
    name = "onefile",
    version,
    about = "Combine the files of several directory trees into one text file",
    long_about = "Walks every input directory listed in a YAML config, skips excluded folders \
                  and files, and appends each remaining file to a single output file with \
                  header and end-marker lines.\n\n\
                  Relative paths in the config are resolved against the config file's directory.",
    after_help = "EXAMPLES:\n    \
        onefile\n    \
        onefile --config project.yaml\n    \
        onefile -c project.yaml --split\n    \
        onefile -c project.yaml -w 8 -q"
)]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml", value_name = "FILE")]
    pub config: PathBuf,

    /// Split the combined output file into two nearly equal halves
    #[arg(short, long)]
    pub split: bool,

    /// Number of worker threads appending files
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Pending-file queue size (walker blocks when full)
    #[arg(long, default_value_t = DEFAULT_QUEUE_SIZE, value_name = "NUM")]
    pub queue_size: usize,

    /// Quiet mode - suppress progress output and summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Configuration file contents, as written by the user
///
/// ```yaml
/// output: combined.txt
/// output_dir: out
/// input_dirs:
///   - src
///   - docs
/// exclude_folders:
///   - src/generated
/// exclude_files:
///   - docs/secrets.md
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Output file name (or path); `None` or blank means [`DEFAULT_OUTPUT`]
    pub output: Option<String>,

    /// Directory the output file is placed in
    pub output_dir: Option<PathBuf>,

    /// Directories to walk, in order
    #[serde(deserialize_with = "null_as_empty")]
    pub input_dirs: Vec<PathBuf>,

    /// Folders whose whole subtree is skipped
    #[serde(deserialize_with = "null_as_empty")]
    pub exclude_folders: Vec<PathBuf>,

    /// Exact files that are skipped
    #[serde(deserialize_with = "null_as_empty")]
    pub exclude_files: Vec<PathBuf>,
}

/// A bare `key:` in YAML is null; treat it as an empty list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FileConfig {
    /// Read and parse a YAML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&contents, path)
    }

    /// Parse YAML text; `path` is only used for error messages
    pub fn from_yaml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty document deserializes as null
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml_ng::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated runtime configuration
///
/// Every path is absolute and cleaned. Built once, then shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Combined output file
    pub output_path: PathBuf,

    /// Directories to walk, in configured order
    pub input_dirs: Vec<PathBuf>,

    /// Exclude-folder rules
    pub exclude_dirs: Vec<PathBuf>,

    /// Exclude-file rules
    pub exclude_files: Vec<PathBuf>,

    /// Split the output after aggregation
    pub split: bool,

    /// Number of worker threads
    pub worker_count: usize,

    /// Pending-file queue capacity
    pub queue_size: usize,

    /// Show progress indicator
    pub show_progress: bool,
}

impl ResolvedConfig {
    /// Create a config for library use with default runtime settings
    ///
    /// Paths are cleaned but otherwise used as given.
    pub fn new<P, I>(output_path: P, input_dirs: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        Self {
            output_path: clean_path(output_path.as_ref()),
            input_dirs: input_dirs
                .into_iter()
                .map(|p| clean_path(p.as_ref()))
                .collect(),
            exclude_dirs: Vec::new(),
            exclude_files: Vec::new(),
            split: false,
            worker_count: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            show_progress: false,
        }
    }

    /// Set the exclude-folder rules
    pub fn with_exclude_dirs<I>(mut self, dirs: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        self.exclude_dirs = dirs.into_iter().map(|p| clean_path(p.as_ref())).collect();
        self
    }

    /// Set the exclude-file rules
    pub fn with_exclude_files<I>(mut self, files: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        self.exclude_files = files.into_iter().map(|p| clean_path(p.as_ref())).collect();
        self
    }

    /// Set the worker count
    pub fn with_workers(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the queue capacity
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Create, resolve and validate configuration from CLI arguments
    ///
    /// This is the only step with side effects: it reads the config file and
    /// creates the output directory if one is configured and missing.
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let file = FileConfig::load(&args.config)?;
        let config_dir = config_base_dir(&args.config)?;

        let mut config = Self::resolve(&file, &config_dir);
        config.split = args.split;
        config.worker_count = args.workers;
        config.queue_size = args.queue_size;
        config.show_progress = !args.quiet;

        config.validate()?;

        if file.output_dir.is_some() {
            config.ensure_output_dir()?;
        }

        Ok(config)
    }

    /// Resolve a file config against the directory holding it
    ///
    /// Pure transformation: relative entries are joined onto `config_dir`,
    /// everything is cleaned, and the output name defaults to
    /// [`DEFAULT_OUTPUT`]. Without an `output_dir` the output lands beside
    /// the config file.
    pub fn resolve(file: &FileConfig, config_dir: &Path) -> Self {
        let anchor = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                clean_path(p)
            } else {
                clean_path(&config_dir.join(p))
            }
        };

        let output_name = file
            .output
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_OUTPUT);

        let output_dir = match &file.output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => anchor(dir),
            _ => clean_path(config_dir),
        };

        Self {
            output_path: clean_path(&output_dir.join(output_name)),
            input_dirs: file.input_dirs.iter().map(|p| anchor(p)).collect(),
            exclude_dirs: file.exclude_folders.iter().map(|p| anchor(p)).collect(),
            exclude_files: file.exclude_files.iter().map(|p| anchor(p)).collect(),
            split: false,
            worker_count: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            show_progress: false,
        }
    }

    /// Check whole-run preconditions
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_dirs.is_empty() {
            return Err(ConfigError::NoInputDirs);
        }

        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.worker_count,
                max: MAX_WORKERS,
            });
        }

        if self.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: self.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        Ok(())
    }

    /// Create the directory the output file goes into
    pub fn ensure_output_dir(&self) -> Result<(), ConfigError> {
        match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|source| ConfigError::OutputDir {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    /// Build the exclusion matcher for the walk
    ///
    /// The output file and its split parts are always excluded so an output
    /// placed inside an input directory is never read back into itself.
    pub fn matcher(&self) -> PathMatcher {
        let (part1, part2) = part_paths(&self.output_path);
        let files = self
            .exclude_files
            .iter()
            .cloned()
            .chain([self.output_path.clone(), part1, part2]);

        PathMatcher::new(&self.exclude_dirs, files)
    }
}

/// Absolute, cleaned directory containing the config file
fn config_base_dir(config_path: &Path) -> Result<PathBuf, ConfigError> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let absolute = std::path::absolute(dir).map_err(|source| ConfigError::Location {
        path: config_path.to_path_buf(),
        source,
    })?;

    Ok(clean_path(&absolute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
output: all.txt
output_dir: out
input_dirs:
  - src
  - /abs/docs
exclude_folders:
  - src/generated
exclude_files:
  - src/lib.rs
"#;
        let cfg = FileConfig::from_yaml(yaml, Path::new("config.yaml")).unwrap();
        assert_eq!(cfg.output.as_deref(), Some("all.txt"));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cfg.input_dirs.len(), 2);
        assert_eq!(cfg.exclude_folders, vec![PathBuf::from("src/generated")]);
        assert_eq!(cfg.exclude_files, vec![PathBuf::from("src/lib.rs")]);
    }

    #[test]
    fn test_parse_sparse_config() {
        let yaml = "input_dirs:\n  - a\nexclude_folders:\n";
        let cfg = FileConfig::from_yaml(yaml, Path::new("c.yaml")).unwrap();
        assert_eq!(cfg.output, None);
        assert_eq!(cfg.output_dir, None);
        assert!(cfg.exclude_folders.is_empty());
        assert!(cfg.exclude_files.is_empty());
    }

    #[test]
    fn test_null_output_falls_back_to_default() {
        for yaml in ["output: ~\ninput_dirs: [a]\n", "output:\ninput_dirs: [a]\n"] {
            let cfg = FileConfig::from_yaml(yaml, Path::new("c.yaml")).unwrap();
            assert_eq!(cfg.output, None);

            let resolved = ResolvedConfig::resolve(&cfg, Path::new("/proj"));
            assert_eq!(resolved.output_path, PathBuf::from("/proj/combined.txt"));
        }
    }

    #[test]
    fn test_parse_empty_document() {
        let cfg = FileConfig::from_yaml("   \n", Path::new("c.yaml")).unwrap();
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn test_parse_invalid_config() {
        let err = FileConfig::from_yaml("input_dirs: [unclosed", Path::new("bad.yaml"));
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_resolve_relative_paths() {
        let file = FileConfig {
            output: None,
            output_dir: None,
            input_dirs: vec![PathBuf::from("src"), PathBuf::from("/abs/docs/")],
            exclude_folders: vec![PathBuf::from("./src/gen")],
            exclude_files: vec![PathBuf::from("../other/x.txt")],
        };

        let cfg = ResolvedConfig::resolve(&file, Path::new("/proj"));
        assert_eq!(cfg.output_path, PathBuf::from("/proj/combined.txt"));
        assert_eq!(
            cfg.input_dirs,
            vec![PathBuf::from("/proj/src"), PathBuf::from("/abs/docs")]
        );
        assert_eq!(cfg.exclude_dirs, vec![PathBuf::from("/proj/src/gen")]);
        assert_eq!(cfg.exclude_files, vec![PathBuf::from("/other/x.txt")]);
    }

    #[test]
    fn test_resolve_output_dir() {
        let file = FileConfig {
            output: Some("merged.md".into()),
            output_dir: Some(PathBuf::from("build/out")),
            input_dirs: vec![PathBuf::from("a")],
            ..Default::default()
        };
        let cfg = ResolvedConfig::resolve(&file, Path::new("/proj"));
        assert_eq!(cfg.output_path, PathBuf::from("/proj/build/out/merged.md"));

        let file = FileConfig {
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..file
        };
        let cfg = ResolvedConfig::resolve(&file, Path::new("/proj"));
        assert_eq!(cfg.output_path, PathBuf::from("/tmp/out/merged.md"));
    }

    #[test]
    fn test_resolve_does_not_touch_input() {
        let file = FileConfig {
            input_dirs: vec![PathBuf::from("rel")],
            ..Default::default()
        };
        let before = file.clone();
        let _ = ResolvedConfig::resolve(&file, Path::new("/x"));
        assert_eq!(file, before);
    }

    #[test]
    fn test_validate() {
        let cfg = ResolvedConfig::new("/out.txt", Vec::<PathBuf>::new());
        assert!(matches!(cfg.validate(), Err(ConfigError::NoInputDirs)));

        let cfg = ResolvedConfig::new("/out.txt", ["/a"]).with_workers(0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidWorkerCount { count: 0, .. })
        ));

        let cfg = ResolvedConfig::new("/out.txt", ["/a"]).with_queue_size(0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidQueueSize { size: 0, .. })
        ));

        let cfg = ResolvedConfig::new("/out.txt", ["/a"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_matcher_excludes_own_output() {
        let cfg = ResolvedConfig::new("/a/combined.txt", ["/a"]).with_exclude_dirs(["/a/skip"]);
        let matcher = cfg.matcher();
        assert!(matcher.is_excluded_file(Path::new("/a/combined.txt")));
        assert!(matcher.is_excluded_file(Path::new("/a/combined_part1.txt")));
        assert!(matcher.is_excluded_file(Path::new("/a/combined_part2.txt")));
        assert!(matcher.is_excluded_dir(Path::new("/a/skip/z")));
        assert!(!matcher.is_excluded_file(Path::new("/a/x.txt")));
    }

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::parse_from(["onefile"]);
        assert_eq!(args.config, PathBuf::from("config.yaml"));
        assert!(!args.split);
        assert_eq!(args.workers, DEFAULT_WORKERS);
        assert_eq!(args.queue_size, DEFAULT_QUEUE_SIZE);

        let args = CliArgs::parse_from(["onefile", "-c", "x.yaml", "--split", "-w", "8"]);
        assert_eq!(args.config, PathBuf::from("x.yaml"));
        assert!(args.split);
        assert_eq!(args.workers, 8);
    }
}
