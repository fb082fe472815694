//! Share exclusion patterns
//!
//! `<root>/shares/.syncignore` lists share paths (gitignore semantics) that
//! are neither mirrored between stages nor linked into releases. The same
//! file is handed to rsync via `--exclude-from` for nested entries.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the exclusion list inside the shares root
pub const EXCLUSION_FILE: &str = ".syncignore";

/// Maximum size accepted for the exclusion file (64KB)
pub const MAX_FILE_SIZE: usize = 65536;

/// Maximum number of patterns allowed
const MAX_PATTERNS: usize = 1000;

/// Patterns loaded from a `.syncignore` file
#[derive(Debug)]
pub struct ShareExclusions {
    matcher: Option<Gitignore>,
    pattern_count: usize,
}

impl Default for ShareExclusions {
    fn default() -> Self {
        Self::empty()
    }
}

impl ShareExclusions {
    /// Pattern set that matches nothing
    pub fn empty() -> Self {
        Self {
            matcher: None,
            pattern_count: 0,
        }
    }

    /// Parse patterns from file content
    ///
    /// `source_path` is only used for error messages; matching is done on
    /// share-relative paths.
    pub fn from_content(source_path: &Path, content: &str) -> Result<Self, IgnoreError> {
        if content.len() > MAX_FILE_SIZE {
            return Err(IgnoreError::FileTooLarge {
                path: source_path.to_path_buf(),
                size: content.len(),
                limit: MAX_FILE_SIZE,
            });
        }

        let mut builder = GitignoreBuilder::new("");
        let mut pattern_count = 0;

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            pattern_count += 1;
            if pattern_count > MAX_PATTERNS {
                return Err(IgnoreError::TooManyPatterns {
                    path: source_path.to_path_buf(),
                    count: pattern_count,
                    limit: MAX_PATTERNS,
                });
            }

            if let Err(e) = builder.add_line(None, trimmed) {
                return Err(IgnoreError::InvalidPattern {
                    path: source_path.to_path_buf(),
                    line: line_num + 1,
                    pattern: line.to_string(),
                    message: e.to_string(),
                });
            }
        }

        if pattern_count == 0 {
            return Ok(Self::empty());
        }

        let matcher = builder
            .build()
            .map_err(|e| IgnoreError::BuildFailed(e.to_string()))?;

        Ok(Self {
            matcher: Some(matcher),
            pattern_count,
        })
    }

    /// Whether a share path (relative, `/`-separated) is excluded
    ///
    /// A path is excluded when it, or any of its parents, matches.
    pub fn is_excluded(&self, share_path: &str, is_dir: bool) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };
        let rel = share_path.trim_start_matches("./").trim_matches('/');
        if rel.is_empty() {
            return false;
        }
        matcher
            .matched_path_or_any_parents(Path::new(rel), is_dir)
            .is_ignore()
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

/// Errors that can occur when loading exclusion patterns
#[derive(Debug)]
pub enum IgnoreError {
    FileTooLarge {
        path: PathBuf,
        size: usize,
        limit: usize,
    },
    TooManyPatterns {
        path: PathBuf,
        count: usize,
        limit: usize,
    },
    InvalidPattern {
        path: PathBuf,
        line: usize,
        pattern: String,
        message: String,
    },
    BuildFailed(String),
}

impl fmt::Display for IgnoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileTooLarge { path, size, limit } => write!(
                f,
                "{} exceeds {}KB limit ({} bytes): {}",
                EXCLUSION_FILE,
                limit / 1024,
                size,
                path.display()
            ),
            Self::TooManyPatterns { path, count, limit } => write!(
                f,
                "{} has {} patterns, exceeds {} limit: {}",
                EXCLUSION_FILE,
                count,
                limit,
                path.display()
            ),
            Self::InvalidPattern {
                path,
                line,
                pattern,
                message,
            } => write!(
                f,
                "Invalid pattern at {}:{}: '{}' - {}",
                path.display(),
                line,
                pattern,
                message
            ),
            Self::BuildFailed(msg) => write!(f, "Failed to build exclusion matcher: {}", msg),
        }
    }
}

impl std::error::Error for IgnoreError {}
