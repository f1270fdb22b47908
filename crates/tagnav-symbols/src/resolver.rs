//! Address resolution
//!
//! Turns a tag's address into a zero-based line by consulting the source file.
//! A [`ResolveBatch`] reads each file at most once; it is meant to live for a
//! single lookup and be dropped afterwards so edits on disk are picked up by
//! the next one.

use crate::ResolveError;
use crate::address::{AddressSpec, SearchPattern};
use crate::index::TagRecord;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A definition location ready to hand to an editor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedLocation {
    pub path: PathBuf,
    /// Zero-based line number
    pub lineno: usize,
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.lineno + 1)
    }
}

/// Per-lookup resolver with a private file cache
#[derive(Debug)]
pub struct ResolveBatch {
    root: PathBuf,
    /// Lines of every file read so far; `None` when the file could not be read
    files: HashMap<PathBuf, Option<Vec<String>>>,
}

impl ResolveBatch {
    /// Create a batch resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: HashMap::new(),
        }
    }

    /// Absolute location of a record path
    pub fn full_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Resolve an address inside `path` to a zero-based line
    pub fn resolve(&mut self, path: &Path, spec: &AddressSpec) -> Result<usize, ResolveError> {
        self.resolve_with_hint(path, spec, None)
    }

    /// Resolve a whole record, using its `line:` hint to pick between duplicate matches
    pub fn resolve_record(&mut self, record: &TagRecord) -> Result<ResolvedLocation, ResolveError> {
        let lineno = self.resolve_with_hint(&record.path, &record.address, record.line_hint)?;
        Ok(ResolvedLocation {
            path: self.full_path(&record.path),
            lineno,
        })
    }

    /// Number of distinct files touched by this batch
    pub fn cached_files(&self) -> usize {
        self.files.len()
    }

    fn resolve_with_hint(
        &mut self,
        path: &Path,
        spec: &AddressSpec,
        line_hint: Option<usize>,
    ) -> Result<usize, ResolveError> {
        let full_path = self.full_path(path);

        match spec {
            AddressSpec::Numeric(line) => {
                if *line == 0 {
                    return Err(ResolveError::OutOfRange {
                        path: full_path,
                        line: 0,
                    });
                }
                let already_read = matches!(self.files.get(&full_path), Some(Some(_)));
                if !already_read && !full_path.is_file() {
                    return Err(ResolveError::FileNotFound(full_path));
                }
                Ok(line - 1)
            }
            AddressSpec::Pattern(pattern) => {
                let lines = self
                    .lines(&full_path)
                    .ok_or_else(|| ResolveError::FileNotFound(full_path.clone()))?;
                find_pattern(lines, pattern, line_hint).ok_or_else(|| {
                    ResolveError::PatternNotFound {
                        path: full_path.clone(),
                        pattern: pattern.to_string(),
                    }
                })
            }
        }
    }

    fn lines(&mut self, full_path: &Path) -> Option<&[String]> {
        self.files
            .entry(full_path.to_path_buf())
            .or_insert_with(|| read_lines(full_path))
            .as_deref()
    }
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect(),
        ),
        Err(err) => {
            tracing::debug!("Failed to read {}: {}", path.display(), err);
            None
        }
    }
}

/// Zero-based index of the matching line
///
/// Without a hint the first match wins; with one, the match nearest to the
/// hinted line wins and ties go to the earlier line.
fn find_pattern(lines: &[String], pattern: &SearchPattern, line_hint: Option<usize>) -> Option<usize> {
    let mut matches = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| pattern.matches(line))
        .map(|(idx, _)| idx);

    match line_hint {
        Some(hint) if hint > 0 => {
            let target = hint - 1;
            matches.min_by_key(|idx| idx.abs_diff(target))
        }
        _ => matches.next(),
    }
}
