//! Source file selection

use crate::core::PipelineError;
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File names starting with this are partials: included by other files,
/// never built on their own
pub const PARTIAL_MARKER: char = '_';

/// Check whether a path names a partial file
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(PARTIAL_MARKER))
        .unwrap_or(false)
}

/// The input files of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSet {
    /// A single required entry file
    Entry(PathBuf),

    /// Every file under `base` matching one of the relative `patterns`
    Glob { base: PathBuf, patterns: Vec<String> },
}

/// A selected input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute or cwd-relative path on disk
    pub path: PathBuf,

    /// Path relative to the selection base, used as output path
    pub relative: PathBuf,
}

impl SourceSet {
    pub fn entry(path: impl Into<PathBuf>) -> Self {
        SourceSet::Entry(path.into())
    }

    pub fn glob<I, S>(base: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SourceSet::Glob {
            base: base.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Select the files of this set, skipping partials, in a stable order.
    pub fn select(&self) -> Result<Vec<SourceFile>, PipelineError> {
        match self {
            SourceSet::Entry(path) => {
                if !path.is_file() {
                    return Err(PipelineError::MissingEntry(path.clone()));
                }
                let relative = path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| path.clone());
                Ok(vec![SourceFile {
                    path: path.clone(),
                    relative,
                }])
            }
            SourceSet::Glob { base, patterns } => {
                let mut seen = BTreeSet::new();
                for pattern in patterns {
                    let full = base.join(pattern);
                    let full = full.to_string_lossy();
                    let entries = glob::glob(&full).map_err(|e| PipelineError::InvalidGlob {
                        pattern: full.to_string(),
                        message: e.to_string(),
                    })?;
                    for entry in entries.flatten() {
                        if entry.is_file() && !is_partial(&entry) {
                            seen.insert(entry);
                        }
                    }
                }

                Ok(seen
                    .into_iter()
                    .map(|path| {
                        let relative = path
                            .strip_prefix(base)
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|_| path.clone());
                        SourceFile { path, relative }
                    })
                    .collect())
            }
        }
    }
}

/// Matcher for file events: a base directory plus relative glob patterns
#[derive(Debug, Clone)]
pub struct PathMatcher {
    base: PathBuf,
    patterns: Vec<Pattern>,
}

impl PathMatcher {
    pub fn new<I, S>(base: impl Into<PathBuf>, patterns: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| PipelineError::InvalidGlob {
                    pattern: p.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            base: base.into(),
            patterns,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Check whether an event path falls under the base and matches a pattern
    pub fn matches(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.base) {
            Ok(relative) => relative,
            Err(_) => match self.base.canonicalize() {
                Ok(canonical) => match path.strip_prefix(&canonical) {
                    Ok(relative) => relative,
                    Err(_) => return false,
                },
                Err(_) => return false,
            },
        };
        self.patterns.iter().any(|p| p.matches_path(relative))
    }
}
