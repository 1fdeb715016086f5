//! File-like items flowing through a pipeline

use std::path::{Path, PathBuf};

/// One file travelling through a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Output path, relative to the pipeline's destination directory
    pub path: PathBuf,

    /// Where the asset was read from
    pub origin: PathBuf,

    /// Raw file contents
    pub contents: Vec<u8>,

    /// Files that contributed to this asset (the origin first)
    pub sources: Vec<PathBuf>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, origin: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        let origin = origin.into();
        Self {
            path: path.into(),
            sources: vec![origin.clone()],
            origin,
            contents,
        }
    }

    /// Contents as text, if they are valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// Lower-cased extension of the output path
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Replace the extension of the output path
    pub fn set_extension(&mut self, extension: &str) {
        self.path.set_extension(extension);
    }

    /// Add a suffix before the extension: `main.css` -> `main.min.css`
    pub fn add_suffix(&mut self, suffix: &str) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.extension() {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext),
            None => format!("{}{}", stem, suffix),
        };
        self.path.set_file_name(name);
    }

    /// Add a prefix to the file name: `main.js` -> `min.main.js`
    pub fn add_prefix(&mut self, prefix: &str) {
        let name = format!("{}{}", prefix, self.file_name());
        self.path.set_file_name(name);
    }

    /// Record another contributing source file
    pub fn add_source(&mut self, source: &Path) {
        if !self.sources.iter().any(|s| s == source) {
            self.sources.push(source.to_path_buf());
        }
    }
}
