//! Error types shared by pipelines and tasks

use crate::bundler::BundlerError;
use std::path::PathBuf;
use thiserror::Error;

/// A single transform step failed
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("template error in {}: {message}", file.display())]
    Template { file: PathBuf, message: String },

    #[error("stylesheet error in {}: {message}", file.display())]
    Stylesheet { file: PathBuf, message: String },

    #[error("bundler failed for {}: {source}", file.display())]
    Bundler {
        file: PathBuf,
        #[source]
        source: BundlerError,
    },

    #[error("image error in {}: {message}", file.display())]
    Image { file: PathBuf, message: String },

    #[error("{} is not valid UTF-8", file.display())]
    Encoding { file: PathBuf },

    #[error("invalid glob '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread failed: {0}")]
    Worker(String),
}

/// A domain pipeline run failed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("entry file not found: {}", .0.display())]
    MissingEntry(PathBuf),

    #[error("invalid glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("step '{step}' of pipeline '{pipeline}' failed: {source}")]
    Transform {
        pipeline: String,
        step: String,
        #[source]
        source: TransformError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

impl TransformError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransformError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render an error together with its source chain on one line
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        let text = source.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = source.source();
    }
    message
}
