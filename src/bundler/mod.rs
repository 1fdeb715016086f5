//! Script bundler interface

pub mod esbuild;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use esbuild::EsbuildBundler;

/// Error types for bundler operations
#[derive(Debug, Error)]
pub enum BundlerError {
    #[error("failed to start bundler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bundler exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("bundler output is not valid UTF-8")]
    Encoding,
}

/// One bundling job: a single entry producing a single output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    /// Entry script
    pub entry: PathBuf,

    /// Run the bundler's minifier
    pub minify: bool,

    /// Embed a source map in the output
    pub source_map: bool,

    /// Syntax target to lower to (e.g. `es2015`)
    pub target: String,
}

/// Trait for bundler execution - allows for different implementations
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle the entry and return the output script
    async fn bundle(&self, request: &BundleRequest) -> Result<String, BundlerError>;
}
