//! esbuild subprocess client - bundles to stdout

use crate::bundler::{BundleRequest, Bundler, BundlerError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Bundler that runs the esbuild CLI as a subprocess
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    /// Path to the esbuild executable
    program: String,

    /// Timeout for one bundling run in seconds
    timeout_secs: u64,
}

impl EsbuildBundler {
    /// Create a new subprocess bundler
    ///
    /// # Arguments
    /// * `program` - Path to esbuild (e.g., "esbuild", "node_modules/.bin/esbuild")
    /// * `timeout_secs` - Timeout for a bundling run in seconds
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for a request
    ///
    /// Without `--outfile` esbuild writes the bundle to stdout, so source
    /// maps are inlined.
    pub fn args(request: &BundleRequest) -> Vec<String> {
        let mut args = vec![
            request.entry.to_string_lossy().into_owned(),
            "--bundle".to_string(),
            format!("--target={}", request.target),
            "--log-level=warning".to_string(),
        ];
        if request.minify {
            args.push("--minify".to_string());
        }
        if request.source_map {
            args.push("--sourcemap=inline".to_string());
        }
        args
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    /// Bundle through the esbuild subprocess
    ///
    /// # Errors
    /// Returns `BundlerError` if:
    /// - The executable cannot be spawned
    /// - esbuild exits with a non-zero status (stderr carries file:line:col)
    /// - The output is not valid UTF-8
    /// - The command times out
    async fn bundle(&self, request: &BundleRequest) -> Result<String, BundlerError> {
        let args = Self::args(request);
        debug!("Spawning {} {}", self.program, args.join(" "));

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(&self.program)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| BundlerError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|source| BundlerError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", self.program, code, stderr);
            return Err(BundlerError::Exit { code, stderr });
        }

        let content = String::from_utf8(output.stdout).map_err(|_| BundlerError::Encoding)?;
        debug!("{} returned {} bytes", self.program, content.len());

        Ok(content)
    }
}
