//! Pipeline domain model

use crate::core::{
    context::{BuildContext, Notify},
    error::PipelineError,
    source::SourceSet,
    step::Step,
    Asset,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A named chain of steps over a set of source files
pub struct Pipeline {
    /// Pipeline name, also its task name
    pub name: String,

    /// Input files
    pub sources: SourceSet,

    /// Steps, applied left to right
    pub steps: Vec<Box<dyn Step>>,

    /// Output subtree, relative to the build root ("" for the root itself)
    pub destination: PathBuf,

    /// Dev server notification sent after writing
    pub notify: Notify,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pipeline: String,

    /// Files written, relative to the build root
    pub written: Vec<PathBuf>,

    pub duration: Duration,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, sources: SourceSet, destination: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            sources,
            steps: Vec::new(),
            destination: destination.into(),
            notify: Notify::Nothing,
        }
    }

    /// Append a step
    pub fn step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn notify(mut self, notify: Notify) -> Self {
        self.notify = notify;
        self
    }

    /// Names of the steps, in order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline once: select, transform, write, notify
    pub async fn run(&self, ctx: &BuildContext) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();
        info!("[{}] Running pipeline {} ({})", short_id(ctx), self.name, ctx.env);

        let mut assets = self.read_sources().await?;
        debug!("Pipeline {} selected {} file(s)", self.name, assets.len());

        for step in &self.steps {
            assets = step
                .transform(assets, ctx)
                .await
                .map_err(|source| PipelineError::Transform {
                    pipeline: self.name.clone(),
                    step: step.name().to_string(),
                    source,
                })?;
        }

        let written = self.write_assets(&assets, ctx).await?;
        self.send_notification(&written, ctx);

        let duration = start.elapsed();
        info!(
            "[{}] Pipeline {} wrote {} file(s) in {}ms",
            short_id(ctx),
            self.name,
            written.len(),
            duration.as_millis()
        );

        Ok(PipelineReport {
            pipeline: self.name.clone(),
            written,
            duration,
        })
    }

    async fn read_sources(&self) -> Result<Vec<Asset>, PipelineError> {
        let files = self.sources.select()?;
        let mut assets = Vec::with_capacity(files.len());
        for file in files {
            let contents = tokio::fs::read(&file.path)
                .await
                .map_err(|e| PipelineError::io(&file.path, e))?;
            assets.push(Asset::new(file.relative, file.path, contents));
        }
        Ok(assets)
    }

    async fn write_assets(&self, assets: &[Asset], ctx: &BuildContext) -> Result<Vec<PathBuf>, PipelineError> {
        let out_dir = ctx.build_root.join(&self.destination);
        let mut written = Vec::with_capacity(assets.len());

        for asset in assets {
            let target = out_dir.join(&asset.path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PipelineError::io(parent, e))?;
            }
            tokio::fs::write(&target, &asset.contents)
                .await
                .map_err(|e| PipelineError::io(&target, e))?;
            debug!("Wrote {}", target.display());
            written.push(self.destination.join(&asset.path));
        }

        Ok(written)
    }

    fn send_notification(&self, written: &[PathBuf], ctx: &BuildContext) {
        let Some(notifier) = &ctx.notifier else {
            return;
        };

        match self.notify {
            Notify::Reload => notifier.reload(),
            Notify::Inject => {
                let paths: Vec<String> = written
                    .iter()
                    .filter(|p| p.extension().is_some_and(|ext| ext == "css"))
                    .map(|p| url_path(p))
                    .collect();
                notifier.inject(&paths);
            }
            Notify::Nothing => {}
        }
    }
}

/// Relative path as a URL path with `/` separators
pub fn url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn short_id(ctx: &BuildContext) -> String {
    ctx.run_id.to_string()[..8].to_string()
}
