//! Template pipeline: pages rendered with Tera

use crate::core::{
    error::error_chain,
    source::SourceSet,
    step::{always, map_assets, production_only},
    Asset, BuildContext, Notify, Pipeline, Step, TransformError,
};
use crate::pipelines::html::Beautify;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::debug;

/// Variable exposed to every template
pub const PRODUCTION_FLAG: &str = "IS_PRODUCTION";

/// Template file extensions
pub const EXTENSIONS: &[&str] = &["njk", "html"];

/// Build the template pipeline for a source root
pub fn pipeline(source_root: &Path) -> Pipeline {
    let root = source_root.join("templates");
    let patterns: Vec<String> = EXTENSIONS.iter().map(|ext| format!("**/*.{}", ext)).collect();

    Pipeline::new("templates", SourceSet::glob(root.join("pages"), patterns), "")
        .step(always(Render::new(root)))
        .step(production_only(Beautify::default()))
        .notify(Notify::Reload)
}

/// Watch patterns: every template, partials included
pub fn watch_patterns() -> Vec<String> {
    EXTENSIONS.iter().map(|ext| format!("**/*.{}", ext)).collect()
}

/// Render step: each asset is a page template under the include root
#[derive(Debug)]
pub struct Render {
    include_root: PathBuf,
}

impl Render {
    pub fn new(include_root: impl Into<PathBuf>) -> Self {
        Self {
            include_root: include_root.into(),
        }
    }

    /// Load every template under the include root.
    ///
    /// A new instance per run, so edits to layouts and partials are picked up.
    fn load(&self) -> Result<Tera, TransformError> {
        let mut files = Vec::new();
        for ext in EXTENSIONS {
            let pattern = self.include_root.join(format!("**/*.{}", ext));
            let pattern = pattern.to_string_lossy().into_owned();
            let entries = glob::glob(&pattern).map_err(|e| TransformError::Glob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            for path in entries.flatten() {
                let name = self.template_name(&path);
                files.push((path, Some(name)));
            }
        }
        debug!("Loading {} template(s) from {}", files.len(), self.include_root.display());

        let mut tera = Tera::default();
        tera.add_template_files(files)
            .map_err(|e| TransformError::Template {
                file: self.include_root.clone(),
                message: error_chain(&e),
            })?;
        Ok(tera)
    }

    /// Template name: path relative to the include root with `/` separators
    fn template_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.include_root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl Step for Render {
    fn name(&self) -> &str {
        "render"
    }

    async fn transform(&self, assets: Vec<Asset>, ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        if assets.is_empty() {
            return Ok(assets);
        }

        let tera = self.load()?;
        let mut context = Context::new();
        context.insert(PRODUCTION_FLAG, &ctx.is_production());

        map_assets(assets, |mut asset| {
            let name = self.template_name(&asset.origin);
            let html = tera.render(&name, &context).map_err(|e| TransformError::Template {
                file: asset.origin.clone(),
                message: error_chain(&e),
            })?;
            asset.set_text(html);
            asset.set_extension("html");
            Ok(asset)
        })
    }
}
