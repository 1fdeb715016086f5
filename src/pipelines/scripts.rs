//! Script pipeline: one entry handed to an external bundler

use crate::bundler::{BundleRequest, Bundler};
use crate::core::{
    source::SourceSet,
    step::{always, map_assets, production_only},
    Asset, BuildContext, Notify, Pipeline, Step, TransformError,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Output name prefix for minified bundles: `main.js` -> `min.main.js`
pub const MINIFIED_PREFIX: &str = "min.";

/// Build the script pipeline for a source root
pub fn pipeline(source_root: &Path, bundler: Arc<dyn Bundler>, target: impl Into<String>) -> Pipeline {
    let entry = source_root.join("scripts").join("main.js");

    Pipeline::new("scripts", SourceSet::entry(entry), "js")
        .step(always(Bundle::new(bundler, target)))
        .step(production_only(Prefix::new(MINIFIED_PREFIX)))
        .notify(Notify::Reload)
}

/// Watch patterns, relative to the scripts directory
pub fn watch_patterns() -> Vec<String> {
    vec!["**/*.js".to_string()]
}

/// Bundle step: replaces each entry with the bundler's output.
///
/// Minification in production, an inline source map in development.
pub struct Bundle {
    bundler: Arc<dyn Bundler>,
    target: String,
}

impl Bundle {
    pub fn new(bundler: Arc<dyn Bundler>, target: impl Into<String>) -> Self {
        Self {
            bundler,
            target: target.into(),
        }
    }
}

#[async_trait]
impl Step for Bundle {
    fn name(&self) -> &str {
        "bundle"
    }

    async fn transform(&self, assets: Vec<Asset>, ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        let mut out = Vec::with_capacity(assets.len());

        for mut asset in assets {
            let request = BundleRequest {
                entry: asset.origin.clone(),
                minify: ctx.is_production(),
                source_map: !ctx.is_production(),
                target: self.target.clone(),
            };
            debug!("Bundling {} (target {})", request.entry.display(), request.target);

            let bundle = self
                .bundler
                .bundle(&request)
                .await
                .map_err(|source| TransformError::Bundler {
                    file: asset.origin.clone(),
                    source,
                })?;
            asset.set_text(bundle);
            out.push(asset);
        }

        Ok(out)
    }
}

/// Rename step: adds a prefix to every file name
pub struct Prefix {
    prefix: String,
}

impl Prefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

#[async_trait]
impl Step for Prefix {
    fn name(&self) -> &str {
        "rename"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            asset.add_prefix(&self.prefix);
            Ok(asset)
        })
    }
}
