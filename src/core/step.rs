//! Pipeline step model

use crate::core::{Asset, BuildContext, Condition, TransformError};
use async_trait::async_trait;

/// A single transform applied to the assets of a pipeline
#[async_trait]
pub trait Step: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Transform the input assets into the output assets
    async fn transform(&self, assets: Vec<Asset>, ctx: &BuildContext) -> Result<Vec<Asset>, TransformError>;
}

/// A step that only takes effect when its condition holds, and otherwise
/// passes its input through unchanged
pub struct Conditional {
    condition: Condition,
    inner: Box<dyn Step>,
}

impl Conditional {
    pub fn new(condition: Condition, inner: Box<dyn Step>) -> Self {
        Self { condition, inner }
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }
}

#[async_trait]
impl Step for Conditional {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn transform(&self, assets: Vec<Asset>, ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        if self.condition.holds(ctx.env) {
            self.inner.transform(assets, ctx).await
        } else {
            tracing::debug!(
                "Skipping step {} ({} only)",
                self.inner.name(),
                self.condition.label()
            );
            Ok(assets)
        }
    }
}

/// Wrap a step that runs in every environment
pub fn always<S: Step + 'static>(step: S) -> Box<dyn Step> {
    Box::new(Conditional::new(Condition::Always, Box::new(step)))
}

/// Wrap a step that runs only in production
pub fn production_only<S: Step + 'static>(step: S) -> Box<dyn Step> {
    Box::new(Conditional::new(Condition::ProductionOnly, Box::new(step)))
}

/// Wrap a step that runs only in development
pub fn development_only<S: Step + 'static>(step: S) -> Box<dyn Step> {
    Box::new(Conditional::new(Condition::DevelopmentOnly, Box::new(step)))
}

/// Apply a fallible function to every asset in turn
pub fn map_assets<F>(assets: Vec<Asset>, f: F) -> Result<Vec<Asset>, TransformError>
where
    F: FnMut(Asset) -> Result<Asset, TransformError>,
{
    assets.into_iter().map(f).collect()
}

/// Rename step: adds a suffix before the extension of every asset
pub struct Suffix {
    suffix: String,
}

impl Suffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }
}

#[async_trait]
impl Step for Suffix {
    fn name(&self) -> &str {
        "rename"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            asset.add_suffix(&self.suffix);
            Ok(asset)
        })
    }
}
