//! Core domain models
//!
//! This module defines the environment, assets, steps and pipelines that
//! every domain pipeline is built from.

pub mod asset;
pub mod condition;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod step;

pub use asset::Asset;
pub use condition::Condition;
pub use config::SiteConfig;
pub use context::{BuildContext, Notify, ReloadNotifier};
pub use environment::BuildEnvironment;
pub use error::{PipelineError, TransformError};
pub use pipeline::{Pipeline, PipelineReport};
pub use source::{PathMatcher, SourceSet};
pub use step::Step;
