//! sitepipe - a static-site front-end build pipeline with live reload

pub mod bundler;
pub mod cli;
pub mod core;
pub mod execution;
pub mod pipelines;
pub mod server;
pub mod site;
pub mod watch;

// Re-export commonly used types
pub use bundler::{BundleRequest, Bundler, BundlerError, EsbuildBundler};
pub use crate::core::{Asset, BuildContext, BuildEnvironment, Pipeline, PipelineError, SiteConfig, Step, TransformError};
pub use execution::{parallel, series, ExecutionEngine, ExecutionEvent, Node, Task, TaskError, TaskRegistry};
pub use server::{DevServer, ServerError};
pub use site::{Site, SiteError};
pub use watch::{WatchError, WatchService};
