//! Site assembly: pipelines, tasks and the top-level commands

use crate::bundler::{Bundler, EsbuildBundler};
use crate::core::{BuildContext, BuildEnvironment, PathMatcher, Pipeline, PipelineError, SiteConfig};
use crate::execution::{parallel, series, EventHandler, ExecutionEngine, Node, RegistryError, Task, TaskRegistry};
use crate::pipelines::{self, images, scripts, styles, templates};
use crate::server::DevServer;
use crate::watch::WatchService;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Pipeline tasks in build order
pub const PIPELINE_TASKS: [&str; 4] = ["templates", "styles", "scripts", "images"];

/// Top-level commands
pub const COMMANDS: [&str; 3] = ["default", "build", "development"];

/// Errors while assembling the site
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("pipelines '{first}' and '{second}' both write to '{}'", destination.display())]
    OverlappingDestination {
        first: String,
        second: String,
        destination: PathBuf,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// `default`: every pipeline, in order, without cleaning
pub fn default_command() -> Node {
    series(PIPELINE_TASKS.map(Node::task))
}

/// `build`: clean, then every pipeline
pub fn build_command() -> Node {
    series([Node::task("clean"), default_command()])
}

/// `development`: a full build, then watch and serve side by side
pub fn development_command() -> Node {
    series([
        Node::task("clean"),
        default_command(),
        parallel([Node::task("watch"), Node::task("serve")]),
    ])
}

/// Look up a top-level command by name
pub fn command(name: &str) -> Option<Node> {
    match name {
        "default" => Some(default_command()),
        "build" => Some(build_command()),
        "development" => Some(development_command()),
        _ => None,
    }
}

/// Reject pipelines that share an output subtree
pub fn validate_destinations(pipelines: &[Pipeline]) -> Result<(), SiteError> {
    for (i, first) in pipelines.iter().enumerate() {
        if let Some(second) = pipelines[i + 1..]
            .iter()
            .find(|other| other.destination == first.destination)
        {
            return Err(SiteError::OverlappingDestination {
                first: first.name.clone(),
                second: second.name.clone(),
                destination: first.destination.clone(),
            });
        }
    }
    Ok(())
}

/// A configured site for one invocation
pub struct Site {
    config: SiteConfig,
    context: BuildContext,
    server: DevServer,
    bundler: Arc<dyn Bundler>,
    handlers: Vec<EventHandler>,
}

impl Site {
    pub fn new(config: SiteConfig, env: BuildEnvironment) -> Self {
        let server = DevServer::new(&config.build_dir, config.server.host.clone(), config.server.port)
            .with_open_browser(config.server.open);
        let context = BuildContext::new(env, &config.source_dir, &config.build_dir).with_notifier(server.notifier());
        let bundler = Arc::new(EsbuildBundler::new(
            config.scripts.bundler.clone(),
            config.scripts.timeout_secs,
        ));

        Self {
            config,
            context,
            server,
            bundler,
            handlers: Vec::new(),
        }
    }

    /// Replace the script bundler
    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    /// Receive execution events from every engine this site creates
    pub fn with_event_handler(mut self, handler: EventHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    pub fn server(&self) -> &DevServer {
        &self.server
    }

    /// The four domain pipelines
    pub fn pipelines(&self) -> Vec<Pipeline> {
        let root = &self.config.source_dir;
        vec![
            templates::pipeline(root),
            styles::pipeline(root),
            scripts::pipeline(root, self.bundler.clone(), self.config.scripts.target.clone()),
            images::pipeline(root),
        ]
    }

    /// Clean plus one task per pipeline
    pub fn pipeline_registry(&self) -> Result<TaskRegistry, SiteError> {
        let domain = self.pipelines();
        validate_destinations(&domain)?;

        let mut registry = TaskRegistry::new();
        let build_root = self.config.build_dir.clone();
        registry.register(Task::new("clean", "Remove the build output", move || {
            let build_root = build_root.clone();
            async move {
                pipelines::clean(&build_root).await?;
                Ok(())
            }
        }))?;

        for pipeline in domain {
            let name = pipeline.name.clone();
            let description = format!("Build {} into {}", name, self.output_dir(&pipeline).display());
            let pipeline = Arc::new(pipeline);
            let context = self.context.clone();
            registry.register(Task::new(name, description, move || {
                let pipeline = pipeline.clone();
                let context = context.for_new_run();
                async move {
                    pipeline.run(&context).await?;
                    Ok(())
                }
            }))?;
        }

        Ok(registry)
    }

    /// Pipeline tasks plus the long-running watch and serve tasks
    pub fn registry(&self) -> Result<TaskRegistry, SiteError> {
        let mut registry = self.pipeline_registry()?;

        // Watch-triggered runs go through their own engine over the
        // pipeline tasks only.
        let watch = Arc::new(self.watch_service(self.engine_for(self.pipeline_registry()?))?);
        registry.register(Task::new("watch", "Rebuild on source changes", move || {
            let watch = watch.clone();
            async move {
                watch.run().await?;
                Ok(())
            }
        }))?;

        let server = self.server.clone();
        let description = format!("Serve the build output on {}", server.address());
        registry.register(Task::new("serve", description, move || {
            let server = server.clone();
            async move {
                server.serve().await?;
                Ok(())
            }
        }))?;

        Ok(registry)
    }

    /// Engine over the full registry
    pub fn engine(&self) -> Result<ExecutionEngine, SiteError> {
        Ok(self.engine_for(self.registry()?))
    }

    fn engine_for(&self, registry: TaskRegistry) -> ExecutionEngine {
        self.handlers
            .iter()
            .cloned()
            .fold(ExecutionEngine::new(registry), |engine, handler| engine.with_shared_handler(handler))
    }

    /// Watch service for the four pipelines. Partials are watched too.
    pub fn watch_service(&self, engine: ExecutionEngine) -> Result<WatchService, SiteError> {
        let root = &self.config.source_dir;
        let interval = Duration::from_millis(self.config.watch.poll_interval_ms);

        Ok(WatchService::new(engine, interval)
            .watch("templates", PathMatcher::new(root.join("templates"), templates::watch_patterns())?)
            .watch("styles", PathMatcher::new(root.join("styles"), styles::watch_patterns())?)
            .watch("scripts", PathMatcher::new(root.join("scripts"), scripts::watch_patterns())?)
            .watch("images", PathMatcher::new(root.join("images"), images::watch_patterns())?))
    }

    fn output_dir(&self, pipeline: &Pipeline) -> PathBuf {
        self.config.build_dir.join(&pipeline.destination)
    }
}
