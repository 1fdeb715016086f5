//! Main execution engine - runs composed task graphs

use crate::core::error::error_chain;
use crate::execution::{
    composition::Node,
    task::{TaskError, TaskRegistry},
};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Events that can occur while running tasks
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    TaskStarted {
        task: String,
    },
    TaskCompleted {
        task: String,
        duration: Duration,
    },
    TaskFailed {
        task: String,
        error: String,
        duration: Duration,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Runs task graphs against a registry
///
/// Cloning is cheap; clones share the registry and handlers.
#[derive(Clone)]
pub struct ExecutionEngine {
    registry: Arc<TaskRegistry>,
    event_handlers: Arc<Vec<EventHandler>>,
}

impl ExecutionEngine {
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            event_handlers: Arc::new(Vec::new()),
        }
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.event_handlers).push(Arc::new(handler));
        self
    }

    /// Share an existing handler
    pub fn with_shared_handler(mut self, handler: EventHandler) -> Self {
        Arc::make_mut(&mut self.event_handlers).push(handler);
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in self.event_handlers.iter() {
            handler(event.clone());
        }
    }

    /// Run a node to completion.
    ///
    /// Sequences are fail-fast. Parallel groups report the first failure as
    /// soon as it happens; siblings still running are left to finish in the
    /// background and are not cancelled.
    pub fn run(&self, node: Node) -> BoxFuture<'static, Result<(), TaskError>> {
        let engine = self.clone();
        async move {
            match node {
                Node::Task(name) => engine.run_task(&name).await,
                Node::Sequence(children) => {
                    for child in children {
                        engine.run(child).await?;
                    }
                    Ok(())
                }
                Node::Parallel(children) => engine.run_parallel(children).await,
            }
        }
        .boxed()
    }

    async fn run_task(&self, name: &str) -> Result<(), TaskError> {
        let task = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

        info!("Starting task: {}", name);
        self.emit_event(ExecutionEvent::TaskStarted {
            task: name.to_string(),
        });

        let start = Instant::now();
        let result = task.invoke().await;
        let duration = start.elapsed();

        match result {
            Ok(()) => {
                info!("Finished task: {} ({}ms)", name, duration.as_millis());
                self.emit_event(ExecutionEvent::TaskCompleted {
                    task: name.to_string(),
                    duration,
                });
                Ok(())
            }
            Err(err) => {
                let message = error_chain(&err);
                error!("Task {} failed: {}", name, message);
                self.emit_event(ExecutionEvent::TaskFailed {
                    task: name.to_string(),
                    error: message,
                    duration,
                });
                Err(TaskError::Failed {
                    task: name.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn run_parallel(&self, children: Vec<Node>) -> Result<(), TaskError> {
        debug!("Starting parallel group of {} node(s)", children.len());

        let mut pending: FuturesUnordered<_> = children
            .into_iter()
            .map(|child| tokio::spawn(self.run(child)))
            .collect();

        while let Some(joined) = pending.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(err),
                Err(join_error) => return Err(TaskError::Panicked(join_error.to_string())),
            }
        }

        Ok(())
    }
}
