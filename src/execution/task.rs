//! Named tasks and the task registry

use crate::core::PipelineError;
use crate::server::ServerError;
use crate::watch::WatchError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors a task can finish with
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("task '{task}' failed: {source}")]
    Failed {
        task: String,
        #[source]
        source: Box<TaskError>,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl TaskError {
    /// Name of the task that failed, if known
    pub fn task(&self) -> Option<&str> {
        match self {
            TaskError::Failed { task, .. } => Some(task),
            TaskError::UnknownTask(task) => Some(task),
            _ => None,
        }
    }
}

/// Errors while registering tasks
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("task '{0}' is already registered")]
    Duplicate(String),
}

/// The completion signal a task returns
pub type TaskFuture = BoxFuture<'static, Result<(), TaskError>>;

type TaskFn = dyn Fn() -> TaskFuture + Send + Sync;

/// A named, re-runnable unit of work
#[derive(Clone)]
pub struct Task {
    name: String,
    description: String,
    run: Arc<TaskFn>,
}

impl Task {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            run: Arc::new(move || f().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Start a fresh invocation
    pub fn invoke(&self) -> TaskFuture {
        (self.run)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Task lookup by name
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Each name may be registered only once.
    pub fn register(&mut self, task: Task) -> Result<(), RegistryError> {
        if self.tasks.contains_key(task.name()) {
            return Err(RegistryError::Duplicate(task.name().to_string()));
        }
        self.order.push(task.name().to_string());
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
