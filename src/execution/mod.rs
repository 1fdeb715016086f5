//! Task execution: registry, composition and the engine

pub mod composition;
pub mod engine;
pub mod task;

pub use composition::{parallel, series, Node};
pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use task::{RegistryError, Task, TaskError, TaskFuture, TaskRegistry};
