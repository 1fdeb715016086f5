//! Test: Sequence and Parallel composition semantics

use sitepipe::{parallel, series, ExecutionEngine, Node, Task, TaskError, TaskRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting(name: &str, counter: Arc<AtomicUsize>, delay: Duration) -> Task {
    Task::new(name, "counts", move || {
        let counter = counter.clone();
        async move {
            tokio::time::sleep(delay).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn failing(name: &str, delay: Duration) -> Task {
    Task::new(name, "fails", move || async move {
        tokio::time::sleep(delay).await;
        Err(TaskError::Other("broken".to_string()))
    })
}

/// Sequence [A, B] with A failing never starts B
#[tokio::test]
async fn test_sequence_failure_never_starts_next() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();
    registry.register(failing("a", Duration::ZERO)).unwrap();
    registry.register(counting("b", counter.clone(), Duration::ZERO)).unwrap();

    let engine = ExecutionEngine::new(registry);
    let err = engine.run(series([Node::task("a"), Node::task("b")])).await.unwrap_err();

    assert_eq!(err.task(), Some("a"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

/// Parallel reports failure whichever member fails and whenever it fails
#[tokio::test]
async fn test_parallel_failure_irrespective_of_order() {
    for (fail_delay, ok_delay) in [(0, 30), (30, 0)] {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = TaskRegistry::new();
        registry
            .register(failing("bad", Duration::from_millis(fail_delay)))
            .unwrap();
        registry
            .register(counting("good", counter.clone(), Duration::from_millis(ok_delay)))
            .unwrap();
        let engine = ExecutionEngine::new(registry);

        for group in [
            parallel([Node::task("bad"), Node::task("good")]),
            parallel([Node::task("good"), Node::task("bad")]),
        ] {
            let err = engine.run(group).await.unwrap_err();
            assert_eq!(err.task(), Some("bad"));
        }
    }
}

/// Nested groups: parallel inside a sequence waits for every member
#[tokio::test]
async fn test_nested_composition() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();
    for name in ["first", "left", "right"] {
        registry
            .register(counting(name, counter.clone(), Duration::from_millis(10)))
            .unwrap();
    }
    let after = counter.clone();
    registry
        .register(Task::new("last", "checks", move || {
            let after = after.clone();
            async move {
                assert_eq!(after.load(Ordering::SeqCst), 3);
                Ok(())
            }
        }))
        .unwrap();

    let node = series([
        Node::task("first"),
        parallel([Node::task("left"), Node::task("right")]),
        Node::task("last"),
    ]);
    ExecutionEngine::new(registry).run(node).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

/// A composition node can be run again; each run is independent
#[tokio::test]
async fn test_node_rerun() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();
    registry.register(counting("a", counter.clone(), Duration::ZERO)).unwrap();
    let engine = ExecutionEngine::new(registry);

    let node = series([Node::task("a")]);
    engine.run(node.clone()).await.unwrap();
    engine.run(node).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}
