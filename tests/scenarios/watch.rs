//! Test: the watch service rebuilds a pipeline when a source changes

use crate::helpers::*;
use sitepipe::{BuildEnvironment, ExecutionEngine, Node};
use std::sync::Arc;
use std::time::Duration;

/// Editing a partial re-runs the styles pipeline, and a failing rebuild
/// does not stop the watcher
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_change_rebuilds_styles() {
    let fixture = SiteFixture::standard();
    let site = fixture.site(BuildEnvironment::Development, Arc::new(MockBundler::default()));
    let engine = ExecutionEngine::new(site.pipeline_registry().unwrap());
    engine.run(Node::task("styles")).await.unwrap();
    assert!(!fixture.read_output("css/main.css").contains(".footer"));

    let watch = Arc::new(site.watch_service(engine).unwrap());
    let running = watch.clone();
    let handle = tokio::spawn(async move { running.run().await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Broken partial: the rebuild fails and is only logged
    fixture.write("styles/blocks/footer.scss", ".footer { color: red;\n");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!handle.is_finished());

    fixture.write("styles/blocks/footer.scss", ".footer { color: red; }\n");
    let rebuilt = eventually(Duration::from_secs(5), || {
        std::fs::read_to_string(fixture.build().join("css/main.css"))
            .map(|css| css.contains(".footer"))
            .unwrap_or(false)
    })
    .await;

    handle.abort();
    assert!(rebuilt, "styles were not rebuilt after the change");
}
