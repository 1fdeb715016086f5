//! Test: style output is deterministic and environment dependent

use crate::helpers::*;
use sitepipe::{BuildEnvironment, Node};

async fn run_styles(fixture: &SiteFixture, env: BuildEnvironment) {
    fixture.engine(env).run(Node::task("styles")).await.unwrap();
}

#[tokio::test]
async fn test_two_runs_are_byte_identical() {
    let fixture = SiteFixture::standard();

    run_styles(&fixture, BuildEnvironment::Development).await;
    let css = fixture.read_output("css/main.css");
    let map = fixture.read_output("css/main.css.map");

    run_styles(&fixture, BuildEnvironment::Development).await;
    assert_eq!(css, fixture.read_output("css/main.css"));
    assert_eq!(map, fixture.read_output("css/main.css.map"));

    run_styles(&fixture, BuildEnvironment::Production).await;
    let min = fixture.read_output("css/main.min.css");
    run_styles(&fixture, BuildEnvironment::Production).await;
    assert_eq!(min, fixture.read_output("css/main.min.css"));
}

#[tokio::test]
async fn test_development_has_source_map() {
    let fixture = SiteFixture::standard();
    run_styles(&fixture, BuildEnvironment::Development).await;

    let css = fixture.read_output("css/main.css");
    assert!(css.contains("/*# sourceMappingURL=main.css.map */"));
    assert!(css.contains("\r\n\t"), "expected tab indentation and CRLF: {:?}", css);

    let map: serde_json::Value = serde_json::from_str(&fixture.read_output("css/main.css.map")).unwrap();
    assert_eq!(map["version"], 3);
    let sources = map["sources"].as_array().unwrap();
    assert!(sources.iter().any(|s| s == "main.scss"));
    assert!(sources.iter().any(|s| s == "blocks/header.scss"));
    assert!(!fixture.build().join("css/main.min.css").exists());
}

#[tokio::test]
async fn test_production_is_minified_without_map() {
    let fixture = SiteFixture::standard();
    run_styles(&fixture, BuildEnvironment::Production).await;

    assert_eq!(fixture.outputs(), vec!["css/main.min.css"]);
    let css = fixture.read_output("css/main.min.css");
    assert!(!css.contains("sourceMappingURL"));
    assert!(!css.contains('\t'));
    assert!(css.contains(".header{"), "{}", css);
}
