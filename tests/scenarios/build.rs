//! Test: top-level build commands end to end

use crate::helpers::*;
use sitepipe::site::{build_command, default_command};
use sitepipe::BuildEnvironment;
use std::sync::Arc;

/// One entry extending a layout and including a partial renders exactly one
/// file in the output root, with no partial output
#[tokio::test]
async fn test_build_renders_single_page() {
    let fixture = SiteFixture::standard();
    let engine = fixture.engine(BuildEnvironment::Development);

    engine.run(build_command()).await.unwrap();

    let root_files: Vec<_> = fixture
        .outputs()
        .into_iter()
        .filter(|f| !f.contains('/'))
        .collect();
    assert_eq!(root_files, vec!["index.html".to_string()]);

    let html = fixture.read_output("index.html");
    assert!(html.contains("<main>Hello</main>"));
    assert!(html.contains("<footer>dev</footer>"));
    assert!(html.contains("<link rel=\"stylesheet\" href=\"css/main.css\">"));
}

#[tokio::test]
async fn test_development_build_outputs() {
    let fixture = SiteFixture::standard();
    fixture
        .engine(BuildEnvironment::Development)
        .run(build_command())
        .await
        .unwrap();

    assert_eq!(
        fixture.outputs(),
        vec![
            "css/main.css",
            "css/main.css.map",
            "img/logo.svg",
            "index.html",
            "js/main.js",
        ]
    );

    let js = fixture.read_output("js/main.js");
    assert!(js.starts_with("/* minify=false sourcemap=true target=es2015 */"));
    assert_eq!(
        fixture.read_output("img/logo.svg"),
        "<svg>\n  <!-- logo -->\n  <rect/>\n</svg>\n"
    );
}

#[tokio::test]
async fn test_production_build_outputs() {
    let fixture = SiteFixture::standard();
    fixture
        .engine(BuildEnvironment::Production)
        .run(build_command())
        .await
        .unwrap();

    assert_eq!(
        fixture.outputs(),
        vec!["css/main.min.css", "img/logo.svg", "index.html", "js/min.main.js"]
    );

    let html = fixture.read_output("index.html");
    assert!(html.contains("<footer>prod</footer>"));
    assert!(html.contains("\r\n\t<body>\r\n"));
    assert!(!html.contains("\r\n\r\n"));

    let js = fixture.read_output("js/min.main.js");
    assert!(js.starts_with("/* minify=true sourcemap=false target=es2015 */"));
    assert_eq!(fixture.read_output("img/logo.svg"), "<svg><rect/></svg>");
}

/// `build` cleans stale output; `default` leaves it in place
#[tokio::test]
async fn test_clean_only_in_build() {
    let fixture = SiteFixture::standard();
    std::fs::create_dir_all(fixture.build()).unwrap();
    std::fs::write(fixture.build().join("stale.html"), "old").unwrap();

    let engine = fixture.engine(BuildEnvironment::Development);
    engine.run(default_command()).await.unwrap();
    assert!(fixture.build().join("stale.html").exists());

    engine.run(build_command()).await.unwrap();
    assert!(!fixture.build().join("stale.html").exists());
    assert!(fixture.build().join("index.html").exists());
}

/// A failing pipeline stops the build; later pipelines never run
#[tokio::test]
async fn test_failure_stops_build() {
    let fixture = SiteFixture::standard();
    fixture.write("styles/main.scss", ".broken { color: red;\n");

    let bundler = Arc::new(MockBundler::default());
    let engine = fixture
        .site(BuildEnvironment::Development, bundler.clone())
        .engine()
        .unwrap();

    let err = engine.run(build_command()).await.unwrap_err();
    assert_eq!(err.task(), Some("styles"));
    let message = sitepipe::core::error::error_chain(&err);
    assert!(message.contains("main.scss"), "{}", message);

    assert_eq!(bundler.calls(), 0);
    assert!(fixture.build().join("index.html").exists());
    assert!(!fixture.build().join("js").exists());
}
