//! Test: pipelines notify the dev server; the server injects its client

use crate::helpers::*;
use sitepipe::server::{DevServer, ReloadEvent, ServerError};
use sitepipe::site::default_command;
use sitepipe::{BuildEnvironment, Node, TaskError};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn test_pipelines_send_their_notification() {
    let fixture = SiteFixture::standard();
    let site = fixture.site(BuildEnvironment::Development, Arc::new(MockBundler::default()));
    let mut client = site.server().live_reload().subscribe();
    let engine = site.engine().unwrap();

    engine.run(default_command()).await.unwrap();

    // templates and scripts reload; styles inject; images stay silent
    let mut events = Vec::new();
    while let Ok(event) = client.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            ReloadEvent::Reload,
            ReloadEvent::Inject {
                paths: vec!["css/main.css".to_string()]
            },
            ReloadEvent::Reload,
        ]
    );
}

#[tokio::test]
async fn test_served_pages_get_client() {
    let fixture = SiteFixture::standard();
    fixture
        .engine(BuildEnvironment::Development)
        .run(Node::task("templates"))
        .await
        .unwrap();

    let server = DevServer::new(fixture.build(), "127.0.0.1", 0);
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { server.serve_on(listener).await });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("<footer>dev</footer>"));
    assert!(response.contains("<script src=\"/__livereload.js\"></script></body>"));
}

/// A port already in use fails the serve task
#[tokio::test]
async fn test_bind_failure_fails_serve_task() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let fixture = SiteFixture::standard();
    let mut config = fixture.config();
    config.server.port = taken.local_addr().unwrap().port();

    let engine = sitepipe::Site::new(config, BuildEnvironment::Development)
        .with_bundler(Arc::new(MockBundler::default()))
        .engine()
        .unwrap();

    let err = engine.run(Node::task("serve")).await.unwrap_err();
    match err {
        TaskError::Failed { task, source } => {
            assert_eq!(task, "serve");
            assert!(matches!(*source, TaskError::Server(ServerError::Bind { .. })));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// A nested page linking its stylesheet relatively resolves to the same
/// path the style pipeline announces
#[tokio::test]
async fn test_nested_page_stylesheet_matches_inject_path() {
    let fixture = SiteFixture::standard();
    fixture.write(
        "templates/pages/blog/post.html",
        "<html><head><link rel=\"stylesheet\" href=\"../css/main.css\"></head><body>post</body></html>",
    );
    let site = fixture.site(BuildEnvironment::Development, Arc::new(MockBundler::default()));
    let mut client = site.server().live_reload().subscribe();
    let engine = site.engine().unwrap();
    engine.run(Node::task("templates")).await.unwrap();
    engine.run(Node::task("styles")).await.unwrap();

    let mut inject_paths = Vec::new();
    while let Ok(event) = client.try_recv() {
        if let ReloadEvent::Inject { paths } = event {
            inject_paths.extend(paths);
        }
    }
    assert_eq!(inject_paths, vec!["css/main.css".to_string()]);

    let server = DevServer::new(fixture.build(), "127.0.0.1", 0);
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { server.serve_on(listener).await });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /blog/post.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("<script src=\"/__livereload.js\"></script></body>"));

    let href = response
        .split("href=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap();
    assert_eq!(href, "../css/main.css");
    assert_eq!(resolve_href("blog/post.html", href), inject_paths[0]);
    assert_eq!(resolve_href("blog/post.html", "./../css/main.css"), inject_paths[0]);
}
