//! Development server: static files from the build root plus live reload

pub mod livereload;

use crate::core::ReloadNotifier;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

pub use livereload::{inject_script, LiveReload, ReloadEvent, CLIENT_SCRIPT, SCRIPT_PATH, SOCKET_PATH};

/// Error types for the dev server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Static file server with a live-reload channel
#[derive(Debug, Clone)]
pub struct DevServer {
    root: PathBuf,
    host: String,
    port: u16,
    open_browser: bool,
    live: LiveReload,
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>, host: impl Into<String>, port: u16) -> Self {
        Self {
            root: root.into(),
            host: host.into(),
            port,
            open_browser: false,
            live: LiveReload::new(),
        }
    }

    /// Open the default browser on the served URL once bound
    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn opens_browser(&self) -> bool {
        self.open_browser
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Notifier that pipelines use to reach connected browsers
    pub fn notifier(&self) -> Arc<dyn ReloadNotifier> {
        Arc::new(self.live.clone())
    }

    pub fn live_reload(&self) -> &LiveReload {
        &self.live
    }

    pub fn router(&self) -> Router {
        let files = ServeDir::new(&self.root).append_index_html_on_directories(true);

        Router::new()
            .route(SOCKET_PATH, get(livereload_socket))
            .route(SCRIPT_PATH, get(client_script))
            .fallback_service(files)
            .layer(middleware::from_fn(inject_client))
            .with_state(self.live.clone())
    }

    /// Bind the configured address. Failure is fatal to the caller.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.address();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve on an already bound listener until the process stops
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(local) = listener.local_addr() {
            let url = browser_url(local);
            info!("Serving {} at {}", self.root.display(), url);
            if self.open_browser {
                open_in_browser(&url);
            }
        }
        axum::serve(listener, self.router())
            .await
            .map_err(ServerError::Serve)
    }

    pub async fn serve(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve_on(listener).await
    }
}

/// URL a browser on this machine can reach the listener at
pub fn browser_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() || addr.ip().is_loopback() {
        format!("http://localhost:{}/", addr.port())
    } else {
        format!("http://{}/", addr)
    }
}

/// Failing to launch a browser never stops the server
fn open_in_browser(url: &str) {
    match open::that_detached(url) {
        Ok(()) => debug!("Opened {} in the default browser", url),
        Err(e) => warn!("Could not open a browser at {}: {}", url, e),
    }
}

async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_SCRIPT)
}

async fn livereload_socket(ws: WebSocketUpgrade, State(live): State<LiveReload>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, live))
}

async fn client_session(mut socket: WebSocket, live: LiveReload) {
    let mut events = live.subscribe();
    debug!("Live reload client connected ({} total)", live.clients());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Live reload client lagged by {} event(s)", skipped),
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Live reload client disconnected");
}

/// Add the client script to HTML responses
async fn inject_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if !is_html || !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}
