//! Live-reload channel between pipelines and connected browsers

use crate::core::ReloadNotifier;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// WebSocket endpoint browsers connect to
pub const SOCKET_PATH: &str = "/__livereload";

/// Path the client script is served from
pub const SCRIPT_PATH: &str = "/__livereload.js";

const CHANNEL_CAPACITY: usize = 64;

/// Browser-side client: reloads the page, or swaps matching stylesheets
pub const CLIENT_SCRIPT: &str = r#"(function () {
  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var socket = new WebSocket(scheme + location.host + '/__livereload');

  // Build-root relative path of a stylesheet, whatever form its href takes
  function stylesheetPath(link) {
    return new URL(link.href, location.href).pathname.replace(/^\//, '');
  }

  socket.onmessage = function (message) {
    var event = JSON.parse(message.data);
    if (event.command === 'reload') {
      location.reload();
      return;
    }
    if (event.command === 'inject') {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      Array.prototype.forEach.call(links, function (link) {
        if (!link.href || event.paths.indexOf(stylesheetPath(link)) === -1) {
          return;
        }
        var url = new URL(link.href, location.href);
        url.searchParams.set('livereload', Date.now());
        link.setAttribute('href', url.href);
      });
    }
  };
})();
"#;

/// Message pushed to browsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Hard refresh
    Reload,
    /// Re-fetch these stylesheets in place
    Inject { paths: Vec<String> },
}

/// Broadcasts reload events to every connected client
#[derive(Debug, Clone)]
pub struct LiveReload {
    sender: broadcast::Sender<ReloadEvent>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    pub fn clients(&self) -> usize {
        self.sender.receiver_count()
    }

    fn publish(&self, event: ReloadEvent) {
        match self.sender.send(event) {
            Ok(count) => debug!("Live reload sent to {} client(s)", count),
            Err(_) => debug!("Live reload skipped: no clients connected"),
        }
    }
}

impl ReloadNotifier for LiveReload {
    fn reload(&self) {
        self.publish(ReloadEvent::Reload);
    }

    fn inject(&self, paths: &[String]) {
        if paths.is_empty() {
            return;
        }
        self.publish(ReloadEvent::Inject {
            paths: paths.to_vec(),
        });
    }
}

/// Insert the client script tag before the last `</body>`, or append it
pub fn inject_script(html: &str) -> String {
    let tag = format!("<script src=\"{}\"></script>", SCRIPT_PATH);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => format!("{}{}{}", &html[..index], tag, &html[index..]),
        None => format!("{}{}", html, tag),
    }
}
