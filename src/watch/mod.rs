//! Poll-based watch service: re-runs a pipeline task when its sources change

use crate::core::{error::error_chain, PathMatcher};
use crate::execution::{ExecutionEngine, Node};
use chrono::Local;
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),

    #[error("failed to watch {}: {source}", path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watch event channel closed")]
    ChannelClosed,
}

/// One watched pipeline: the task to re-run and the files that trigger it
#[derive(Debug, Clone)]
pub struct WatchEntry {
    pub task: String,
    pub matcher: PathMatcher,
}

type WatchMessage = (usize, notify::Result<Event>);

/// Watches each entry's directory and re-runs its task on change
pub struct WatchService {
    engine: ExecutionEngine,
    entries: Vec<WatchEntry>,
    poll_interval: Duration,
}

/// A started watch: the live watchers and their event stream
pub struct ActiveWatch {
    entries: Vec<WatchEntry>,
    receiver: UnboundedReceiver<WatchMessage>,
    _watchers: Vec<PollWatcher>,
}

impl WatchService {
    pub fn new(engine: ExecutionEngine, poll_interval: Duration) -> Self {
        Self {
            engine,
            entries: Vec::new(),
            poll_interval,
        }
    }

    /// Add a watched task
    pub fn watch(mut self, task: impl Into<String>, matcher: PathMatcher) -> Self {
        self.entries.push(WatchEntry {
            task: task.into(),
            matcher,
        });
        self
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    /// Create one poll watcher per entry. Entries whose directory does not
    /// exist are skipped with a warning.
    pub fn start(&self) -> Result<ActiveWatch, WatchError> {
        let (sender, receiver) = unbounded_channel();
        let mut watchers = Vec::with_capacity(self.entries.len());

        for (index, entry) in self.entries.iter().enumerate() {
            let base = entry.matcher.base();
            if !base.is_dir() {
                warn!("Not watching {}: directory does not exist", base.display());
                continue;
            }

            let mut watcher = self.poll_watcher(index, sender.clone())?;
            watcher
                .watch(base, RecursiveMode::Recursive)
                .map_err(|source| WatchError::WatchPath {
                    path: base.to_path_buf(),
                    source,
                })?;
            debug!("Watching {} for task {}", base.display(), entry.task);
            watchers.push(watcher);
        }

        Ok(ActiveWatch {
            entries: self.entries.clone(),
            receiver,
            _watchers: watchers,
        })
    }

    fn poll_watcher(&self, index: usize, sender: UnboundedSender<WatchMessage>) -> Result<PollWatcher, WatchError> {
        // Modification times are too coarse to see two saves within a second
        let config = Config::default()
            .with_poll_interval(self.poll_interval)
            .with_compare_contents(true);
        PollWatcher::new(
            move |event: notify::Result<Event>| {
                // The receiver is gone once the service stops
                let _ = sender.send((index, event));
            },
            config,
        )
        .map_err(WatchError::WatcherInit)
    }

    /// Watch until the process is interrupted.
    ///
    /// Each batch of matching events spawns one run per triggered task; runs
    /// may overlap. A failed run is logged and watching continues.
    pub async fn run(&self) -> Result<(), WatchError> {
        let mut active = self.start()?;
        info!("Watching {} source tree(s) for changes", active._watchers.len());

        loop {
            let tasks = active.next_batch().await?;
            for task in tasks {
                info!("[{}] Change detected, running {}", Local::now().format("%H:%M:%S"), task);
                let engine = self.engine.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.run(Node::task(task.clone())).await {
                        error!(
                            "[{}] Rebuild of {} failed: {}",
                            Local::now().format("%H:%M:%S"),
                            task,
                            error_chain(&e)
                        );
                    }
                });
            }
        }
    }
}

impl ActiveWatch {
    /// Wait for the next batch of events and return the tasks it triggers,
    /// each at most once
    pub async fn next_batch(&mut self) -> Result<Vec<String>, WatchError> {
        loop {
            let first = self.receiver.recv().await.ok_or(WatchError::ChannelClosed)?;
            let mut triggered = BTreeSet::new();
            self.collect(first, &mut triggered);
            while let Ok(message) = self.receiver.try_recv() {
                self.collect(message, &mut triggered);
            }

            if !triggered.is_empty() {
                return Ok(triggered
                    .into_iter()
                    .map(|index| self.entries[index].task.clone())
                    .collect());
            }
        }
    }

    fn collect(&self, (index, event): WatchMessage, triggered: &mut BTreeSet<usize>) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!("Watch error: {}", e);
                return;
            }
        };

        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }

        let Some(entry) = self.entries.get(index) else {
            return;
        };
        if event.paths.iter().any(|path| entry.matcher.matches(path)) {
            debug!("{:?} on {:?} triggers {}", event.kind, event.paths, entry.task);
            triggered.insert(index);
        }
    }
}
