//! Build context - the read-only state every pipeline run receives

use crate::core::BuildEnvironment;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Receiver of "the output changed" notifications, i.e. the dev server
pub trait ReloadNotifier: Send + Sync {
    /// Ask connected clients for a full page reload
    fn reload(&self);

    /// Ask connected clients to swap the given stylesheets in place.
    /// Paths are relative to the build root, with `/` separators.
    fn inject(&self, paths: &[String]);
}

/// Which notification a pipeline sends after writing its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Hard refresh (templates, scripts)
    Reload,
    /// In-place style swap without navigation (styles)
    Inject,
    /// No notification (images)
    Nothing,
}

/// Context for a single pipeline run
///
/// Built once per run; nothing in it is mutated while steps execute.
#[derive(Clone)]
pub struct BuildContext {
    /// Resolved build environment
    pub env: BuildEnvironment,

    /// Root of the source tree (`app/`)
    pub source_root: PathBuf,

    /// Root of the build output (`build/`)
    pub build_root: PathBuf,

    /// Correlation id for this run's log lines
    pub run_id: Uuid,

    /// Dev server notifications, if anyone is listening
    pub notifier: Option<Arc<dyn ReloadNotifier>>,
}

impl BuildContext {
    pub fn new(env: BuildEnvironment, source_root: impl Into<PathBuf>, build_root: impl Into<PathBuf>) -> Self {
        Self {
            env,
            source_root: source_root.into(),
            build_root: build_root.into(),
            run_id: Uuid::new_v4(),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReloadNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Same settings, fresh run id
    pub fn for_new_run(&self) -> Self {
        let mut context = self.clone();
        context.run_id = Uuid::new_v4();
        context
    }

    /// Resolve a path under the source root
    pub fn source_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.source_root.join(relative)
    }

    pub fn is_production(&self) -> bool {
        self.env.is_production()
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("env", &self.env)
            .field("source_root", &self.source_root)
            .field("build_root", &self.build_root)
            .field("run_id", &self.run_id)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}
