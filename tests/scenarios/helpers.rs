//! Test utility functions: site fixtures and a mock bundler

use async_trait::async_trait;
use sitepipe::bundler::{BundleRequest, Bundler, BundlerError};
use sitepipe::core::config::{ServerConfig, WatchConfig};
use sitepipe::{BuildEnvironment, ExecutionEngine, Site, SiteConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Bundler that copies the entry file, prefixed with the flags it was given
#[derive(Default)]
pub struct MockBundler {
    calls: AtomicUsize,
}

impl MockBundler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bundler for MockBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<String, BundlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let source = tokio::fs::read_to_string(&request.entry)
            .await
            .map_err(|source| BundlerError::Spawn {
                program: "mock".to_string(),
                source,
            })?;
        Ok(format!(
            "/* minify={} sourcemap={} target={} */\n{}",
            request.minify, request.source_map, request.target, source
        ))
    }
}

/// A site source tree in a temporary directory
pub struct SiteFixture {
    pub dir: TempDir,
}

impl SiteFixture {
    /// Empty source tree
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir_all(dir.path().join("app")).expect("app dir");
        Self { dir }
    }

    /// A small complete site: one page with a layout and a partial, a Sass
    /// entry with a glob import, a script entry and a couple of images
    pub fn standard() -> Self {
        let fixture = Self::empty();
        fixture.write(
            "templates/layouts/_base.njk",
            "<!DOCTYPE html>\n<html>\n<head>\n<link rel=\"stylesheet\" href=\"css/main.css\">\n</head>\n<body>\n{% block content %}{% endblock content %}\n</body>\n</html>\n",
        );
        fixture.write("templates/partials/_footer.njk", "<footer>{% if IS_PRODUCTION %}prod{% else %}dev{% endif %}</footer>");
        fixture.write(
            "templates/pages/index.njk",
            "{% extends \"layouts/_base.njk\" %}\n{% block content %}\n<main>Hello</main>\n{% include \"partials/_footer.njk\" %}\n{% endblock content %}\n",
        );

        fixture.write("styles/main.scss", "@import \"blocks/**/*.scss\";\nbody { .page { margin: 0; } }\n");
        fixture.write("styles/blocks/header.scss", ".header { display: flex; }\n");
        fixture.write("styles/blocks/_vars.scss", "$unused: 1px;\n");

        fixture.write("scripts/main.js", "import { x } from './_helper.js';\nconsole.log(x);\n");
        fixture.write("scripts/_helper.js", "export const x = 1;\n");

        fixture.write("images/logo.svg", "<svg>\n  <!-- logo -->\n  <rect/>\n</svg>\n");
        fixture.write("images/_draft.svg", "<svg/>");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn app(&self) -> PathBuf {
        self.root().join("app")
    }

    pub fn build(&self) -> PathBuf {
        self.root().join("build")
    }

    /// Write a file under the source root
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.app().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, content).expect("write fixture file");
    }

    pub fn read_output(&self, relative: &str) -> String {
        fs::read_to_string(self.build().join(relative)).expect("read output")
    }

    pub fn config(&self) -> SiteConfig {
        SiteConfig {
            source_dir: self.app(),
            build_dir: self.build(),
            server: ServerConfig {
                open: false,
                ..ServerConfig::default()
            },
            watch: WatchConfig { poll_interval_ms: 20 },
            ..SiteConfig::default()
        }
    }

    pub fn site(&self, env: BuildEnvironment, bundler: Arc<MockBundler>) -> Site {
        Site::new(self.config(), env).with_bundler(bundler)
    }

    pub fn engine(&self, env: BuildEnvironment) -> ExecutionEngine {
        self.site(env, Arc::new(MockBundler::default()))
            .engine()
            .expect("site assembles")
    }

    /// Every file under the build root, relative, sorted
    pub fn outputs(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(&self.build(), &self.build(), &mut files);
        files.sort();
        files
    }
}

fn collect_files(base: &Path, dir: &Path, files: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, files);
        } else if let Ok(relative) = path.strip_prefix(base) {
            let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            files.push(parts.join("/"));
        }
    }
}

/// Poll until `check` holds or the timeout passes
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let step = Duration::from_millis(25);
    let mut waited = Duration::ZERO;
    while waited < timeout {
        if check() {
            return true;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    check()
}

/// Resolve a relative `href` against the page it appears on, giving a
/// build-root relative path
pub fn resolve_href(page: &str, href: &str) -> String {
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        page.split('/').collect()
    };
    parts.pop();
    for segment in href.trim_start_matches('/').split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
