//! Style pipeline: Sass entry compiled to CSS
//!
//! Development output is expanded CSS with a source map next to it.
//! Production output is prefixed, media-grouped and minified into
//! `main.min.css`.

use crate::core::{
    pipeline::url_path,
    source::{is_partial, SourceSet},
    step::{always, development_only, map_assets, production_only, Suffix},
    Asset, BuildContext, Notify, Pipeline, Step, TransformError,
};
use async_trait::async_trait;
use lightningcss::{
    rules::CssRule,
    stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet},
    targets::{Browsers, Targets},
    traits::ToCss,
};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static GLOB_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*)@import\s+["']([^"']*\*[^"']*)["']\s*;[ \t]*$"#)
        .expect("glob import pattern is valid")
});

/// Package directories searched for Sass imports, relative to the working directory
pub const VENDOR_LOAD_PATHS: &[&str] = &["node_modules", "bower_components"];

/// Build the style pipeline for a source root
pub fn pipeline(source_root: &Path) -> Pipeline {
    let entry = source_root.join("styles").join("main.scss");

    Pipeline::new("styles", SourceSet::entry(entry), "css")
        .step(always(GlobImports))
        .step(always(Compile::new(VENDOR_LOAD_PATHS.iter().copied())))
        .step(production_only(Autoprefix::default()))
        .step(production_only(GroupMedia))
        .step(production_only(Minify::default()))
        .step(production_only(Suffix::new(".min")))
        .step(development_only(SourceMap))
        .notify(Notify::Inject)
}

/// Watch patterns, relative to the styles directory
pub fn watch_patterns() -> Vec<String> {
    vec!["**/*.scss".to_string(), "**/*.css".to_string()]
}

/// Browser versions vendor prefixes are generated for
pub fn browser_targets() -> Targets {
    let version = |major: u32| Some(major << 16);
    Targets {
        browsers: Some(Browsers {
            chrome: version(49),
            edge: version(14),
            firefox: version(52),
            ie: version(11),
            ios_saf: version(9),
            safari: version(9),
            ..Browsers::default()
        }),
        ..Targets::default()
    }
}

fn stylesheet_error(file: &Path, error: impl Display) -> TransformError {
    TransformError::Stylesheet {
        file: file.to_path_buf(),
        message: error.to_string(),
    }
}

fn css_text(asset: &Asset) -> Result<String, TransformError> {
    asset
        .text()
        .map(str::to_string)
        .ok_or_else(|| TransformError::Encoding {
            file: asset.origin.clone(),
        })
}

/// Directory the entry lives in; relative imports resolve from here
fn entry_dir(asset: &Asset) -> PathBuf {
    asset
        .origin
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Expand `@import "dir/**/*.scss";` into one import per matching file.
///
/// Matches are sorted and partials skipped. Returns the rewritten source and
/// the files that were pulled in.
pub fn expand_glob_imports(source: &str, base: &Path) -> Result<(String, Vec<PathBuf>), TransformError> {
    let mut out = String::with_capacity(source.len());
    let mut imported = Vec::new();
    let mut last = 0;

    for cap in GLOB_IMPORT.captures_iter(source) {
        let whole = cap.get(0).expect("group 0 always exists");
        out.push_str(&source[last..whole.start()]);
        last = whole.end();

        let indent = &cap[1];
        let pattern = base.join(&cap[2]).to_string_lossy().into_owned();
        let entries = glob::glob(&pattern).map_err(|e| TransformError::Glob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .filter(|p| p.is_file() && !is_partial(p))
            .collect();
        files.sort();
        debug!("Glob import {} matched {} file(s)", &cap[2], files.len());

        let lines: Vec<String> = files
            .iter()
            .map(|file| {
                // grass resolves imports through load paths only without the extension
                let relative = file.strip_prefix(base).unwrap_or(file).with_extension("");
                format!("{}@import \"{}\";", indent, url_path(&relative))
            })
            .collect();
        out.push_str(&lines.join("\n"));
        imported.extend(files);
    }

    out.push_str(&source[last..]);
    Ok((out, imported))
}

/// Glob import expansion step
#[derive(Debug)]
pub struct GlobImports;

#[async_trait]
impl Step for GlobImports {
    fn name(&self) -> &str {
        "glob-imports"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            let source = css_text(&asset)?;
            let (expanded, imported) = expand_glob_imports(&source, &entry_dir(&asset))?;
            for file in &imported {
                asset.add_source(file);
            }
            asset.set_text(expanded);
            Ok(asset)
        })
    }
}

/// Reformat expanded compiler output: tab indentation, CRLF line endings
pub fn format_expanded(css: &str) -> String {
    let mut out = String::with_capacity(css.len() + css.len() / 8);
    for line in css.lines() {
        let content = line.trim_start_matches(' ');
        let spaces = line.len() - content.len();
        out.push_str(&"\t".repeat(spaces / 2));
        out.push_str(&" ".repeat(spaces % 2));
        out.push_str(content.trim_end());
        out.push_str("\r\n");
    }
    out
}

/// Sass compilation step
#[derive(Debug)]
pub struct Compile {
    load_paths: Vec<PathBuf>,
}

impl Compile {
    /// Extra load paths are searched after the entry's own directory
    pub fn new<I, P>(load_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            load_paths: load_paths.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Step for Compile {
    fn name(&self) -> &str {
        "sass"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            let source = css_text(&asset)?;
            let mut options = grass::Options::default()
                .style(grass::OutputStyle::Expanded)
                .load_path(entry_dir(&asset));
            for path in &self.load_paths {
                options = options.load_path(path);
            }

            let css = grass::from_string(source, &options).map_err(|e| stylesheet_error(&asset.origin, e))?;
            asset.set_text(format_expanded(&css));
            asset.set_extension("css");
            Ok(asset)
        })
    }
}

/// Parse an asset's CSS, let `edit` rework the sheet, and print it back
fn rewrite_css<F>(asset: &mut Asset, printer: PrinterOptions, edit: F) -> Result<(), TransformError>
where
    F: FnOnce(&mut StyleSheet<'_>) -> Result<(), String>,
{
    let css = css_text(asset)?;
    let file = asset.origin.clone();
    let options = ParserOptions {
        filename: asset.file_name(),
        ..ParserOptions::default()
    };

    let output = {
        let mut sheet = StyleSheet::parse(&css, options).map_err(|e| stylesheet_error(&file, e))?;
        edit(&mut sheet).map_err(|e| stylesheet_error(&file, e))?;
        sheet.to_css(printer).map_err(|e| stylesheet_error(&file, e))?.code
    };

    asset.set_text(output);
    Ok(())
}

/// Vendor prefixing for the fixed browser targets
pub struct Autoprefix {
    targets: Targets,
}

impl Default for Autoprefix {
    fn default() -> Self {
        Self {
            targets: browser_targets(),
        }
    }
}

#[async_trait]
impl Step for Autoprefix {
    fn name(&self) -> &str {
        "autoprefix"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            let printer = PrinterOptions {
                targets: self.targets,
                ..PrinterOptions::default()
            };
            rewrite_css(&mut asset, printer, |sheet| {
                sheet
                    .minify(MinifyOptions {
                        targets: self.targets,
                        ..MinifyOptions::default()
                    })
                    .map_err(|e| e.to_string())
            })?;
            Ok(asset)
        })
    }
}

/// Merge top-level `@media` blocks with equal queries and move them after
/// the plain rules, in first-seen order
pub fn group_media_rules<'i>(rules: Vec<CssRule<'i>>) -> Result<Vec<CssRule<'i>>, String> {
    let mut plain = Vec::with_capacity(rules.len());
    let mut groups: Vec<(String, lightningcss::rules::media::MediaRule<'i>)> = Vec::new();

    for rule in rules {
        match rule {
            CssRule::Media(media) => {
                let key = media
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| e.to_string())?;
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => existing.rules.0.extend(media.rules.0),
                    None => groups.push((key, media)),
                }
            }
            other => plain.push(other),
        }
    }

    plain.extend(groups.into_iter().map(|(_, media)| CssRule::Media(media)));
    Ok(plain)
}

/// Media query grouping step
#[derive(Debug)]
pub struct GroupMedia;

#[async_trait]
impl Step for GroupMedia {
    fn name(&self) -> &str {
        "group-media"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            rewrite_css(&mut asset, PrinterOptions::default(), |sheet| {
                let rules = std::mem::take(&mut sheet.rules.0);
                sheet.rules.0 = group_media_rules(rules)?;
                Ok(())
            })?;
            Ok(asset)
        })
    }
}

/// Drop top-level rules that print identically to a later one
pub fn dedupe_rules<'i>(rules: Vec<CssRule<'i>>) -> Result<Vec<CssRule<'i>>, String> {
    let keys = rules
        .iter()
        .map(|rule| rule.to_css_string(PrinterOptions::default()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let mut seen = HashSet::new();
    let mut keep = vec![false; keys.len()];
    for (index, key) in keys.iter().enumerate().rev() {
        keep[index] = seen.insert(key.as_str());
    }

    Ok(rules
        .into_iter()
        .zip(keep)
        .filter_map(|(rule, keep)| keep.then_some(rule))
        .collect())
}

/// Structural minification: dedupe, then compact printing
pub struct Minify {
    targets: Targets,
}

impl Default for Minify {
    fn default() -> Self {
        Self {
            targets: browser_targets(),
        }
    }
}

#[async_trait]
impl Step for Minify {
    fn name(&self) -> &str {
        "minify"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            let printer = PrinterOptions {
                minify: true,
                targets: self.targets,
                ..PrinterOptions::default()
            };
            rewrite_css(&mut asset, printer, |sheet| {
                let rules = std::mem::take(&mut sheet.rules.0);
                sheet.rules.0 = dedupe_rules(rules)?;
                sheet
                    .minify(MinifyOptions {
                        targets: self.targets,
                        ..MinifyOptions::default()
                    })
                    .map_err(|e| e.to_string())
            })?;
            Ok(asset)
        })
    }
}

/// Version 3 source map listing the files that went into a stylesheet
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapDocument {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

/// Source map step: emits `<name>.map` and links it from the stylesheet
#[derive(Debug)]
pub struct SourceMap;

impl SourceMap {
    async fn document(asset: &Asset) -> Result<SourceMapDocument, TransformError> {
        let base = entry_dir(asset);
        let mut sources = Vec::with_capacity(asset.sources.len());
        let mut contents = Vec::with_capacity(asset.sources.len());

        for source in &asset.sources {
            let text = tokio::fs::read_to_string(source)
                .await
                .map_err(|e| TransformError::io(source, e))?;
            let relative = source.strip_prefix(&base).unwrap_or(source);
            sources.push(url_path(relative));
            contents.push(text);
        }

        Ok(SourceMapDocument {
            version: 3,
            file: asset.file_name(),
            sources,
            sources_content: contents,
            names: Vec::new(),
            mappings: String::new(),
        })
    }
}

#[async_trait]
impl Step for SourceMap {
    fn name(&self) -> &str {
        "sourcemap"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        let mut out = Vec::with_capacity(assets.len() * 2);

        for mut asset in assets {
            let document = Self::document(&asset).await?;
            let json = serde_json::to_string(&document).map_err(|e| stylesheet_error(&asset.origin, e))?;

            let map_name = format!("{}.map", asset.file_name());
            let mut map_path = asset.path.clone();
            map_path.set_file_name(&map_name);

            let mut css = css_text(&asset)?;
            css.push_str(&format!("/*# sourceMappingURL={} */\r\n", map_name));
            asset.set_text(css);

            let map = Asset::new(map_path, asset.origin.clone(), json.into_bytes());
            out.push(asset);
            out.push(map);
        }

        Ok(out)
    }
}
