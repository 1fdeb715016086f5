//! Image pipeline: copied in development, optimized in production

use crate::core::{
    source::SourceSet, step::production_only, Asset, BuildContext, Notify, Pipeline, Step, TransformError,
};
use async_trait::async_trait;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, ColorType, ImageEncoder, ImageFormat};
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Image file extensions picked up by the pipeline
pub const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// JPEG re-encoding quality
pub const JPEG_QUALITY: u8 = 75;

static SVG_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

static SVG_PROLOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>").expect("prolog pattern is valid"));

static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("whitespace pattern is valid"));

// Whitespace inside text content is rendered, so it is left alone
static TEXT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b.*?</text>").expect("text pattern is valid"));

static SVG_ROOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("svg pattern is valid"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s([a-zA-Z:-]+)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid")
});

/// Build the image pipeline for a source root
pub fn pipeline(source_root: &Path) -> Pipeline {
    let patterns: Vec<String> = EXTENSIONS.iter().map(|ext| format!("**/*.{}", ext)).collect();

    Pipeline::new("images", SourceSet::glob(source_root.join("images"), patterns), "img")
        .step(production_only(Optimize))
        .notify(Notify::Nothing)
}

/// Watch patterns, relative to the images directory
pub fn watch_patterns() -> Vec<String> {
    vec!["**/*".to_string()]
}

/// Lossless/near-lossless re-encoding; the result is kept only when smaller
#[derive(Debug)]
pub struct Optimize;

#[async_trait]
impl Step for Optimize {
    fn name(&self) -> &str {
        "optimize"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        tokio::task::spawn_blocking(move || assets.into_iter().map(optimize_asset).collect::<Result<Vec<_>, _>>())
            .await
            .map_err(|e| TransformError::Worker(e.to_string()))?
    }
}

fn optimize_asset(mut asset: Asset) -> Result<Asset, TransformError> {
    let image_error = |e: image::ImageError| TransformError::Image {
        file: asset.origin.clone(),
        message: e.to_string(),
    };

    let candidate = match asset.extension().as_deref() {
        Some("png") => Some(optimize_png(&asset.contents).map_err(image_error)?),
        Some("jpg") | Some("jpeg") => Some(optimize_jpeg(&asset.contents).map_err(image_error)?),
        Some("gif") => Some(optimize_gif(&asset.contents).map_err(image_error)?),
        Some("svg") => {
            let text = asset.text().ok_or_else(|| TransformError::Encoding {
                file: asset.origin.clone(),
            })?;
            Some(minify_svg(text).into_bytes())
        }
        _ => None,
    };

    if let Some(candidate) = candidate {
        let before = asset.contents.len();
        asset.contents = keep_smaller(std::mem::take(&mut asset.contents), candidate);
        debug!("Optimized {}: {} -> {} bytes", asset.path.display(), before, asset.contents.len());
    }
    Ok(asset)
}

/// The candidate replaces the original only when strictly smaller
pub fn keep_smaller(original: Vec<u8>, candidate: Vec<u8>) -> Vec<u8> {
    if candidate.len() < original.len() {
        candidate
    } else {
        original
    }
}

pub fn optimize_png(bytes: &[u8]) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive).write_image(
        img.as_bytes(),
        img.width(),
        img.height(),
        img.color(),
    )?;
    Ok(out)
}

pub fn optimize_jpeg(bytes: &[u8]) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    match img.color() {
        ColorType::L8 => encoder.encode(img.as_bytes(), img.width(), img.height(), ColorType::L8)?,
        _ => {
            let rgb = img.to_rgb8();
            encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?
        }
    }
    Ok(out)
}

pub fn optimize_gif(bytes: &[u8]) -> image::ImageResult<Vec<u8>> {
    let frames = GifDecoder::new(Cursor::new(bytes))?.into_frames().collect_frames()?;
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(frames)?;
    }
    Ok(out)
}

/// Minify SVG markup: drops comments, the XML prolog, inter-tag whitespace
/// and a `viewBox` that only restates width and height. Ids are kept.
pub fn minify_svg(svg: &str) -> String {
    let svg = SVG_COMMENT.replace_all(svg, "");
    let svg = SVG_PROLOG.replace_all(&svg, "");
    let svg = collapse_between_tags(&svg);
    let svg = svg.trim();

    SVG_ROOT
        .replace(svg, |caps: &regex::Captures| strip_redundant_view_box(&caps[0]))
        .into_owned()
}

fn collapse_between_tags(svg: &str) -> String {
    let texts: Vec<(usize, usize)> = TEXT_ELEMENT.find_iter(svg).map(|m| (m.start(), m.end())).collect();
    let mut out = String::with_capacity(svg.len());
    let mut last = 0;
    for gap in BETWEEN_TAGS.find_iter(svg) {
        let inside_text = texts
            .iter()
            .any(|&(start, end)| gap.start() >= start && gap.end() <= end);
        if inside_text {
            continue;
        }
        out.push_str(&svg[last..gap.start()]);
        out.push_str("><");
        last = gap.end();
    }
    out.push_str(&svg[last..]);
    out
}

fn strip_redundant_view_box(tag: &str) -> String {
    let mut width = None;
    let mut height = None;
    let mut view_box = None;
    for cap in ATTRIBUTE.captures_iter(tag) {
        let value = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
        match &cap[1] {
            "width" => width = parse_length(value),
            "height" => height = parse_length(value),
            "viewBox" => view_box = Some(value.to_string()),
            _ => {}
        }
    }

    let (Some(width), Some(height), Some(view_box)) = (width, height, view_box) else {
        return tag.to_string();
    };

    let numbers: Vec<f64> = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if numbers != [0.0, 0.0, width, height] {
        return tag.to_string();
    }

    ATTRIBUTE
        .replace_all(tag, |cap: &regex::Captures| {
            if &cap[1] == "viewBox" {
                String::new()
            } else {
                cap[0].to_string()
            }
        })
        .into_owned()
}

/// Plain or `px` lengths only; percentages and other units never match
fn parse_length(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}
