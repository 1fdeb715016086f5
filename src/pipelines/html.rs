//! HTML reformatting for production page output
//!
//! Re-indents markup by element nesting, drops blank lines, normalizes line
//! endings and guarantees a trailing newline. Contents of `pre` and
//! `textarea` are kept verbatim; `script` and `style` bodies are re-indented
//! but never scanned for tags.

use crate::core::{step::map_assets, Asset, BuildContext, Step, TransformError};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)\b[^>]*?(/?)>").expect("tag pattern is valid")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const VERBATIM_ELEMENTS: &[&str] = &["pre", "textarea"];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlFormat {
    pub indent: String,
    pub line_ending: String,
}

impl Default for HtmlFormat {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            line_ending: "\r\n".to_string(),
        }
    }
}

enum Mode {
    Normal,
    /// Inside pre/textarea: lines copied as-is until the closer
    Verbatim(String),
    /// Inside script/style: lines re-indented, not scanned, until the closer
    RawText(String),
}

/// Tag counts for a single line
struct LineTags {
    leading_closes: usize,
    opens: usize,
    closes: usize,
    opened_special: Option<String>,
}

fn scan_line(line: &str) -> LineTags {
    let without_comments = COMMENT.replace_all(line, "");
    let mut tags = LineTags {
        leading_closes: 0,
        opens: 0,
        closes: 0,
        opened_special: None,
    };
    let mut seen_open = false;
    let mut leading_text = false;

    let mut last_end = 0;
    for cap in TAG.captures_iter(&without_comments) {
        let whole = cap.get(0).expect("group 0 always exists");
        if !without_comments[last_end..whole.start()].trim().is_empty() {
            leading_text = true;
        }
        last_end = whole.end();

        let closing = &cap[1] == "/";
        let name = cap[2].to_ascii_lowercase();
        let self_closing = &cap[3] == "/";

        if closing {
            tags.closes += 1;
            if !seen_open && !leading_text {
                tags.leading_closes += 1;
            }
            if tags.opened_special.as_deref() == Some(name.as_str()) {
                tags.opened_special = None;
            }
        } else if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            tags.opens += 1;
            seen_open = true;
            if VERBATIM_ELEMENTS.contains(&name.as_str()) || RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                tags.opened_special = Some(name);
            }
        }
    }

    tags
}

fn closes_element(line: &str, name: &str) -> bool {
    line.to_ascii_lowercase().contains(&format!("</{}", name))
}

/// Reformat an HTML document
pub fn beautify(html: &str, format: &HtmlFormat) -> String {
    let normalized = html.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let mut mode = Mode::Normal;

    for raw in normalized.lines() {
        match &mode {
            Mode::Verbatim(name) => {
                let closing = closes_element(raw, name);
                out.push(raw.trim_end().to_string());
                if closing {
                    let tags = scan_line(raw);
                    depth = (depth + tags.opens).saturating_sub(tags.closes);
                    mode = Mode::Normal;
                }
                continue;
            }
            Mode::RawText(name) => {
                let trimmed = raw.trim();
                if !closes_element(trimmed, name) {
                    if !trimmed.is_empty() {
                        out.push(format!("{}{}", format.indent.repeat(depth), trimmed));
                    }
                    continue;
                }
                mode = Mode::Normal;
            }
            Mode::Normal => {}
        }

        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let tags = scan_line(line);
        let level = depth.saturating_sub(tags.leading_closes);
        out.push(format!("{}{}", format.indent.repeat(level), line));
        depth = (depth + tags.opens).saturating_sub(tags.closes);

        if let Some(name) = tags.opened_special {
            mode = if VERBATIM_ELEMENTS.contains(&name.as_str()) {
                Mode::Verbatim(name)
            } else {
                Mode::RawText(name)
            };
        }
    }

    if out.is_empty() {
        return String::new();
    }

    let mut result = out.join(&format.line_ending);
    result.push_str(&format.line_ending);
    result
}

/// Step that reformats every asset as HTML
#[derive(Debug, Default)]
pub struct Beautify {
    format: HtmlFormat,
}

impl Beautify {
    pub fn new(format: HtmlFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Step for Beautify {
    fn name(&self) -> &str {
        "beautify"
    }

    async fn transform(&self, assets: Vec<Asset>, _ctx: &BuildContext) -> Result<Vec<Asset>, TransformError> {
        map_assets(assets, |mut asset| {
            let text = asset.text().ok_or_else(|| TransformError::Encoding {
                file: asset.origin.clone(),
            })?;
            let formatted = beautify(text, &self.format);
            asset.set_text(formatted);
            Ok(asset)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lf() -> HtmlFormat {
        HtmlFormat {
            indent: "\t".to_string(),
            line_ending: "\n".to_string(),
        }
    }

    #[test]
    fn test_reindents_nested_elements() {
        let input = "<html>\n<body>\n   <ul>\n<li>One</li>\n      <li>Two</li>\n</ul>\n</body>\n</html>";
        let expected = "<html>\n\t<body>\n\t\t<ul>\n\t\t\t<li>One</li>\n\t\t\t<li>Two</li>\n\t\t</ul>\n\t</body>\n</html>\n";
        assert_eq!(beautify(input, &lf()), expected);
    }

    #[test]
    fn test_drops_blank_lines_and_uses_crlf() {
        let input = "<div>\n\n\n<p>Hi</p>\n\n</div>\n";
        let out = beautify(input, &HtmlFormat::default());
        assert_eq!(out, "<div>\r\n\t<p>Hi</p>\r\n</div>\r\n");
    }

    #[test]
    fn test_void_and_self_closing_elements_do_not_nest() {
        let input = "<head>\n<meta charset=\"utf-8\">\n<link rel=\"stylesheet\" href=\"css/main.css\">\n<br/>\n<title>T</title>\n</head>";
        let expected = "<head>\n\t<meta charset=\"utf-8\">\n\t<link rel=\"stylesheet\" href=\"css/main.css\">\n\t<br/>\n\t<title>T</title>\n</head>\n";
        assert_eq!(beautify(input, &lf()), expected);
    }

    #[test]
    fn test_doctype_and_comments() {
        let input = "<!DOCTYPE html>\n<html>\n<!-- <div> -->\n<body></body>\n</html>";
        let expected = "<!DOCTYPE html>\n<html>\n\t<!-- <div> -->\n\t<body></body>\n</html>\n";
        assert_eq!(beautify(input, &lf()), expected);
    }

    #[test]
    fn test_pre_is_verbatim() {
        let input = "<div>\n<pre>\n  keep   this\n\n    and this\n</pre>\n<p>x</p>\n</div>";
        let expected = "<div>\n\t<pre>\n  keep   this\n\n    and this\n</pre>\n\t<p>x</p>\n</div>\n";
        assert_eq!(beautify(input, &lf()), expected);
    }

    #[test]
    fn test_script_body_not_scanned() {
        let input = "<body>\n<script>\nif (a < b && c > d) {\n}\n</script>\n</body>";
        let expected = "<body>\n\t<script>\n\t\tif (a < b && c > d) {\n\t\t}\n\t</script>\n</body>\n";
        assert_eq!(beautify(input, &lf()), expected);
    }

    #[test]
    fn test_closing_then_opening_on_one_line() {
        let input = "<ul>\n<li>a\n</li><li>b\n</li>\n</ul>";
        let expected = "<ul>\n\t<li>a\n\t</li><li>b\n\t</li>\n</ul>\n";
        assert_eq!(beautify(input, &lf()), expected);
    }

    #[test]
    fn test_idempotent() {
        let input = "<html>\n<body>\n<p>Hi</p>\n</body>\n</html>";
        let once = beautify(input, &HtmlFormat::default());
        let twice = beautify(&once, &HtmlFormat::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(beautify("\n\n", &HtmlFormat::default()), "");
    }
}
