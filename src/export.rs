//! Export of extracted page content to text, Markdown, HTML or JSON.
//!
//! Pages are joined with the configured [`PageBreak`](crate::config::PageBreak)
//! marker for the text-like formats. HTML output is a standalone document
//! with one `<section>` per page; JSON output is an array of
//! `{page, status, content}` objects.

use crate::config::ViewerConfig;
use crate::coordinator::PageBody;
use crate::error::ViewerError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Output format for exported content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain text; HTML markup is stripped.
    Text,
    /// Content as extracted (default).
    #[default]
    Markdown,
    /// Standalone HTML document.
    Html,
    /// Pretty-printed JSON array.
    Json,
}

/// One page collected for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedPage {
    pub page: u32,
    pub body: PageBody,
}

#[derive(Serialize)]
struct JsonPage<'a> {
    page: u32,
    status: &'static str,
    content: &'a str,
}

/// Render `pages` of `file` in `format`.
pub fn render(
    file: &str,
    pages: &[ExportedPage],
    format: ExportFormat,
    config: &ViewerConfig,
) -> Result<String, ViewerError> {
    let html_source = config.content_format.is_html();
    match format {
        ExportFormat::Markdown => Ok(join_pages(pages, config, |body| body.content().to_string())),
        ExportFormat::Text => Ok(join_pages(pages, config, |body| {
            if html_source {
                html_to_text(body.content())
            } else {
                body.content().to_string()
            }
        })),
        ExportFormat::Html => Ok(render_html(file, pages, html_source)),
        ExportFormat::Json => {
            let entries: Vec<JsonPage<'_>> = pages
                .iter()
                .map(|p| JsonPage {
                    page: p.page,
                    status: match p.body {
                        PageBody::Content(_) => "found",
                        PageBody::NoText => "not_found",
                        PageBody::Pending => "pending",
                    },
                    content: p.body.content(),
                })
                .collect();
            serde_json::to_string_pretty(&entries)
                .map_err(|e| ViewerError::Internal(format!("JSON export: {e}")))
        }
    }
}

fn join_pages(pages: &[ExportedPage], config: &ViewerConfig, text: impl Fn(&PageBody) -> String) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str(&config.page_break.render(page.page));
        }
        out.push_str(text(&page.body).trim_end_matches('\n'));
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn render_html(file: &str, pages: &[ExportedPage], html_source: bool) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(file)));
    out.push_str("</head>\n<body>\n");

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str("<hr class=\"page-break\">\n");
        }
        out.push_str(&format!("<section data-page=\"{}\">\n", page.page));
        match &page.body {
            PageBody::Content(text) if html_source => out.push_str(text),
            PageBody::Content(text) => out.push_str(&markdown_to_html(text)),
            placeholder => out.push_str(&format!(
                "<p class=\"placeholder\">{}</p>",
                escape_html(placeholder.display_text())
            )),
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

static RE_BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</?(?:p|div|section|article|h[1-6]|li|ul|ol|tr|table|blockquote|pre)\b[^>]*>")
        .unwrap()
});
static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Strip markup from an HTML fragment.
///
/// Block-level tags become line breaks, other tags vanish, common entities
/// are decoded and runs of blank lines collapse to one.
pub fn html_to_text(html: &str) -> String {
    let text = RE_BLOCK_TAG.replace_all(html, "\n");
    let text = RE_ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let text = RE_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Write `content` to `path` atomically (temp file + rename).
pub async fn write_export(path: impl AsRef<Path>, content: &str) -> Result<(), ViewerError> {
    let path = path.as_ref();
    let write_err = |e: std::io::Error| ViewerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, content).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContentFormat, PageBreak};

    fn pages() -> Vec<ExportedPage> {
        vec![
            ExportedPage {
                page: 1,
                body: PageBody::Content("# Title\n\nBody & more\n".into()),
            },
            ExportedPage {
                page: 2,
                body: PageBody::NoText,
            },
            ExportedPage {
                page: 3,
                body: PageBody::Content("tail".into()),
            },
        ]
    }

    #[test]
    fn markdown_joins_with_page_break() {
        let out = render("a.pdf", &pages(), ExportFormat::Markdown, &ViewerConfig::default()).unwrap();
        assert_eq!(out, "# Title\n\nBody & more\n\n---\n\n\n\n---\n\ntail\n");
    }

    #[test]
    fn comment_page_break_names_following_page() {
        let config = ViewerConfig::builder().page_break(PageBreak::Comment).build().unwrap();
        let out = render("a.pdf", &pages()[..1], ExportFormat::Markdown, &config).unwrap();
        assert_eq!(out, "# Title\n\nBody & more\n");

        let two = [pages()[0].clone(), pages()[2].clone()];
        let out = render("a.pdf", &two, ExportFormat::Markdown, &config).unwrap();
        assert_eq!(out, "# Title\n\nBody & more\n\n<!-- page 3 -->\n\ntail\n");
    }

    #[test]
    fn text_strips_html_content() {
        let config = ViewerConfig::builder()
            .content_format(ContentFormat::Html)
            .build()
            .unwrap();
        let html = [ExportedPage {
            page: 1,
            body: PageBody::Content("<h1>Title</h1><p>a &amp; b &lt;c&gt;</p>".into()),
        }];
        let out = render("a.pdf", &html, ExportFormat::Text, &config).unwrap();
        assert_eq!(out, "Title\n\na & b <c>\n");
    }

    #[test]
    fn html_to_text_handles_breaks_and_nbsp() {
        assert_eq!(html_to_text("one<br>two&nbsp;three"), "one\ntwo three");
        assert_eq!(html_to_text("<span>plain</span>"), "plain");
    }

    #[test]
    fn html_export_renders_markdown_per_section() {
        let out = render("a&b.pdf", &pages(), ExportFormat::Html, &ViewerConfig::default()).unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<title>a&amp;b.pdf</title>"));
        assert!(out.contains("<section data-page=\"1\">\n<h1>Title</h1>"));
        assert!(out.contains("<p>Body &amp; more</p>"));
        assert!(out.contains("<p class=\"placeholder\">No text could be extracted from this page.</p>"));
        assert_eq!(out.matches("<hr class=\"page-break\">").count(), 2);
        assert!(out.ends_with("</html>\n"));
    }

    #[test]
    fn html_export_passes_html_content_through() {
        let config = ViewerConfig::builder()
            .content_format(ContentFormat::Html)
            .build()
            .unwrap();
        let html = [ExportedPage {
            page: 4,
            body: PageBody::Content("<p>kept</p>".into()),
        }];
        let out = render("a.pdf", &html, ExportFormat::Html, &config).unwrap();
        assert!(out.contains("<section data-page=\"4\">\n<p>kept</p>\n</section>"));
    }

    #[test]
    fn json_lists_status_per_page() {
        let out = render("a.pdf", &pages(), ExportFormat::Json, &ViewerConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0]["status"], "found");
        assert_eq!(arr[1]["status"], "not_found");
        assert_eq!(arr[1]["content"], "");
        assert_eq!(arr[2]["page"], 3);
    }

    #[tokio::test]
    async fn write_export_is_atomic_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("a.md");

        write_export(&path, "hello\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        assert!(!dir.path().join("out").join("a.md.tmp").exists());
    }
}
