//! Configuration types for the viewer controller.
//!
//! All viewer behaviour is controlled through [`ViewerConfig`], built via its
//! [`ViewerConfigBuilder`]. The defaults match a backend running locally on
//! port 8000 that serves Markdown extraction results.

use crate::error::ViewerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a [`crate::Viewer`] session.
///
/// # Example
/// ```rust
/// use edgequake_pdfview::{ContentFormat, ViewerConfig};
///
/// let config = ViewerConfig::builder()
///     .server_url("http://localhost:8000")
///     .content_format(ContentFormat::Html)
///     .render_scale(2.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Base URL of the extraction backend. Default: `http://127.0.0.1:8000`.
    pub server_url: String,

    /// Which extracted-content endpoint family to use. Default: Markdown.
    pub content_format: ContentFormat,

    /// Per-request timeout in seconds. Default: 30.
    ///
    /// Extraction requests process a batch of pages on the server before
    /// answering, so this should stay well above typical page latency.
    pub request_timeout_secs: u64,

    /// Page rasterisation scale relative to 72 DPI. Range: 0.25–8.0. Default: 1.5.
    pub render_scale: f32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps either dimension independent of `render_scale` so oversized pages
    /// (posters, plans) do not allocate enormous bitmaps.
    pub max_rendered_pixels: u32,

    /// User password for encrypted PDFs.
    pub pdf_password: Option<String>,

    /// Directory containing the pdfium shared library. `None` means the
    /// `PDFIUM_LIB_PATH` environment variable, then the system loader.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Marker inserted between pages by export-all. Default: horizontal rule.
    pub page_break: PageBreak,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            content_format: ContentFormat::default(),
            request_timeout_secs: 30,
            render_scale: 1.5,
            max_rendered_pixels: 2000,
            pdf_password: None,
            pdfium_lib_path: None,
            page_break: PageBreak::default(),
        }
    }
}

impl ViewerConfig {
    /// Create a new builder for `ViewerConfig`.
    pub fn builder() -> ViewerConfigBuilder {
        ViewerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ViewerConfig`].
#[derive(Debug)]
pub struct ViewerConfigBuilder {
    config: ViewerConfig,
}

impl ViewerConfigBuilder {
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn content_format(mut self, format: ContentFormat) -> Self {
        self.config.content_format = format;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn page_break(mut self, marker: PageBreak) -> Self {
        self.config.page_break = marker;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ViewerConfig, ViewerError> {
        let c = &self.config;
        if !(c.server_url.starts_with("http://") || c.server_url.starts_with("https://")) {
            return Err(ViewerError::InvalidConfig(format!(
                "server URL must start with http:// or https://, got '{}'",
                c.server_url
            )));
        }
        if !(0.25..=8.0).contains(&c.render_scale) {
            return Err(ViewerError::InvalidConfig(format!(
                "render scale must be 0.25–8.0, got {}",
                c.render_scale
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(ViewerError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which family of extracted-content endpoints the backend exposes.
///
/// | Format | Fetch | Save |
/// |--------|-------|------|
/// | Markdown | `/extracted-markdown/{name}/{page}` | `/save-markdown/{name}/{page}` |
/// | Html | `/extracted-html/{name}/{page}` | `/save-html/{name}/{page}` |
/// | Content | `/extracted-content/{name}/{page}` | `/save-html/{name}/{page}` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentFormat {
    #[default]
    Markdown,
    Html,
    /// Rich-text content served as HTML fragments.
    Content,
}

impl ContentFormat {
    /// Path prefix of the fetch endpoint.
    pub fn fetch_endpoint(self) -> &'static str {
        match self {
            ContentFormat::Markdown => "extracted-markdown",
            ContentFormat::Html => "extracted-html",
            ContentFormat::Content => "extracted-content",
        }
    }

    /// Path prefix of the save endpoint.
    pub fn save_endpoint(self) -> &'static str {
        match self {
            ContentFormat::Markdown => "save-markdown",
            ContentFormat::Html | ContentFormat::Content => "save-html",
        }
    }

    /// Whether the payload is HTML markup.
    pub fn is_html(self) -> bool {
        !matches!(self, ContentFormat::Markdown)
    }
}

/// Marker placed between pages when exporting every page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageBreak {
    /// Horizontal rule: "\n\n---\n\n" (default)
    #[default]
    HorizontalRule,
    /// HTML comment with the number of the following page: "<!-- page N -->"
    Comment,
    /// ASCII form feed, understood by printers and pagers.
    FormFeed,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageBreak {
    /// Render the marker placed before `page_num` (1-indexed).
    pub fn render(&self, page_num: u32) -> String {
        match self {
            PageBreak::HorizontalRule => "\n\n---\n\n".to_string(),
            PageBreak::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageBreak::FormFeed => "\n\x0c\n".to_string(),
            PageBreak::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ViewerConfig::builder().build().expect("defaults build");
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert_eq!(config.content_format, ContentFormat::Markdown);
        assert_eq!(config.render_scale, 1.5);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ViewerConfig::builder()
            .server_url("http://host:9000/")
            .build()
            .unwrap();
        assert_eq!(config.server_url, "http://host:9000");
    }

    #[test]
    fn rejects_non_http_url() {
        let err = ViewerConfig::builder()
            .server_url("ftp://host")
            .build()
            .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_out_of_range_scale() {
        assert!(ViewerConfig::builder().render_scale(0.0).build().is_err());
        assert!(ViewerConfig::builder().render_scale(9.0).build().is_err());
    }

    #[test]
    fn content_endpoints() {
        assert_eq!(ContentFormat::Markdown.fetch_endpoint(), "extracted-markdown");
        assert_eq!(ContentFormat::Content.fetch_endpoint(), "extracted-content");
        assert_eq!(ContentFormat::Content.save_endpoint(), "save-html");
        assert!(!ContentFormat::Markdown.is_html());
        assert!(ContentFormat::Html.is_html());
    }

    #[test]
    fn page_break_render() {
        assert_eq!(PageBreak::HorizontalRule.render(2), "\n\n---\n\n");
        assert_eq!(PageBreak::Comment.render(3), "\n\n<!-- page 3 -->\n\n");
        assert_eq!(PageBreak::Custom("***".into()).render(1), "\n\n***\n\n");
    }
}
