//! PDF rasterisation: render one page of a document into a PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. `tokio::task::spawn_blocking` moves the work onto the
//! blocking pool so the runtime's worker threads keep serving network calls.
//!
//! ## Binding
//!
//! pdfium is bound once per process. Failure to bind is the one fatal
//! condition of the viewer: without a renderer no page can be displayed, so
//! [`PdfiumRenderer::new`] fails with [`ViewerError::RendererUnavailable`]
//! and the caller should abort the viewing session.

use crate::config::ViewerConfig;
use crate::encode;
use crate::error::ViewerError;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Raw bytes of an opened PDF, shared between the viewer and render tasks.
#[derive(Debug, Clone)]
pub struct PdfFile {
    name: String,
    bytes: Arc<Vec<u8>>,
}

impl PdfFile {
    /// Wrap downloaded bytes, checking the `%PDF` magic first so callers get
    /// a meaningful error rather than a pdfium parse failure.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ViewerError> {
        let name = name.into();
        Self::check_magic(&name, &bytes)?;
        Ok(Self {
            name,
            bytes: Arc::new(bytes),
        })
    }

    /// Fail with [`ViewerError::NotAPdf`] unless `bytes` start with `%PDF`.
    pub fn check_magic(name: &str, bytes: &[u8]) -> Result<(), ViewerError> {
        if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
            return Err(ViewerError::NotAPdf {
                name: name.to_string(),
                magic: bytes.iter().take(4).copied().collect(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One rasterised page: the viewer's "canvas".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl RenderedPage {
    /// The page as a `data:image/png;base64,…` URI.
    pub fn data_uri(&self) -> String {
        encode::png_data_uri(&self.png)
    }
}

/// Rasterises pages of an opened document.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, document: &PdfFile) -> Result<u32, ViewerError>;

    /// Render a 1-indexed page.
    async fn render_page(&self, document: &PdfFile, page: u32) -> Result<RenderedPage, ViewerError>;
}

static PDFIUM: OnceCell<Arc<Pdfium>> = OnceCell::new();

/// Bind pdfium from an explicit directory, `PDFIUM_LIB_PATH`, or the system loader.
fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Arc<Pdfium>, ViewerError> {
    PDFIUM
        .get_or_try_init(|| {
            let dir = lib_dir
                .map(Path::to_path_buf)
                .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

            let bindings = match dir {
                Some(dir) => {
                    info!("Binding pdfium from {}", dir.display());
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                }
                None => Pdfium::bind_to_system_library(),
            }
            .map_err(|e| ViewerError::RendererUnavailable(format!("{:?}", e)))?;

            Ok(Arc::new(Pdfium::new(bindings)))
        })
        .map(Arc::clone)
}

/// [`PageRenderer`] backed by pdfium.
pub struct PdfiumRenderer {
    pdfium: Arc<Pdfium>,
    scale: f32,
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumRenderer {
    /// Bind pdfium and capture the rendering settings from `config`.
    pub fn new(config: &ViewerConfig) -> Result<Self, ViewerError> {
        let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;
        Ok(Self {
            pdfium,
            scale: config.render_scale,
            max_pixels: config.max_rendered_pixels,
            password: config.pdf_password.clone(),
        })
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn page_count(&self, document: &PdfFile) -> Result<u32, ViewerError> {
        let pdfium = Arc::clone(&self.pdfium);
        let document = document.clone();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || -> Result<u32, ViewerError> {
            let doc = open(&pdfium, &document, password.as_deref())?;
            let count = doc.pages().len() as u32;
            info!("PDF '{}' loaded: {} pages", document.name(), count);
            Ok(count)
        })
        .await
        .map_err(|e| ViewerError::Internal(format!("Render task panicked: {}", e)))?
    }

    async fn render_page(&self, document: &PdfFile, page: u32) -> Result<RenderedPage, ViewerError> {
        let pdfium = Arc::clone(&self.pdfium);
        let document = document.clone();
        let password = self.password.clone();
        let scale = self.scale;
        let max_pixels = self.max_pixels;

        tokio::task::spawn_blocking(move || {
            render_page_blocking(&pdfium, &document, password.as_deref(), page, scale, max_pixels)
        })
        .await
        .map_err(|e| ViewerError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn open<'a>(
    pdfium: &'a Pdfium,
    document: &'a PdfFile,
    password: Option<&'a str>,
) -> Result<pdfium_render::prelude::PdfDocument<'a>, ViewerError> {
    pdfium
        .load_pdf_from_byte_slice(document.bytes(), password)
        .map_err(|e| ViewerError::CorruptPdf {
            name: document.name().to_string(),
            detail: format!("{:?}", e),
        })
}

/// Blocking implementation of page rendering.
fn render_page_blocking(
    pdfium: &Pdfium,
    document: &PdfFile,
    password: Option<&str>,
    page: u32,
    scale: f32,
    max_pixels: u32,
) -> Result<RenderedPage, ViewerError> {
    let doc = open(pdfium, document, password)?;
    let pages = doc.pages();
    let total = pages.len() as u32;
    if page == 0 || page > total {
        return Err(ViewerError::InvalidPage { page, total });
    }

    let pdf_page = pages
        .get((page - 1) as u16)
        .map_err(|e| ViewerError::RenderFailed {
            page,
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = pdf_page
        .render_with_config(&render_config)
        .map_err(|e| ViewerError::RenderFailed {
            page,
            detail: format!("{:?}", e),
        })?;

    let image = bitmap.as_image();
    let png = encode::encode_png(&image).map_err(|e| ViewerError::RenderFailed {
        page,
        detail: format!("PNG encoding failed: {}", e),
    })?;
    debug!("Rendered page {} → {}x{} px", page, image.width(), image.height());

    Ok(RenderedPage {
        page,
        width: image.width(),
        height: image.height(),
        png,
    })
}
