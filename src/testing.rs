//! In-memory fakes for the backend and renderer, shared by unit tests.

use crate::backend::{Backend, ExtractionResult, PageContent, UploadResponse};
use crate::error::ViewerError;
use crate::render::{PageRenderer, PdfFile, RenderedPage};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct FakeFile {
    total: u32,
    extracted: u32,
    saved: BTreeMap<u32, String>,
}

#[derive(Default)]
struct Inner {
    files: BTreeMap<String, FakeFile>,
    extract_calls: Vec<(String, u32)>,
    content_calls: Vec<(String, u32)>,
    force_calls: Vec<(String, u32)>,
    saves: Vec<(String, u32, String)>,
    extract_failure: Option<String>,
    content_failure: Option<String>,
    save_failure: Option<String>,
}

/// Backend that extracts `batch` pages per request and serves
/// `"page N text"` for every extracted page.
pub struct FakeBackend {
    inner: Mutex<Inner>,
    batch: u32,
    blank: HashSet<u32>,
    pending: HashSet<u32>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            batch: 1,
            blank: HashSet::new(),
            pending: HashSet::new(),
        }
    }
}

fn failure(detail: &str) -> ViewerError {
    ViewerError::Backend {
        status: 500,
        detail: detail.to_string(),
    }
}

fn not_found() -> ViewerError {
    ViewerError::Backend {
        status: 404,
        detail: "File not found".into(),
    }
}

impl FakeBackend {
    pub fn with_pages(name: &str, total: u32) -> Self {
        Self::default().file(name, total)
    }

    pub fn file(self, name: &str, total: u32) -> Self {
        self.inner.lock().unwrap().files.insert(
            name.to_string(),
            FakeFile {
                total,
                extracted: 0,
                saved: BTreeMap::new(),
            },
        );
        self
    }

    pub fn batch_size(mut self, n: u32) -> Self {
        self.batch = n.max(1);
        self
    }

    /// Page with no text: always `not_found`.
    pub fn blank_page(mut self, page: u32) -> Self {
        self.blank.insert(page);
        self
    }

    /// Page whose extraction never finishes: always `pending`.
    pub fn pending_page(mut self, page: u32) -> Self {
        self.pending.insert(page);
        self
    }

    pub fn fail_extraction(&self, detail: &str) {
        self.inner.lock().unwrap().extract_failure = Some(detail.to_string());
    }

    pub fn fail_content(&self, detail: &str) {
        self.inner.lock().unwrap().content_failure = Some(detail.to_string());
    }

    pub fn fail_save(&self, detail: &str) {
        self.inner.lock().unwrap().save_failure = Some(detail.to_string());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.extract_failure = None;
        inner.content_failure = None;
        inner.save_failure = None;
    }

    pub fn extract_calls(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().extract_calls.clone()
    }

    pub fn content_calls(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().content_calls.clone()
    }

    pub fn force_calls(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().force_calls.clone()
    }

    pub fn saves(&self) -> Vec<(String, u32, String)> {
        self.inner.lock().unwrap().saves.clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_files(&self) -> Result<Vec<String>, ViewerError> {
        Ok(self.inner.lock().unwrap().files.keys().cloned().collect())
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ViewerError> {
        let total = fake_page_count(&bytes).unwrap_or(1);
        self.inner.lock().unwrap().files.insert(
            filename.to_string(),
            FakeFile {
                total,
                extracted: 0,
                saved: BTreeMap::new(),
            },
        );
        Ok(UploadResponse {
            filename: filename.to_string(),
        })
    }

    async fn fetch_file(&self, name: &str) -> Result<Vec<u8>, ViewerError> {
        let inner = self.inner.lock().unwrap();
        let file = inner.files.get(name).ok_or_else(not_found)?;
        Ok(fake_pdf(file.total))
    }

    async fn extract(&self, name: &str, page_hint: u32) -> Result<ExtractionResult, ViewerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.extract_calls.push((name.to_string(), page_hint));
        if let Some(detail) = inner.extract_failure.clone() {
            return Err(failure(&detail));
        }
        let file = inner.files.get_mut(name).ok_or_else(not_found)?;
        let target = page_hint.max(file.extracted + self.batch).min(file.total);
        file.extracted = file.extracted.max(target);
        Ok(ExtractionResult {
            total_pages: file.total,
            last_page_extracted_in_batch: file.extracted,
            is_processing_complete: file.extracted >= file.total,
        })
    }

    async fn fetch_content(&self, name: &str, page: u32) -> Result<PageContent, ViewerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.content_calls.push((name.to_string(), page));
        if let Some(detail) = inner.content_failure.clone() {
            return Err(failure(&detail));
        }
        let file = inner.files.get(name).ok_or_else(not_found)?;
        if self.pending.contains(&page) {
            return Ok(PageContent::pending());
        }
        if self.blank.contains(&page) || page > file.extracted {
            return Ok(PageContent::not_found());
        }
        Ok(match file.saved.get(&page) {
            Some(text) => PageContent::found(text.clone()),
            None => PageContent::found(format!("page {page} text")),
        })
    }

    async fn save_content(&self, name: &str, page: u32, content: &str) -> Result<(), ViewerError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(detail) = inner.save_failure.clone() {
            return Err(failure(&detail));
        }
        inner
            .saves
            .push((name.to_string(), page, content.to_string()));
        let file = inner.files.get_mut(name).ok_or_else(not_found)?;
        file.saved.insert(page, content.to_string());
        Ok(())
    }

    async fn force_extract_page(&self, name: &str, page: u32) -> Result<(), ViewerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.force_calls.push((name.to_string(), page));
        let file = inner.files.get_mut(name).ok_or_else(not_found)?;
        file.saved.remove(&page);
        Ok(())
    }

    async fn fetch_json(&self, name: &str, page: u32) -> Result<serde_json::Value, ViewerError> {
        let inner = self.inner.lock().unwrap();
        inner.files.get(name).ok_or_else(not_found)?;
        Ok(serde_json::json!({ "file": name, "page": page, "blocks": [] }))
    }
}

/// Bytes the fake renderer understands: the `%PDF` magic plus a page count.
pub fn fake_pdf(total: u32) -> Vec<u8> {
    format!("%PDF-fake {total}").into_bytes()
}

fn fake_page_count(bytes: &[u8]) -> Option<u32> {
    std::str::from_utf8(bytes)
        .ok()?
        .strip_prefix("%PDF-fake ")?
        .trim()
        .parse()
        .ok()
}

/// Renderer for [`fake_pdf`] documents; each page is a one-byte "PNG"
/// holding its page number.
#[derive(Default)]
pub struct FakeRenderer {
    failing: Mutex<HashSet<u32>>,
    renders: Mutex<Vec<u32>>,
}

impl FakeRenderer {
    pub fn fail_page(&self, page: u32) {
        self.failing.lock().unwrap().insert(page);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn renders(&self) -> Vec<u32> {
        self.renders.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn page_count(&self, document: &PdfFile) -> Result<u32, ViewerError> {
        fake_page_count(document.bytes()).ok_or_else(|| ViewerError::CorruptPdf {
            name: document.name().to_string(),
            detail: "not a fake pdf".into(),
        })
    }

    async fn render_page(&self, document: &PdfFile, page: u32) -> Result<RenderedPage, ViewerError> {
        let total = self.page_count(document).await?;
        if page == 0 || page > total {
            return Err(ViewerError::InvalidPage { page, total });
        }
        if self.failing.lock().unwrap().contains(&page) {
            return Err(ViewerError::RenderFailed {
                page,
                detail: "canvas exploded".into(),
            });
        }
        self.renders.lock().unwrap().push(page);
        Ok(RenderedPage {
            page,
            width: 10,
            height: 14,
            png: vec![page as u8],
        })
    }
}
