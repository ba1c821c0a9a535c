//! The extraction backend: the HTTP service that stores PDFs, extracts their
//! pages into text/HTML, and persists edits.
//!
//! The viewer only ever talks to the backend through the [`Backend`] trait so
//! the coordinator, editor and export logic can be exercised against an
//! in-memory fake. [`HttpBackend`] is the production implementation.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /files                               → ["a.pdf", …]
//! POST /upload            (multipart file)  → {filename}
//! GET  /file/{name}                         → PDF bytes
//! POST /extract/{name}?page_hint=N          → ExtractionResult
//! GET  /extracted-{fmt}/{name}/{page}       → PageContent
//! POST /save-{fmt}/{name}/{page}  {content} → ack
//! POST /force-extract-page/{name}/{page}    → ack
//! GET  /extracted-json/{name}/{page}        → raw JSON
//! ```

mod http;

pub use http::HttpBackend;

use crate::error::ViewerError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of an extraction request.
///
/// The backend may extract a whole batch of pages up to and including the
/// hinted page; `last_page_extracted_in_batch` reports how far it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub total_pages: u32,
    pub last_page_extracted_in_batch: u32,
    #[serde(default)]
    pub is_processing_complete: bool,
}

/// Availability of a page's extracted content on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Found,
    NotFound,
    Pending,
}

/// Extracted content of one page, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub status: PageStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl PageContent {
    pub fn found(content: impl Into<String>) -> Self {
        Self {
            status: PageStatus::Found,
            content: content.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: PageStatus::NotFound,
            content: String::new(),
        }
    }

    pub fn pending() -> Self {
        Self {
            status: PageStatus::Pending,
            content: String::new(),
        }
    }
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Operations the viewer needs from the extraction backend.
///
/// Page numbers are 1-indexed throughout.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Names of every file the backend knows about.
    async fn list_files(&self) -> Result<Vec<String>, ViewerError>;

    /// Store a new PDF under `filename`.
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ViewerError>;

    /// Raw bytes of a stored PDF.
    async fn fetch_file(&self, name: &str) -> Result<Vec<u8>, ViewerError>;

    /// Ask the backend to extract pages up to at least `page_hint`.
    async fn extract(&self, name: &str, page_hint: u32) -> Result<ExtractionResult, ViewerError>;

    /// Extracted content of one page.
    async fn fetch_content(&self, name: &str, page: u32) -> Result<PageContent, ViewerError>;

    /// Persist edited content for one page.
    async fn save_content(&self, name: &str, page: u32, content: &str) -> Result<(), ViewerError>;

    /// Discard and redo the extraction of a single page.
    async fn force_extract_page(&self, name: &str, page: u32) -> Result<(), ViewerError>;

    /// Raw structured extraction result, for inspection.
    async fn fetch_json(&self, name: &str, page: u32) -> Result<serde_json::Value, ViewerError>;
}
