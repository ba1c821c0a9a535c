//! Progress-callback trait for export-all.
//!
//! Exporting every page may trigger one extraction request per batch and one
//! content request per page, which takes a while on long documents. Pass an
//! [`ExportProgressCallback`] to [`crate::Viewer::export_all`] to receive
//! events as each page is collected.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfview::ExportProgressCallback;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! struct Counter(AtomicU32);
//!
//! impl ExportProgressCallback for Counter {
//!     fn on_page_complete(&self, page: u32, total: u32, content_len: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page}/{total}: {content_len} bytes");
//!     }
//! }
//! ```

/// Called by export-all as it walks the document.
///
/// Pages are visited strictly in order, one at a time. All methods have
/// default no-op implementations so callers only override what they need.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once before the first page.
    fn on_export_start(&self, total_pages: u32) {
        let _ = total_pages;
    }

    /// Called before a page's content is requested.
    fn on_page_start(&self, page: u32, total_pages: u32) {
        let _ = (page, total_pages);
    }

    /// Called once a page's content (or placeholder) is collected.
    ///
    /// `content_len` is 0 for pages with no text or still pending.
    fn on_page_complete(&self, page: u32, total_pages: u32, content_len: usize) {
        let _ = (page, total_pages, content_len);
    }

    /// Called when a page fails; the export stops after this call.
    fn on_page_error(&self, page: u32, total_pages: u32, error: &str) {
        let _ = (page, total_pages, error);
    }

    /// Called once at the end, whether or not the export succeeded.
    fn on_export_complete(&self, total_pages: u32, collected: u32) {
        let _ = (total_pages, collected);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}
