//! # edgequake-pdfview
//!
//! Controller for a PDF viewer backed by an extraction server: render pages
//! locally, drive the server's incremental extraction, show and edit the
//! extracted content of each page, and export it.
//!
//! ## How a page is shown
//!
//! ```text
//! select file
//!  │
//!  ├─ 1. Extract   POST /extract/{file}?page_hint=1   (raises the watermark)
//!  ├─ 2. Load      GET  /file/{file}                   (PDF bytes → pdfium)
//!  └─ 3. Display   for the requested page:
//!        ├─ extract with page_hint=P when P is beyond the watermark
//!        ├─ render P via pdfium (spawn_blocking) → PNG
//!        └─ GET /extracted-{format}/{file}/{P}
//!             found → content · pending → indicator · not_found → retry once
//! ```
//!
//! The server extracts in batches and reports the last page it reached; the
//! viewer keeps that as a watermark and only asks again for pages beyond it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfview::{ExportFormat, NoopProgressCallback, Viewer, ViewerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::builder()
//!         .server_url("http://127.0.0.1:8000")
//!         .build()?;
//!     let mut viewer = Viewer::connect(config)?;
//!
//!     viewer.load_file("report.pdf").await?;
//!     viewer.goto(3).await?;
//!     if let Some(view) = viewer.current_view() {
//!         println!("{}", view.body.display_text());
//!     }
//!
//!     let markdown = viewer.export_all(ExportFormat::Markdown, &NoopProgressCallback).await?;
//!     println!("{markdown}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfview` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## pdfium
//!
//! Rendering needs the pdfium shared library. It is looked up in
//! [`ViewerConfig::pdfium_lib_path`], then `PDFIUM_LIB_PATH`, then the
//! system library path. When none is found, [`Viewer::connect`] fails with
//! [`ViewerError::RendererUnavailable`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod editor;
pub mod encode;
pub mod error;
pub mod export;
pub mod progress;
pub mod render;
pub mod state;
pub mod viewer;

#[cfg(test)]
mod testing;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{Backend, ExtractionResult, HttpBackend, PageContent, PageStatus, UploadResponse};
pub use config::{ContentFormat, PageBreak, ViewerConfig, ViewerConfigBuilder};
pub use coordinator::{ExtractionCoordinator, PageBody};
pub use editor::ContentEditor;
pub use error::ViewerError;
pub use export::{write_export, ExportFormat, ExportedPage};
pub use progress::{ExportProgressCallback, NoopProgressCallback};
pub use render::{PageRenderer, PdfFile, PdfiumRenderer, RenderedPage};
pub use state::{DisplayPhase, ViewerState};
pub use viewer::{upload_file, NavigationOutcome, NavigationTicket, PageFetch, PageFetcher, PageView, Viewer};
