//! Error types for the edgequake-pdfview library.
//!
//! A single error enum covers every failure the viewer can surface:
//!
//! * **Backend failures**: the network call failed, timed out, or the
//!   server answered with a non-success status. The server's `detail`
//!   message is preserved so it can be shown in place of page content.
//!
//! * **Renderer failures**: pdfium could not be bound (fatal for all
//!   viewing), or a particular document/page could not be rasterised.
//!
//! * **Usage errors**: an out-of-range page, an action that needs a loaded
//!   file, or an action refused because the editor holds unsaved edits.
//!
//! None of these leave the viewer unusable: after any error the caller may
//! select another file or navigate again.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdfview library.
#[derive(Debug, Error)]
pub enum ViewerError {
    // ── Backend errors ────────────────────────────────────────────────────
    /// The HTTP request could not be sent or the connection dropped.
    #[error("Network error calling '{url}': {reason}")]
    Network { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s\nIncrease --timeout.")]
    Timeout { url: String, secs: u64 },

    /// The backend answered with a 4xx/5xx status.
    #[error("Backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    /// The backend answered 2xx but the body was not what we expected.
    #[error("Could not decode response from '{url}': {reason}")]
    Decode { url: String, reason: String },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// Could not bind to a pdfium library. Viewing is impossible.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium, or install pdfium\n\
system-wide so that it can be found by the dynamic loader.\n"
    )]
    RendererUnavailable(String),

    /// The downloaded bytes do not start with the `%PDF` magic.
    #[error("File '{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// pdfium could not parse the document.
    #[error("PDF '{name}' is corrupt or encrypted: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: u32, detail: String },

    // ── Usage errors ──────────────────────────────────────────────────────
    /// Requested page is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    InvalidPage { page: u32, total: u32 },

    /// An action that needs an open file was called before `load_file`.
    #[error("No file is loaded")]
    NoFileLoaded,

    /// Navigation, refresh or file load was refused while editing.
    #[error("Page {page} has unsaved edits; save or discard them first")]
    UnsavedEdits { page: u32 },

    /// `save` or `discard_edits` was called outside edit mode.
    #[error("The editor is not in edit mode")]
    NotEditing,

    /// Edit mode needs a displayed page.
    #[error("Nothing is displayed to edit")]
    NothingToEdit,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read a local file (e.g. for upload).
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload path does not end in a file name (e.g. `..` or `/`).
    #[error("'{path}' does not name a file")]
    NoFileName { path: PathBuf },

    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ViewerError {
    /// The text shown in the content area when this error interrupts a page load.
    pub fn display_message(&self) -> String {
        match self {
            ViewerError::Backend { detail, .. } => format!("Error: {detail}"),
            other => format!("Error: {other}"),
        }
    }
}
