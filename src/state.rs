//! Per-session viewer state and the page display state machine.
//!
//! ```text
//!            select file / navigate
//!   Idle ───────────────────────────▶ Loading ──fetch/render error──▶ Error
//!                                        │  ▲                          │
//!                         page + content │  └────── retry (navigate) ──┘
//!                                        ▼
//!                                   Displaying ◀──── save ok ────┐
//!                                        │                       │
//!                                        └──── enter_edit ──▶ Editing
//! ```

use serde::Serialize;

/// Where the page display currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum DisplayPhase {
    #[default]
    Idle,
    Loading { page: u32 },
    Displaying { page: u32 },
    Editing { page: u32 },
    /// Terminal for `page` until the user navigates or refreshes.
    Error { page: u32, message: String },
}

/// Everything the viewer tracks about the open file.
///
/// Reset in full whenever a new file is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerState {
    pub current_file: Option<String>,
    /// 1-indexed; within `1..=total_pages` once a file is loaded.
    pub current_page: u32,
    pub total_pages: u32,
    /// Furthest page known to have been extracted by the backend.
    /// Never decreases within a file session.
    pub highest_page_extracted: u32,
    pub is_fully_extracted: bool,
    pub is_editing: bool,
    pub phase: DisplayPhase,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            current_file: None,
            current_page: 1,
            total_pages: 0,
            highest_page_extracted: 0,
            is_fully_extracted: false,
            is_editing: false,
            phase: DisplayPhase::Idle,
        }
    }
}

impl ViewerState {
    /// Fresh state for a newly selected file.
    pub fn for_file(name: impl Into<String>) -> Self {
        Self {
            current_file: Some(name.into()),
            ..Self::default()
        }
    }

    /// Raise the watermark; lower values are ignored.
    pub fn record_extracted(&mut self, last_page: u32) {
        self.highest_page_extracted = self.highest_page_extracted.max(last_page);
    }

    /// Fold one extraction answer into the watermark and completion flag.
    ///
    /// An answer that lags behind the watermark cannot clear the flag: it
    /// predates whatever answer raised the watermark.
    pub fn record_batch(&mut self, last_page: u32, complete: bool) {
        if complete || last_page >= self.highest_page_extracted {
            self.is_fully_extracted = complete;
        }
        self.record_extracted(last_page);
    }

    /// Check `page` against the loaded document.
    pub fn is_valid_page(&self, page: u32) -> bool {
        page >= 1 && page <= self.total_pages
    }
}
