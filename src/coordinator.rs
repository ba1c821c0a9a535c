//! Extraction coordination: decide when the backend must extract a page,
//! and keep the local watermark in step with what it reports.
//!
//! The backend extracts in batches: asking for page 7 may make it process
//! pages 3–7 and answer with `lastPageExtractedInBatch = 7`. The coordinator
//! only asks when a page lies beyond the watermark and the file is not yet
//! fully extracted, so walking back and forth through already-extracted
//! pages costs one content fetch each and nothing more.
//!
//! Duplicate requests for the same page are not deduplicated; two quick
//! navigations to an unextracted page will both call the backend.

use crate::backend::{Backend, ExtractionResult, PageStatus};
use crate::error::ViewerError;
use crate::state::ViewerState;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the content panel shows for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum PageBody {
    /// Extracted text/HTML/Markdown.
    Content(String),
    /// The backend has finished with this file and found no text on the page.
    NoText,
    /// The backend is still working on the page.
    Pending,
}

impl PageBody {
    /// Text to show in place of the content.
    pub fn display_text(&self) -> &str {
        match self {
            PageBody::Content(text) => text,
            PageBody::NoText => "No text could be extracted from this page.",
            PageBody::Pending => "Extraction in progress. Refresh in a moment.",
        }
    }

    /// Extracted content, or `""` for the placeholder variants.
    pub fn content(&self) -> &str {
        match self {
            PageBody::Content(text) => text,
            _ => "",
        }
    }
}

/// Extraction progress as known at the moment a request was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractionSnapshot {
    pub highest_page_extracted: u32,
    pub is_fully_extracted: bool,
}

impl ExtractionSnapshot {
    pub fn of(state: &ViewerState) -> Self {
        Self {
            highest_page_extracted: state.highest_page_extracted,
            is_fully_extracted: state.is_fully_extracted,
        }
    }

    pub fn needs_extraction(&self, page: u32) -> bool {
        !self.is_fully_extracted && page > self.highest_page_extracted
    }

    pub(crate) fn record(&mut self, result: &ExtractionResult) {
        let last = result.last_page_extracted_in_batch;
        if result.is_processing_complete || last >= self.highest_page_extracted {
            self.is_fully_extracted = result.is_processing_complete;
        }
        self.highest_page_extracted = self.highest_page_extracted.max(last);
    }
}

/// Drives backend extraction for the viewer.
#[derive(Clone)]
pub struct ExtractionCoordinator {
    backend: Arc<dyn Backend>,
}

impl ExtractionCoordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Request extraction up to `page` for the state's current file and fold
    /// the answer into the watermark.
    ///
    /// On failure the state is left untouched and the backend's error is
    /// returned for display.
    pub async fn ensure_extracted(
        &self,
        state: &mut ViewerState,
        page: u32,
    ) -> Result<ExtractionResult, ViewerError> {
        let file = state.current_file.clone().ok_or(ViewerError::NoFileLoaded)?;
        let result = self.extract(&file, page).await?;
        apply_extraction(state, &file, &result);
        Ok(result)
    }

    /// Call the extraction endpoint without touching any state.
    pub async fn extract(&self, file: &str, page_hint: u32) -> Result<ExtractionResult, ViewerError> {
        info!("Requesting extraction of '{}' (page hint {})", file, page_hint);
        match self.backend.extract(file, page_hint).await {
            Ok(result) => {
                debug!(
                    "Extraction of '{}': {}/{} pages, complete={}",
                    file,
                    result.last_page_extracted_in_batch,
                    result.total_pages,
                    result.is_processing_complete
                );
                Ok(result)
            }
            Err(e) => {
                warn!("Extraction of '{}' (page hint {}) failed: {}", file, page_hint, e);
                Err(e)
            }
        }
    }

    /// Force the backend to redo one page. The watermark is unaffected.
    pub async fn force_extract(&self, file: &str, page: u32) -> Result<(), ViewerError> {
        info!("Forcing re-extraction of '{}' page {}", file, page);
        self.backend.force_extract_page(file, page).await.inspect_err(|e| {
            warn!("Forced extraction of '{}' page {} failed: {}", file, page, e);
        })
    }

    /// Fetch a page's content, extracting on demand.
    ///
    /// * `found` → the content.
    /// * `not_found` on a fully extracted file → [`PageBody::NoText`].
    /// * `not_found` otherwise → extract with this page as hint and fetch
    ///   once more.
    /// * `pending` → [`PageBody::Pending`].
    ///
    /// Every extraction performed along the way is appended to `extractions`
    /// so the caller can fold it into the state.
    pub async fn resolve_content(
        &self,
        file: &str,
        page: u32,
        snapshot: &mut ExtractionSnapshot,
        extractions: &mut Vec<ExtractionResult>,
    ) -> Result<PageBody, ViewerError> {
        if snapshot.needs_extraction(page) {
            let result = self.extract(file, page).await?;
            snapshot.record(&result);
            extractions.push(result);
        }

        let content = self.backend.fetch_content(file, page).await?;
        match content.status {
            PageStatus::Found => return Ok(PageBody::Content(content.content)),
            PageStatus::Pending => return Ok(PageBody::Pending),
            PageStatus::NotFound if snapshot.is_fully_extracted => return Ok(PageBody::NoText),
            PageStatus::NotFound => {}
        }

        debug!("Page {} of '{}' not extracted yet; retrying after extraction", page, file);
        let result = self.extract(file, page).await?;
        snapshot.record(&result);
        extractions.push(result);

        let retry = self.backend.fetch_content(file, page).await?;
        Ok(match retry.status {
            PageStatus::Found => PageBody::Content(retry.content),
            PageStatus::Pending => PageBody::Pending,
            PageStatus::NotFound => PageBody::NoText,
        })
    }
}

/// Fold an extraction answer for `file` into the state.
///
/// Answers for a file that is no longer open are ignored.
pub fn apply_extraction(state: &mut ViewerState, file: &str, result: &ExtractionResult) {
    if state.current_file.as_deref() != Some(file) {
        debug!("Ignoring extraction result for '{}' (no longer open)", file);
        return;
    }
    state.record_batch(result.last_page_extracted_in_batch, result.is_processing_complete);
    if state.total_pages == 0 {
        state.total_pages = result.total_pages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn result(total: u32, last: u32, done: bool) -> ExtractionResult {
        ExtractionResult {
            total_pages: total,
            last_page_extracted_in_batch: last,
            is_processing_complete: done,
        }
    }

    #[tokio::test]
    async fn ensure_extracted_raises_watermark() {
        let backend = Arc::new(FakeBackend::with_pages("a.pdf", 3).batch_size(2));
        let coordinator = ExtractionCoordinator::new(backend.clone());
        let mut state = ViewerState::for_file("a.pdf");

        let r = coordinator.ensure_extracted(&mut state, 1).await.unwrap();
        assert_eq!(r.last_page_extracted_in_batch, 2);
        assert_eq!(state.highest_page_extracted, 2);
        assert_eq!(state.total_pages, 3);
        assert!(!state.is_fully_extracted);

        coordinator.ensure_extracted(&mut state, 3).await.unwrap();
        assert_eq!(state.highest_page_extracted, 3);
        assert!(state.is_fully_extracted);
        assert_eq!(backend.extract_calls(), vec![("a.pdf".to_string(), 1), ("a.pdf".to_string(), 3)]);
    }

    #[tokio::test]
    async fn failed_extraction_leaves_watermark() {
        let backend = Arc::new(FakeBackend::with_pages("a.pdf", 3));
        backend.fail_extraction("worker crashed");
        let coordinator = ExtractionCoordinator::new(backend);
        let mut state = ViewerState::for_file("a.pdf");
        state.record_extracted(1);

        let err = coordinator.ensure_extracted(&mut state, 3).await.unwrap_err();
        assert_eq!(err.display_message(), "Error: worker crashed");
        assert_eq!(state.highest_page_extracted, 1);
    }

    #[tokio::test]
    async fn ensure_extracted_requires_file() {
        let coordinator = ExtractionCoordinator::new(Arc::new(FakeBackend::default()));
        let mut state = ViewerState::default();
        assert!(matches!(
            coordinator.ensure_extracted(&mut state, 1).await,
            Err(ViewerError::NoFileLoaded)
        ));
    }

    #[test]
    fn apply_ignores_other_files() {
        let mut state = ViewerState::for_file("b.pdf");
        apply_extraction(&mut state, "a.pdf", &result(3, 3, true));
        assert_eq!(state.highest_page_extracted, 0);
        assert!(!state.is_fully_extracted);
    }

    #[test]
    fn snapshot_needs_extraction_respects_completion() {
        let mut state = ViewerState::for_file("a.pdf");
        state.total_pages = 3;
        state.record_extracted(1);
        let snapshot = ExtractionSnapshot::of(&state);
        assert!(!snapshot.needs_extraction(1));
        assert!(snapshot.needs_extraction(3));

        state.is_fully_extracted = true;
        assert!(!ExtractionSnapshot::of(&state).needs_extraction(3));
    }

    #[test]
    fn lagging_result_does_not_reopen_finished_file() {
        let mut state = ViewerState::for_file("a.pdf");
        apply_extraction(&mut state, "a.pdf", &result(3, 3, true));
        apply_extraction(&mut state, "a.pdf", &result(3, 2, false));
        assert!(state.is_fully_extracted);
        assert_eq!(state.highest_page_extracted, 3);
    }

    #[test]
    fn apply_keeps_known_page_count() {
        let mut state = ViewerState::for_file("a.pdf");
        state.total_pages = 4;
        apply_extraction(&mut state, "a.pdf", &result(5, 1, false));
        assert_eq!(state.total_pages, 4);
    }

    #[tokio::test]
    async fn not_found_on_complete_file_is_terminal() {
        let backend = Arc::new(FakeBackend::with_pages("a.pdf", 2).blank_page(2));
        let coordinator = ExtractionCoordinator::new(backend.clone());
        let mut snapshot = ExtractionSnapshot {
            highest_page_extracted: 2,
            is_fully_extracted: true,
        };
        let mut extractions = Vec::new();

        let body = coordinator
            .resolve_content("a.pdf", 2, &mut snapshot, &mut extractions)
            .await
            .unwrap();
        assert_eq!(body, PageBody::NoText);
        assert!(extractions.is_empty());
        assert!(backend.extract_calls().is_empty());
    }

    #[tokio::test]
    async fn not_found_before_completion_extracts_and_retries() {
        let backend = Arc::new(FakeBackend::with_pages("a.pdf", 3).batch_size(1));
        let coordinator = ExtractionCoordinator::new(backend.clone());
        // Stale snapshot claims page 3 is already extracted.
        let mut snapshot = ExtractionSnapshot {
            highest_page_extracted: 3,
            is_fully_extracted: false,
        };
        let mut extractions = Vec::new();

        let body = coordinator
            .resolve_content("a.pdf", 3, &mut snapshot, &mut extractions)
            .await
            .unwrap();
        assert_eq!(body, PageBody::Content("page 3 text".into()));
        assert_eq!(extractions.len(), 1);
        assert_eq!(backend.extract_calls(), vec![("a.pdf".to_string(), 3)]);
    }

    #[tokio::test]
    async fn pending_page_shows_indicator() {
        let backend = Arc::new(FakeBackend::with_pages("a.pdf", 2).pending_page(1));
        let coordinator = ExtractionCoordinator::new(backend);
        let mut snapshot = ExtractionSnapshot::default();
        let mut extractions = Vec::new();

        let body = coordinator
            .resolve_content("a.pdf", 1, &mut snapshot, &mut extractions)
            .await
            .unwrap();
        assert_eq!(body, PageBody::Pending);
        assert_eq!(extractions.len(), 1);
        assert!(!body.display_text().is_empty());
        assert_eq!(body.content(), "");
    }
}
