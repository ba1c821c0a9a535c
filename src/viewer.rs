//! The viewer controller: owns the session state and turns user actions
//! (select file, navigate, edit, save, refresh, export) into backend and
//! renderer calls.
//!
//! ## Navigation pipeline
//!
//! Every page display goes through three steps:
//!
//! ```text
//! begin_navigation(page) ──▶ PageFetcher::fetch(ticket) ──▶ apply_navigation(fetch)
//!   (validate, bump          (extract if beyond the         (fold watermark, drop
//!    generation, Loading)     watermark, render, content)     stale results, display)
//! ```
//!
//! [`Viewer::goto`] and friends run the three steps back to back. A front end
//! that lets the user click "next" again before the previous page arrives can
//! drive the steps itself: only the most recently issued ticket is ever
//! displayed, so a slow response can never overwrite a newer page.

use crate::backend::{Backend, ExtractionResult, HttpBackend, UploadResponse};
use crate::config::ViewerConfig;
use crate::coordinator::{apply_extraction, ExtractionCoordinator, ExtractionSnapshot, PageBody};
use crate::editor::ContentEditor;
use crate::error::ViewerError;
use crate::export::{self, ExportFormat, ExportedPage};
use crate::progress::ExportProgressCallback;
use crate::render::{PageRenderer, PdfFile, PdfiumRenderer, RenderedPage};
use crate::state::{DisplayPhase, ViewerState};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What is on screen for the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub page: u32,
    pub image: RenderedPage,
    pub body: PageBody,
}

/// Identifies one navigation so that its results can be matched against the
/// state at the time they arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTicket {
    generation: u64,
    pub file: String,
    pub page: u32,
    snapshot: ExtractionSnapshot,
}

/// Whether a fetched page made it onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Applied,
    /// A newer navigation was issued after this one; the result was dropped.
    Stale,
}

/// Results of fetching one page, waiting to be applied.
#[derive(Debug)]
pub struct PageFetch {
    ticket: NavigationTicket,
    extractions: Vec<ExtractionResult>,
    outcome: Result<(RenderedPage, PageBody), ViewerError>,
}

/// Everything needed to fetch a page, detached from the viewer so several
/// fetches may be in flight at once.
#[derive(Clone)]
pub struct PageFetcher {
    coordinator: ExtractionCoordinator,
    renderer: Arc<dyn PageRenderer>,
    document: PdfFile,
}

impl PageFetcher {
    /// Extract (if needed), render, then fetch content for the ticket's page.
    pub async fn fetch(&self, ticket: NavigationTicket) -> PageFetch {
        let mut extractions = Vec::new();
        let outcome = self.fetch_inner(&ticket, &mut extractions).await;
        PageFetch {
            ticket,
            extractions,
            outcome,
        }
    }

    async fn fetch_inner(
        &self,
        ticket: &NavigationTicket,
        extractions: &mut Vec<ExtractionResult>,
    ) -> Result<(RenderedPage, PageBody), ViewerError> {
        let mut snapshot = ticket.snapshot;
        if snapshot.needs_extraction(ticket.page) {
            let result = self.coordinator.extract(&ticket.file, ticket.page).await?;
            snapshot.record(&result);
            extractions.push(result);
        }

        let image = self.renderer.render_page(&self.document, ticket.page).await?;
        let body = self
            .coordinator
            .resolve_content(&ticket.file, ticket.page, &mut snapshot, extractions)
            .await?;
        Ok((image, body))
    }
}

/// Read a local PDF, check its magic bytes and upload it under its file name.
///
/// Needs no renderer, so it works where pdfium is unavailable.
pub async fn upload_file(backend: &dyn Backend, path: impl AsRef<Path>) -> Result<UploadResponse, ViewerError> {
    let path = path.as_ref();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ViewerError::NoFileName {
            path: path.to_path_buf(),
        })?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ViewerError::InputReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    PdfFile::check_magic(&path.display().to_string(), &bytes)?;

    backend
        .upload(&filename, bytes)
        .await
        .inspect_err(|e| warn!("Upload of '{}' failed: {}", filename, e))
}

/// The PDF viewer controller.
pub struct Viewer {
    config: ViewerConfig,
    backend: Arc<dyn Backend>,
    renderer: Arc<dyn PageRenderer>,
    coordinator: ExtractionCoordinator,
    state: ViewerState,
    editor: ContentEditor,
    document: Option<PdfFile>,
    view: Option<PageView>,
    generation: u64,
}

impl Viewer {
    /// Assemble a viewer from explicit collaborators.
    pub fn new(config: ViewerConfig, backend: Arc<dyn Backend>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            coordinator: ExtractionCoordinator::new(Arc::clone(&backend)),
            config,
            backend,
            renderer,
            state: ViewerState::default(),
            editor: ContentEditor::default(),
            document: None,
            view: None,
            generation: 0,
        }
    }

    /// Connect to the HTTP backend and bind pdfium.
    ///
    /// Fails with [`ViewerError::RendererUnavailable`] when pdfium cannot be
    /// loaded; no page can be viewed in that case.
    pub fn connect(config: ViewerConfig) -> Result<Self, ViewerError> {
        let backend = Arc::new(HttpBackend::new(&config)?);
        let renderer = Arc::new(PdfiumRenderer::new(&config)?);
        Ok(Self::new(config, backend, renderer))
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn editor(&self) -> &ContentEditor {
        &self.editor
    }

    pub fn current_view(&self) -> Option<&PageView> {
        self.view.as_ref()
    }

    // ── Files ────────────────────────────────────────────────────────────

    /// Names of the files stored on the backend.
    pub async fn list_files(&self) -> Result<Vec<String>, ViewerError> {
        self.backend
            .list_files()
            .await
            .inspect_err(|e| warn!("Listing files failed: {}", e))
    }

    /// Upload a local PDF under its file name.
    pub async fn upload(&self, path: impl AsRef<Path>) -> Result<UploadResponse, ViewerError> {
        upload_file(self.backend.as_ref(), path).await
    }

    /// Open `name`: reset the session, extract page 1, load the document and
    /// display page 1.
    pub async fn load_file(&mut self, name: &str) -> Result<(), ViewerError> {
        self.guard_editing()?;
        info!("Loading '{}'", name);

        self.generation += 1;
        self.state = ViewerState::for_file(name);
        self.state.phase = DisplayPhase::Loading { page: 1 };
        self.editor.clear();
        self.document = None;
        self.view = None;

        if let Err(e) = self.open_document(name).await {
            warn!("Loading '{}' failed: {}", name, e);
            self.state.phase = DisplayPhase::Error {
                page: 1,
                message: e.display_message(),
            };
            return Err(e);
        }

        self.goto(1).await
    }

    async fn open_document(&mut self, name: &str) -> Result<(), ViewerError> {
        self.coordinator.ensure_extracted(&mut self.state, 1).await?;

        let bytes = self.backend.fetch_file(name).await?;
        let document = PdfFile::new(name, bytes)?;
        let total = self.renderer.page_count(&document).await?;
        if total == 0 {
            return Err(ViewerError::CorruptPdf {
                name: name.to_string(),
                detail: "document has no pages".into(),
            });
        }

        self.state.total_pages = total;
        self.document = Some(document);
        Ok(())
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Validate `page`, mark it as the current page and issue a ticket for it.
    ///
    /// Any ticket issued earlier becomes stale.
    pub fn begin_navigation(&mut self, page: u32) -> Result<NavigationTicket, ViewerError> {
        let file = self.state.current_file.clone().ok_or(ViewerError::NoFileLoaded)?;
        if self.document.is_none() {
            return Err(ViewerError::NoFileLoaded);
        }
        self.guard_editing()?;
        if !self.state.is_valid_page(page) {
            return Err(ViewerError::InvalidPage {
                page,
                total: self.state.total_pages,
            });
        }

        self.generation += 1;
        self.state.current_page = page;
        self.state.phase = DisplayPhase::Loading { page };
        debug!("Navigation #{} → page {}", self.generation, page);

        Ok(NavigationTicket {
            generation: self.generation,
            file,
            page,
            snapshot: ExtractionSnapshot::of(&self.state),
        })
    }

    /// A detached fetcher for the open document.
    pub fn fetcher(&self) -> Result<PageFetcher, ViewerError> {
        let document = self.document.clone().ok_or(ViewerError::NoFileLoaded)?;
        Ok(PageFetcher {
            coordinator: self.coordinator.clone(),
            renderer: Arc::clone(&self.renderer),
            document,
        })
    }

    /// Fold a finished fetch into the state and, unless it is stale, display it.
    ///
    /// Extraction progress is recorded even for stale fetches of the open
    /// file: the backend did the work regardless of what is on screen.
    pub fn apply_navigation(&mut self, fetch: PageFetch) -> Result<NavigationOutcome, ViewerError> {
        let PageFetch {
            ticket,
            extractions,
            outcome,
        } = fetch;

        for result in &extractions {
            apply_extraction(&mut self.state, &ticket.file, result);
        }

        let is_current = ticket.generation == self.generation
            && self.state.current_file.as_deref() == Some(ticket.file.as_str())
            && self.state.current_page == ticket.page;
        if !is_current {
            debug!(
                "Dropping stale result for page {} (navigation #{}, latest #{})",
                ticket.page, ticket.generation, self.generation
            );
            return Ok(NavigationOutcome::Stale);
        }

        match outcome {
            Ok((image, body)) => {
                self.editor.load(body.content());
                self.view = Some(PageView {
                    page: ticket.page,
                    image,
                    body,
                });
                self.state.phase = DisplayPhase::Displaying { page: ticket.page };
                info!("Displaying page {}/{}", ticket.page, self.state.total_pages);
                Ok(NavigationOutcome::Applied)
            }
            Err(e) => {
                warn!("Loading page {} failed: {}", ticket.page, e);
                self.editor.clear();
                self.view = None;
                self.state.phase = DisplayPhase::Error {
                    page: ticket.page,
                    message: e.display_message(),
                };
                Err(e)
            }
        }
    }

    /// Display `page` (1-indexed).
    pub async fn goto(&mut self, page: u32) -> Result<(), ViewerError> {
        let ticket = self.begin_navigation(page)?;
        let fetch = self.fetcher()?.fetch(ticket).await;
        self.apply_navigation(fetch)?;
        Ok(())
    }

    /// Move to the next page. Returns `false` on the last page.
    pub async fn next(&mut self) -> Result<bool, ViewerError> {
        if self.state.current_page >= self.state.total_pages {
            return Ok(false);
        }
        self.goto(self.state.current_page + 1).await?;
        Ok(true)
    }

    /// Move to the previous page. Returns `false` on the first page.
    pub async fn prev(&mut self) -> Result<bool, ViewerError> {
        if self.state.current_page <= 1 {
            return Ok(false);
        }
        self.goto(self.state.current_page - 1).await?;
        Ok(true)
    }

    /// Force the backend to re-extract the current page, then redisplay it.
    pub async fn refresh(&mut self) -> Result<(), ViewerError> {
        let file = self.state.current_file.clone().ok_or(ViewerError::NoFileLoaded)?;
        self.guard_editing()?;
        let page = self.state.current_page;

        if let Err(e) = self.coordinator.force_extract(&file, page).await {
            self.state.phase = DisplayPhase::Error {
                page,
                message: e.display_message(),
            };
            return Err(e);
        }
        self.goto(page).await
    }

    /// Raw structured extraction result of the current page.
    pub async fn inspect_json(&self) -> Result<serde_json::Value, ViewerError> {
        let file = self.state.current_file.as_deref().ok_or(ViewerError::NoFileLoaded)?;
        self.backend.fetch_json(file, self.state.current_page).await
    }

    // ── Editing ──────────────────────────────────────────────────────────

    fn guard_editing(&self) -> Result<(), ViewerError> {
        if self.state.is_editing {
            return Err(ViewerError::UnsavedEdits {
                page: self.state.current_page,
            });
        }
        Ok(())
    }

    /// Make the displayed content editable.
    pub fn enter_edit(&mut self) -> Result<(), ViewerError> {
        let page = match self.state.phase {
            DisplayPhase::Displaying { page } => page,
            DisplayPhase::Editing { .. } => return Ok(()),
            _ => return Err(ViewerError::NothingToEdit),
        };
        self.editor.enter_edit();
        self.state.is_editing = true;
        self.state.phase = DisplayPhase::Editing { page };
        Ok(())
    }

    /// Replace the editor buffer.
    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), ViewerError> {
        self.editor.set_content(content)
    }

    /// Persist the editor buffer for the current page and return to read-only.
    ///
    /// On failure the viewer stays in edit mode with the buffer intact.
    pub async fn save(&mut self) -> Result<(), ViewerError> {
        let page = match self.state.phase {
            DisplayPhase::Editing { page } => page,
            _ => return Err(ViewerError::NotEditing),
        };
        let file = self.state.current_file.clone().ok_or(ViewerError::NoFileLoaded)?;
        let content = self.editor.content().to_string();

        if let Err(e) = self.backend.save_content(&file, page, &content).await {
            warn!("Saving page {} of '{}' failed: {}", page, file, e);
            return Err(e);
        }
        info!("Saved page {} of '{}' ({} bytes)", page, file, content.len());

        if let Some(view) = self.view.as_mut() {
            view.body = PageBody::Content(content.clone());
        }
        self.editor.commit(content);
        self.state.is_editing = false;
        self.state.phase = DisplayPhase::Displaying { page };
        Ok(())
    }

    /// Replace the buffer with `content` and save it.
    pub async fn save_content(&mut self, content: impl Into<String>) -> Result<(), ViewerError> {
        self.set_content(content)?;
        self.save().await
    }

    /// Drop unsaved edits and return to read-only.
    pub fn discard_edits(&mut self) -> Result<(), ViewerError> {
        let page = match self.state.phase {
            DisplayPhase::Editing { page } => page,
            _ => return Err(ViewerError::NotEditing),
        };
        self.editor.revert();
        self.state.is_editing = false;
        self.state.phase = DisplayPhase::Displaying { page };
        Ok(())
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Export the current page as shown in the editor, unsaved edits included.
    pub fn export_current(&self, format: ExportFormat) -> Result<String, ViewerError> {
        let file = self.state.current_file.as_deref().ok_or(ViewerError::NoFileLoaded)?;
        let view = self.view.as_ref().ok_or(ViewerError::NothingToEdit)?;

        let body = match &view.body {
            PageBody::Content(_) => PageBody::Content(self.editor.content().to_string()),
            _ if self.editor.is_dirty() => PageBody::Content(self.editor.content().to_string()),
            other => other.clone(),
        };
        let pages = [ExportedPage { page: view.page, body }];
        export::render(file, &pages, format, &self.config)
    }

    /// Export every page in order, extracting on demand.
    ///
    /// Content comes from the backend, so unsaved edits are not included.
    pub async fn export_all(
        &mut self,
        format: ExportFormat,
        progress: &dyn ExportProgressCallback,
    ) -> Result<String, ViewerError> {
        let file = self.state.current_file.clone().ok_or(ViewerError::NoFileLoaded)?;
        if self.document.is_none() {
            return Err(ViewerError::NoFileLoaded);
        }
        let total = self.state.total_pages;
        info!("Exporting all {} pages of '{}'", total, file);
        progress.on_export_start(total);

        let mut pages = Vec::with_capacity(total as usize);
        for page in 1..=total {
            progress.on_page_start(page, total);
            let mut snapshot = ExtractionSnapshot::of(&self.state);
            let mut extractions = Vec::new();
            let resolved = self
                .coordinator
                .resolve_content(&file, page, &mut snapshot, &mut extractions)
                .await;
            for result in &extractions {
                apply_extraction(&mut self.state, &file, result);
            }

            match resolved {
                Ok(body) => {
                    progress.on_page_complete(page, total, body.content().len());
                    pages.push(ExportedPage { page, body });
                }
                Err(e) => {
                    warn!("Export of page {} failed: {}", page, e);
                    progress.on_page_error(page, total, &e.to_string());
                    progress.on_export_complete(total, pages.len() as u32);
                    return Err(e);
                }
            }
        }

        progress.on_export_complete(total, pages.len() as u32);
        export::render(&file, &pages, format, &self.config)
    }
}
