//! The content editor: one long-lived buffer holding the displayed page's
//! content, toggled between read-only and editable.
//!
//! The editor never talks to the backend itself; [`crate::Viewer::save`]
//! persists the buffer and then calls [`ContentEditor::commit`] so the
//! displayed value is exactly what the backend accepted.

use crate::error::ViewerError;

/// Editable view of the current page's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEditor {
    /// Last content loaded from, or persisted to, the backend.
    persisted: String,
    /// What the user sees; differs from `persisted` only while editing.
    buffer: String,
    readonly: bool,
}

impl Default for ContentEditor {
    fn default() -> Self {
        Self {
            persisted: String::new(),
            buffer: String::new(),
            readonly: true,
        }
    }
}

impl ContentEditor {
    /// Replace the content with a freshly fetched page and lock the editor.
    pub fn load(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.buffer.clone_from(&content);
        self.persisted = content;
        self.readonly = true;
    }

    /// Empty the editor (no page displayed).
    pub fn clear(&mut self) {
        self.load(String::new());
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Make the buffer mutable.
    pub fn exit_readonly(&mut self) {
        self.readonly = false;
    }

    /// Alias for [`exit_readonly`](Self::exit_readonly), named after the
    /// edit button it backs.
    pub fn enter_edit(&mut self) {
        self.exit_readonly();
    }

    /// Replace the buffer. Refused while read-only.
    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), ViewerError> {
        if self.readonly {
            return Err(ViewerError::NotEditing);
        }
        self.buffer = content.into();
        Ok(())
    }

    /// Current buffer, including unsaved edits.
    pub fn content(&self) -> &str {
        &self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer != self.persisted
    }

    /// Record `content` as persisted and return to read-only.
    pub fn commit(&mut self, content: impl Into<String>) {
        self.load(content);
    }

    /// Drop unsaved edits and return to read-only.
    pub fn revert(&mut self) {
        self.buffer.clone_from(&self.persisted);
        self.readonly = true;
    }
}
