//! The single live cell editor.

use shared::cursor::CursorPos;
use tracing::debug;

pub trait FieldEditor: Send {
    fn cursor_pos(&self) -> CursorPos;
    /// Tears the editor down; called exactly once.
    fn dispose(&mut self);
}

/// Holds at most one editor. Installing a new one disposes the previous one first.
#[derive(Default)]
pub struct EditorHolder {
    editor: Option<Box<dyn FieldEditor>>,
}

impl EditorHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, editor: Box<dyn FieldEditor>) {
        self.clear();
        debug!(cursor = ?editor.cursor_pos(), "editor: installed");
        self.editor = Some(editor);
    }

    pub fn clear(&mut self) {
        if let Some(mut previous) = self.editor.take() {
            debug!(cursor = ?previous.cursor_pos(), "editor: disposed");
            previous.dispose();
        }
    }

    pub fn is_active(&self) -> bool {
        self.editor.is_some()
    }

    pub fn active_cursor(&self) -> Option<CursorPos> {
        self.editor.as_ref().map(|editor| editor.cursor_pos())
    }
}

impl Drop for EditorHolder {
    fn drop(&mut self) {
        self.clear();
    }
}
