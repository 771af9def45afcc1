//! Seams to the view renderers (grid, card, chart...) that live outside this crate.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{cursor::CursorPos, domain::SectionId};

/// A rendered view section.
#[async_trait]
pub trait ViewInstance: Send + Sync {
    fn section_id(&self) -> SectionId;
    /// Latest cursor position reported by the renderer, if it has one yet.
    fn current_position(&self) -> Option<CursorPos>;
    /// Row and field under the cursor; the section id is filled in by the caller.
    fn get_cursor_pos(&self) -> CursorPos;
    fn set_cursor_pos(&self, pos: CursorPos);
    /// Resolves once the renderer has loaded its rows.
    async fn loading_done(&self) -> Result<()>;
    fn activate_editor_at_cursor(&self, init: Option<String>) -> Result<()>;
}

/// Owner of the view instances that the UI has materialized.
#[async_trait]
pub trait ViewRegistry: Send + Sync {
    /// The instance for `section_id` if it is rendered right now.
    fn peek_view(&self, section_id: SectionId) -> Option<Arc<dyn ViewInstance>>;
    /// Waits until the instance for `section_id` materializes.
    async fn wait_for_view(&self, section_id: SectionId) -> Result<Arc<dyn ViewInstance>>;
}

pub struct MissingViewRegistry;

#[async_trait]
impl ViewRegistry for MissingViewRegistry {
    fn peek_view(&self, _section_id: SectionId) -> Option<Arc<dyn ViewInstance>> {
        None
    }

    async fn wait_for_view(&self, section_id: SectionId) -> Result<Arc<dyn ViewInstance>> {
        Err(anyhow!("no view renderer available for section {section_id}"))
    }
}
