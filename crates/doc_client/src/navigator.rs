//! Cursor navigation that follows section links back to their sources.
//!
//! Moving the cursor of a linked section only works once its source section shows the
//! row that makes the target row visible, so sources are positioned first, innermost
//! source first. Each step waits for its view to render and yields to the runtime before
//! and after placing the cursor, giving linked sections a turn to re-filter.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use shared::{
    cursor::{CursorPos, HashLink},
    domain::{DocPage, SectionId, SpecialPage},
};
use tracing::debug;

use crate::{
    error::NavigationError,
    link::resolve_link_source,
    model::{DocModel, SectionMeta},
    view::ViewInstance,
};

/// What the navigator needs from the document it drives.
#[async_trait]
pub trait NavigationHost: Send + Sync {
    async fn active_page(&self) -> Option<DocPage>;
    async fn open_page(&self, page: DocPage);
    async fn mark_active_section(&self, section: &SectionMeta) -> Result<()>;
    /// The section's view once it has rendered and loaded its rows.
    async fn ready_view(&self, section_id: SectionId) -> Result<Arc<dyn ViewInstance>, NavigationError>;
    /// Called after the cursor of a section has been placed.
    fn cursor_placed(&self, _pos: CursorPos) {}
}

/// Page that renders `section`.
pub fn page_of_section(section: &SectionMeta) -> DocPage {
    if section.is_raw {
        DocPage::Special(SpecialPage::Data)
    } else {
        DocPage::View(section.view_id)
    }
}

/// Moves the cursor to `pos`, first moving every link source so the row is visible.
///
/// `visited` collects the sections already on the chain; a chain that comes back to one
/// of them fails with [`NavigationError::LinkCycle`].
pub fn navigate<'a>(
    host: &'a dyn NavigationHost,
    model: &'a dyn DocModel,
    pos: CursorPos,
    set_active: bool,
    visited: &'a mut Vec<SectionId>,
) -> BoxFuture<'a, Result<(), NavigationError>> {
    async move {
        let section_id = pos.section_id.ok_or(NavigationError::MissingSectionId)?;
        let row_id = pos.row_id.ok_or(NavigationError::MissingRowId)?;
        if visited.contains(&section_id) {
            return Err(NavigationError::LinkCycle(section_id));
        }
        visited.push(section_id);

        let section = model
            .section(section_id)
            .await
            .map_err(|_| NavigationError::UnknownSection(section_id))?;

        if let Some(step) = resolve_link_source(model, &section, row_id).await? {
            // Sources are only positioned, never made active.
            let src_pos = CursorPos::new(step.src_section_id, step.src_row_id);
            navigate(host, model, src_pos, false, &mut *visited).await?;
        }

        let page = page_of_section(&section);
        if host.active_page().await != Some(page) {
            debug!(section_id = section_id.0, ?page, "navigate: switching page");
            host.open_page(page).await;
        }
        if set_active {
            host.mark_active_section(&section)
                .await
                .map_err(NavigationError::Model)?;
        }

        let view = host.ready_view(section_id).await?;
        tokio::task::yield_now().await;
        let placed = CursorPos {
            section_id: Some(section_id),
            row_id: Some(row_id),
            field_index: pos.field_index,
        };
        view.set_cursor_pos(placed);
        debug!(
            section_id = section_id.0,
            row_id = row_id.0,
            field_index = ?pos.field_index,
            "navigate: cursor placed"
        );
        host.cursor_placed(placed);
        tokio::task::yield_now().await;
        Ok(())
    }
    .boxed()
}

/// Turns an anchor link into a cursor position.
///
/// The field index is that of the first field showing `col_ref`; a column the section does
/// not show leaves it unset.
pub async fn hash_to_cursor_pos(model: &dyn DocModel, hash: &HashLink) -> CursorPos {
    let mut pos = CursorPos {
        section_id: hash.section_id,
        row_id: hash.row_id,
        field_index: None,
    };
    if let (Some(section_id), Some(col_ref)) = (hash.section_id, hash.col_ref) {
        if let Ok(section) = model.section(section_id).await {
            pos.field_index = section
                .fields
                .iter()
                .position(|field| field.col_ref == col_ref);
        }
    }
    pos
}

#[cfg(test)]
#[path = "tests/navigator_tests.rs"]
mod tests;
