//! In-process stand-ins for the renderer and the document server.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use doc_client::{channel::SendOptions, DocChannel, ViewInstance, ViewRegistry};
use serde_json::Value;
use shared::{
    action::UserAction,
    cursor::CursorPos,
    domain::{ActionNum, SectionId},
};
use tracing::info;

pub const LOCAL_DOC_FD: i64 = 1;

/// A view that prints where its cursor lands.
pub struct HeadlessView {
    section_id: SectionId,
    cursor: Mutex<Option<CursorPos>>,
}

#[async_trait]
impl ViewInstance for HeadlessView {
    fn section_id(&self) -> SectionId {
        self.section_id
    }

    fn current_position(&self) -> Option<CursorPos> {
        self.cursor.lock().ok().and_then(|cursor| *cursor)
    }

    fn get_cursor_pos(&self) -> CursorPos {
        self.current_position().unwrap_or_default()
    }

    fn set_cursor_pos(&self, pos: CursorPos) {
        let row = pos.row_id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let field = pos
            .field_index
            .map_or_else(|| "-".to_string(), |index| index.to_string());
        println!("cursor section={} row={row} field={field}", self.section_id);
        if let Ok(mut cursor) = self.cursor.lock() {
            *cursor = Some(pos);
        }
    }

    async fn loading_done(&self) -> Result<()> {
        Ok(())
    }

    fn activate_editor_at_cursor(&self, _init: Option<String>) -> Result<()> {
        Err(anyhow!("headless views cannot edit cells"))
    }
}

/// Renders every section as soon as it is asked for.
#[derive(Default)]
pub struct HeadlessViews {
    views: Mutex<HashMap<SectionId, Arc<HeadlessView>>>,
}

#[async_trait]
impl ViewRegistry for HeadlessViews {
    fn peek_view(&self, section_id: SectionId) -> Option<Arc<dyn ViewInstance>> {
        let views = self.views.lock().ok()?;
        views
            .get(&section_id)
            .map(|view| Arc::clone(view) as Arc<dyn ViewInstance>)
    }

    async fn wait_for_view(&self, section_id: SectionId) -> Result<Arc<dyn ViewInstance>> {
        let mut views = self
            .views
            .lock()
            .map_err(|_| anyhow!("view registry poisoned"))?;
        let view = views.entry(section_id).or_insert_with(|| {
            Arc::new(HeadlessView {
                section_id,
                cursor: Mutex::new(None),
            })
        });
        Ok(Arc::clone(view) as Arc<dyn ViewInstance>)
    }
}

/// Accepts every send without a server; nothing is broadcast back.
#[derive(Default)]
pub struct LoopbackChannel {
    sent: AtomicUsize,
}

#[async_trait]
impl DocChannel for LoopbackChannel {
    fn doc_fd(&self) -> i64 {
        LOCAL_DOC_FD
    }

    async fn send_actions(
        &self,
        actions: Vec<UserAction>,
        options: SendOptions,
    ) -> Result<Vec<Value>> {
        let total = self.sent.fetch_add(actions.len(), Ordering::Relaxed) + actions.len();
        info!(count = actions.len(), total, bundle = ?options.bundle, "loopback: accepted actions");
        Ok(vec![Value::Null; actions.len()])
    }

    async fn apply_user_actions_by_id(
        &self,
        action_nums: Vec<ActionNum>,
        _action_hashes: Vec<String>,
        undo: bool,
    ) -> Result<()> {
        info!(?action_nums, undo, "loopback: replay accepted");
        Ok(())
    }
}
