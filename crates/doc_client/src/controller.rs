//! The document controller: the per-document hub that ties navigation, undo bookkeeping,
//! the action log, the right panel and the URL state together.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use shared::{
    action::{CreatedSection, DocAction, DocUserAction, RecordValues, UserAction},
    cursor::{CursorPos, HashLink, UrlState, UrlUpdate, ViewCursorPos},
    domain::{
        ActionNum, ColRef, DocPage, RightPanelTool, RowId, SectionId, SpecialPage, TableRef,
        ViewId, DOC_TOUR_TABLE,
    },
    error::ApiError,
    value::CellValue,
};
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    action_log::{ActionLog, ActionLogEntry},
    channel::{DocChannel, SendOptions},
    config::Settings,
    editor::{EditorHolder, FieldEditor},
    error::{DocControllerError, NavigationError},
    link::{self, LinkOption, PageWidget, PageWidgetLink},
    model::{DocModel, SectionMeta},
    navigator::{self, page_of_section, NavigationHost},
    page,
    tools::{self, TabContent, ToolContent},
    tour::{plan_tour, NoTourLauncher, TourGate, TourKind, TourLauncher, TourPrefs},
    undo::{ReplayTarget, UndoStack},
    url_state::UrlStateStore,
    view::{ViewInstance, ViewRegistry},
};

const SECTIONS_TABLE: &str = "_grist_Views_section";
const COLUMNS_TABLE: &str = "_grist_Tables_column";
const RECALC_WHEN_DEFAULT: i64 = 0;
const RECALC_WHEN_NEVER: i64 = 1;

tokio::task_local! {
    /// Label of the bundle the current task is sending under.
    static ACTIVE_BUNDLE: String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocEvent {
    ActiveViewChanged(Option<DocPage>),
    CursorMoved(CursorPos),
    SchemaUpdated { doc_actions: Vec<DocAction> },
    ActionLogUpdated { action_num: ActionNum },
    RowCountChanged(u64),
    ToolChanged(RightPanelTool),
    TourStarted(TourKind),
    Error(ApiError),
}

struct DocControllerState {
    /// The last own action group received since the current send started.
    last_own_action: Option<ActionNum>,
    right_panel_tool: RightPanelTool,
    options_tabs: HashMap<String, Vec<TabContent>>,
    row_count: Option<u64>,
    /// Active section of the `data` page, which has no views row of its own.
    raw_active_section: Option<SectionId>,
    active_page: Option<DocPage>,
}

#[derive(Deserialize)]
struct AddEmptyTableResult {
    id: TableRef,
    #[serde(default)]
    views: Vec<CreatedView>,
}

#[derive(Deserialize)]
struct CreatedView {
    id: ViewId,
}

pub struct DocController {
    channel: Arc<dyn DocChannel>,
    model: Arc<dyn DocModel>,
    views: Arc<dyn ViewRegistry>,
    tours: Arc<dyn TourLauncher>,
    settings: Settings,
    url: UrlStateStore,
    inner: Mutex<DocControllerState>,
    undo_stack: Mutex<UndoStack>,
    action_log: Mutex<ActionLog>,
    editor: Mutex<EditorHolder>,
    tour_gate: TourGate,
    tour_prefs: RwLock<TourPrefs>,
    events: broadcast::Sender<DocEvent>,
}

impl DocController {
    pub fn new(
        channel: Arc<dyn DocChannel>,
        model: Arc<dyn DocModel>,
        views: Arc<dyn ViewRegistry>,
        settings: Settings,
    ) -> Arc<Self> {
        Self::new_with_dependencies(channel, model, views, Arc::new(NoTourLauncher), settings)
    }

    pub fn new_with_dependencies(
        channel: Arc<dyn DocChannel>,
        model: Arc<dyn DocModel>,
        views: Arc<dyn ViewRegistry>,
        tours: Arc<dyn TourLauncher>,
        settings: Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(settings.event_channel_capacity.max(1));
        Arc::new(Self {
            channel,
            model,
            views,
            tours,
            url: UrlStateStore::default(),
            inner: Mutex::new(DocControllerState {
                last_own_action: None,
                right_panel_tool: settings.default_tool,
                options_tabs: HashMap::new(),
                row_count: None,
                raw_active_section: None,
                active_page: None,
            }),
            undo_stack: Mutex::new(UndoStack::new(settings.undo_max_entries)),
            action_log: Mutex::new(ActionLog::new(settings.action_log_max_entries)),
            editor: Mutex::new(EditorHolder::new()),
            tour_gate: TourGate::default(),
            tour_prefs: RwLock::new(TourPrefs::default()),
            events,
            settings,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DocEvent> {
        self.events.subscribe()
    }

    pub fn url(&self) -> &UrlStateStore {
        &self.url
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &Arc<dyn DocModel> {
        &self.model
    }

    fn emit(&self, event: DocEvent) {
        let _ = self.events.send(event);
    }

    fn report_error(&self, error: &DocControllerError) {
        warn!(%error, "doc: reporting error");
        self.emit(DocEvent::Error(error.to_api_error()));
    }

    pub async fn set_tour_prefs(&self, prefs: TourPrefs) {
        *self.tour_prefs.write().await = prefs;
    }

    // Pages

    /// The page the URL resolves to right now.
    pub async fn active_view_id(&self) -> Option<DocPage> {
        page::resolve_active_view(&self.url.current(), self.model.as_ref()).await
    }

    pub async fn current_page_name(&self) -> String {
        page::current_page_name(self.active_view_id().await, self.model.as_ref()).await
    }

    pub fn has_custom_nav(&self) -> bool {
        self.url.current().has_custom_nav()
    }

    pub async fn open_doc_page(&self, page: DocPage) {
        info!(page = %page.to_token(), "doc: opening page");
        self.url.push_url(&UrlUpdate::page(page.to_token()));
        self.refresh_active_view().await;
    }

    /// Recomputes the active page and announces it when it changed.
    pub async fn refresh_active_view(&self) -> Option<DocPage> {
        let page = self.active_view_id().await;
        let changed = {
            let mut guard = self.inner.lock().await;
            let changed = guard.active_page != page;
            guard.active_page = page;
            changed
        };
        if changed {
            // The editor belongs to the page being left.
            self.editor.lock().await.clear();
            debug!(?page, "doc: active view changed");
            self.emit(DocEvent::ActiveViewChanged(page));
        }
        page
    }

    /// Section holding the cursor on the active page.
    pub async fn active_section_id(&self) -> Option<SectionId> {
        match self.active_view_id().await? {
            DocPage::View(view_id) => {
                let view = self.model.view(view_id).await.ok()?;
                match view.active_section_id {
                    Some(section_id) => Some(section_id),
                    None => self
                        .model
                        .sections_of_view(view_id)
                        .await
                        .first()
                        .map(|section| section.section_id),
                }
            }
            DocPage::Special(SpecialPage::Data) => self.inner.lock().await.raw_active_section,
            DocPage::Special(_) => None,
        }
    }

    // Cursor

    /// Cursor of the active section; empty while its view is not rendered.
    pub async fn get_cursor_pos(&self) -> CursorPos {
        let Some(section_id) = self.active_section_id().await else {
            return CursorPos::default();
        };
        match self.views.peek_view(section_id) {
            Some(view) => {
                let pos = view.get_cursor_pos();
                CursorPos {
                    section_id: Some(section_id),
                    row_id: pos.row_id,
                    field_index: pos.field_index,
                }
            }
            None => CursorPos::default(),
        }
    }

    /// Cursor of the active section tagged with its view, once the renderer reported one.
    pub async fn cursor_position(&self) -> Option<ViewCursorPos> {
        let view_id = self.active_view_id().await?.view_id()?;
        let section_id = self.active_section_id().await?;
        let pos = self.views.peek_view(section_id)?.current_position()?;
        Some(ViewCursorPos {
            view_id,
            pos: CursorPos {
                section_id: Some(section_id),
                ..pos
            },
        })
    }

    /// Jumps to `pos` without following links; used when undo or redo restores a cursor.
    pub async fn move_to_cursor_pos(&self, pos: Option<CursorPos>) {
        let Some(pos) = pos else {
            return;
        };
        let Some(section_id) = pos.section_id else {
            return;
        };
        match self.switch_to_section(section_id).await {
            Ok(view) => {
                view.set_cursor_pos(pos);
                self.emit(DocEvent::CursorMoved(pos));
            }
            Err(cause) => self.report_error(&DocControllerError::CellNotFound { cause }),
        }
    }

    async fn switch_to_section(
        &self,
        section_id: SectionId,
    ) -> Result<Arc<dyn ViewInstance>, NavigationError> {
        let section = self
            .model
            .section(section_id)
            .await
            .map_err(|_| NavigationError::UnknownSection(section_id))?;
        let page = page_of_section(&section);
        if self.active_view_id().await != Some(page) {
            self.open_doc_page(page).await;
        }
        self.mark_section_active(&section)
            .await
            .map_err(NavigationError::Model)?;
        self.wait_for_section_view(section_id).await
    }

    async fn mark_section_active(&self, section: &SectionMeta) -> Result<()> {
        if section.is_raw {
            self.inner.lock().await.raw_active_section = Some(section.section_id);
            Ok(())
        } else {
            self.model
                .set_active_section(section.view_id, section.section_id)
                .await
        }
    }

    async fn wait_for_section_view(
        &self,
        section_id: SectionId,
    ) -> Result<Arc<dyn ViewInstance>, NavigationError> {
        let wait = async {
            let view = self.views.wait_for_view(section_id).await?;
            view.loading_done().await?;
            anyhow::Ok(view)
        };
        match tokio::time::timeout(self.settings.view_ready_timeout(), wait).await {
            Ok(Ok(view)) => Ok(view),
            Ok(Err(err)) => {
                warn!(section_id = section_id.0, %err, "doc: view failed to load");
                Err(NavigationError::ViewNotReady(section_id))
            }
            Err(_) => {
                warn!(
                    section_id = section_id.0,
                    timeout_ms = self.settings.view_ready_timeout_ms,
                    "doc: timed out waiting for view"
                );
                Err(NavigationError::ViewNotReady(section_id))
            }
        }
    }

    /// Moves the cursor to `pos`, first moving link sources so the row becomes visible.
    ///
    /// With `silent`, failures are logged and swallowed.
    pub async fn recursive_move_to_cursor_pos(
        &self,
        pos: CursorPos,
        set_active: bool,
        silent: bool,
    ) -> Result<(), DocControllerError> {
        let mut visited = Vec::new();
        match navigator::navigate(self, self.model.as_ref(), pos, set_active, &mut visited).await {
            Ok(()) => Ok(()),
            Err(cause) if silent => {
                debug!(?pos, %cause, "doc: silent navigation failed");
                Ok(())
            }
            Err(cause) => {
                warn!(?pos, %cause, "doc: navigation failed");
                Err(DocControllerError::CellNotFound { cause })
            }
        }
    }

    pub async fn hash_to_cursor_pos(&self, hash: &HashLink) -> CursorPos {
        navigator::hash_to_cursor_pos(self.model.as_ref(), hash).await
    }

    // URL

    /// Reacts to the current URL state: follows an anchor link, then considers starting a tour.
    pub async fn handle_url_change(&self) {
        let state = self.url.current();
        self.follow_url_anchor().await;
        self.maybe_start_tour(&state).await;
    }

    /// Refreshes the active page and navigates to the URL's anchor link, if any.
    pub async fn follow_url_anchor(&self) {
        self.refresh_active_view().await;
        let Some(hash) = self.url.current().hash.filter(|hash| !hash.is_empty()) else {
            return;
        };
        let pos = self.hash_to_cursor_pos(&hash).await;
        info!(anchor = %hash.to_fragment(), "doc: following anchor link");
        if let Err(err) = self.recursive_move_to_cursor_pos(pos, true, false).await {
            self.report_error(&err);
        }
        // The anchor is consumed; a later change to the same anchor navigates again.
        self.url.push_url(&UrlUpdate::clear_hash());
    }

    /// Replaces the URL state, as when the location changes outside the app.
    pub fn set_url(&self, state: UrlState) -> bool {
        self.url.set(state)
    }

    /// Follows every URL change until the controller is dropped.
    ///
    /// Anchor links are handled in order on the listener task. Each change also gets its own
    /// task that considers starting a tour, so a running tour never holds up navigation;
    /// the tour gate keeps those starts from overlapping.
    pub fn spawn_url_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.url.subscribe();
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                let state = rx.borrow_and_update().clone();
                let tours = Arc::clone(&controller);
                tokio::spawn(async move {
                    tours.maybe_start_tour(&state).await;
                });
                controller.follow_url_anchor().await;
            }
            debug!("doc: url listener stopped");
        })
    }

    // Tours

    async fn has_doc_tour(&self) -> bool {
        self.model
            .all_table_ids()
            .await
            .iter()
            .any(|table_id| table_id == DOC_TOUR_TABLE)
    }

    /// Starts the tour `state` and the user's preferences call for, if any and none is running.
    pub async fn maybe_start_tour(&self, state: &UrlState) -> Option<TourKind> {
        if self.tours.is_tour_active() {
            return None;
        }
        let _guard = self.tour_gate.try_begin()?;
        let mut prefs = self.tour_prefs.read().await.clone();
        prefs.narrow_screen |= self.settings.narrow_screen;
        let kind = plan_tour(state, self.has_doc_tour().await, &prefs)?;

        self.wait_for_active_view().await;
        self.url.push_url(&UrlUpdate::clear_tours());
        info!(?kind, "doc: starting tour");
        self.emit(DocEvent::TourStarted(kind));

        let result = match kind {
            TourKind::Welcome => self.tours.start_welcome_tour().await,
            TourKind::Doc { auto_started } => self.run_doc_tour(&prefs.doc_id, auto_started).await,
        };
        if let Err(err) = result {
            self.report_error(&DocControllerError::View(err));
        }
        Some(kind)
    }

    async fn run_doc_tour(&self, doc_id: &str, auto_started: bool) -> Result<()> {
        self.tours.start_doc_tour().await?;
        if auto_started {
            self.tours.mark_doc_tour_seen(doc_id).await?;
            let mut prefs = self.tour_prefs.write().await;
            if !prefs.seen_doc_tours.iter().any(|seen| seen == doc_id) {
                prefs.seen_doc_tours.push(doc_id.to_string());
            }
        }
        Ok(())
    }

    /// The active section's view once it is ready; `None` on pages without one.
    async fn wait_for_active_view(&self) -> Option<Arc<dyn ViewInstance>> {
        let section_id = self.active_section_id().await?;
        let view = self.wait_for_section_view(section_id).await.ok()?;
        tokio::task::yield_now().await;
        Some(view)
    }

    // Editor

    pub async fn activate_editor_at_cursor(
        &self,
        init: Option<String>,
    ) -> Result<(), DocControllerError> {
        let view = self
            .wait_for_active_view()
            .await
            .ok_or(DocControllerError::NoActiveView)?;
        view.activate_editor_at_cursor(init)
            .map_err(DocControllerError::View)
    }

    /// Installs the live cell editor, disposing any previous one.
    pub async fn set_field_editor(&self, editor: Box<dyn FieldEditor>) {
        self.editor.lock().await.replace(editor);
    }

    pub async fn close_field_editor(&self) {
        self.editor.lock().await.clear();
    }

    pub async fn has_field_editor(&self) -> bool {
        self.editor.lock().await.is_active()
    }

    // Right panel

    pub async fn show_tool(&self, tool: RightPanelTool) {
        self.inner.lock().await.right_panel_tool = tool;
        debug!(?tool, "doc: showing tool");
        self.emit(DocEvent::ToolChanged(tool));
    }

    /// Content of the right panel for the selected tool.
    pub async fn right_panel_tool(&self) -> Option<ToolContent> {
        let guard = self.inner.lock().await;
        tools::tool_content(guard.right_panel_tool, &guard.options_tabs)
    }

    pub async fn add_options_tab(&self, tab: TabContent) {
        self.inner
            .lock()
            .await
            .options_tabs
            .entry(tab.label.clone())
            .or_default()
            .push(tab);
    }

    // Actions

    /// Applies an action broadcast from the server.
    pub async fn on_doc_user_action(&self, message: DocUserAction) -> Result<(), DocControllerError> {
        let DocUserAction {
            doc_fd,
            from_self,
            data,
        } = message;
        if let Some(message) = data.error {
            error!(%message, "doc: action broadcast carried an error");
            let err = DocControllerError::Broadcast(message);
            self.emit(DocEvent::Error(err.to_api_error()));
            return Err(err);
        }
        if doc_fd != self.channel.doc_fd() {
            debug!(doc_fd, "doc: ignoring broadcast for another document");
            return Ok(());
        }

        let mut schema_changed = false;
        for action in &data.doc_actions {
            if let Err(err) = self.model.receive_action(action).await {
                warn!(table_id = action.table_id(), %err, "doc: model rejected action");
            }
            schema_changed |= action.is_schema_action();
        }

        let mut group = data.action_group;
        group.from_self = from_self;
        debug!(
            action_num = group.action_num.0,
            from_self,
            internal = group.internal,
            is_undo = group.is_undo,
            "doc: received action group"
        );
        if from_self && !group.internal {
            let action_num = group.action_num;
            self.action_log.lock().await.push_action(&group);
            self.undo_stack.lock().await.push_action(group.clone());
            self.inner.lock().await.last_own_action = Some(action_num);
            self.emit(DocEvent::ActionLogUpdated { action_num });
        }
        if schema_changed {
            self.emit(DocEvent::SchemaUpdated {
                doc_actions: data.doc_actions,
            });
        }
        if let Some(row_count) = group.row_count {
            self.inner.lock().await.row_count = Some(row_count);
            self.emit(DocEvent::RowCountChanged(row_count));
        }
        Ok(())
    }

    async fn on_send_actions_start(&self) -> CursorPos {
        self.inner.lock().await.last_own_action = None;
        self.get_cursor_pos().await
    }

    /// Attaches the cursor captured before sending to the own action group it produced.
    async fn on_send_actions_end(&self, cursor: CursorPos) {
        let Some(action_num) = self.inner.lock().await.last_own_action else {
            return;
        };
        let mut pos = cursor;
        let mut undo_stack = self.undo_stack.lock().await;
        if let Some(hint) = undo_stack.get(action_num).and_then(|group| group.row_id_hint) {
            pos.row_id = Some(hint);
        }
        undo_stack.attach_cursor(action_num, pos);
        drop(undo_stack);
        self.action_log.lock().await.attach_cursor(action_num, pos);
        debug!(action_num = action_num.0, ?pos, "doc: cursor attached to action");
    }

    pub async fn send_actions(
        &self,
        actions: Vec<UserAction>,
        desc: Option<String>,
    ) -> Result<Vec<Value>, DocControllerError> {
        let cursor = self.on_send_actions_start().await;
        let options = SendOptions {
            bundle: ACTIVE_BUNDLE.try_with(String::clone).ok(),
            desc,
        };
        debug!(count = actions.len(), bundle = ?options.bundle, "doc: sending actions");
        let result = self.channel.send_actions(actions, options).await;
        self.on_send_actions_end(cursor).await;
        result.map_err(DocControllerError::Channel)
    }

    /// Runs `run` with every action it sends labelled as one bundle.
    ///
    /// The label is scoped to the calling task: nested bundles join the outermost one, and
    /// sends from other tasks are never labelled.
    pub async fn bundle_actions<T, F, Fut>(
        &self,
        label: impl Into<String>,
        run: F,
    ) -> Result<T, DocControllerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DocControllerError>>,
    {
        if ACTIVE_BUNDLE.try_with(|_| ()).is_ok() {
            return run().await;
        }
        ACTIVE_BUNDLE.scope(label.into(), run()).await
    }

    pub async fn undo(&self) -> Result<(), DocControllerError> {
        let target = self
            .undo_stack
            .lock()
            .await
            .undo_target()
            .ok_or(DocControllerError::NothingToReplay("undo"))?;
        self.replay(target, true).await?;
        self.undo_stack.lock().await.mark_undone();
        Ok(())
    }

    pub async fn redo(&self) -> Result<(), DocControllerError> {
        let target = self
            .undo_stack
            .lock()
            .await
            .redo_target()
            .ok_or(DocControllerError::NothingToReplay("redo"))?;
        self.replay(target, false).await?;
        self.undo_stack.lock().await.mark_redone();
        Ok(())
    }

    async fn replay(&self, target: ReplayTarget, undo: bool) -> Result<(), DocControllerError> {
        info!(action_nums = ?target.action_nums, undo, "doc: replaying action groups");
        self.channel
            .apply_user_actions_by_id(target.action_nums, target.action_hashes, undo)
            .await
            .map_err(DocControllerError::Channel)?;
        self.move_to_cursor_pos(target.cursor_pos).await;
        Ok(())
    }

    pub async fn can_undo(&self) -> bool {
        self.undo_stack.lock().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.undo_stack.lock().await.can_redo()
    }

    /// Action log entries, newest first.
    pub async fn action_log(&self) -> Vec<ActionLogEntry> {
        self.action_log.lock().await.entries().cloned().collect()
    }

    pub async fn row_count(&self) -> Option<u64> {
        self.inner.lock().await.row_count
    }

    // Page widgets

    /// Link options for `widget` among the sections of the active view.
    pub async fn select_by(&self, widget: &PageWidget) -> Result<Vec<LinkOption>, DocControllerError> {
        let sections = match self.active_view_id().await {
            Some(DocPage::View(view_id)) => self.model.sections_of_view(view_id).await,
            _ => Vec::new(),
        };
        link::select_by(self.model.as_ref(), &sections, widget)
            .await
            .map_err(DocControllerError::View)
    }

    /// Adds an empty table and opens its page.
    pub async fn add_empty_table(&self) -> Result<TableRef, DocControllerError> {
        let results = self
            .send_actions(vec![UserAction::AddEmptyTable], None)
            .await?;
        let created: AddEmptyTableResult = first_result(&results, "AddEmptyTable")?;
        let view_id = match created.views.first() {
            Some(view) => Some(view.id),
            None => self
                .model
                .table(created.id)
                .await
                .ok()
                .and_then(|table| table.primary_view_id),
        };
        if let Some(view_id) = view_id {
            self.open_doc_page(DocPage::View(view_id)).await;
        }
        Ok(created.id)
    }

    /// Adds `widget` to the active view, linked by `link`, and makes it the active section.
    pub async fn add_widget_to_page(
        &self,
        widget: &PageWidget,
        link: PageWidgetLink,
    ) -> Result<CreatedSection, DocControllerError> {
        let Some(DocPage::View(view_id)) = self.active_view_id().await else {
            return Err(DocControllerError::NoActiveView);
        };
        let view_name = self
            .model
            .view(view_id)
            .await
            .map(|view| view.name)
            .unwrap_or_default();
        let label = format!("Added new linked section to view {view_name}");
        let created = self
            .bundle_actions(label, move || async move {
                let group_by = widget
                    .summarize
                    .then(|| widget.group_by.iter().map(|col| col.0).collect());
                let results = self
                    .send_actions(
                        vec![UserAction::CreateViewSection {
                            table_ref: widget.table_ref,
                            view_ref: view_id,
                            section_type: widget.section_type,
                            group_by,
                        }],
                        None,
                    )
                    .await?;
                let created: CreatedSection = first_result(&results, "CreateViewSection")?;
                if link.is_linked() {
                    self.send_actions(vec![link_update(created.section_ref, link)], None)
                        .await?;
                }
                Ok(created)
            })
            .await?;
        if let Err(err) = self
            .model
            .set_active_section(created.view_ref, created.section_ref)
            .await
        {
            warn!(section_id = created.section_ref.0, %err, "doc: could not activate new section");
        }
        info!(section_id = created.section_ref.0, link = %link.link_id(), "doc: widget added");
        Ok(created)
    }

    /// Stores `link` on the active section.
    pub async fn save_link(&self, link: PageWidgetLink) -> Result<(), DocControllerError> {
        let section_id = self
            .active_section_id()
            .await
            .ok_or(DocControllerError::NoActiveView)?;
        self.send_actions(vec![link_update(section_id, link)], None)
            .await?;
        Ok(())
    }

    /// Turns the columns into empty formula columns.
    pub async fn clear_columns(&self, col_refs: &[ColRef]) -> Result<(), DocControllerError> {
        let count = col_refs.len();
        let values = BTreeMap::from([
            ("isFormula".to_string(), vec![CellValue::Bool(true); count]),
            ("formula".to_string(), vec![CellValue::Text(String::new()); count]),
            (
                "recalcWhen".to_string(),
                vec![CellValue::Int(RECALC_WHEN_DEFAULT); count],
            ),
            ("recalcDeps".to_string(), vec![CellValue::Null; count]),
        ]);
        self.send_actions(
            vec![UserAction::BulkUpdateRecord {
                table_id: COLUMNS_TABLE.to_string(),
                row_ids: col_refs.iter().map(|col| RowId(col.0)).collect(),
                values,
            }],
            Some("Clear columns".to_string()),
        )
        .await?;
        Ok(())
    }

    pub async fn update_formula(
        &self,
        col_ref: ColRef,
        formula: impl Into<String>,
    ) -> Result<(), DocControllerError> {
        let values = RecordValues::from([("formula".to_string(), CellValue::Text(formula.into()))]);
        self.send_actions(
            vec![UserAction::UpdateRecord {
                table_id: COLUMNS_TABLE.to_string(),
                row_id: RowId(col_ref.0),
                values,
            }],
            None,
        )
        .await?;
        Ok(())
    }

    /// Switches columns between formula and data; `no_recalc` data columns never recalculate.
    pub async fn convert_is_formula(
        &self,
        col_refs: &[ColRef],
        to_formula: bool,
        no_recalc: bool,
    ) -> Result<(), DocControllerError> {
        let count = col_refs.len();
        let recalc_when = if no_recalc {
            RECALC_WHEN_NEVER
        } else {
            RECALC_WHEN_DEFAULT
        };
        let values = BTreeMap::from([
            ("isFormula".to_string(), vec![CellValue::Bool(to_formula); count]),
            ("recalcWhen".to_string(), vec![CellValue::Int(recalc_when); count]),
            ("recalcDeps".to_string(), vec![CellValue::Null; count]),
        ]);
        self.send_actions(
            vec![UserAction::BulkUpdateRecord {
                table_id: COLUMNS_TABLE.to_string(),
                row_ids: col_refs.iter().map(|col| RowId(col.0)).collect(),
                values,
            }],
            None,
        )
        .await?;
        Ok(())
    }
}

fn link_update(section_id: SectionId, link: PageWidgetLink) -> UserAction {
    let values = RecordValues::from([
        (
            "linkSrcSectionRef".to_string(),
            CellValue::Int(link.src_section_id.map_or(0, |id| id.0)),
        ),
        (
            "linkSrcColRef".to_string(),
            CellValue::Int(link.src_col_ref.map_or(0, |id| id.0)),
        ),
        (
            "linkTargetColRef".to_string(),
            CellValue::Int(link.target_col_ref.map_or(0, |id| id.0)),
        ),
    ]);
    UserAction::UpdateRecord {
        table_id: SECTIONS_TABLE.to_string(),
        row_id: RowId(section_id.0),
        values,
    }
}

fn first_result<T: DeserializeOwned>(
    results: &[Value],
    action: &'static str,
) -> Result<T, DocControllerError> {
    let value = results
        .first()
        .ok_or_else(|| DocControllerError::UnexpectedResult {
            action,
            detail: "no result".to_string(),
        })?;
    serde_json::from_value(value.clone()).map_err(|err| DocControllerError::UnexpectedResult {
        action,
        detail: err.to_string(),
    })
}

#[async_trait]
impl NavigationHost for DocController {
    async fn active_page(&self) -> Option<DocPage> {
        self.active_view_id().await
    }

    async fn open_page(&self, page: DocPage) {
        self.open_doc_page(page).await;
    }

    async fn mark_active_section(&self, section: &SectionMeta) -> Result<()> {
        self.mark_section_active(section).await
    }

    async fn ready_view(
        &self,
        section_id: SectionId,
    ) -> Result<Arc<dyn ViewInstance>, NavigationError> {
        self.wait_for_section_view(section_id).await
    }

    fn cursor_placed(&self, pos: CursorPos) {
        self.emit(DocEvent::CursorMoved(pos));
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
