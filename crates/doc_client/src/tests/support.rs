use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc, Mutex as StdMutex, OnceLock, Weak,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use shared::{
    action::{ActionGroup, DocUserAction, DocUserActionData, UserAction},
    cursor::CursorPos,
    domain::{ActionNum, RowId, SectionId},
};
use tokio::sync::{Mutex, Notify};

use crate::{
    channel::{DocChannel, SendOptions},
    config::Settings,
    controller::DocController,
    model::MemoryDocModel,
    tour::TourLauncher,
    view::{ViewInstance, ViewRegistry},
};

pub const DOC_FD: i64 = 7;

/// Two pages of linked sections over customers, orders, an order summary and projects.
///
/// View 1 "Sales": S1 customers; S2 the order picked by the customer's `fav_order`;
/// S3 orders of the selected customer; S8 customers watching the order in S2.
/// View 2 "Summary": S4 orders grouped by customer; S5 the orders of the selected group.
/// View 3 "Owners": S7 customers; S6 projects owned by the selected customer.
/// View 4 "Loop": S10 and S11 follow each other. S9 is the raw customers section.
pub fn fixture_json() -> Value {
    json!({
        "tables": [
            {"table_ref": 1, "table_id": "Customers", "primary_view_id": 1},
            {"table_ref": 2, "table_id": "Orders"},
            {"table_ref": 3, "table_id": "Orders_summary_customer", "summary_source": 2},
            {"table_ref": 4, "table_id": "Projects"}
        ],
        "columns": [
            {"col_ref": 11, "table_ref": 1, "col_id": "name", "type": "Text"},
            {"col_ref": 12, "table_ref": 1, "col_id": "fav_order", "type": "Ref:Orders"},
            {"col_ref": 21, "table_ref": 2, "col_id": "customer", "type": "Ref:Customers"},
            {"col_ref": 22, "table_ref": 2, "col_id": "watchers", "type": "RefList:Customers"},
            {"col_ref": 31, "table_ref": 3, "col_id": "customer", "type": "Ref:Customers",
             "summary_source_col": 21},
            {"col_ref": 41, "table_ref": 4, "col_id": "owners", "type": "RefList:Customers"}
        ],
        "views": [
            {"view_id": 1, "name": "Sales"},
            {"view_id": 2, "name": "Summary"},
            {"view_id": 3, "name": "Owners"},
            {"view_id": 4, "name": "Loop"}
        ],
        "sections": [
            {"section_id": 1, "view_id": 1, "table_ref": 1, "title": "Customers",
             "fields": [{"col_ref": 11}, {"col_ref": 12}]},
            {"section_id": 2, "view_id": 1, "table_ref": 2, "title": "Favorite order",
             "link": {"src_section_id": 1, "src_col_ref": 12},
             "fields": [{"col_ref": 21}, {"col_ref": 22}]},
            {"section_id": 3, "view_id": 1, "table_ref": 2, "title": "Orders",
             "link": {"src_section_id": 1, "target_col_ref": 21},
             "fields": [{"col_ref": 21}]},
            {"section_id": 4, "view_id": 2, "table_ref": 3, "title": "By customer",
             "fields": [{"col_ref": 31}]},
            {"section_id": 5, "view_id": 2, "table_ref": 2, "title": "Group orders",
             "link": {"src_section_id": 4}, "fields": [{"col_ref": 21}]},
            {"section_id": 6, "view_id": 3, "table_ref": 4, "title": "Projects",
             "link": {"src_section_id": 7, "target_col_ref": 41}, "fields": [{"col_ref": 41}]},
            {"section_id": 7, "view_id": 3, "table_ref": 1, "title": "Owners",
             "fields": [{"col_ref": 11}]},
            {"section_id": 8, "view_id": 1, "table_ref": 1, "title": "Watchers",
             "link": {"src_section_id": 2, "src_col_ref": 22}, "fields": [{"col_ref": 11}]},
            {"section_id": 9, "view_id": 1, "table_ref": 1, "title": "", "is_raw": true,
             "fields": [{"col_ref": 11}]},
            {"section_id": 10, "view_id": 4, "table_ref": 1, "title": "Left",
             "link": {"src_section_id": 11}},
            {"section_id": 11, "view_id": 4, "table_ref": 1, "title": "Right",
             "link": {"src_section_id": 10}}
        ],
        "default_view_id": 1,
        "data": {
            "Customers": {
                "5": {"name": "Ada", "fav_order": 10},
                "6": {"name": "Bo", "fav_order": 11},
                "7": {"name": "Cy", "fav_order": 0}
            },
            "Orders": {
                "10": {"customer": 5, "watchers": ["L", 6, 7]},
                "11": {"customer": 6, "watchers": ["L", 5]},
                "12": {"customer": 7, "watchers": ["L"]}
            },
            "Orders_summary_customer": {
                "1": {"customer": 5},
                "2": {"customer": 6},
                "3": {"customer": 7}
            },
            "Projects": {
                "1": {"owners": ["L", 7, 5]}
            }
        }
    })
}

pub fn fixture_model() -> Arc<MemoryDocModel> {
    Arc::new(MemoryDocModel::from_json(&fixture_json().to_string()).expect("fixture model"))
}

pub fn group(num: i64) -> ActionGroup {
    ActionGroup {
        action_num: ActionNum(num),
        action_hash: format!("hash-{num}"),
        desc: None,
        actions: vec![format!("UpdateRecord #{num}")],
        time: Utc::now(),
        user: "ada@example.com".to_string(),
        primary_action: "UpdateRecord".to_string(),
        from_self: true,
        internal: false,
        is_undo: false,
        row_id_hint: None,
        row_count: None,
        cursor_pos: None,
    }
}

pub fn broadcast(group: ActionGroup, from_self: bool) -> DocUserAction {
    DocUserAction {
        doc_fd: DOC_FD,
        from_self,
        data: DocUserActionData {
            doc_actions: Vec::new(),
            action_group: group,
            error: None,
        },
    }
}

pub struct TestView {
    section_id: SectionId,
    cursor: StdMutex<Option<CursorPos>>,
    placements: Arc<StdMutex<Vec<CursorPos>>>,
    pub editor_inits: StdMutex<Vec<Option<String>>>,
}

#[async_trait]
impl ViewInstance for TestView {
    fn section_id(&self) -> SectionId {
        self.section_id
    }

    fn current_position(&self) -> Option<CursorPos> {
        *self.cursor.lock().expect("cursor lock")
    }

    fn get_cursor_pos(&self) -> CursorPos {
        self.current_position().unwrap_or_default()
    }

    fn set_cursor_pos(&self, pos: CursorPos) {
        *self.cursor.lock().expect("cursor lock") = Some(pos);
        self.placements.lock().expect("placements lock").push(pos);
    }

    async fn loading_done(&self) -> Result<()> {
        Ok(())
    }

    fn activate_editor_at_cursor(&self, init: Option<String>) -> Result<()> {
        self.editor_inits.lock().expect("editor lock").push(init);
        Ok(())
    }
}

/// Materializes a view for any section on first request, except those marked never-ready.
#[derive(Default)]
pub struct TestViewRegistry {
    views: StdMutex<HashMap<SectionId, Arc<TestView>>>,
    never_ready: StdMutex<HashSet<SectionId>>,
    pub placements: Arc<StdMutex<Vec<CursorPos>>>,
}

impl TestViewRegistry {
    pub fn never_ready(&self, section_id: SectionId) {
        self.never_ready
            .lock()
            .expect("never-ready lock")
            .insert(section_id);
    }

    pub fn view(&self, section_id: SectionId) -> Arc<TestView> {
        self.views
            .lock()
            .expect("views lock")
            .entry(section_id)
            .or_insert_with(|| {
                Arc::new(TestView {
                    section_id,
                    cursor: StdMutex::new(None),
                    placements: Arc::clone(&self.placements),
                    editor_inits: StdMutex::new(Vec::new()),
                })
            })
            .clone()
    }

    pub fn placed(&self) -> Vec<(i64, i64)> {
        self.placements
            .lock()
            .expect("placements lock")
            .iter()
            .map(|pos| {
                (
                    pos.section_id.map_or(0, |id| id.0),
                    pos.row_id.map_or(0, |id| id.0),
                )
            })
            .collect()
    }
}

#[async_trait]
impl ViewRegistry for TestViewRegistry {
    fn peek_view(&self, section_id: SectionId) -> Option<Arc<dyn ViewInstance>> {
        self.views
            .lock()
            .expect("views lock")
            .get(&section_id)
            .map(|view| Arc::clone(view) as Arc<dyn ViewInstance>)
    }

    async fn wait_for_view(&self, section_id: SectionId) -> Result<Arc<dyn ViewInstance>> {
        let blocked = self
            .never_ready
            .lock()
            .expect("never-ready lock")
            .contains(&section_id);
        if blocked {
            std::future::pending::<()>().await;
        }
        Ok(self.view(section_id))
    }
}

/// Records what is sent and, once attached, echoes each send back as an own broadcast
/// before acknowledging it.
pub struct TestChannel {
    pub sent: Arc<Mutex<Vec<(Vec<UserAction>, SendOptions)>>>,
    pub replays: Arc<Mutex<Vec<(Vec<ActionNum>, bool)>>>,
    pub results: Mutex<VecDeque<Vec<Value>>>,
    pub row_id_hint: Mutex<Option<RowId>>,
    next_action: AtomicI64,
    controller: OnceLock<Weak<DocController>>,
}

impl TestChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            replays: Arc::new(Mutex::new(Vec::new())),
            results: Mutex::new(VecDeque::new()),
            row_id_hint: Mutex::new(None),
            next_action: AtomicI64::new(1),
            controller: OnceLock::new(),
        })
    }

    pub fn attach(&self, controller: &Arc<DocController>) {
        let _ = self.controller.set(Arc::downgrade(controller));
    }

    pub async fn queue_result(&self, result: Vec<Value>) {
        self.results.lock().await.push_back(result);
    }

    async fn echo(&self, group: ActionGroup) -> Result<()> {
        let Some(controller) = self.controller.get().and_then(Weak::upgrade) else {
            return Ok(());
        };
        controller
            .on_doc_user_action(broadcast(group, true))
            .await
            .map_err(|err| anyhow!(err.to_string()))
    }
}

#[async_trait]
impl DocChannel for TestChannel {
    fn doc_fd(&self) -> i64 {
        DOC_FD
    }

    async fn send_actions(
        &self,
        actions: Vec<UserAction>,
        options: SendOptions,
    ) -> Result<Vec<Value>> {
        let count = actions.len();
        self.sent.lock().await.push((actions, options));
        let num = self.next_action.fetch_add(1, Ordering::SeqCst);
        let mut own = group(num);
        own.row_id_hint = *self.row_id_hint.lock().await;
        self.echo(own).await?;
        let queued = self.results.lock().await.pop_front();
        Ok(queued.unwrap_or_else(|| vec![Value::Null; count]))
    }

    async fn apply_user_actions_by_id(
        &self,
        action_nums: Vec<ActionNum>,
        _action_hashes: Vec<String>,
        undo: bool,
    ) -> Result<()> {
        self.replays.lock().await.push((action_nums, undo));
        let num = self.next_action.fetch_add(1, Ordering::SeqCst);
        let mut replayed = group(num);
        replayed.is_undo = true;
        self.echo(replayed).await
    }
}

#[derive(Default)]
pub struct TestTourLauncher {
    pub active: AtomicBool,
    pub started: Arc<Mutex<Vec<&'static str>>>,
    pub seen: Arc<Mutex<Vec<String>>>,
    /// When set, the welcome tour runs until `finish` is notified.
    pub hold: AtomicBool,
    pub finish: Notify,
}

#[async_trait]
impl TourLauncher for TestTourLauncher {
    fn is_tour_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn start_welcome_tour(&self) -> Result<()> {
        self.started.lock().await.push("welcome");
        if self.hold.load(Ordering::SeqCst) {
            self.finish.notified().await;
        }
        Ok(())
    }

    async fn start_doc_tour(&self) -> Result<()> {
        self.started.lock().await.push("doc");
        Ok(())
    }

    async fn mark_doc_tour_seen(&self, doc_id: &str) -> Result<()> {
        self.seen.lock().await.push(doc_id.to_string());
        Ok(())
    }
}

pub fn test_settings() -> Settings {
    Settings {
        view_ready_timeout_ms: 200,
        ..Settings::default()
    }
}

pub struct Harness {
    pub controller: Arc<DocController>,
    pub channel: Arc<TestChannel>,
    pub views: Arc<TestViewRegistry>,
    pub model: Arc<MemoryDocModel>,
    pub tours: Arc<TestTourLauncher>,
}

pub fn harness() -> Harness {
    harness_with(fixture_model(), test_settings())
}

pub fn harness_with(model: Arc<MemoryDocModel>, settings: Settings) -> Harness {
    let channel = TestChannel::new();
    let views = Arc::new(TestViewRegistry::default());
    let tours = Arc::new(TestTourLauncher::default());
    let controller = DocController::new_with_dependencies(
        channel.clone(),
        model.clone(),
        views.clone(),
        tours.clone(),
        settings,
    );
    channel.attach(&controller);
    Harness {
        controller,
        channel,
        views,
        model,
        tours,
    }
}
