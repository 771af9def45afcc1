use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cursor::CursorPos,
    domain::{ActionNum, RowId, SectionId, TableRef, ViewId},
    value::CellValue,
};

pub type RecordValues = BTreeMap<String, CellValue>;
pub type BulkColValues = BTreeMap<String, Vec<CellValue>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColInfo {
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub is_formula: bool,
    #[serde(default)]
    pub formula: String,
}

/// Atomic document mutations as broadcast by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum DocAction {
    AddRecord {
        table_id: String,
        row_id: RowId,
        values: RecordValues,
    },
    BulkAddRecord {
        table_id: String,
        row_ids: Vec<RowId>,
        values: BulkColValues,
    },
    RemoveRecord {
        table_id: String,
        row_id: RowId,
    },
    BulkRemoveRecord {
        table_id: String,
        row_ids: Vec<RowId>,
    },
    UpdateRecord {
        table_id: String,
        row_id: RowId,
        values: RecordValues,
    },
    BulkUpdateRecord {
        table_id: String,
        row_ids: Vec<RowId>,
        values: BulkColValues,
    },
    ReplaceTableData {
        table_id: String,
        row_ids: Vec<RowId>,
        values: BulkColValues,
    },
    AddColumn {
        table_id: String,
        col_id: String,
        info: ColInfo,
    },
    RemoveColumn {
        table_id: String,
        col_id: String,
    },
    RenameColumn {
        table_id: String,
        old_col_id: String,
        new_col_id: String,
    },
    ModifyColumn {
        table_id: String,
        col_id: String,
        info: ColInfo,
    },
    AddTable {
        table_id: String,
        columns: Vec<(String, ColInfo)>,
    },
    RemoveTable {
        table_id: String,
    },
    RenameTable {
        old_table_id: String,
        new_table_id: String,
    },
}

impl DocAction {
    pub fn table_id(&self) -> &str {
        match self {
            DocAction::AddRecord { table_id, .. }
            | DocAction::BulkAddRecord { table_id, .. }
            | DocAction::RemoveRecord { table_id, .. }
            | DocAction::BulkRemoveRecord { table_id, .. }
            | DocAction::UpdateRecord { table_id, .. }
            | DocAction::BulkUpdateRecord { table_id, .. }
            | DocAction::ReplaceTableData { table_id, .. }
            | DocAction::AddColumn { table_id, .. }
            | DocAction::RemoveColumn { table_id, .. }
            | DocAction::RenameColumn { table_id, .. }
            | DocAction::ModifyColumn { table_id, .. }
            | DocAction::AddTable { table_id, .. }
            | DocAction::RemoveTable { table_id } => table_id,
            DocAction::RenameTable { old_table_id, .. } => old_table_id,
        }
    }

    /// Actions that change the shape of tables rather than their data.
    pub fn is_schema_action(&self) -> bool {
        matches!(
            self,
            DocAction::AddColumn { .. }
                | DocAction::RemoveColumn { .. }
                | DocAction::RenameColumn { .. }
                | DocAction::ModifyColumn { .. }
                | DocAction::AddTable { .. }
                | DocAction::RemoveTable { .. }
                | DocAction::RenameTable { .. }
        )
    }
}

/// A batch of doc actions produced by one user action, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroup {
    pub action_num: ActionNum,
    pub action_hash: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub primary_action: String,
    #[serde(default)]
    pub from_self: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub is_undo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id_hint: Option<RowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_pos: Option<CursorPos>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocUserActionData {
    #[serde(default)]
    pub doc_actions: Vec<DocAction>,
    pub action_group: ActionGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The action broadcast a document server sends to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocUserAction {
    pub doc_fd: i64,
    #[serde(default)]
    pub from_self: bool,
    pub data: DocUserActionData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Record,
    Detail,
    Single,
    Chart,
    Custom,
}

/// Outgoing user actions, expanded by the data engine into doc actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum UserAction {
    AddEmptyTable,
    CreateViewSection {
        table_ref: TableRef,
        view_ref: ViewId,
        section_type: SectionType,
        group_by: Option<Vec<i64>>,
    },
    UpdateRecord {
        table_id: String,
        row_id: RowId,
        values: RecordValues,
    },
    BulkUpdateRecord {
        table_id: String,
        row_ids: Vec<RowId>,
        values: BulkColValues,
    },
    RemoveViewSection {
        section_id: SectionId,
    },
    UpdateSummaryViewSection {
        section_id: SectionId,
        group_by: Vec<i64>,
    },
}

impl UserAction {
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::AddEmptyTable => "AddEmptyTable",
            UserAction::CreateViewSection { .. } => "CreateViewSection",
            UserAction::UpdateRecord { .. } => "UpdateRecord",
            UserAction::BulkUpdateRecord { .. } => "BulkUpdateRecord",
            UserAction::RemoveViewSection { .. } => "RemoveViewSection",
            UserAction::UpdateSummaryViewSection { .. } => "UpdateSummaryViewSection",
        }
    }
}

/// Result of `CreateViewSection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSection {
    pub section_ref: SectionId,
    pub view_ref: ViewId,
}

#[cfg(test)]
#[path = "tests/action_tests.rs"]
mod tests;
