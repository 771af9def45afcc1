//! Read access to document metadata and table data.
//!
//! The controller never defines the schema of views, sections or tables; it reads them
//! through [`DocModel`]. [`MemoryDocModel`] is an in-process implementation that can be
//! loaded from a JSON snapshot and keeps its table data current by applying doc actions.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    action::{DocAction, RecordValues},
    domain::{ColRef, RowId, SectionId, TableRef, ViewId},
    value::CellValue,
};
use tokio::sync::RwLock;

use crate::link::PageWidgetLink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Any,
    Text,
    Numeric,
    Int,
    Bool,
    Ref(String),
    RefList(String),
    Other(String),
}

impl ColumnType {
    pub fn parse(raw: &str) -> Self {
        if let Some(table_id) = raw.strip_prefix("RefList:") {
            return ColumnType::RefList(table_id.to_string());
        }
        if let Some(table_id) = raw.strip_prefix("Ref:") {
            return ColumnType::Ref(table_id.to_string());
        }
        match raw {
            "Any" => ColumnType::Any,
            "Text" => ColumnType::Text,
            "Numeric" => ColumnType::Numeric,
            "Int" => ColumnType::Int,
            "Bool" => ColumnType::Bool,
            other => ColumnType::Other(other.to_string()),
        }
    }

    pub fn is_ref_list(&self) -> bool {
        matches!(self, ColumnType::RefList(_))
    }

    /// Table id a `Ref` or `RefList` column points at.
    pub fn ref_target(&self) -> Option<&str> {
        match self {
            ColumnType::Ref(table_id) | ColumnType::RefList(table_id) => Some(table_id),
            _ => None,
        }
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        ColumnType::parse(&value)
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        match value {
            ColumnType::Any => "Any".into(),
            ColumnType::Text => "Text".into(),
            ColumnType::Numeric => "Numeric".into(),
            ColumnType::Int => "Int".into(),
            ColumnType::Bool => "Bool".into(),
            ColumnType::Ref(table_id) => format!("Ref:{table_id}"),
            ColumnType::RefList(table_id) => format!("RefList:{table_id}"),
            ColumnType::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub table_ref: TableRef,
    pub table_id: String,
    /// Set for summary tables: the table being summarized.
    #[serde(default)]
    pub summary_source: Option<TableRef>,
    #[serde(default)]
    pub primary_view_id: Option<ViewId>,
}

impl TableMeta {
    pub fn is_summary(&self) -> bool {
        self.summary_source.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub col_ref: ColRef,
    pub table_ref: TableRef,
    pub col_id: String,
    #[serde(rename = "type")]
    pub col_type: ColumnType,
    /// Set on the group-by columns of a summary table.
    #[serde(default)]
    pub summary_source_col: Option<ColRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeta {
    pub view_id: ViewId,
    pub name: String,
    #[serde(default)]
    pub active_section_id: Option<SectionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub col_ref: ColRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMeta {
    pub section_id: SectionId,
    pub view_id: ViewId,
    pub table_ref: TableRef,
    #[serde(default)]
    pub title: String,
    /// Raw-data sections live on the `data` page rather than on their view.
    #[serde(default)]
    pub is_raw: bool,
    #[serde(default)]
    pub link: PageWidgetLink,
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

#[async_trait]
pub trait DocModel: Send + Sync {
    async fn section(&self, section_id: SectionId) -> Result<SectionMeta>;
    async fn sections_of_view(&self, view_id: ViewId) -> Vec<SectionMeta>;
    async fn view(&self, view_id: ViewId) -> Result<ViewMeta>;
    async fn find_view_by_name(&self, name: &str) -> Option<ViewId>;
    async fn default_view_id(&self) -> Option<ViewId>;
    async fn table(&self, table_ref: TableRef) -> Result<TableMeta>;
    async fn column(&self, col_ref: ColRef) -> Result<ColumnMeta>;
    async fn columns_of(&self, table_ref: TableRef) -> Vec<ColumnMeta>;
    async fn all_table_ids(&self) -> Vec<String>;
    async fn row_ids(&self, table_id: &str) -> Result<Vec<RowId>>;
    /// Value of a cell; a row without a value for `col_id` reads as `Null`.
    async fn cell_value(&self, table_id: &str, row_id: RowId, col_id: &str) -> Result<CellValue>;
    async fn set_active_section(&self, view_id: ViewId, section_id: SectionId) -> Result<()>;
    async fn receive_action(&self, action: &DocAction) -> Result<()>;

    async fn view_exists(&self, view_id: ViewId) -> bool {
        self.view(view_id).await.is_ok()
    }

    /// Group-by columns of a summary table.
    async fn group_by_columns(&self, table_ref: TableRef) -> Vec<ColumnMeta> {
        self.columns_of(table_ref)
            .await
            .into_iter()
            .filter(|col| col.summary_source_col.is_some())
            .collect()
    }
}

pub struct MissingDocModel;

#[async_trait]
impl DocModel for MissingDocModel {
    async fn section(&self, section_id: SectionId) -> Result<SectionMeta> {
        Err(anyhow!("document model unavailable for section {section_id}"))
    }

    async fn sections_of_view(&self, _view_id: ViewId) -> Vec<SectionMeta> {
        Vec::new()
    }

    async fn view(&self, view_id: ViewId) -> Result<ViewMeta> {
        Err(anyhow!("document model unavailable for view {view_id}"))
    }

    async fn find_view_by_name(&self, _name: &str) -> Option<ViewId> {
        None
    }

    async fn default_view_id(&self) -> Option<ViewId> {
        None
    }

    async fn table(&self, table_ref: TableRef) -> Result<TableMeta> {
        Err(anyhow!("document model unavailable for table {table_ref}"))
    }

    async fn column(&self, col_ref: ColRef) -> Result<ColumnMeta> {
        Err(anyhow!("document model unavailable for column {col_ref}"))
    }

    async fn columns_of(&self, _table_ref: TableRef) -> Vec<ColumnMeta> {
        Vec::new()
    }

    async fn all_table_ids(&self) -> Vec<String> {
        Vec::new()
    }

    async fn row_ids(&self, table_id: &str) -> Result<Vec<RowId>> {
        Err(anyhow!("document model unavailable for table {table_id}"))
    }

    async fn cell_value(&self, table_id: &str, _row_id: RowId, _col_id: &str) -> Result<CellValue> {
        Err(anyhow!("document model unavailable for table {table_id}"))
    }

    async fn set_active_section(&self, view_id: ViewId, _section_id: SectionId) -> Result<()> {
        Err(anyhow!("document model unavailable for view {view_id}"))
    }

    async fn receive_action(&self, action: &DocAction) -> Result<()> {
        Err(anyhow!(
            "document model unavailable for table {}",
            action.table_id()
        ))
    }
}

/// Rows of one table, keyed by row id.
pub type TableData = BTreeMap<RowId, RecordValues>;

/// Serializable contents of a [`MemoryDocModel`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocSnapshot {
    #[serde(default)]
    pub tables: Vec<TableMeta>,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub views: Vec<ViewMeta>,
    #[serde(default)]
    pub sections: Vec<SectionMeta>,
    #[serde(default)]
    pub default_view_id: Option<ViewId>,
    #[serde(default)]
    pub data: BTreeMap<String, TableData>,
}

pub struct MemoryDocModel {
    inner: RwLock<DocSnapshot>,
}

impl MemoryDocModel {
    pub fn new(snapshot: DocSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let snapshot: DocSnapshot = serde_json::from_str(raw)?;
        Ok(Self::new(snapshot))
    }

    pub async fn snapshot(&self) -> DocSnapshot {
        self.inner.read().await.clone()
    }
}

fn table_mut<'a>(snapshot: &'a mut DocSnapshot, table_id: &str) -> Result<&'a mut TableData> {
    snapshot
        .data
        .get_mut(table_id)
        .ok_or_else(|| anyhow!("unknown table {table_id}"))
}

fn bulk_record(values: &BTreeMap<String, Vec<CellValue>>, index: usize) -> RecordValues {
    values
        .iter()
        .map(|(col_id, column)| {
            (
                col_id.clone(),
                column.get(index).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

#[async_trait]
impl DocModel for MemoryDocModel {
    async fn section(&self, section_id: SectionId) -> Result<SectionMeta> {
        self.inner
            .read()
            .await
            .sections
            .iter()
            .find(|section| section.section_id == section_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown section {section_id}"))
    }

    async fn sections_of_view(&self, view_id: ViewId) -> Vec<SectionMeta> {
        self.inner
            .read()
            .await
            .sections
            .iter()
            .filter(|section| section.view_id == view_id && !section.is_raw)
            .cloned()
            .collect()
    }

    async fn view(&self, view_id: ViewId) -> Result<ViewMeta> {
        self.inner
            .read()
            .await
            .views
            .iter()
            .find(|view| view.view_id == view_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown view {view_id}"))
    }

    async fn find_view_by_name(&self, name: &str) -> Option<ViewId> {
        self.inner
            .read()
            .await
            .views
            .iter()
            .find(|view| view.name == name)
            .map(|view| view.view_id)
    }

    async fn default_view_id(&self) -> Option<ViewId> {
        let guard = self.inner.read().await;
        guard
            .default_view_id
            .or_else(|| guard.views.first().map(|view| view.view_id))
    }

    async fn table(&self, table_ref: TableRef) -> Result<TableMeta> {
        self.inner
            .read()
            .await
            .tables
            .iter()
            .find(|table| table.table_ref == table_ref)
            .cloned()
            .ok_or_else(|| anyhow!("unknown table {table_ref}"))
    }

    async fn column(&self, col_ref: ColRef) -> Result<ColumnMeta> {
        self.inner
            .read()
            .await
            .columns
            .iter()
            .find(|col| col.col_ref == col_ref)
            .cloned()
            .ok_or_else(|| anyhow!("unknown column {col_ref}"))
    }

    async fn columns_of(&self, table_ref: TableRef) -> Vec<ColumnMeta> {
        self.inner
            .read()
            .await
            .columns
            .iter()
            .filter(|col| col.table_ref == table_ref)
            .cloned()
            .collect()
    }

    async fn all_table_ids(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        let mut table_ids: Vec<String> =
            guard.tables.iter().map(|t| t.table_id.clone()).collect();
        for table_id in guard.data.keys() {
            if !table_ids.contains(table_id) {
                table_ids.push(table_id.clone());
            }
        }
        table_ids
    }

    async fn row_ids(&self, table_id: &str) -> Result<Vec<RowId>> {
        self.inner
            .read()
            .await
            .data
            .get(table_id)
            .map(|rows| rows.keys().copied().collect())
            .ok_or_else(|| anyhow!("unknown table {table_id}"))
    }

    async fn cell_value(&self, table_id: &str, row_id: RowId, col_id: &str) -> Result<CellValue> {
        let guard = self.inner.read().await;
        let rows = guard
            .data
            .get(table_id)
            .ok_or_else(|| anyhow!("unknown table {table_id}"))?;
        let record = rows
            .get(&row_id)
            .ok_or_else(|| anyhow!("unknown row {row_id} in table {table_id}"))?;
        Ok(record.get(col_id).cloned().unwrap_or_default())
    }

    async fn set_active_section(&self, view_id: ViewId, section_id: SectionId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let view = guard
            .views
            .iter_mut()
            .find(|view| view.view_id == view_id)
            .ok_or_else(|| anyhow!("unknown view {view_id}"))?;
        view.active_section_id = Some(section_id);
        Ok(())
    }

    async fn receive_action(&self, action: &DocAction) -> Result<()> {
        let mut guard = self.inner.write().await;
        match action {
            DocAction::AddRecord {
                table_id,
                row_id,
                values,
            } => {
                table_mut(&mut guard, table_id)?.insert(*row_id, values.clone());
            }
            DocAction::BulkAddRecord {
                table_id,
                row_ids,
                values,
            } => {
                let rows = table_mut(&mut guard, table_id)?;
                for (index, row_id) in row_ids.iter().enumerate() {
                    rows.insert(*row_id, bulk_record(values, index));
                }
            }
            DocAction::RemoveRecord { table_id, row_id } => {
                table_mut(&mut guard, table_id)?.remove(row_id);
            }
            DocAction::BulkRemoveRecord { table_id, row_ids } => {
                let rows = table_mut(&mut guard, table_id)?;
                for row_id in row_ids {
                    rows.remove(row_id);
                }
            }
            DocAction::UpdateRecord {
                table_id,
                row_id,
                values,
            } => {
                let record = table_mut(&mut guard, table_id)?
                    .get_mut(row_id)
                    .ok_or_else(|| anyhow!("unknown row {row_id} in table {table_id}"))?;
                record.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            DocAction::BulkUpdateRecord {
                table_id,
                row_ids,
                values,
            } => {
                let rows = table_mut(&mut guard, table_id)?;
                for (index, row_id) in row_ids.iter().enumerate() {
                    if let Some(record) = rows.get_mut(row_id) {
                        record.extend(bulk_record(values, index));
                    }
                }
            }
            DocAction::ReplaceTableData {
                table_id,
                row_ids,
                values,
            } => {
                let rows = table_mut(&mut guard, table_id)?;
                rows.clear();
                for (index, row_id) in row_ids.iter().enumerate() {
                    rows.insert(*row_id, bulk_record(values, index));
                }
            }
            DocAction::AddColumn { table_id, .. } | DocAction::ModifyColumn { table_id, .. } => {
                table_mut(&mut guard, table_id)?;
            }
            DocAction::RemoveColumn { table_id, col_id } => {
                for record in table_mut(&mut guard, table_id)?.values_mut() {
                    record.remove(col_id);
                }
            }
            DocAction::RenameColumn {
                table_id,
                old_col_id,
                new_col_id,
            } => {
                for record in table_mut(&mut guard, table_id)?.values_mut() {
                    if let Some(value) = record.remove(old_col_id) {
                        record.insert(new_col_id.clone(), value);
                    }
                }
                let table_ref = guard
                    .tables
                    .iter()
                    .find(|table| table.table_id == *table_id)
                    .map(|table| table.table_ref);
                for col in guard.columns.iter_mut() {
                    if Some(col.table_ref) == table_ref && col.col_id == *old_col_id {
                        col.col_id = new_col_id.clone();
                    }
                }
            }
            DocAction::AddTable { table_id, .. } => {
                guard.data.entry(table_id.clone()).or_default();
            }
            DocAction::RemoveTable { table_id } => {
                guard.data.remove(table_id);
            }
            DocAction::RenameTable {
                old_table_id,
                new_table_id,
            } => {
                if let Some(rows) = guard.data.remove(old_table_id) {
                    guard.data.insert(new_table_id.clone(), rows);
                }
                for table in guard.tables.iter_mut() {
                    if table.table_id == *old_table_id {
                        table.table_id = new_table_id.clone();
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
