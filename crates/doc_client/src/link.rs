//! Section links: which source row makes a target row visible, and which links a new
//! page widget may use.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::{
    action::SectionType,
    domain::{ColRef, RowId, SectionId, TableRef},
    value::CellValue,
};
use tracing::debug;

use crate::{
    error::NavigationError,
    model::{DocModel, SectionMeta, TableMeta},
};

/// How a destination section follows the cursor of a source section.
///
/// A destination has at most one source; `src_section_id == None` means unlinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageWidgetLink {
    #[serde(default)]
    pub src_section_id: Option<SectionId>,
    #[serde(default)]
    pub src_col_ref: Option<ColRef>,
    #[serde(default)]
    pub target_col_ref: Option<ColRef>,
}

impl PageWidgetLink {
    pub fn is_linked(&self) -> bool {
        self.src_section_id.is_some()
    }

    /// `"<src>:<srcCol>:<targetCol>"` with `0` for absent parts; the unlinked link is `""`.
    pub fn link_id(&self) -> String {
        let Some(src) = self.src_section_id else {
            return String::new();
        };
        format!(
            "{}:{}:{}",
            src.0,
            self.src_col_ref.map_or(0, |c| c.0),
            self.target_col_ref.map_or(0, |c| c.0)
        )
    }

    pub fn from_link_id(link_id: &str) -> Self {
        let mut parts = link_id.split(':').map(|part| part.parse::<i64>().unwrap_or(0));
        let mut next = || parts.next().filter(|id| *id > 0);
        let src_section_id = next().map(SectionId);
        let src_col_ref = next().map(ColRef);
        let target_col_ref = next().map(ColRef);
        if src_section_id.is_none() {
            return Self::default();
        }
        Self {
            src_section_id,
            src_col_ref,
            target_col_ref,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// The cell value is one of the filter values.
    In,
    /// The cell holds a list sharing at least one element with the filter values.
    Intersects,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub col_id: String,
    pub op: FilterOp,
    pub values: Vec<CellValue>,
}

impl ColumnFilter {
    pub fn matches(&self, cell: &CellValue) -> bool {
        match self.op {
            FilterOp::In => self.values.contains(cell),
            FilterOp::Intersects => match cell {
                CellValue::List(items) => items.iter().any(|item| self.values.contains(item)),
                _ => false,
            },
        }
    }
}

/// A conjunction of column filters over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkQuery {
    pub table_id: String,
    pub filters: Vec<ColumnFilter>,
}

impl LinkQuery {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            filters: Vec::new(),
        }
    }

    pub fn filter(&mut self, col_id: impl Into<String>, op: FilterOp, values: Vec<CellValue>) {
        self.filters.push(ColumnFilter {
            col_id: col_id.into(),
            op,
            values,
        });
    }

    /// First row id (in table order) that satisfies every filter.
    pub async fn find_first(&self, model: &dyn DocModel) -> Result<Option<RowId>> {
        'rows: for row_id in model.row_ids(&self.table_id).await? {
            for filter in &self.filters {
                let cell = model
                    .cell_value(&self.table_id, row_id, &filter.col_id)
                    .await?;
                if !filter.matches(&cell) {
                    continue 'rows;
                }
            }
            return Ok(Some(row_id));
        }
        Ok(None)
    }
}

/// The source row a navigator must select so that `row_id` shows up in `section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStep {
    pub src_section_id: SectionId,
    pub src_row_id: RowId,
}

/// Resolves the source row of `section`'s link for its row `row_id`.
///
/// Returns `Ok(None)` for an unlinked section.
pub async fn resolve_link_source(
    model: &dyn DocModel,
    section: &SectionMeta,
    row_id: RowId,
) -> Result<Option<LinkStep>, NavigationError> {
    let Some(src_section_id) = section.link.src_section_id else {
        return Ok(None);
    };
    let src_section = model
        .section(src_section_id)
        .await
        .map_err(|_| NavigationError::UnknownSection(src_section_id))?;
    let dest_table = model
        .table(section.table_ref)
        .await
        .map_err(NavigationError::Model)?;
    let src_table = model
        .table(src_section.table_ref)
        .await
        .map_err(NavigationError::Model)?;

    let controller = match section.link.target_col_ref {
        Some(col_ref) => {
            let target_col = model.column(col_ref).await.map_err(NavigationError::Model)?;
            let value = model
                .cell_value(&dest_table.table_id, row_id, &target_col.col_id)
                .await
                .map_err(NavigationError::Model)?;
            if target_col.col_type.is_ref_list() {
                value.into_ref_list()?
            } else {
                value
            }
        }
        None => CellValue::Int(row_id.0),
    };

    let src_col = match section.link.src_col_ref {
        Some(col_ref) => Some(model.column(col_ref).await.map_err(NavigationError::Model)?),
        None => None,
    };

    let src_row_id = match src_col {
        None if !src_table.is_summary() => {
            // Linked by row id: a reference list selects its first referenced row.
            if controller.is_list() {
                controller.ref_list_ids().first().copied()
            } else {
                controller.as_row_id()
            }
        }
        Some(src_col) => {
            let op = if src_col.col_type.is_ref_list() {
                FilterOp::Intersects
            } else {
                FilterOp::In
            };
            let mut query = LinkQuery::new(&src_table.table_id);
            query.filter(&src_col.col_id, op, controller.filter_values());
            query
                .find_first(model)
                .await
                .map_err(NavigationError::Model)?
        }
        None => summary_query(model, &src_table, &dest_table, row_id)
            .await?
            .find_first(model)
            .await
            .map_err(NavigationError::Model)?,
    };

    let src_row_id = src_row_id.ok_or(NavigationError::UnresolvedLink {
        section_id: section.section_id,
        row_id,
    })?;
    debug!(
        section_id = section.section_id.0,
        row_id = row_id.0,
        src_section_id = src_section_id.0,
        src_row_id = src_row_id.0,
        "link: traced row to source"
    );
    Ok(Some(LinkStep {
        src_section_id,
        src_row_id,
    }))
}

/// Filters a summary source table on its group-by columns using the destination row's values.
async fn summary_query(
    model: &dyn DocModel,
    src_table: &TableMeta,
    dest_table: &TableMeta,
    row_id: RowId,
) -> Result<LinkQuery, NavigationError> {
    let mut query = LinkQuery::new(&src_table.table_id);
    for group_col in model.group_by_columns(src_table.table_ref).await {
        let Some(source_col_ref) = group_col.summary_source_col else {
            continue;
        };
        let source_col = model
            .column(source_col_ref)
            .await
            .map_err(NavigationError::Model)?;
        let value = model
            .cell_value(&dest_table.table_id, row_id, &source_col.col_id)
            .await
            .map_err(NavigationError::Model)?;
        query.filter(&source_col.col_id, FilterOp::In, value.filter_values());
    }
    Ok(query)
}

/// A page widget being added or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWidget {
    pub table_ref: TableRef,
    pub section_type: SectionType,
    pub summarize: bool,
    pub group_by: Vec<ColRef>,
    /// The section being edited, which cannot link to itself.
    pub section_id: Option<SectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOption {
    pub label: String,
    pub link: PageWidgetLink,
}

fn section_label(section: &SectionMeta, table: &TableMeta) -> String {
    if section.title.is_empty() {
        table.table_id.clone()
    } else {
        section.title.clone()
    }
}

/// Lists the links a widget may use to follow one of `view_sections`.
///
/// The unlinked option always comes first.
pub async fn select_by(
    model: &dyn DocModel,
    view_sections: &[SectionMeta],
    widget: &PageWidget,
) -> Result<Vec<LinkOption>> {
    let mut options = vec![LinkOption {
        label: "Select Widget".to_string(),
        link: PageWidgetLink::default(),
    }];
    if widget.summarize {
        return Ok(options);
    }

    let target_table = model.table(widget.table_ref).await?;
    let target_columns = model.columns_of(widget.table_ref).await;

    for src in view_sections {
        if Some(src.section_id) == widget.section_id {
            continue;
        }
        let src_table = model.table(src.table_ref).await?;
        let label = section_label(src, &src_table);
        let link = |src_col_ref, target_col_ref| PageWidgetLink {
            src_section_id: Some(src.section_id),
            src_col_ref,
            target_col_ref,
        };

        if src_table.summary_source == Some(widget.table_ref) {
            options.push(LinkOption {
                label: label.clone(),
                link: link(None, None),
            });
            continue;
        }
        if src_table.is_summary() {
            continue;
        }
        if src.table_ref == widget.table_ref {
            options.push(LinkOption {
                label: label.clone(),
                link: link(None, None),
            });
        }
        for col in &target_columns {
            if col.col_type.ref_target() == Some(src_table.table_id.as_str()) {
                options.push(LinkOption {
                    label: format!("{label} \u{2022} {}", col.col_id),
                    link: link(None, Some(col.col_ref)),
                });
            }
        }
        for col in model.columns_of(src.table_ref).await {
            if col.col_type.ref_target() == Some(target_table.table_id.as_str()) {
                options.push(LinkOption {
                    label: format!("{label}.{}", col.col_id),
                    link: link(Some(col.col_ref), None),
                });
            }
        }
    }
    Ok(options)
}

#[cfg(test)]
#[path = "tests/link_tests.rs"]
mod tests;
