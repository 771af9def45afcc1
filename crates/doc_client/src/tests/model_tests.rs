use std::collections::BTreeMap;

use shared::{
    action::DocAction,
    domain::{ColRef, RowId, SectionId, TableRef, ViewId},
    value::CellValue,
};

use crate::{
    model::{ColumnType, DocModel},
    test_support::fixture_model,
};

#[test]
fn column_types_parse_reference_targets() {
    assert_eq!(
        ColumnType::parse("RefList:People"),
        ColumnType::RefList("People".to_string())
    );
    assert_eq!(ColumnType::parse("Ref:People").ref_target(), Some("People"));
    assert!(ColumnType::parse("RefList:People").is_ref_list());
    assert_eq!(ColumnType::parse("Date"), ColumnType::Other("Date".to_string()));
    assert_eq!(String::from(ColumnType::Ref("T".to_string())), "Ref:T");
}

#[tokio::test]
async fn fixture_decodes_reference_lists() {
    let model = fixture_model();
    let watchers = model
        .cell_value("Orders", RowId(10), "watchers")
        .await
        .expect("cell");
    assert_eq!(watchers.ref_list_ids(), vec![RowId(6), RowId(7)]);
    let missing = model
        .cell_value("Orders", RowId(10), "nope")
        .await
        .expect("cell");
    assert_eq!(missing, CellValue::Null);
    assert!(model.cell_value("Orders", RowId(99), "customer").await.is_err());
}

#[tokio::test]
async fn bulk_actions_add_and_remove_rows() {
    let model = fixture_model();
    model
        .receive_action(&DocAction::BulkAddRecord {
            table_id: "Projects".to_string(),
            row_ids: vec![RowId(2), RowId(3)],
            values: BTreeMap::from([(
                "owners".to_string(),
                vec![CellValue::List(vec![CellValue::Int(5)]), CellValue::Null],
            )]),
        })
        .await
        .expect("add");
    model
        .receive_action(&DocAction::BulkRemoveRecord {
            table_id: "Projects".to_string(),
            row_ids: vec![RowId(1)],
        })
        .await
        .expect("remove");

    assert_eq!(
        model.row_ids("Projects").await.expect("rows"),
        vec![RowId(2), RowId(3)]
    );
}

#[tokio::test]
async fn rename_column_only_touches_its_table() {
    let model = fixture_model();
    model
        .receive_action(&DocAction::RenameColumn {
            table_id: "Orders".to_string(),
            old_col_id: "customer".to_string(),
            new_col_id: "buyer".to_string(),
        })
        .await
        .expect("rename");

    assert_eq!(model.column(ColRef(21)).await.expect("col").col_id, "buyer");
    assert_eq!(model.column(ColRef(31)).await.expect("col").col_id, "customer");
    assert_eq!(
        model
            .cell_value("Orders", RowId(10), "buyer")
            .await
            .expect("cell"),
        CellValue::Int(5)
    );
}

#[tokio::test]
async fn actions_on_unknown_tables_are_rejected() {
    let model = fixture_model();
    let result = model
        .receive_action(&DocAction::RemoveRecord {
            table_id: "Ghost".to_string(),
            row_id: RowId(1),
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn raw_sections_are_not_part_of_their_view() {
    let model = fixture_model();
    let ids: Vec<SectionId> = model
        .sections_of_view(ViewId(1))
        .await
        .into_iter()
        .map(|section| section.section_id)
        .collect();
    assert_eq!(ids, vec![SectionId(1), SectionId(2), SectionId(3), SectionId(8)]);
    assert_eq!(model.group_by_columns(TableRef(3)).await.len(), 1);
}
