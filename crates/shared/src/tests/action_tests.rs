use serde_json::json;

use crate::{
    action::{ColInfo, DocAction, SectionType, UserAction},
    domain::{RowId, TableRef, ViewId},
    value::CellValue,
};

#[test]
fn schema_actions_are_column_and_table_shape_changes() {
    let add_record: DocAction = serde_json::from_value(json!({
        "type": "AddRecord",
        "payload": {"tableId": "People", "rowId": 1, "values": {"name": "Ann"}}
    }))
    .expect("add record");
    assert!(!add_record.is_schema_action());

    let rename: DocAction = serde_json::from_value(json!({
        "type": "RenameColumn",
        "payload": {"tableId": "People", "oldColId": "name", "newColId": "full_name"}
    }))
    .expect("rename column");
    assert!(rename.is_schema_action());
    assert_eq!(rename.table_id(), "People");
}

#[test]
fn payload_fields_travel_in_camel_case() {
    let create = UserAction::CreateViewSection {
        table_ref: TableRef(4),
        view_ref: ViewId(2),
        section_type: SectionType::Record,
        group_by: None,
    };
    assert_eq!(
        serde_json::to_value(&create).expect("encode"),
        json!({
            "type": "CreateViewSection",
            "payload": {"tableRef": 4, "viewRef": 2, "sectionType": "record", "groupBy": null}
        })
    );

    let add_column: DocAction = serde_json::from_value(json!({
        "type": "AddColumn",
        "payload": {
            "tableId": "People",
            "colId": "age",
            "info": {"type": "Int", "isFormula": true, "formula": "$born"}
        }
    }))
    .expect("add column");
    assert_eq!(
        add_column,
        DocAction::AddColumn {
            table_id: "People".to_string(),
            col_id: "age".to_string(),
            info: ColInfo {
                col_type: "Int".to_string(),
                is_formula: true,
                formula: "$born".to_string(),
            },
        }
    );

    let update: DocAction = serde_json::from_value(json!({
        "type": "UpdateRecord",
        "payload": {"tableId": "People", "rowId": 3, "values": {"name": "Bo"}}
    }))
    .expect("update record");
    assert!(matches!(
        update,
        DocAction::UpdateRecord { row_id: RowId(3), ref values, .. }
            if values.get("name") == Some(&CellValue::Text("Bo".to_string()))
    ));
}
