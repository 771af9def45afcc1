use serde_json::json;

use crate::{
    domain::RowId,
    value::{CellValue, ValueError},
};

#[test]
fn decodes_reference_list_without_type_tag() {
    let value = CellValue::from_wire(&json!(["L", 7, 9])).expect("ref list");
    assert_eq!(value, CellValue::List(vec![CellValue::Int(7), CellValue::Int(9)]));
    assert_eq!(value.ref_list_ids(), vec![RowId(7), RowId(9)]);
}

#[test]
fn rejects_arrays_without_a_string_tag() {
    assert_eq!(
        CellValue::from_wire(&json!([5, 6])),
        Err(ValueError::MissingTypeTag)
    );
    assert_eq!(CellValue::from_wire(&json!([])), Err(ValueError::MissingTypeTag));
    assert_eq!(
        CellValue::from_wire(&json!(["", 1])),
        Err(ValueError::MissingTypeTag)
    );
}

#[test]
fn keeps_other_tagged_values_opaque() {
    let value = CellValue::from_wire(&json!(["d", 1700000000])).expect("date");
    assert!(matches!(value, CellValue::Encoded { ref tag, .. } if tag == "d"));
    assert_eq!(value.to_wire(), json!(["d", 1700000000]));
    assert_eq!(value.as_row_id(), None);
}

#[test]
fn row_ids_must_be_positive_integers() {
    assert_eq!(CellValue::Int(3).as_row_id(), Some(RowId(3)));
    assert_eq!(CellValue::Int(0).as_row_id(), None);
    assert_eq!(CellValue::Float(4.0).as_row_id(), Some(RowId(4)));
    assert_eq!(CellValue::Float(4.5).as_row_id(), None);
    assert_eq!(CellValue::Text("4".into()).as_row_id(), None);
}

#[test]
fn reference_list_cells_must_hold_lists() {
    let empty = CellValue::from_wire(&json!(["L"])).expect("empty list");
    assert!(empty.ref_list_ids().is_empty());
    assert_eq!(CellValue::Null.into_ref_list(), Ok(CellValue::List(Vec::new())));
    assert_eq!(
        CellValue::Int(7).into_ref_list(),
        Err(ValueError::ExpectedList("7".to_string()))
    );
}
