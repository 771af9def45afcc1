use std::time::Duration;

use shared::{
    cursor::{CursorPos, HashLink},
    domain::{ColRef, DocPage, RowId, SectionId, SpecialPage, ViewId},
};

use crate::{
    config::Settings,
    controller::DocEvent,
    error::{DocControllerError, NavigationError},
    model::DocModel,
    test_support::{fixture_model, harness, harness_with, test_settings},
};

#[tokio::test]
async fn moves_source_section_before_linked_target() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(2), RowId(10)), true, false)
        .await
        .expect("navigation");

    assert_eq!(h.views.placed(), vec![(1, 5), (2, 10)]);
    assert_eq!(h.controller.active_view_id().await, Some(DocPage::View(ViewId(1))));
    let view = h.model.view(ViewId(1)).await.expect("view");
    assert_eq!(view.active_section_id, Some(SectionId(2)));
}

#[tokio::test]
async fn follows_chains_in_source_to_target_order() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(8), RowId(5)), false, false)
        .await
        .expect("navigation");

    // S8 watchers intersect order 11, which is customer 6's favorite.
    assert_eq!(h.views.placed(), vec![(1, 6), (2, 11), (8, 5)]);
}

#[tokio::test]
async fn sources_are_never_made_active() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(3), RowId(12)), false, false)
        .await
        .expect("navigation");

    assert_eq!(h.views.placed(), vec![(1, 7), (3, 12)]);
    let view = h.model.view(ViewId(1)).await.expect("view");
    assert_eq!(view.active_section_id, None);
}

#[tokio::test]
async fn reference_list_link_uses_first_id() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(6), RowId(1)), false, false)
        .await
        .expect("navigation");

    assert_eq!(h.views.placed(), vec![(7, 7), (6, 1)]);
}

#[tokio::test]
async fn summary_source_is_matched_on_group_by_columns() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(5), RowId(11)), false, false)
        .await
        .expect("navigation");

    assert_eq!(h.views.placed(), vec![(4, 2), (5, 11)]);
    assert_eq!(h.controller.active_view_id().await, Some(DocPage::View(ViewId(2))));
}

#[tokio::test]
async fn field_index_is_kept_on_the_target_only() {
    let h = harness();
    let target = CursorPos::new(SectionId(2), RowId(10)).with_field(1);
    h.controller
        .recursive_move_to_cursor_pos(target, false, false)
        .await
        .expect("navigation");

    let placements = h.views.placements.lock().expect("placements").clone();
    assert_eq!(placements[0].field_index, None);
    assert_eq!(placements[1], target);
}

#[tokio::test]
async fn missing_ids_fail_as_cell_not_found() {
    let h = harness();
    let err = h
        .controller
        .recursive_move_to_cursor_pos(
            CursorPos {
                section_id: Some(SectionId(1)),
                row_id: None,
                field_index: None,
            },
            true,
            false,
        )
        .await
        .expect_err("missing row id");

    assert!(matches!(
        err,
        DocControllerError::CellNotFound {
            cause: NavigationError::MissingRowId
        }
    ));
    assert_eq!(err.to_string(), "There was a problem finding the desired cell.");
    assert!(h.views.placed().is_empty());
}

#[tokio::test]
async fn unresolved_link_stops_before_any_placement() {
    let h = harness();
    let err = h
        .controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(2), RowId(12)), true, false)
        .await
        .expect_err("nobody favors order 12");

    assert!(matches!(
        err,
        DocControllerError::CellNotFound {
            cause: NavigationError::UnresolvedLink { .. }
        }
    ));
    assert!(h.views.placed().is_empty());
}

#[tokio::test]
async fn silent_mode_swallows_failures() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(2), RowId(12)), true, true)
        .await
        .expect("silent navigation never fails");
    assert!(h.views.placed().is_empty());
}

#[tokio::test]
async fn link_cycles_are_rejected() {
    let h = harness();
    let err = h
        .controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(10), RowId(5)), false, false)
        .await
        .expect_err("cycle");

    assert!(matches!(
        err,
        DocControllerError::CellNotFound {
            cause: NavigationError::LinkCycle(SectionId(10))
        }
    ));
}

#[tokio::test]
async fn raw_sections_open_the_data_page() {
    let h = harness();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(9), RowId(6)), true, false)
        .await
        .expect("navigation");

    assert_eq!(
        h.controller.active_view_id().await,
        Some(DocPage::Special(SpecialPage::Data))
    );
    assert_eq!(h.controller.active_section_id().await, Some(SectionId(9)));
    let pos = h.controller.get_cursor_pos().await;
    assert_eq!(pos, CursorPos::new(SectionId(9), RowId(6)));
}

#[tokio::test(start_paused = true)]
async fn view_that_never_renders_times_out() {
    let h = harness_with(
        fixture_model(),
        Settings {
            view_ready_timeout_ms: 50,
            ..test_settings()
        },
    );
    h.views.never_ready(SectionId(1));

    let started = tokio::time::Instant::now();
    let err = h
        .controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(1), RowId(5)), false, false)
        .await
        .expect_err("view not ready");

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(matches!(
        err,
        DocControllerError::CellNotFound {
            cause: NavigationError::ViewNotReady(SectionId(1))
        }
    ));
}

#[tokio::test]
async fn cursor_moves_are_announced() {
    let h = harness();
    let mut events = h.controller.subscribe_events();
    h.controller
        .recursive_move_to_cursor_pos(CursorPos::new(SectionId(1), RowId(6)), false, false)
        .await
        .expect("navigation");

    let mut moved = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DocEvent::CursorMoved(pos) = event {
            moved.push(pos);
        }
    }
    assert_eq!(moved, vec![CursorPos::new(SectionId(1), RowId(6))]);
}

#[tokio::test]
async fn hash_column_maps_to_first_matching_field() {
    let h = harness();
    let pos = h
        .controller
        .hash_to_cursor_pos(&HashLink {
            row_id: Some(RowId(10)),
            col_ref: Some(ColRef(22)),
            section_id: Some(SectionId(2)),
        })
        .await;
    assert_eq!(pos, CursorPos::new(SectionId(2), RowId(10)).with_field(1));
}

#[tokio::test]
async fn hash_column_outside_section_leaves_field_unset() {
    let h = harness();
    let pos = h
        .controller
        .hash_to_cursor_pos(&HashLink {
            row_id: Some(RowId(10)),
            col_ref: Some(ColRef(41)),
            section_id: Some(SectionId(2)),
        })
        .await;
    assert_eq!(pos.field_index, None);
    assert_eq!(pos.row_id, Some(RowId(10)));
}
