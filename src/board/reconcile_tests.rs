use serde_json::json;

use crate::browser::{BrowserEvent, BrowserSession as _, GroupTarget, GroupUpdate, MoveTarget};
use crate::input::{BoardInput, Target};
use crate::model::{GroupId, GroupRecord, TabId, TabRecord, WindowId};
use crate::store::KeyValueStore as _;
use crate::test_support::{FakeBrowser, TestBoard, board, pump, rendered, session_values};

const NOW: f64 = 1_000.0;

fn ids(board: &TestBoard) -> Vec<u32> {
    rendered(board).into_iter().map(|(tab, _)| tab.0).collect()
}

fn group_of(board: &TestBoard, tab: u32) -> Option<GroupId> {
    let doc = board.document();
    doc.tab_line(TabId(tab))
        .and_then(|line| doc.enclosing_group(line))
}

fn is_collapsed(board: &TestBoard, group: GroupId) -> Option<bool> {
    let doc = board.document();
    doc.group_container(group)
        .and_then(|c| doc.group(c))
        .map(|g| g.collapsed)
}

/// 1, [2 3] in group 7, 4
fn grouped_board() -> TestBoard {
    let mut browser = FakeBrowser::with_tabs(4);
    browser.add_group(
        GroupRecord::new(GroupId(7), WindowId(1), "Work"),
        &[TabId(2), TabId(3)],
    );
    board(browser)
}

fn create_tab(board: &mut TestBoard, tab: TabRecord) {
    board.browser_mut().add_tab(tab.clone());
    board.browser_mut().push_event(BrowserEvent::TabCreated(tab));
    pump(board, NOW);
}

#[test]
fn events_for_other_windows_are_ignored() {
    let mut board = board(FakeBrowser::with_tabs(2));
    board.handle_event(
        BrowserEvent::TabCreated(TabRecord::new(TabId(50), WindowId(2), 0, "https://other.example/")),
        NOW,
    );
    board.handle_event(
        BrowserEvent::TabMoved {
            tab_id: TabId(51),
            window_id: WindowId(2),
            from_index: 0,
            to_index: 3,
        },
        NOW,
    );
    assert_eq!(ids(&board), [1, 2]);
    assert!(!board.is_rerender_pending());
}

#[test]
fn created_tab_lands_at_its_index() {
    let mut board = board(FakeBrowser::with_tabs(3));
    board.handle_event(
        BrowserEvent::TabCreated(TabRecord::new(TabId(9), WindowId(1), 1, "https://new.example/")),
        NOW,
    );
    assert_eq!(
        rendered(&board),
        [(TabId(1), 0), (TabId(9), 1), (TabId(2), 2), (TabId(3), 3)]
    );
    assert_eq!(board.record(TabId(2)).map(|r| r.index), Some(2));
    assert!(!board.is_rerender_pending());

    // A second created event for the same tab changes nothing.
    board.handle_event(
        BrowserEvent::TabCreated(TabRecord::new(TabId(9), WindowId(1), 1, "https://new.example/")),
        NOW,
    );
    assert_eq!(ids(&board), [1, 9, 2, 3]);
}

#[test]
fn created_tab_joins_its_group() {
    let mut board = grouped_board();
    create_tab(
        &mut board,
        TabRecord::new(TabId(9), WindowId(1), 3, "https://new.example/").in_group(GroupId(7)),
    );
    assert_eq!(ids(&board), [1, 2, 3, 9, 4]);
    assert_eq!(group_of(&board, 9), Some(GroupId(7)));
}

#[test]
fn closing_the_last_tabs_of_a_group_drops_the_container() {
    let mut board = grouped_board();
    board
        .browser_mut()
        .close_tabs(&[TabId(2), TabId(3)])
        .unwrap();
    pump(&mut board, NOW);

    assert_eq!(rendered(&board), [(TabId(1), 0), (TabId(4), 1)]);
    assert_eq!(board.document().group_container(GroupId(7)), None);
    assert!(board.record(TabId(2)).is_none());
}

#[test]
fn foreign_move_rerenders_after_the_debounce() {
    let mut board = board(FakeBrowser::with_tabs(3));
    board
        .browser_mut()
        .move_tabs(&[TabId(3)], MoveTarget::index(0))
        .unwrap();
    pump(&mut board, NOW);
    assert!(board.is_rerender_pending());
    assert_eq!(ids(&board), [1, 2, 3]);

    board.update(NOW + 0.05);
    assert_eq!(ids(&board), [1, 2, 3]);

    board.update(NOW + 0.2);
    assert!(!board.is_rerender_pending());
    assert_eq!(
        rendered(&board),
        [(TabId(3), 0), (TabId(1), 1), (TabId(2), 2)]
    );
}

#[test]
fn ungrouped_first_child_goes_above_the_group() {
    let mut board = grouped_board();
    board.browser_mut().ungroup_tabs(&[TabId(2)]).unwrap();
    pump(&mut board, NOW);

    assert_eq!(ids(&board), [1, 2, 3, 4]);
    assert_eq!(group_of(&board, 2), None);
    assert_eq!(group_of(&board, 3), Some(GroupId(7)));
    let doc = board.document();
    let root = doc.children(None);
    assert_eq!(doc.tab_of(root[1]), Some(TabId(2)));
    assert!(!board.is_rerender_pending());
}

#[test]
fn ungrouped_last_child_goes_below_the_group() {
    let mut board = grouped_board();
    board.browser_mut().ungroup_tabs(&[TabId(3)]).unwrap();
    pump(&mut board, NOW);

    let doc = board.document();
    let root = doc.children(None);
    assert_eq!(root.len(), 4);
    assert_eq!(doc.group_of_container(root[1]), Some(GroupId(7)));
    assert_eq!(doc.tab_of(root[2]), Some(TabId(3)));
}

#[test]
fn regrouped_tab_gets_a_new_container() {
    let mut board = grouped_board();
    let group = board
        .browser_mut()
        .group_tabs(&[TabId(4)], GroupTarget::New)
        .unwrap();
    pump(&mut board, NOW);

    assert_eq!(group_of(&board, 4), Some(group));
    assert_eq!(board.document().group_order(), [GroupId(7), group]);
    assert_eq!(ids(&board), [1, 2, 3, 4]);
    assert!(!board.is_rerender_pending());
}

#[test]
fn own_fold_toggle_echo_is_not_applied_twice() {
    let mut board = grouped_board();
    board.handle_input(
        BoardInput::Click {
            target: Target::GroupHeader(GroupId(7)),
            modifiers: egui::Modifiers::NONE,
        },
        NOW,
    );
    assert_eq!(is_collapsed(&board, GroupId(7)), Some(true));
    assert_eq!(board.browser().group(GroupId(7)).map(|g| g.collapsed), Some(true));

    pump(&mut board, NOW);
    assert_eq!(is_collapsed(&board, GroupId(7)), Some(true));
    assert_eq!(
        session_values(&board).get("groupCollapsed:7"),
        Some(&json!(true))
    );

    // Folded lines drop out of keyboard navigation.
    assert_eq!(
        board.focus_order(),
        [
            Target::Tab(TabId(1)),
            Target::GroupHeader(GroupId(7)),
            Target::Tab(TabId(4)),
        ]
    );
}

#[test]
fn browser_fold_is_followed_when_synced() {
    let mut board = grouped_board();
    board
        .browser_mut()
        .update_group(GroupId(7), GroupUpdate::collapsed(true))
        .unwrap();
    pump(&mut board, NOW);
    assert_eq!(is_collapsed(&board, GroupId(7)), Some(true));
    assert_eq!(board.group_state().get(GroupId(7)), Some(true));
}

#[test]
fn browser_fold_is_ignored_without_sync() {
    let mut board = grouped_board();
    board.set_option("syncFoldState", &json!(false)).unwrap();
    pump(&mut board, NOW);
    board.update(NOW + 1.0);

    board
        .browser_mut()
        .update_group(GroupId(7), GroupUpdate::collapsed(true))
        .unwrap();
    pump(&mut board, NOW + 1.0);
    assert_eq!(is_collapsed(&board, GroupId(7)), Some(false));

    // A rename still shows up.
    board
        .browser_mut()
        .update_group(GroupId(7), GroupUpdate::title("Later"))
        .unwrap();
    pump(&mut board, NOW + 1.0);
    let doc = board.document();
    let title = doc
        .group_container(GroupId(7))
        .and_then(|c| doc.group(c))
        .map(|g| g.title.clone());
    assert_eq!(title.as_deref(), Some("Later"));
}

#[test]
fn own_settings_write_is_not_merged_back() {
    let mut board = board(FakeBrowser::with_tabs(2));
    board.set_option("hideSelfTabs", &json!(false)).unwrap();
    assert!(board.is_rerender_pending());
    board.update(NOW + 1.0);
    assert!(!board.is_rerender_pending());

    pump(&mut board, NOW + 1.0);
    assert!(!board.is_rerender_pending());
    assert!(board.debug_log_text().contains("our own echo"));
}

#[test]
fn foreign_settings_change_is_merged() {
    let mut board = board(FakeBrowser::with_tabs(2));
    board
        .settings_store_mut()
        .set_one("compactView", json!(true))
        .unwrap();
    pump(&mut board, NOW);
    assert!(board.options().compact_view);
    assert!(!board.is_rerender_pending());
    let doc = board.document();
    assert!(
        doc.line_order()
            .into_iter()
            .all(|line| doc.node(line).is_some_and(|n| n.flags.compact))
    );

    board
        .settings_store_mut()
        .set_one("keepSingleSelfTab", json!(false))
        .unwrap();
    pump(&mut board, NOW);
    assert!(board.is_rerender_pending());
}

#[test]
fn self_tab_is_hidden_and_triggers_a_cleanup_render() {
    let mut board = board(FakeBrowser::with_tabs(2));
    let visible = board.tab_lines().visible_count();
    create_tab(
        &mut board,
        TabRecord::new(TabId(9), WindowId(1), 2, "chrome://newtab/"),
    );

    let doc = board.document();
    let line = doc.tab_line(TabId(9));
    assert!(line.and_then(|l| doc.node(l)).is_some_and(|n| n.flags.hidden));
    assert_eq!(board.tab_lines().visible_count(), visible);
    assert!(board.is_rerender_pending());
}

#[test]
fn replaced_tab_rerenders_only_when_known() {
    let mut board = board(FakeBrowser::with_tabs(2));
    board.handle_event(
        BrowserEvent::TabReplaced {
            added_tab_id: TabId(60),
            removed_tab_id: TabId(61),
        },
        NOW,
    );
    assert!(!board.is_rerender_pending());

    board.handle_event(
        BrowserEvent::TabReplaced {
            added_tab_id: TabId(60),
            removed_tab_id: TabId(2),
        },
        NOW,
    );
    assert!(board.is_rerender_pending());
}

#[test]
fn regroup_during_a_drag_rebuilds_candidates_and_defers_rerender() {
    let mut board = board(FakeBrowser::with_tabs(4));
    board.handle_input(
        BoardInput::DragStart {
            target: Target::Tab(TabId(1)),
            pointer_y: 10.0,
        },
        NOW,
    );
    assert_eq!(board.drag().candidates().len(), 4);

    board
        .browser_mut()
        .group_tabs(&[TabId(3), TabId(4)], GroupTarget::New)
        .unwrap();
    pump(&mut board, NOW);
    assert!(board.drag().is_active());
    // 2, the group's top, 3, 4, below 4, below the group.
    assert_eq!(board.drag().candidates().len(), 6);

    board
        .browser_mut()
        .move_tabs(&[TabId(2)], MoveTarget::index(3))
        .unwrap();
    pump(&mut board, NOW);
    board.update(NOW + 1.0);
    assert!(board.is_rerender_pending());
    assert!(board.drag().is_active());

    board.handle_input(BoardInput::FocusLost, NOW + 1.0);
    board.update(NOW + 2.0);
    assert!(!board.is_rerender_pending());
    assert_eq!(ids(&board), [1, 3, 4, 2]);
}

#[test]
fn removing_the_dragged_tab_cancels_the_drag() {
    let mut board = board(FakeBrowser::with_tabs(3));
    board.handle_input(
        BoardInput::DragStart {
            target: Target::Tab(TabId(2)),
            pointer_y: 50.0,
        },
        NOW,
    );
    assert!(board.drag().is_active());

    board.browser_mut().close_tabs(&[TabId(2)]).unwrap();
    pump(&mut board, NOW);
    assert!(!board.drag().is_active());
    assert_eq!(rendered(&board), [(TabId(1), 0), (TabId(3), 1)]);
}
