//! Browser and settings-store events, applied to the rendered document.
//!
//! Handlers are idempotent where the browser may deliver related events in any order. Only the
//! board's own drag commits get incremental treatment for moves; any other move ends in a
//! debounced full re-render.

use super::{Parts, TabBoard};
use crate::browser::{BrowserEvent, BrowserSession};
use crate::document::{NodeId, Slot};
use crate::drag::DragSubject;
use crate::groups::{place_in_root, update_info};
use crate::input::Target;
use crate::model::{GroupId, GroupRecord, TabChange, TabId, TabRecord};
use crate::selection::DialogHost;
use crate::store::{KeyValueStore, StorageArea, StorageChanges};

impl<B, K, D> TabBoard<B, K, D>
where
    B: BrowserSession,
    K: KeyValueStore,
    D: DialogHost,
{
    pub fn handle_event(&mut self, event: BrowserEvent, now: f64) {
        self.now = now;
        self.drag.suppression_mut().expire(now);

        let Some(window) = self.window else {
            log::debug!("{} before bootstrap; ignored", event.kind());
            return;
        };
        if event.window_id().is_some_and(|w| w != window) {
            log::debug!("{} for another window; ignored", event.kind());
            return;
        }

        match event {
            BrowserEvent::TabCreated(tab) => self.on_tab_created(tab),
            BrowserEvent::TabUpdated {
                tab_id,
                change,
                tab,
            } => self.on_tab_updated(tab_id, &change, tab),
            BrowserEvent::TabRemoved { tab_id, .. } | BrowserEvent::TabDetached { tab_id, .. } => {
                self.on_tab_removed(tab_id);
            }
            BrowserEvent::TabMoved { tab_id, .. } => self.on_tab_moved(tab_id),
            BrowserEvent::TabAttached { tab_id, .. } => {
                self.schedule_rerender(&format!("{tab_id} attached"));
            }
            BrowserEvent::TabReplaced {
                added_tab_id,
                removed_tab_id,
            } => {
                if self.records.contains_key(&removed_tab_id) {
                    self.schedule_rerender(&format!("{removed_tab_id} replaced by {added_tab_id}"));
                }
            }
            BrowserEvent::GroupCreated(group) => {
                log::debug!("{} created", group.id);
                self.groups.remember(group);
            }
            BrowserEvent::GroupUpdated(group) => self.on_group_updated(group),
            BrowserEvent::GroupRemoved(group) => self.on_group_removed(group.id),
            BrowserEvent::GroupMoved(group) => self.on_group_moved(group.id),
        }
    }

    /// Change notification from one of the key-value stores.
    pub fn handle_storage_change(&mut self, area: StorageArea, changes: &StorageChanges, now: f64) {
        self.now = now;
        match area {
            StorageArea::Session => {
                log::debug!("session store changed ({} keys); nothing to do", changes.len());
            }
            StorageArea::Sync => {
                if self.local_settings_write {
                    self.local_settings_write = false;
                    self.debug_log_event("settings change is our own echo");
                    return;
                }
                let merge = self.options.merge_changes(changes);
                self.debug_log_event(format!("settings merged: {:?}", merge.changed));
                self.apply_options_change(&merge);
            }
        }
    }

    fn on_tab_created(&mut self, tab: TabRecord) {
        if self.doc.tab_line(tab.id).is_some() {
            log::debug!("{} already rendered", tab.id);
            return;
        }
        let id = tab.id;
        let is_self = {
            let Parts {
                mut ctx,
                tab_lines,
                groups,
                ..
            } = self.parts();
            let line = tab_lines.create_line(&mut ctx, &tab);
            if tab.group_id.is_some() {
                groups.append_to_group(&mut ctx, &tab, line);
            } else {
                place_in_root(ctx.doc, line, tab.index);
            }
            ctx.doc.line(line).is_some_and(|l| l.is_self)
        };
        self.records.insert(id, tab);
        self.debug_log_event(format!("{id} created"));

        if is_self && self.options.keep_single_self_tab {
            self.schedule_rerender("another instance of the board opened");
        }
        self.after_structural_change("tab created");
    }

    fn on_tab_updated(&mut self, tab_id: TabId, change: &TabChange, tab: TabRecord) {
        let Some(line) = self.doc.tab_line(tab_id) else {
            log::debug!("update for unrendered {tab_id}");
            return;
        };
        let old_group = self.doc.enclosing_group(line);
        let mut structural = false;

        if let Some(new_group) = change.group_id {
            if new_group != old_group {
                self.relocate_line(line, &tab, old_group, new_group);
                structural = true;
            }
        }

        {
            let Parts {
                mut ctx, tab_lines, ..
            } = self.parts();
            if change.url.is_some() && tab_lines.refresh_self_state(&mut ctx, line, &tab) {
                structural = true;
            }
            tab_lines.update_content(&mut ctx, line, &tab, Some(change));
        }
        self.records.insert(tab_id, tab);

        if structural {
            self.after_structural_change("tab updated");
        }
    }

    /// Move a line whose group membership changed, without a full re-sort.
    fn relocate_line(
        &mut self,
        line: NodeId,
        tab: &TabRecord,
        old_group: Option<GroupId>,
        new_group: Option<GroupId>,
    ) {
        self.debug_log_event(format!("{} regrouped {old_group:?} -> {new_group:?}", tab.id));
        let Parts {
            mut ctx, groups, ..
        } = self.parts();
        let old_container = old_group.and_then(|g| ctx.doc.group_container(g));

        match new_group {
            None => {
                let Some(container) = old_container else {
                    return;
                };
                // First child: right above the group. Last or middle: right below it; the browser
                // reports a middle child's real position with a separate move.
                if ctx.doc.children(Some(container)).first() == Some(&line) {
                    ctx.doc.insert_before(container, line);
                } else {
                    ctx.doc.insert_after(container, line);
                }
                if let Some(flags) = ctx.doc.flags_mut(line) {
                    flags.focusable = true;
                }
            }
            Some(group) => {
                let container = match ctx.doc.group_container(group) {
                    Some(container) => container,
                    None => {
                        let container = groups.create_group_container(&mut ctx, group);
                        place_in_root(ctx.doc, container, tab.index);
                        container
                    }
                };
                if ctx.doc.precedes(line, container) {
                    ctx.doc.prepend(Some(container), line);
                } else {
                    ctx.doc.append(Some(container), line);
                }
                groups.sync_line_focus(ctx.doc, container, line);
                groups.refresh_tab_count(ctx.doc, container, ctx.options);
            }
        }

        if let Some(old) = old_container {
            if ctx.doc.children(Some(old)).is_empty() {
                ctx.doc.remove(old);
            } else {
                groups.refresh_tab_count(ctx.doc, old, ctx.options);
            }
        }
    }

    fn on_tab_removed(&mut self, tab: TabId) {
        self.records.remove(&tab);
        if self.drag.subject() == Some(DragSubject::Tab(tab)) {
            self.drag.cancel(&mut self.doc);
        }
        self.selection.tab_removed(tab);
        if self.focus == Some(Target::Tab(tab)) {
            self.focus = None;
        }

        let Some(line) = self.doc.tab_line(tab) else {
            return;
        };
        let hidden = self.doc.node(line).is_some_and(|n| n.flags.hidden);
        let container = match self.doc.slot(line) {
            Slot::Group(container) => Some(container),
            Slot::Root | Slot::Detached => None,
        };
        self.doc.remove(line);
        self.tab_lines.line_removed(tab, hidden);

        if let Some(container) = container {
            if self.doc.children(Some(container)).is_empty() {
                self.doc.remove(container);
            } else {
                self.groups
                    .refresh_tab_count(&mut self.doc, container, &self.options);
            }
        }
        self.debug_log_event(format!("{tab} removed"));
        self.after_structural_change("tab removed");
    }

    fn on_tab_moved(&mut self, tab: TabId) {
        if self.drag.suppression_mut().take_tab(tab) {
            self.debug_log_event(format!("{tab} moved: echo of our group move"));
            return;
        }
        if self.drag.suppression().single_move_active(self.now) {
            self.debug_log_event(format!("{tab} moved: echo of our tab move"));
            return;
        }
        self.schedule_rerender(&format!("{tab} moved"));
    }

    fn on_group_updated(&mut self, record: GroupRecord) {
        let group = record.id;
        let ours = self.groups.take_user_initiated(group);
        let Some(container) = self.doc.group_container(group) else {
            self.groups.remember(record);
            return;
        };

        let folded = {
            let Parts {
                mut ctx, groups, ..
            } = self.parts();
            update_info(ctx.doc, container, &record, ctx.options);
            let shown = ctx.doc.group(container).is_some_and(|g| g.collapsed);
            let follow = ctx.options.sync_fold_state && !ours && shown != record.collapsed;
            if follow {
                if record.collapsed {
                    groups.collapse_group(&mut ctx, container);
                } else {
                    groups.expand_group(&mut ctx, container);
                }
            }
            groups.remember(record);
            follow
        };

        if ours {
            self.debug_log_event(format!("{group} updated: echo of our fold toggle"));
        }
        if folded {
            self.debug_log_event(format!("{group} folded by the browser"));
            self.after_structural_change("group folded");
        } else {
            self.relayout();
        }
    }

    fn on_group_removed(&mut self, group: GroupId) {
        if self.drag.subject() == Some(DragSubject::Group(group)) {
            self.drag.cancel(&mut self.doc);
        }
        self.selection.group_removed(group);
        if self.focus == Some(Target::GroupHeader(group)) {
            self.focus = None;
        }
        {
            let Parts {
                mut ctx, groups, ..
            } = self.parts();
            groups.remove_group(&mut ctx, group);
        }
        self.debug_log_event(format!("{group} removed"));
        self.after_structural_change("group removed");
    }

    fn on_group_moved(&mut self, group: GroupId) {
        if self.drag.suppression_mut().take_group(group) {
            self.debug_log_event(format!("{group} moved: echo of our group move"));
            return;
        }
        self.schedule_rerender(&format!("{group} moved"));
    }
}
