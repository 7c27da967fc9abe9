//! Multi-select of tabs and groups, followed by one batch action chosen through dialogs.

use ahash::HashSet;
use itertools::Itertools as _;
use serde::Serialize;

use crate::browser::{BrowserError, GroupTarget, GroupUpdate, MoveTarget};
use crate::context::RenderCtx;
use crate::document::ListDocument;
use crate::model::{GroupId, TabId, WindowId};

mod dialog;

pub use dialog::{BatchAction, DialogHost, GroupChoice};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SelectionMode {
    /// Toggled on and off by a key; survives pointer release.
    Keyboard,

    /// Lasts while a modifier is held.
    Modifier,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SelectionState {
    #[default]
    Inactive,
    Selecting(SelectionMode),

    /// Dialogs are up and batch calls are running.
    Finalizing,
}

/// Result of a finished selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub action: BatchAction,
    pub tabs: usize,
    pub groups: usize,
    pub failures: usize,
}

#[derive(Debug, Default)]
pub struct Selection {
    state: SelectionState,
    tabs: HashSet<TabId>,
    groups: HashSet<GroupId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Selecting or finalizing.
    pub fn is_active(&self) -> bool {
        self.state != SelectionState::Inactive
    }

    pub fn mode(&self) -> Option<SelectionMode> {
        match self.state {
            SelectionState::Selecting(mode) => Some(mode),
            _ => None,
        }
    }

    pub fn selected_tabs(&self) -> &HashSet<TabId> {
        &self.tabs
    }

    pub fn selected_groups(&self) -> &HashSet<GroupId> {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty() && self.groups.is_empty()
    }

    pub(crate) fn begin(&mut self, mode: SelectionMode) -> bool {
        if self.state != SelectionState::Inactive {
            return false;
        }
        log::debug!("selection started ({mode:?})");
        self.state = SelectionState::Selecting(mode);
        true
    }

    pub(crate) fn toggle_tab(&mut self, doc: &mut ListDocument, tab: TabId) -> bool {
        if self.mode().is_none() {
            return false;
        }
        let selected = if self.tabs.remove(&tab) {
            false
        } else {
            self.tabs.insert(tab);
            true
        };
        if let Some(flags) = doc.tab_line(tab).and_then(|n| doc.flags_mut(n)) {
            flags.selected = selected;
        }
        true
    }

    pub(crate) fn toggle_group(&mut self, doc: &mut ListDocument, group: GroupId) -> bool {
        if self.mode().is_none() {
            return false;
        }
        let selected = if self.groups.remove(&group) {
            false
        } else {
            self.groups.insert(group);
            true
        };
        if let Some(flags) = doc.group_container(group).and_then(|n| doc.flags_mut(n)) {
            flags.selected = selected;
        }
        true
    }

    /// Set the visual markers again after the document was rebuilt.
    pub(crate) fn reapply_markers(&self, doc: &mut ListDocument) {
        for &tab in &self.tabs {
            if let Some(flags) = doc.tab_line(tab).and_then(|n| doc.flags_mut(n)) {
                flags.selected = true;
            }
        }
        for &group in &self.groups {
            if let Some(flags) = doc.group_container(group).and_then(|n| doc.flags_mut(n)) {
                flags.selected = true;
            }
        }
    }

    pub(crate) fn tab_removed(&mut self, tab: TabId) {
        self.tabs.remove(&tab);
    }

    pub(crate) fn group_removed(&mut self, group: GroupId) {
        self.groups.remove(&group);
    }

    /// Back to `Inactive` without side effects.
    pub(crate) fn abort(&mut self, doc: &mut ListDocument) {
        if self.state != SelectionState::Inactive {
            log::debug!("selection aborted");
        }
        self.clear(doc);
    }

    fn clear(&mut self, doc: &mut ListDocument) {
        for tab in self.tabs.drain() {
            if let Some(flags) = doc.tab_line(tab).and_then(|n| doc.flags_mut(n)) {
                flags.selected = false;
            }
        }
        for group in self.groups.drain() {
            if let Some(flags) = doc.group_container(group).and_then(|n| doc.flags_mut(n)) {
                flags.selected = false;
            }
        }
        self.state = SelectionState::Inactive;
    }

    /// Actions offered for the current selection.
    pub fn available_actions(&self, doc: &ListDocument) -> Vec<BatchAction> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.groups.is_empty() {
            actions.push(BatchAction::CreateGroup);
            if !doc.group_order().is_empty() {
                actions.push(BatchAction::MoveToGroup);
            }
        }
        actions.push(BatchAction::MoveToWindow);
        actions.push(BatchAction::MoveToNewWindow);
        actions
    }

    /// End the gesture. A non-empty selection goes through the dialogs and the chosen batch
    /// action; selection state is cleared afterwards whatever happened.
    pub(crate) fn finish(
        &mut self,
        ctx: &mut RenderCtx<'_>,
        dialogs: &mut dyn DialogHost,
        window: WindowId,
    ) -> Option<BatchReport> {
        if self.mode().is_none() {
            return None;
        }
        if self.is_empty() {
            self.clear(ctx.doc);
            return None;
        }
        self.state = SelectionState::Finalizing;
        let report = self.run_batch(ctx, dialogs, window);
        self.clear(ctx.doc);
        report
    }

    fn tabs_in_order(&self, doc: &ListDocument) -> Vec<TabId> {
        doc.tab_order()
            .into_iter()
            .filter(|t| self.tabs.contains(t))
            .collect()
    }

    fn groups_in_order(&self, doc: &ListDocument) -> Vec<GroupId> {
        doc.group_order()
            .into_iter()
            .filter(|g| self.groups.contains(g))
            .collect()
    }

    fn run_batch(
        &self,
        ctx: &mut RenderCtx<'_>,
        dialogs: &mut dyn DialogHost,
        window: WindowId,
    ) -> Option<BatchReport> {
        let actions = self.available_actions(ctx.doc);
        let action = dialogs.choose_action(&actions)?;
        if !actions.contains(&action) {
            log::warn!("dialog returned {action:?}, which was not offered");
            return None;
        }

        let tabs = self.tabs_in_order(ctx.doc);
        let groups = self.groups_in_order(ctx.doc);
        let mut errors: Vec<BrowserError> = Vec::new();

        match action {
            BatchAction::CreateGroup => {
                let name = dialogs.prompt_group_name()?;
                match ctx.browser.group_tabs(&tabs, GroupTarget::New) {
                    Ok(group) => {
                        if let Err(err) = ctx.browser.update_group(group, GroupUpdate::title(name)) {
                            log::warn!("naming {group} failed: {err}");
                            errors.push(err);
                        }
                    }
                    Err(err) => {
                        log::warn!("grouping {} tabs failed: {err}", tabs.len());
                        errors.push(err);
                    }
                }
            }
            BatchAction::MoveToGroup => {
                let choices = group_choices(ctx.doc);
                let target = dialogs.choose_group(&choices)?;
                if let Err(err) = ctx.browser.group_tabs(&tabs, GroupTarget::Existing(target)) {
                    log::warn!("moving {} tabs into {target} failed: {err}", tabs.len());
                    errors.push(err);
                }
            }
            BatchAction::MoveToWindow | BatchAction::MoveToNewWindow => {
                let target = if action == BatchAction::MoveToNewWindow {
                    match ctx.browser.create_window() {
                        Ok(target) => target,
                        Err(err) => {
                            log::warn!("creating a window failed: {err}");
                            dialogs.alert("Could not create a new window.");
                            return Some(BatchReport {
                                action,
                                tabs: tabs.len(),
                                groups: groups.len(),
                                failures: 1,
                            });
                        }
                    }
                } else {
                    let windows = match ctx.browser.list_windows() {
                        Ok(windows) => windows
                            .into_iter()
                            .filter(|w| w.id != window)
                            .collect_vec(),
                        Err(err) => {
                            log::warn!("listing windows failed: {err}");
                            Vec::new()
                        }
                    };
                    if windows.is_empty() {
                        dialogs.alert("There is no other window to move to.");
                        return None;
                    }
                    dialogs.choose_window(&windows)?
                };

                for &group in &groups {
                    if let Err(err) = ctx.browser.move_group(group, MoveTarget::end_of(target)) {
                        log::warn!("moving {group} to {target} failed: {err}");
                        errors.push(err);
                    }
                }
                // Tabs of a selected group already travelled with it.
                let loose: Vec<TabId> = tabs
                    .iter()
                    .copied()
                    .filter(|&t| {
                        ctx.doc
                            .tab_line(t)
                            .and_then(|n| ctx.doc.enclosing_group(n))
                            .is_none_or(|g| !self.groups.contains(&g))
                    })
                    .collect();
                if !loose.is_empty() {
                    if let Err(err) = ctx.browser.move_tabs(&loose, MoveTarget::end_of(target)) {
                        log::warn!("moving {} tabs to {target} failed: {err}", tabs.len());
                        errors.push(err);
                    }
                }
            }
        }

        if !errors.is_empty() {
            dialogs.alert("Some tabs could not be updated. See the log for details.");
        }
        Some(BatchReport {
            action,
            tabs: tabs.len(),
            groups: groups.len(),
            failures: errors.len(),
        })
    }
}

/// Groups of the rendered window, ordered by their first tab's position.
pub fn group_choices(doc: &ListDocument) -> Vec<GroupChoice> {
    doc.children(None)
        .iter()
        .filter_map(|&node| {
            let group = doc.group(node)?;
            let first_index = group
                .children()
                .iter()
                .filter_map(|&c| doc.line(c).map(|l| l.index))
                .min()?;
            Some(GroupChoice {
                id: group.group_id,
                title: group.title.clone(),
                first_index,
            })
        })
        .sorted_by_key(|c| c.first_index)
        .collect()
}
