//! Group renderer: group containers, placing lines into them, and folding.

use ahash::{HashMap, HashSet};

use crate::browser::GroupUpdate;
use crate::color::GroupPaint;
use crate::context::RenderCtx;
use crate::document::{ListDocument, NodeId, natural_content_height};
use crate::model::{GroupId, GroupRecord, TabRecord};
use crate::options::Options;

/// First tab index shown by a root-level node, if it shows any.
fn first_index(doc: &ListDocument, node: NodeId) -> Option<usize> {
    if let Some(line) = doc.line(node) {
        return Some(line.index);
    }
    let group = doc.group(node)?;
    group
        .children()
        .iter()
        .filter_map(|&c| doc.line(c).map(|l| l.index))
        .min()
}

#[derive(Debug, Default)]
pub struct GroupManager {
    /// Last record fetched for every group with a container.
    records: HashMap<GroupId, GroupRecord>,

    /// Groups whose next browser fold echo was caused by us.
    user_initiated: HashSet<GroupId>,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached container state. The document is cleared separately.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn record(&self, group: GroupId) -> Option<&GroupRecord> {
        self.records.get(&group)
    }

    pub(crate) fn remember(&mut self, record: GroupRecord) {
        self.records.insert(record.id, record);
    }

    /// Place `line` inside its group's content, creating the container the first time the group
    /// is seen.
    ///
    /// The line goes right before the line currently holding its position (whose index is bumped
    /// by one), or at the end. This is a local renumbering only: callers reindex afterwards.
    pub(crate) fn append_to_group(&mut self, ctx: &mut RenderCtx<'_>, tab: &TabRecord, line: NodeId) {
        let Some(group) = tab.group_id else {
            ctx.doc.append(None, line);
            return;
        };

        let container = match ctx.doc.group_container(group) {
            Some(container) => container,
            None => {
                let container = self.create_group_container(ctx, group);
                place_in_root(ctx.doc, container, tab.index);
                container
            }
        };

        let children = ctx.doc.children(Some(container)).to_vec();
        let occupant = children
            .iter()
            .copied()
            .filter(|&c| c != line)
            .find(|&c| ctx.doc.line(c).is_some_and(|l| l.index >= tab.index));

        match occupant {
            Some(occupant) => {
                ctx.doc.insert_before(occupant, line);
                if let Some(occupant_line) = ctx.doc.line_mut(occupant) {
                    if occupant_line.index == tab.index {
                        occupant_line.index += 1;
                    }
                }
            }
            None => ctx.doc.append(Some(container), line),
        }

        self.sync_line_focus(ctx.doc, container, line);
        self.refresh_tab_count(ctx.doc, container, ctx.options);
    }

    /// Lines inside a folded group are not reachable by keyboard navigation.
    pub(crate) fn sync_line_focus(&self, doc: &mut ListDocument, container: NodeId, line: NodeId) {
        let collapsed = doc.group(container).is_some_and(|g| g.collapsed);
        if let Some(flags) = doc.flags_mut(line) {
            flags.focusable = !collapsed;
        }
    }

    /// Build a detached container and perform its first fold/unfold.
    pub(crate) fn create_group_container(&mut self, ctx: &mut RenderCtx<'_>, group: GroupId) -> NodeId {
        let container = ctx.doc.create_group(group);

        let collapsed = match ctx.browser.get_group(group) {
            Ok(record) => {
                update_info(ctx.doc, container, &record, ctx.options);
                let collapsed = if ctx.options.sync_fold_state {
                    if ctx.group_state.get(group) != Some(record.collapsed) {
                        ctx.group_state
                            .set_collapsed(group, record.collapsed, ctx.session_store);
                    }
                    record.collapsed
                } else {
                    ctx.group_state.ensure(group, false)
                };
                self.records.insert(group, record);
                collapsed
            }
            Err(err) => {
                log::warn!("could not fetch {group}: {err}");
                ctx.group_state.ensure(group, false)
            }
        };

        if collapsed {
            self.collapse_group(ctx, container);
        } else {
            self.expand_group(ctx, container);
        }
        container
    }

    /// Unfold: restore max-height to the natural content height and make lines focusable again.
    pub(crate) fn expand_group(&mut self, ctx: &mut RenderCtx<'_>, container: NodeId) {
        self.set_fold(ctx, container, false);
    }

    /// Fold: pin max-height to the natural height first so the transition has a start value, then
    /// drop it to zero.
    pub(crate) fn collapse_group(&mut self, ctx: &mut RenderCtx<'_>, container: NodeId) {
        self.set_fold(ctx, container, true);
    }

    fn set_fold(&mut self, ctx: &mut RenderCtx<'_>, container: NodeId, collapsed: bool) {
        let metrics = ctx.metrics();
        let natural = natural_content_height(ctx.doc, container, &metrics);
        let Some(group) = ctx.doc.group_mut(container) else {
            return;
        };
        let group_id = group.group_id;
        group.collapsed = collapsed;
        group.content_scroll_height = natural;
        group.content_max_height = Some(natural);
        if collapsed {
            group.content_max_height = Some(0.0);
        }

        let children = group.children().to_vec();
        for child in children {
            if let Some(flags) = ctx.doc.flags_mut(child) {
                flags.focusable = !collapsed;
            }
        }

        ctx.group_state
            .set_collapsed(group_id, collapsed, ctx.session_store);
    }

    /// User toggle of a group's fold state.
    ///
    /// With fold sync on, the browser is told too, and the echo it sends back is flagged as ours.
    pub(crate) fn toggle_group_collapse(&mut self, ctx: &mut RenderCtx<'_>, group: GroupId) {
        let Some(container) = ctx.doc.group_container(group) else {
            log::debug!("toggle of {group} without a container");
            return;
        };
        let collapse = !ctx.group_state.is_collapsed(group);
        if collapse {
            self.collapse_group(ctx, container);
        } else {
            self.expand_group(ctx, container);
        }

        if ctx.options.sync_fold_state {
            self.user_initiated.insert(group);
            match ctx.browser.update_group(group, GroupUpdate::collapsed(collapse)) {
                Ok(record) => {
                    self.records.insert(group, record);
                }
                Err(err) => {
                    log::warn!("failed to sync fold state of {group}: {err}");
                    self.user_initiated.remove(&group);
                }
            }
        }
    }

    /// Click or Enter on a header. Folding is suppressed during multi-select gestures.
    ///
    /// Returns whether the group was toggled.
    pub(crate) fn on_header_activate(
        &mut self,
        ctx: &mut RenderCtx<'_>,
        group: GroupId,
        shift_held: bool,
        selection_active: bool,
    ) -> bool {
        if shift_held || selection_active {
            return false;
        }
        self.toggle_group_collapse(ctx, group);
        true
    }

    /// Consume the "we caused this" marker for `group`.
    pub(crate) fn take_user_initiated(&mut self, group: GroupId) -> bool {
        self.user_initiated.remove(&group)
    }

    /// Drop the container of a removed group. Lines still inside move to the root list, in place.
    pub(crate) fn remove_group(&mut self, ctx: &mut RenderCtx<'_>, group: GroupId) {
        self.records.remove(&group);
        self.user_initiated.remove(&group);
        if ctx.group_state.contains(group) {
            ctx.group_state.forget(group, ctx.session_store);
        }
        let Some(container) = ctx.doc.group_container(group) else {
            return;
        };
        for child in ctx.doc.children(Some(container)).to_vec() {
            ctx.doc.insert_before(container, child);
            if let Some(flags) = ctx.doc.flags_mut(child) {
                flags.focusable = true;
            }
        }
        ctx.doc.remove(container);
    }

    pub(crate) fn refresh_tab_count(&self, doc: &mut ListDocument, container: NodeId, options: &Options) {
        let count = doc.children(Some(container)).len();
        if let Some(group) = doc.group_mut(container) {
            group.tab_count = options.show_group_tab_count.then_some(count);
        }
    }
}

/// Refresh header title and colors from the group record.
pub(crate) fn update_info(doc: &mut ListDocument, container: NodeId, record: &GroupRecord, options: &Options) {
    let count = doc.children(Some(container)).len();
    let Some(group) = doc.group_mut(container) else {
        return;
    };
    group.title.clone_from(&record.title);
    group.paint = Some(GroupPaint::for_color(record.color));
    group.tab_count = options.show_group_tab_count.then_some(count);
}

/// Put a root-level node (container or ungrouped line) where a tab at `index` belongs.
pub(crate) fn place_in_root(doc: &mut ListDocument, node: NodeId, index: usize) {
    let before = doc
        .children(None)
        .iter()
        .copied()
        .filter(|&n| n != node)
        .find(|&n| first_index(doc, n).is_some_and(|i| i >= index));
    match before {
        Some(before) => doc.insert_before(before, node),
        None => doc.append(None, node),
    }
}
