//! Drag-and-drop reordering of tabs and groups, by pointer or keyboard.
//!
//! One gesture at a time: `Idle -> Dragging -> (Dropped | Cancelled) -> Idle`. Candidate drop
//! positions are computed once when the gesture starts; every pointer move afterwards is a
//! nearest-neighbor scan over that flat list.

use serde::Serialize;

use crate::browser::{GroupTarget, MoveTarget};
use crate::context::RenderCtx;
use crate::document::{ListDocument, NodeId, Slot};
use crate::model::{GroupId, TabId};
use crate::options::EngineTuning;
use crate::ordering;

mod candidates;
mod suppression;


pub use candidates::{Candidate, Resolve, Side};
pub use suppression::MoveSuppression;

use candidates::{build_candidates, current_position, nearest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DragSubject {
    Tab(TabId),
    Group(GroupId),
}

impl DragSubject {
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DragModality {
    Pointer,
    Keyboard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyStep {
    Up,
    Down,
}

/// What a committed drop did on the browser side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropOutcome {
    pub subject: DragSubject,

    /// A move call was issued and succeeded.
    pub moved: bool,

    /// A group/ungroup call was issued and succeeded.
    pub regrouped: bool,

    /// Some browser call failed; the browser's view may now differ from ours.
    pub failed: bool,
}

#[derive(Debug)]
struct ActiveDrag {
    subject: DragSubject,
    node: NodeId,
    modality: DragModality,
    candidates: Vec<Candidate>,
    cursor: Option<usize>,
    last_pointer_y: Option<f32>,
    placeholder: NodeId,
    placeholder_at: Option<(NodeId, Side)>,
}

#[derive(Debug, Default)]
pub struct DragEngine {
    active: Option<ActiveDrag>,

    /// Half a rendered tab line, measured on the first drag.
    placeholder_height: Option<f32>,

    suppression: MoveSuppression,
}

fn subject_node(doc: &ListDocument, subject: DragSubject) -> Option<NodeId> {
    match subject {
        DragSubject::Tab(tab) => doc.tab_line(tab),
        DragSubject::Group(group) => doc.group_container(group),
    }
}

fn first_tab_index(doc: &ListDocument, container: NodeId) -> Option<usize> {
    doc.children(Some(container))
        .iter()
        .find_map(|&c| doc.line(c).map(|l| l.index))
}

impl DragEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn subject(&self) -> Option<DragSubject> {
        self.active.as_ref().map(|a| a.subject)
    }

    pub fn modality(&self) -> Option<DragModality> {
        self.active.as_ref().map(|a| a.modality)
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.active.as_ref().map_or(&[], |a| &a.candidates)
    }

    /// Highlighted candidate, if any.
    pub fn cursor(&self) -> Option<usize> {
        self.active.as_ref().and_then(|a| a.cursor)
    }

    pub fn placeholder(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.placeholder)
    }

    pub fn placeholder_height(&self) -> Option<f32> {
        self.placeholder_height
    }

    pub fn suppression(&self) -> &MoveSuppression {
        &self.suppression
    }

    pub(crate) fn suppression_mut(&mut self) -> &mut MoveSuppression {
        &mut self.suppression
    }

    /// Enter `Dragging`. Returns false if a drag is already active or the subject isn't shown.
    pub(crate) fn start(
        &mut self,
        doc: &mut ListDocument,
        subject: DragSubject,
        modality: DragModality,
    ) -> bool {
        if self.active.is_some() {
            log::debug!("drag of {subject:?} ignored: another drag is active");
            return false;
        }
        let Some(node) = subject_node(doc, subject) else {
            log::debug!("drag of {subject:?} ignored: not rendered");
            return false;
        };
        if doc.node(node).is_none_or(|n| n.flags.hidden) {
            return false;
        }
        if subject.is_group() && doc.children(Some(node)).is_empty() {
            return false;
        }

        if self.placeholder_height.is_none() {
            self.placeholder_height = doc
                .line_order()
                .into_iter()
                .filter_map(|id| doc.node(id))
                .map(|n| n.rect.height())
                .find(|&h| h > 0.0)
                .map(|h| h * 0.5);
        }

        let candidates = build_candidates(doc, node, subject.is_group());
        let cursor = current_position(doc, &candidates, node);

        let placeholder = doc.create_placeholder();
        doc.insert_after(node, placeholder);
        if let Some(flags) = doc.flags_mut(node) {
            flags.dragging = true;
        }

        let placeholder_at = match modality {
            DragModality::Keyboard => cursor.map(|i| (candidates[i].anchor, candidates[i].side)),
            DragModality::Pointer => None,
        };

        log::debug!(
            "drag start {subject:?} via {modality:?} with {} candidates",
            candidates.len()
        );
        self.active = Some(ActiveDrag {
            subject,
            node,
            modality,
            candidates,
            cursor,
            last_pointer_y: None,
            placeholder,
            placeholder_at,
        });
        true
    }

    fn move_placeholder(doc: &mut ListDocument, active: &mut ActiveDrag, anchor: NodeId, side: Side) -> bool {
        if active.placeholder_at == Some((anchor, side)) {
            return false;
        }
        match side {
            Side::Before => doc.insert_before(anchor, active.placeholder),
            Side::After => doc.insert_after(anchor, active.placeholder),
        }
        active.placeholder_at = Some((anchor, side));
        true
    }

    /// Pointer moved to viewport-space `pointer_y` with the list scrolled by `scroll_offset`.
    ///
    /// Returns whether the placeholder moved.
    pub(crate) fn pointer_moved(
        &mut self,
        doc: &mut ListDocument,
        pointer_y: f32,
        scroll_offset: f32,
        tuning: &EngineTuning,
    ) -> bool {
        let Some(active) = &mut self.active else {
            return false;
        };
        let y = pointer_y + scroll_offset;
        if active
            .last_pointer_y
            .is_some_and(|last| (y - last).abs() < tuning.pointer_move_threshold)
        {
            return false;
        }
        active.last_pointer_y = Some(y);

        let Some(i) = nearest(&active.candidates, y) else {
            return false;
        };
        let candidate = active.candidates[i];
        active.cursor = Some(i);
        let side = candidate.side_at(y, tuning.drop_zone_split);
        Self::move_placeholder(doc, active, candidate.anchor, side)
    }

    /// Arrow key while dragging by keyboard. Wraps around at both ends.
    pub(crate) fn step(&mut self, doc: &mut ListDocument, step: KeyStep) -> bool {
        let Some(active) = &mut self.active else {
            return false;
        };
        let len = active.candidates.len();
        if len == 0 {
            return false;
        }
        let next = match (active.cursor, step) {
            (None, KeyStep::Down) => 0,
            (None, KeyStep::Up) => len - 1,
            (Some(i), KeyStep::Down) => (i + 1) % len,
            (Some(i), KeyStep::Up) => (i + len - 1) % len,
        };
        active.cursor = Some(next);
        let candidate = active.candidates[next];
        Self::move_placeholder(doc, active, candidate.anchor, candidate.side)
    }

    /// Drop: move the dragged node where the placeholder is, then tell the browser.
    ///
    /// The visual drag state is reset no matter what the browser says.
    pub(crate) fn commit(&mut self, ctx: &mut RenderCtx<'_>) -> Option<DropOutcome> {
        let active = self.active.take()?;
        let doc = &mut *ctx.doc;

        // The dragged node hasn't moved yet and its index is current.
        let origin_index = match active.subject {
            DragSubject::Tab(_) => doc.line(active.node).map(|l| l.index),
            DragSubject::Group(_) => first_tab_index(doc, active.node),
        };
        let origin_group = doc.enclosing_group(active.node);

        match doc.slot(active.placeholder) {
            Slot::Detached => {}
            // A group can't nest; land before the group the placeholder ended up in.
            Slot::Group(container) if active.subject.is_group() => {
                doc.insert_before(container, active.node);
            }
            _ => doc.insert_before(active.placeholder, active.node),
        }
        doc.remove(active.placeholder);
        if let Some(flags) = doc.flags_mut(active.node) {
            flags.dragging = false;
        }
        ordering::reindex(doc);

        let mut outcome = DropOutcome {
            subject: active.subject,
            moved: false,
            regrouped: false,
            failed: false,
        };

        match active.subject {
            DragSubject::Group(group) => {
                let tabs: Vec<TabId> = doc
                    .children(Some(active.node))
                    .iter()
                    .filter_map(|&c| doc.tab_of(c))
                    .collect();
                let Some(first) = first_tab_index(doc, active.node) else {
                    return Some(outcome);
                };
                if Some(first) == origin_index {
                    log::debug!("group drop of {group} at its own position; nothing to do");
                    return Some(outcome);
                }

                self.suppression.suppress_group_move(
                    group,
                    tabs.iter().copied(),
                    ctx.now + ctx.tuning.group_move_suppression_expiry,
                );
                match ctx.browser.move_group(group, MoveTarget::index(first)) {
                    Ok(()) => outcome.moved = true,
                    Err(err) => {
                        log::warn!("moving {group} to {first} failed: {err}");
                        for tab in &tabs {
                            self.suppression.take_tab(*tab);
                        }
                        self.suppression.take_group(group);
                        outcome.failed = true;
                    }
                }
            }
            DragSubject::Tab(tab) => {
                let new_index = doc.line(active.node).map(|l| l.index);
                let new_group = doc.enclosing_group(active.node);

                if let Some(new_index) = new_index.filter(|&i| Some(i) != origin_index) {
                    self.suppression
                        .suppress_single_move(ctx.now + ctx.tuning.single_move_suppression);
                    match ctx.browser.move_tabs(&[tab], MoveTarget::index(new_index)) {
                        Ok(()) => outcome.moved = true,
                        Err(err) => {
                            log::warn!("moving {tab} to {new_index} failed: {err}");
                            outcome.failed = true;
                        }
                    }
                }

                if new_group != origin_group {
                    let result = match new_group {
                        Some(group) => ctx
                            .browser
                            .group_tabs(&[tab], GroupTarget::Existing(group))
                            .map(|_| ()),
                        None => ctx.browser.ungroup_tabs(&[tab]),
                    };
                    match result {
                        Ok(()) => outcome.regrouped = true,
                        Err(err) => {
                            log::warn!("regrouping {tab} into {new_group:?} failed: {err}");
                            outcome.failed = true;
                        }
                    }
                }
            }
        }

        Some(outcome)
    }

    /// Abort the gesture: no browser calls, the dragged node is left where it was.
    ///
    /// A gesture only registers move suppressions when it commits, so there is nothing of its
    /// own to drop here. Markers left by earlier commits run out on their own deadlines.
    pub(crate) fn cancel(&mut self, doc: &mut ListDocument) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        doc.remove(active.placeholder);
        if let Some(flags) = doc.flags_mut(active.node) {
            flags.dragging = false;
        }
        log::debug!("drag of {:?} cancelled", active.subject);
        true
    }

    /// The document changed under an active drag (browser events). Rebuild candidates, or cancel
    /// if the dragged element is gone.
    ///
    /// `relayout` runs with the placeholder taken out, so the rebuilt candidates are measured
    /// the same way as at gesture start.
    pub(crate) fn on_structure_changed(
        &mut self,
        doc: &mut ListDocument,
        relayout: impl FnOnce(&mut ListDocument),
    ) {
        let Some(active) = &mut self.active else {
            return;
        };
        let alive = subject_node(doc, active.subject) == Some(active.node);
        if !alive {
            log::debug!("dragged {:?} disappeared; cancelling", active.subject);
            self.cancel(doc);
            return;
        }

        if !doc.contains(active.placeholder) {
            active.placeholder = doc.create_placeholder();
        }
        if doc.slot(active.placeholder) == Slot::Detached {
            doc.insert_after(active.node, active.placeholder);
            active.placeholder_at = None;
        }

        // Candidates must not see the placeholder's current spot as an element.
        let placeholder = active.placeholder;
        doc.detach(placeholder);
        relayout(doc);
        active.candidates = build_candidates(doc, active.node, active.subject.is_group());
        match active.placeholder_at {
            Some((anchor, side)) if doc.contains(anchor) && doc.slot(anchor) != Slot::Detached => {
                match side {
                    Side::Before => doc.insert_before(anchor, placeholder),
                    Side::After => doc.insert_after(anchor, placeholder),
                }
                active.cursor = active
                    .candidates
                    .iter()
                    .position(|c| c.anchor == anchor && c.side == side);
            }
            _ => {
                doc.insert_after(active.node, placeholder);
                active.placeholder_at = None;
                active.cursor = current_position(doc, &active.candidates, active.node);
            }
        }
    }
}
