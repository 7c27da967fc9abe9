//! The rendered list: an arena of tab lines, group containers and the drag placeholder.
//!
//! This is a projection of the session, never its source of truth. Records live in the board's
//! id-keyed indices; the only state read back out of here is structure (who is where) and the
//! per-line position index written by [`crate::ordering::reindex`].

use ahash::HashMap;
use egui::Rect;
use serde::Serialize;

use crate::color::GroupPaint;
use crate::model::{GroupId, TabId};

mod layout;

pub use layout::{LayoutMetrics, layout, natural_content_height};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u32);

/// Where a node currently hangs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Detached,
    Root,
    Group(NodeId),
}

/// Presentation-only flags. Never canonical state: they are derived from the engines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeFlags {
    pub hidden: bool,
    pub selected: bool,
    pub dragging: bool,
    pub loading: bool,
    pub full_title: bool,
    pub full_url: bool,
    pub compact: bool,

    /// Reachable by keyboard tab-navigation (`tabindex` 0 vs -1).
    pub focusable: bool,
}

/// The visible projection of one tab.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TabLine {
    pub tab_id: Option<TabId>,

    /// Position index as last written by the ordering utility.
    pub index: usize,

    pub title: String,
    pub url: String,
    pub favicon: String,
    pub pinned: bool,
    pub audible: bool,
    pub muted: bool,
    pub discarded: bool,
    pub frozen: bool,
    pub is_self: bool,

    /// Human readable "last accessed" text.
    pub last_accessed: String,
}

/// The visible projection of one group: a header plus a content element.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupContainer {
    pub group_id: GroupId,
    pub title: String,
    #[serde(skip)]
    pub paint: Option<GroupPaint>,
    pub tab_count: Option<usize>,

    /// Visual fold state of the header.
    pub collapsed: bool,

    /// `None` means "no explicit limit" (never folded yet).
    pub content_max_height: Option<f32>,

    /// Natural height of the content, measured by the last layout pass.
    pub content_scroll_height: f32,

    #[serde(skip)]
    pub header_rect: Rect,

    children: Vec<NodeId>,
}

impl GroupContainer {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            title: String::new(),
            paint: None,
            tab_count: None,
            collapsed: false,
            content_max_height: None,
            content_scroll_height: 0.0,
            header_rect: Rect::NOTHING,
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    TabLine(TabLine),
    Group(GroupContainer),
    Placeholder,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub flags: NodeFlags,
    pub rect: Rect,
    slot: Slot,
}

impl Node {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn as_line(&self) -> Option<&TabLine> {
        match &self.kind {
            NodeKind::TabLine(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupContainer> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ListDocument {
    nodes: Vec<Option<Node>>,
    root: Vec<NodeId>,
    lines_by_tab: HashMap<TabId, NodeId>,
    groups_by_id: HashMap<GroupId, NodeId>,
    content_height: f32,
}

impl ListDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every node. Ids handed out before are invalid afterwards.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root.clear();
        self.lines_by_tab.clear();
        self.groups_by_id.clear();
        self.content_height = 0.0;
    }

    fn insert_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            kind,
            flags: NodeFlags {
                focusable: true,
                ..Default::default()
            },
            rect: Rect::NOTHING,
            slot: Slot::Detached,
        }));
        id
    }

    /// Create a detached tab line.
    pub fn create_line(&mut self, line: TabLine) -> NodeId {
        let tab_id = line.tab_id;
        let id = self.insert_node(NodeKind::TabLine(line));
        if let Some(tab_id) = tab_id {
            self.lines_by_tab.insert(tab_id, id);
        }
        id
    }

    /// Create a detached, empty group container.
    pub fn create_group(&mut self, group_id: GroupId) -> NodeId {
        let id = self.insert_node(NodeKind::Group(GroupContainer::new(group_id)));
        self.groups_by_id.insert(group_id, id);
        id
    }

    pub fn create_placeholder(&mut self) -> NodeId {
        self.insert_node(NodeKind::Placeholder)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn line(&self, id: NodeId) -> Option<&TabLine> {
        self.node(id)?.as_line()
    }

    pub fn line_mut(&mut self, id: NodeId) -> Option<&mut TabLine> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::TabLine(line) => Some(line),
            _ => None,
        }
    }

    pub fn group(&self, id: NodeId) -> Option<&GroupContainer> {
        self.node(id)?.as_group()
    }

    pub fn group_mut(&mut self, id: NodeId) -> Option<&mut GroupContainer> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn flags_mut(&mut self, id: NodeId) -> Option<&mut NodeFlags> {
        self.node_mut(id).map(|node| &mut node.flags)
    }

    pub fn tab_line(&self, tab: TabId) -> Option<NodeId> {
        self.lines_by_tab.get(&tab).copied()
    }

    pub fn group_container(&self, group: GroupId) -> Option<NodeId> {
        self.groups_by_id.get(&group).copied()
    }

    pub fn tab_of(&self, id: NodeId) -> Option<TabId> {
        self.line(id)?.tab_id
    }

    pub fn group_of_container(&self, id: NodeId) -> Option<GroupId> {
        self.group(id).map(|g| g.group_id)
    }

    pub fn slot(&self, id: NodeId) -> Slot {
        self.node(id).map_or(Slot::Detached, |n| n.slot)
    }

    /// The group whose content holds `id`, if any.
    pub fn enclosing_group(&self, id: NodeId) -> Option<GroupId> {
        match self.slot(id) {
            Slot::Group(container) => self.group_of_container(container),
            Slot::Root | Slot::Detached => None,
        }
    }

    /// Children of the root list (`None`) or of a group's content.
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.root,
            Some(parent) => self.group(parent).map_or(&[], |g| g.children()),
        }
    }

    fn children_mut(&mut self, slot: Slot) -> Option<&mut Vec<NodeId>> {
        match slot {
            Slot::Detached => None,
            Slot::Root => Some(&mut self.root),
            Slot::Group(parent) => self.group_mut(parent).map(|g| &mut g.children),
        }
    }

    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let siblings = match self.slot(id) {
            Slot::Detached => return None,
            Slot::Root => &self.root[..],
            Slot::Group(parent) => self.group(parent)?.children(),
        };
        siblings.iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = match self.slot(id) {
            Slot::Detached => return None,
            Slot::Root => None,
            Slot::Group(parent) => Some(parent),
        };
        let pos = self.position_in_parent(id)?;
        self.children(parent).get(pos + 1).copied()
    }

    /// Unhook `id` from its parent. The node stays alive.
    pub fn detach(&mut self, id: NodeId) {
        let slot = self.slot(id);
        if let Some(siblings) = self.children_mut(slot) {
            siblings.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.slot = Slot::Detached;
        }
    }

    fn attach_at(&mut self, slot: Slot, position: Option<usize>, id: NodeId) {
        debug_assert!(
            !matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Group(_)))
                || slot == Slot::Root,
            "groups can only live in the root list"
        );
        self.detach(id);
        let Some(siblings) = self.children_mut(slot) else {
            return;
        };
        match position {
            Some(pos) if pos <= siblings.len() => siblings.insert(pos, id),
            _ => siblings.push(id),
        }
        if let Some(node) = self.node_mut(id) {
            node.slot = slot;
        }
    }

    /// Append to the root list (`None`) or to a group's content.
    pub fn append(&mut self, parent: Option<NodeId>, id: NodeId) {
        let slot = parent.map_or(Slot::Root, Slot::Group);
        self.attach_at(slot, None, id);
    }

    pub fn prepend(&mut self, parent: Option<NodeId>, id: NodeId) {
        let slot = parent.map_or(Slot::Root, Slot::Group);
        self.attach_at(slot, Some(0), id);
    }

    /// Insert `id` right before `reference`, in `reference`'s parent.
    pub fn insert_before(&mut self, reference: NodeId, id: NodeId) {
        if reference == id {
            return;
        }
        self.detach(id);
        let slot = self.slot(reference);
        let position = self.position_in_parent(reference);
        self.attach_at(slot, position, id);
    }

    /// Insert `id` right after `reference`, in `reference`'s parent.
    pub fn insert_after(&mut self, reference: NodeId, id: NodeId) {
        if reference == id {
            return;
        }
        self.detach(id);
        let slot = self.slot(reference);
        let position = self.position_in_parent(reference).map(|p| p + 1);
        self.attach_at(slot, position, id);
    }

    /// Destroy `id` (and a group's content).
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        match node.kind {
            NodeKind::TabLine(line) => {
                if let Some(tab) = line.tab_id {
                    if self.lines_by_tab.get(&tab) == Some(&id) {
                        self.lines_by_tab.remove(&tab);
                    }
                }
            }
            NodeKind::Group(group) => {
                if self.groups_by_id.get(&group.group_id) == Some(&id) {
                    self.groups_by_id.remove(&group.group_id);
                }
                for child in group.children {
                    if let Some(child_node) = self.node_mut(child) {
                        child_node.slot = Slot::Detached;
                    }
                    self.remove(child);
                }
            }
            NodeKind::Placeholder => {}
        }
    }

    /// Every attached node, in document order (a group precedes its content).
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &id in &self.root {
            out.push(id);
            if let Some(group) = self.group(id) {
                out.extend_from_slice(group.children());
            }
        }
        out
    }

    /// Attached tab lines, in document order.
    pub fn line_order(&self) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|&id| self.line(id).is_some())
            .collect()
    }

    /// Tab ids of attached lines, in document order.
    pub fn tab_order(&self) -> Vec<TabId> {
        self.line_order()
            .into_iter()
            .filter_map(|id| self.tab_of(id))
            .collect()
    }

    /// True if `a` comes before `b` in document order.
    pub fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        let order = self.document_order();
        let pos = |x| order.iter().position(|&n| n == x);
        matches!((pos(a), pos(b)), (Some(a), Some(b)) if a < b)
    }

    /// Root-level groups, in document order.
    pub fn group_order(&self) -> Vec<GroupId> {
        self.root
            .iter()
            .filter_map(|&id| self.group_of_container(id))
            .collect()
    }

    /// Total laid-out height of the list.
    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn live_lines(&self) -> impl Iterator<Item = (TabId, NodeId)> + '_ {
        self.lines_by_tab.iter().map(|(&t, &n)| (t, n))
    }
}
