use egui::Rect;

use crate::document::{ListDocument, NodeId, NodeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Side {
    Before,
    After,
}

/// How a pointer hovering a candidate picks a side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolve {
    /// Split the anchor's rect at the configured fraction from the top.
    Split,

    /// Always use the candidate's own side (group boundaries, end of list).
    Fixed,
}

/// A precomputed place the dragged element may land.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub anchor: NodeId,
    pub side: Side,
    pub y: f32,
    pub anchor_rect: Rect,
    pub resolve: Resolve,
}

impl Candidate {
    fn split(anchor: NodeId, rect: Rect) -> Self {
        Self {
            anchor,
            side: Side::Before,
            y: rect.center().y,
            anchor_rect: rect,
            resolve: Resolve::Split,
        }
    }

    fn fixed(anchor: NodeId, side: Side, y: f32, rect: Rect) -> Self {
        Self {
            anchor,
            side,
            y,
            anchor_rect: rect,
            resolve: Resolve::Fixed,
        }
    }

    /// Side for a pointer at document-space `y`.
    pub fn side_at(&self, y: f32, split_fraction: f32) -> Side {
        match self.resolve {
            Resolve::Fixed => self.side,
            Resolve::Split => {
                let split_y = self.anchor_rect.min.y + self.anchor_rect.height() * split_fraction;
                if y < split_y { Side::Before } else { Side::After }
            }
        }
    }
}

/// Scan the list once and collect every place the dragged node may land, top to bottom.
///
/// Groups dragging only see root-level positions. A dragged tab additionally sees every position
/// inside expanded groups, plus the boundaries of those groups as a whole.
pub(crate) fn build_candidates(
    doc: &ListDocument,
    dragged: NodeId,
    dragging_group: bool,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut last_root: Option<(NodeId, Rect)> = None;

    for &item in doc.children(None) {
        if item == dragged {
            continue;
        }
        let Some(node) = doc.node(item) else {
            continue;
        };
        if node.flags.hidden {
            continue;
        }

        match &node.kind {
            NodeKind::Placeholder => continue,
            NodeKind::TabLine(_) => out.push(Candidate::split(item, node.rect)),
            NodeKind::Group(group) => {
                let children: Vec<(NodeId, Rect)> = group
                    .children()
                    .iter()
                    .filter(|&&c| c != dragged)
                    .filter_map(|&c| {
                        let child = doc.node(c)?;
                        (child.as_line().is_some() && !child.flags.hidden).then_some((c, child.rect))
                    })
                    .collect();

                if dragging_group || group.collapsed || children.is_empty() {
                    out.push(Candidate::split(item, group.header_rect));
                } else {
                    let header = group.header_rect;
                    out.push(Candidate::fixed(item, Side::Before, header.center().y, header));
                    for &(child, rect) in &children {
                        out.push(Candidate::split(child, rect));
                    }
                    if let Some(&(last_child, rect)) = children.last() {
                        out.push(Candidate::fixed(last_child, Side::After, rect.max.y, rect));
                    }
                    // Slightly below the content so a pointer can still pick "after the group".
                    let below = node.rect.max.y + header.height() * 0.5;
                    out.push(Candidate::fixed(item, Side::After, below, node.rect));
                }
            }
        }
        last_root = Some((item, node.rect));
    }

    if let Some((last, rect)) = last_root {
        let already_after = out
            .last()
            .is_some_and(|c| c.anchor == last && c.side == Side::After);
        if !already_after {
            out.push(Candidate::fixed(last, Side::After, rect.max.y, rect));
        }
    }

    out
}

/// Nearest candidate to `y` by vertical distance. Ties go to the earlier candidate.
pub(crate) fn nearest(candidates: &[Candidate], y: f32) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1.y - y).abs().total_cmp(&(b.1.y - y).abs()))
        .map(|(i, _)| i)
}

/// Index of the candidate that stands for the dragged node's current position.
///
/// Siblings without candidates (hidden lines, the placeholder) are skipped: the position is
/// "before" the next sibling that has one, or else "after" the previous one. `None` when the
/// dragged node has no visible siblings.
pub(crate) fn current_position(doc: &ListDocument, candidates: &[Candidate], dragged: NodeId) -> Option<usize> {
    let siblings = match doc.slot(dragged) {
        crate::document::Slot::Group(parent) => doc.children(Some(parent)),
        _ => doc.children(None),
    };
    let pos = siblings.iter().position(|&c| c == dragged)?;
    let find = |anchor: NodeId, side: Side| {
        candidates
            .iter()
            .position(|c| c.anchor == anchor && c.side == side)
    };

    siblings[pos + 1..]
        .iter()
        .find_map(|&next| find(next, Side::Before))
        .or_else(|| {
            siblings[..pos]
                .iter()
                .rev()
                .find_map(|&prev| find(prev, Side::After))
        })
}

#[cfg(test)]
mod tests {
    use egui::Pos2;

    use super::*;
    use crate::document::{LayoutMetrics, TabLine, layout};
    use crate::model::{GroupId, TabId};

    const METRICS: LayoutMetrics = LayoutMetrics {
        width: 100.0,
        line_height: 40.0,
        compact_line_height: 20.0,
        header_height: 30.0,
        placeholder_height: 20.0,
    };

    fn line(doc: &mut ListDocument, tab: u32) -> NodeId {
        doc.create_line(TabLine {
            tab_id: Some(TabId(tab)),
            ..Default::default()
        })
    }

    /// a, [g: b, c], d
    fn sample() -> (ListDocument, [NodeId; 5]) {
        let mut doc = ListDocument::new();
        let a = line(&mut doc, 1);
        let g = doc.create_group(GroupId(1));
        let b = line(&mut doc, 2);
        let c = line(&mut doc, 3);
        let d = line(&mut doc, 4);
        doc.append(None, a);
        doc.append(None, g);
        doc.append(Some(g), b);
        doc.append(Some(g), c);
        doc.append(None, d);
        layout(&mut doc, Pos2::ZERO, &METRICS);
        (doc, [a, g, b, c, d])
    }

    #[test]
    fn tab_drag_sees_inside_expanded_groups() {
        let (doc, [a, g, b, c, d]) = sample();
        let candidates = build_candidates(&doc, a, false);
        let anchors: Vec<(NodeId, Side)> = candidates.iter().map(|c| (c.anchor, c.side)).collect();
        assert_eq!(
            anchors,
            [
                (g, Side::Before),
                (b, Side::Before),
                (c, Side::Before),
                (c, Side::After),
                (g, Side::After),
                (d, Side::Before),
                (d, Side::After),
            ]
        );
    }

    #[test]
    fn group_drag_only_sees_root_positions() {
        let (doc, [a, g, _b, _c, d]) = sample();
        let candidates = build_candidates(&doc, g, true);
        let anchors: Vec<NodeId> = candidates.iter().map(|c| c.anchor).collect();
        assert_eq!(anchors, [a, d, d]);
    }

    #[test]
    fn split_is_biased_towards_after() {
        let (doc, [a, _g, _b, _c, d]) = sample();
        let candidates = build_candidates(&doc, a, false);
        let i = candidates
            .iter()
            .position(|c| c.anchor == d && c.resolve == Resolve::Split)
            .unwrap();
        let rect = candidates[i].anchor_rect;
        assert_eq!(candidates[i].side_at(rect.min.y + 5.0, 0.2), Side::Before);
        assert_eq!(candidates[i].side_at(rect.min.y + 12.0, 0.2), Side::After);
        assert_eq!(candidates[i].side_at(rect.center().y, 0.2), Side::After);
    }

    #[test]
    fn current_position_of_last_in_group() {
        let (doc, [_a, _g, b, c, _d]) = sample();
        let candidates = build_candidates(&doc, c, false);
        let i = current_position(&doc, &candidates, c).unwrap();
        assert_eq!((candidates[i].anchor, candidates[i].side), (b, Side::After));
    }

    #[test]
    fn current_position_skips_hidden_neighbours() {
        // a, b, hidden, d
        let mut doc = ListDocument::new();
        let nodes = [1, 2, 3, 4].map(|tab| line(&mut doc, tab));
        for &n in &nodes {
            doc.append(None, n);
        }
        if let Some(flags) = doc.flags_mut(nodes[2]) {
            flags.hidden = true;
        }
        layout(&mut doc, Pos2::ZERO, &METRICS);

        let candidates = build_candidates(&doc, nodes[1], false);
        let i = current_position(&doc, &candidates, nodes[1]).unwrap();
        assert_eq!((candidates[i].anchor, candidates[i].side), (nodes[3], Side::Before));
        assert_eq!(i, 1);

        // Last visible line, with a hidden line after it: "after" the one before.
        let candidates = build_candidates(&doc, nodes[3], false);
        let i = current_position(&doc, &candidates, nodes[3]).unwrap();
        assert_eq!((candidates[i].anchor, candidates[i].side), (nodes[1], Side::After));
    }

    #[test]
    fn nearest_prefers_first_on_ties() {
        let (doc, [a, ..]) = sample();
        let candidates = build_candidates(&doc, a, false);
        let i = nearest(&candidates, -100.0).unwrap();
        assert_eq!(i, 0);
    }
}
