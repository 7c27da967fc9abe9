use egui::{Pos2, Rect, Vec2};

use super::{ListDocument, NodeId, NodeKind};

/// Sizes used to lay the list out top to bottom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutMetrics {
    pub width: f32,
    pub line_height: f32,
    pub compact_line_height: f32,
    pub header_height: f32,
    pub placeholder_height: f32,
}

fn node_height(doc: &ListDocument, id: NodeId, metrics: &LayoutMetrics) -> f32 {
    let Some(node) = doc.node(id) else {
        return 0.0;
    };
    if node.flags.hidden {
        return 0.0;
    }
    match &node.kind {
        NodeKind::TabLine(_) => {
            if node.flags.compact {
                metrics.compact_line_height
            } else {
                metrics.line_height
            }
        }
        NodeKind::Placeholder => metrics.placeholder_height,
        NodeKind::Group(group) => {
            let natural = natural_content_height(doc, id, metrics);
            let visible = if group.collapsed {
                group.content_max_height.unwrap_or(0.0).min(natural)
            } else {
                natural
            };
            metrics.header_height + visible
        }
    }
}

/// The height a group's content would take with no max-height applied.
pub fn natural_content_height(doc: &ListDocument, group: NodeId, metrics: &LayoutMetrics) -> f32 {
    doc.children(Some(group))
        .iter()
        .map(|&child| node_height(doc, child, metrics))
        .sum()
}

/// Assign a rect to every attached node, starting at `origin`.
///
/// Lines inside a folded group get a zero-height rect at the top of the content. The max-height of
/// an expanded group is only a transition target and never clips.
pub fn layout(doc: &mut ListDocument, origin: Pos2, metrics: &LayoutMetrics) {
    let mut y = origin.y;
    let root: Vec<NodeId> = doc.root.clone();

    for id in root {
        let height = node_height(doc, id, metrics);
        let rect = Rect::from_min_size(Pos2::new(origin.x, y), Vec2::new(metrics.width, height));

        let content = if let Some(group) = doc.group(id) {
            let natural = natural_content_height(doc, id, metrics);
            Some((group.children().to_vec(), natural))
        } else {
            None
        };

        if let Some((children, natural)) = content {
            let header_rect = Rect::from_min_size(
                rect.min,
                Vec2::new(metrics.width, metrics.header_height.min(height)),
            );
            let content_top = header_rect.max.y;
            let mut child_y = content_top;
            for child in children {
                let child_height = node_height(doc, child, metrics);
                let visible_bottom = rect.max.y;
                let top = child_y.min(visible_bottom);
                let bottom = (child_y + child_height).min(visible_bottom);
                if let Some(node) = doc.node_mut(child) {
                    node.rect = Rect::from_min_max(
                        Pos2::new(origin.x, top),
                        Pos2::new(origin.x + metrics.width, bottom),
                    );
                }
                child_y += child_height;
            }
            if let Some(group) = doc.group_mut(id) {
                group.header_rect = header_rect;
                group.content_scroll_height = natural;
            }
        }

        if let Some(node) = doc.node_mut(id) {
            node.rect = rect;
        }
        y += height;
    }

    doc.content_height = y - origin.y;
}
