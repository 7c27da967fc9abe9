//! Canonical position indices, recomputed from document order.

use crate::document::{ListDocument, NodeKind};
use crate::model::TabId;

/// Write the position index of every attached tab line in document order, and keep every group
/// header keyboard-focusable.
///
/// Idempotent; call it after any structural change. Returns the resulting `(tab, index)` pairs
/// in order, which is what the browser needs to see.
pub fn reindex(doc: &mut ListDocument) -> Vec<(TabId, usize)> {
    let order = doc.document_order();
    let mut out = Vec::with_capacity(order.len());
    let mut index = 0;

    for id in order {
        let Some(node) = doc.node_mut(id) else {
            continue;
        };
        match &mut node.kind {
            NodeKind::TabLine(line) => {
                line.index = index;
                if let Some(tab) = line.tab_id {
                    out.push((tab, index));
                }
                index += 1;
            }
            NodeKind::Group(_) => node.flags.focusable = true,
            NodeKind::Placeholder => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NodeId, TabLine};
    use crate::model::GroupId;

    struct Rng(u64);

    impl Rng {
        fn next(&mut self, upper: usize) -> usize {
            // Simple LCG: deterministic, fast, no dependency.
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005u64)
                .wrapping_add(1442695040888963407u64);
            ((self.0 >> 33) as usize) % upper.max(1)
        }
    }

    fn new_line(doc: &mut ListDocument, tab: u32) -> NodeId {
        doc.create_line(TabLine {
            tab_id: Some(TabId(tab)),
            index: 999,
            ..Default::default()
        })
    }

    #[test]
    fn indices_follow_document_order_after_random_edits() {
        let mut rng = Rng(0xD0C3);
        let mut doc = ListDocument::new();
        let groups = [doc.create_group(GroupId(1)), doc.create_group(GroupId(2))];
        for &g in &groups {
            doc.append(None, g);
        }
        let mut next_tab = 0;

        for _ in 0..300 {
            let attached = doc.line_order();
            match rng.next(4) {
                0 => {
                    let line = new_line(&mut doc, next_tab);
                    next_tab += 1;
                    let parent = [None, Some(groups[0]), Some(groups[1])][rng.next(3)];
                    doc.append(parent, line);
                }
                1 if !attached.is_empty() => {
                    let line = new_line(&mut doc, next_tab);
                    next_tab += 1;
                    doc.insert_before(attached[rng.next(attached.len())], line);
                }
                2 if !attached.is_empty() => {
                    doc.remove(attached[rng.next(attached.len())]);
                }
                _ if attached.len() > 1 => {
                    let a = attached[rng.next(attached.len())];
                    let b = attached[rng.next(attached.len())];
                    doc.insert_after(a, b);
                }
                _ => {}
            }

            let pairs = reindex(&mut doc);
            for (expected, id) in doc.line_order().into_iter().enumerate() {
                assert_eq!(doc.line(id).unwrap().index, expected);
            }
            assert!(pairs.iter().enumerate().all(|(i, &(_, index))| i == index));
        }
    }

    #[test]
    fn reindex_is_idempotent_and_restores_header_focus() {
        let mut doc = ListDocument::new();
        let g = doc.create_group(GroupId(1));
        doc.append(None, g);
        let a = new_line(&mut doc, 1);
        doc.append(Some(g), a);
        doc.flags_mut(g).unwrap().focusable = false;

        let first = reindex(&mut doc);
        let second = reindex(&mut doc);
        assert_eq!(first, second);
        assert!(doc.node(g).unwrap().flags.focusable);
    }
}
