use std::hash::{Hash as _, Hasher as _};

use ahash::{HashMap, HashSet};

use crate::document::{ListDocument, NodeId, NodeKind, Slot};
use crate::model::{TabId, TabRecord};

/// Structural problems in `doc`, checked against the authoritative tab records.
///
/// Empty means the index and group-membership invariants hold.
pub fn document_issues(doc: &ListDocument, records: &HashMap<TabId, TabRecord>) -> Vec<String> {
    let mut issues: Vec<String> = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::default();

    let mut check_children = |parent: Option<NodeId>, issues: &mut Vec<String>| {
        let expected = parent.map_or(Slot::Root, Slot::Group);
        for &child in doc.children(parent) {
            if !seen.insert(child) {
                issues.push(format!("integrity: {child:?} listed twice (parent {parent:?})"));
            }
            let Some(node) = doc.node(child) else {
                issues.push(format!("integrity: parent {parent:?} references missing {child:?}"));
                continue;
            };
            if node.slot() != expected {
                issues.push(format!(
                    "integrity: {child:?} has slot {:?} but is listed under {parent:?}",
                    node.slot()
                ));
            }
            if parent.is_some() && matches!(node.kind, NodeKind::Group(_)) {
                issues.push(format!("integrity: group {child:?} nested in {parent:?}"));
            }
        }
    };

    check_children(None, &mut issues);
    for &item in doc.children(None) {
        if doc.group(item).is_some() {
            check_children(Some(item), &mut issues);
        }
    }

    for (position, line) in doc.line_order().into_iter().enumerate() {
        let Some(tab_line) = doc.line(line) else {
            continue;
        };
        if tab_line.index != position {
            issues.push(format!(
                "integrity: line {line:?} has index {} at position {position}",
                tab_line.index
            ));
        }
        let Some(tab) = tab_line.tab_id else {
            continue;
        };
        if let Some(record) = records.get(&tab) {
            let rendered = doc.enclosing_group(line);
            if rendered != record.group_id {
                issues.push(format!(
                    "integrity: {tab} rendered in {rendered:?} but belongs to {:?}",
                    record.group_id
                ));
            }
        }
    }

    for (tab, line) in doc.live_lines() {
        if doc.slot(line) == Slot::Detached {
            issues.push(format!("integrity: line of {tab} is detached"));
        }
    }

    for &item in doc.children(None) {
        if let Some(group) = doc.group(item) {
            if group.children().is_empty() {
                issues.push(format!("integrity: container of {} is empty", group.group_id));
            }
        }
    }

    issues
}

pub(crate) fn hash_issues(lines: &[String]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for line in lines {
        line.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TabLine;
    use crate::model::{GroupId, WindowId};
    use crate::ordering::reindex;

    #[test]
    fn reports_membership_and_index_drift() {
        let mut doc = ListDocument::new();
        let a = doc.create_line(TabLine {
            tab_id: Some(TabId(1)),
            ..Default::default()
        });
        let b = doc.create_line(TabLine {
            tab_id: Some(TabId(2)),
            ..Default::default()
        });
        doc.append(None, a);
        doc.append(None, b);
        reindex(&mut doc);

        let mut records = HashMap::default();
        records.insert(TabId(1), TabRecord::new(TabId(1), WindowId(1), 0, "https://a/"));
        records.insert(TabId(2), TabRecord::new(TabId(2), WindowId(1), 1, "https://b/"));
        assert!(document_issues(&doc, &records).is_empty());

        records.insert(
            TabId(2),
            TabRecord::new(TabId(2), WindowId(1), 1, "https://b/").in_group(GroupId(5)),
        );
        if let Some(line) = doc.line_mut(a) {
            line.index = 7;
        }
        let issues = document_issues(&doc, &records);
        assert_eq!(issues.len(), 2, "{issues:#?}");
        assert_ne!(hash_issues(&issues), hash_issues(&[]));
    }
}
