use std::fmt::Write as _;

use super::TabBoard;
use crate::browser::BrowserSession;
use crate::integrity;
use crate::selection::DialogHost;
use crate::store::KeyValueStore;

impl<B, K, D> TabBoard<B, K, D>
where
    B: BrowserSession,
    K: KeyValueStore,
    D: DialogHost,
{
    pub(super) fn debug_log_event(&mut self, message: impl Into<String>) {
        if !self.tuning.debug_event_log {
            return;
        }
        self.push_debug_log_line(message.into());
    }

    fn debug_integrity_log_event(&mut self, message: impl Into<String>) {
        if !self.tuning.debug_integrity {
            return;
        }
        self.push_debug_log_line(message.into());
    }

    fn push_debug_log_line(&mut self, message: String) {
        let cap = self.tuning.debug_event_log_capacity.clamp(1, 10_000);
        while self.debug_log.len() >= cap {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(format!("[t={:.3}] {message}", self.now));
    }

    /// Recorded decisions, oldest first, one per line.
    pub fn debug_log_text(&self) -> String {
        self.debug_log
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn debug_log_clear(&mut self) {
        self.debug_log.clear();
    }

    /// Current integrity issues of the rendered document.
    pub fn integrity_issues(&self) -> Vec<String> {
        integrity::document_issues(&self.doc, &self.records)
    }

    pub(super) fn debug_check_integrity(&mut self, reason: &str) {
        let issues = self.integrity_issues();
        let hash = integrity::hash_issues(&issues);
        let prev = std::mem::replace(&mut self.debug_last_integrity_hash, hash);
        if prev == hash {
            return;
        }

        if issues.is_empty() {
            self.debug_integrity_log_event(format!("integrity OK after {reason}"));
            return;
        }

        log::warn!("integrity FAIL after {reason}: {} issue(s)", issues.len());
        self.debug_integrity_log_event(format!(
            "integrity FAIL after {reason} issues={}",
            issues.len()
        ));
        for issue in &issues {
            self.debug_integrity_log_event(issue.clone());
        }
        let summary = self.debug_document_summary(48);
        self.debug_integrity_log_event(format!("integrity document_summary:\n{summary}"));

        if self.tuning.debug_integrity_panic && cfg!(debug_assertions) {
            panic!(
                "tabboard integrity failure after {reason}\n{}",
                issues.join("\n")
            );
        }
    }

    /// Short textual dump of the root list, for copy-paste debugging.
    pub fn debug_document_summary(&self, max_nodes: usize) -> String {
        let doc = &self.doc;
        let mut out = String::new();
        let mut written = 0;
        for &item in doc.children(None) {
            if written >= max_nodes {
                out.push_str("...\n");
                break;
            }
            written += 1;
            if let Some(group) = doc.group(item) {
                let _ = writeln!(
                    out,
                    "{item:?} {} {:?} collapsed={} children={}",
                    group.group_id,
                    group.title,
                    group.collapsed,
                    group.children().len()
                );
                for &child in group.children() {
                    if let Some(line) = doc.line(child) {
                        let _ = writeln!(out, "  {child:?} {:?} index={}", line.tab_id, line.index);
                    }
                }
            } else if let Some(line) = doc.line(item) {
                let _ = writeln!(out, "{item:?} {:?} index={}", line.tab_id, line.index);
            } else {
                let _ = writeln!(out, "{item:?} placeholder");
            }
        }
        out
    }
}
