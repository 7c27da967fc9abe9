use ahash::HashSet;

use crate::model::{GroupId, TabId};

/// Markers for browser "moved" events that are echoes of our own drag commits.
#[derive(Debug, Default)]
pub struct MoveSuppression {
    /// Tabs of a dragged group; each swallows exactly one moved event.
    tabs: HashSet<TabId>,

    /// The dragged group itself; swallows one group-moved event.
    group: Option<GroupId>,

    /// When unconsumed group entries are dropped.
    tabs_expire_at: Option<f64>,

    /// While set and in the future, every moved event is ignored.
    single_until: Option<f64>,
}

impl MoveSuppression {
    pub(crate) fn suppress_group_move(
        &mut self,
        group: GroupId,
        tabs: impl IntoIterator<Item = TabId>,
        expire_at: f64,
    ) {
        self.tabs.extend(tabs);
        self.group = Some(group);
        self.tabs_expire_at = Some(expire_at);
    }

    pub(crate) fn suppress_single_move(&mut self, until: f64) {
        self.single_until = Some(until);
    }

    /// Swallow one moved event for `tab` if it is an expected echo.
    pub fn take_tab(&mut self, tab: TabId) -> bool {
        self.tabs.remove(&tab)
    }

    pub fn take_group(&mut self, group: GroupId) -> bool {
        if self.group == Some(group) {
            self.group = None;
            true
        } else {
            false
        }
    }

    pub fn single_move_active(&self, now: f64) -> bool {
        self.single_until.is_some_and(|until| now < until)
    }

    pub fn is_tab_suppressed(&self, tab: TabId) -> bool {
        self.tabs.contains(&tab)
    }

    pub fn pending_tabs(&self) -> usize {
        self.tabs.len()
    }

    /// Drop markers whose time is up.
    pub(crate) fn expire(&mut self, now: f64) {
        if self.single_until.is_some_and(|until| now >= until) {
            self.single_until = None;
        }
        if self.tabs_expire_at.is_some_and(|at| now >= at) {
            if !self.tabs.is_empty() {
                log::debug!("dropping {} unconsumed move suppressions", self.tabs.len());
            }
            self.tabs.clear();
            self.group = None;
            self.tabs_expire_at = None;
        }
    }

    /// Next deadline `expire` cares about.
    pub(crate) fn next_deadline(&self) -> Option<f64> {
        match (self.single_until, self.tabs_expire_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
