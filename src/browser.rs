//! The host browser session, seen from the board.
//!
//! Every call is a request/response: the host performs it (possibly asynchronously on its side)
//! and hands back a result. Events flow the other way through [`BrowserEvent`].

use crate::model::{
    GroupColor, GroupId, GroupRecord, TabChange, TabId, TabRecord, WindowId, WindowSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrowserError {
    #[error("no tab with id {0}")]
    TabNotFound(TabId),

    #[error("no group with id {0}")]
    GroupNotFound(GroupId),

    #[error("no window with id {0}")]
    WindowNotFound(WindowId),

    #[error("browser rejected the request: {0}")]
    Rejected(String),
}

/// Where tabs or a group should be moved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveTarget {
    /// `None`: stay in the current window.
    pub window: Option<WindowId>,

    /// `None`: the end of the window.
    pub index: Option<usize>,
}

impl MoveTarget {
    pub fn index(index: usize) -> Self {
        Self {
            window: None,
            index: Some(index),
        }
    }

    pub fn end_of(window: WindowId) -> Self {
        Self {
            window: Some(window),
            index: None,
        }
    }
}

/// Which group tabs should join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupTarget {
    Existing(GroupId),
    New,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub color: Option<GroupColor>,
    pub collapsed: Option<bool>,
}

impl GroupUpdate {
    pub fn collapsed(collapsed: bool) -> Self {
        Self {
            collapsed: Some(collapsed),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// Calls the board makes on the browser.
///
/// Implementations must not call back into the board: resulting events are delivered later
/// through [`crate::TabBoard::handle_event`].
pub trait BrowserSession {
    fn current_window(&mut self) -> Result<WindowId, BrowserError>;

    fn query_tabs(&mut self, window: WindowId) -> Result<Vec<TabRecord>, BrowserError>;

    fn get_group(&mut self, group: GroupId) -> Result<GroupRecord, BrowserError>;

    fn list_windows(&mut self) -> Result<Vec<WindowSummary>, BrowserError>;

    fn move_tabs(&mut self, tabs: &[TabId], target: MoveTarget) -> Result<(), BrowserError>;

    fn move_group(&mut self, group: GroupId, target: MoveTarget) -> Result<(), BrowserError>;

    /// Returns the group the tabs ended up in.
    fn group_tabs(&mut self, tabs: &[TabId], target: GroupTarget) -> Result<GroupId, BrowserError>;

    fn ungroup_tabs(&mut self, tabs: &[TabId]) -> Result<(), BrowserError>;

    fn update_group(
        &mut self,
        group: GroupId,
        update: GroupUpdate,
    ) -> Result<GroupRecord, BrowserError>;

    fn activate_tab(&mut self, tab: TabId) -> Result<(), BrowserError>;

    fn close_tabs(&mut self, tabs: &[TabId]) -> Result<(), BrowserError>;

    fn discard_tab(&mut self, tab: TabId) -> Result<(), BrowserError>;

    fn reload_tab(&mut self, tab: TabId) -> Result<(), BrowserError>;

    /// Open a new, empty window.
    fn create_window(&mut self) -> Result<WindowId, BrowserError>;
}

/// Session events pushed by the browser.
#[derive(Clone, Debug, PartialEq)]
pub enum BrowserEvent {
    TabCreated(TabRecord),
    TabUpdated {
        tab_id: TabId,
        change: TabChange,
        tab: TabRecord,
    },
    TabRemoved {
        tab_id: TabId,
        window_id: WindowId,
        window_closing: bool,
    },
    TabMoved {
        tab_id: TabId,
        window_id: WindowId,
        from_index: usize,
        to_index: usize,
    },
    TabAttached {
        tab_id: TabId,
        new_window_id: WindowId,
        new_position: usize,
    },
    TabDetached {
        tab_id: TabId,
        old_window_id: WindowId,
        old_position: usize,
    },
    TabReplaced {
        added_tab_id: TabId,
        removed_tab_id: TabId,
    },
    GroupCreated(GroupRecord),
    GroupUpdated(GroupRecord),
    GroupRemoved(GroupRecord),
    GroupMoved(GroupRecord),
}

impl BrowserEvent {
    /// The window this event belongs to, if the payload says.
    pub fn window_id(&self) -> Option<WindowId> {
        match self {
            Self::TabCreated(tab) | Self::TabUpdated { tab, .. } => Some(tab.window_id),
            Self::TabRemoved { window_id, .. } | Self::TabMoved { window_id, .. } => {
                Some(*window_id)
            }
            Self::TabAttached { new_window_id, .. } => Some(*new_window_id),
            Self::TabDetached { old_window_id, .. } => Some(*old_window_id),
            Self::TabReplaced { .. } => None,
            Self::GroupCreated(group)
            | Self::GroupUpdated(group)
            | Self::GroupRemoved(group)
            | Self::GroupMoved(group) => Some(group.window_id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TabCreated(_) => "tab_created",
            Self::TabUpdated { .. } => "tab_updated",
            Self::TabRemoved { .. } => "tab_removed",
            Self::TabMoved { .. } => "tab_moved",
            Self::TabAttached { .. } => "tab_attached",
            Self::TabDetached { .. } => "tab_detached",
            Self::TabReplaced { .. } => "tab_replaced",
            Self::GroupCreated(_) => "group_created",
            Self::GroupUpdated(_) => "group_updated",
            Self::GroupRemoved(_) => "group_removed",
            Self::GroupMoved(_) => "group_moved",
        }
    }
}
