//! Records mirrored from the host browser session.
//!
//! None of these are owned by the board: they are snapshots of what the browser reported last.

use serde::{Deserialize, Serialize};

/// Browser tab identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabId(pub u32);

/// Browser tab group identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Browser window identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    #[default]
    Complete,
    Unloaded,
}

/// The nine colors the browser allows for a tab group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub const ALL: [Self; 9] = [
        Self::Grey,
        Self::Blue,
        Self::Red,
        Self::Yellow,
        Self::Green,
        Self::Pink,
        Self::Purple,
        Self::Cyan,
        Self::Orange,
    ];
}

/// A tab as reported by the browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,

    /// Dense, zero-based position within the window.
    pub index: usize,

    /// `None` is the browser's "ungrouped" sentinel.
    pub group_id: Option<GroupId>,

    pub title: String,
    pub url: String,
    pub fav_icon_url: Option<String>,
    pub status: TabStatus,
    pub active: bool,
    pub pinned: bool,
    pub audible: bool,
    pub muted: bool,
    pub discarded: bool,
    pub frozen: bool,

    /// Milliseconds since the unix epoch.
    pub last_accessed: f64,
}

impl TabRecord {
    /// A plain, loaded, ungrouped tab. Mostly useful for hosts and tests.
    pub fn new(id: TabId, window_id: WindowId, index: usize, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id,
            window_id,
            index,
            group_id: None,
            title: url.clone(),
            url,
            fav_icon_url: None,
            status: TabStatus::Complete,
            active: false,
            pinned: false,
            audible: false,
            muted: false,
            discarded: false,
            frozen: false,
            last_accessed: 0.0,
        }
    }

    #[must_use]
    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group_id = Some(group);
        self
    }
}

/// A tab group as reported by the browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub window_id: WindowId,
    pub title: String,
    pub color: GroupColor,

    /// Authoritative fold state. The board keeps a shadow copy in [`crate::GroupStateStore`].
    pub collapsed: bool,
}

impl GroupRecord {
    pub fn new(id: GroupId, window_id: WindowId, title: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            title: title.into(),
            color: GroupColor::default(),
            collapsed: false,
        }
    }
}

/// The fields of a tab-updated event that actually changed.
///
/// `group_id: Some(None)` means the tab left its group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TabChange {
    pub status: Option<TabStatus>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub fav_icon_url: Option<String>,
    pub group_id: Option<Option<GroupId>>,
    pub pinned: Option<bool>,
    pub audible: Option<bool>,
    pub muted: Option<bool>,
    pub discarded: Option<bool>,
    pub frozen: Option<bool>,
}

impl TabChange {
    /// Apply the changed fields onto `tab`.
    pub fn apply_to(&self, tab: &mut TabRecord) {
        if let Some(status) = self.status {
            tab.status = status;
        }
        if let Some(title) = &self.title {
            tab.title.clone_from(title);
        }
        if let Some(url) = &self.url {
            tab.url.clone_from(url);
        }
        if let Some(icon) = &self.fav_icon_url {
            tab.fav_icon_url = Some(icon.clone());
        }
        if let Some(group) = self.group_id {
            tab.group_id = group;
        }
        if let Some(v) = self.pinned {
            tab.pinned = v;
        }
        if let Some(v) = self.audible {
            tab.audible = v;
        }
        if let Some(v) = self.muted {
            tab.muted = v;
        }
        if let Some(v) = self.discarded {
            tab.discarded = v;
        }
        if let Some(v) = self.frozen {
            tab.frozen = v;
        }
    }
}

/// Another browser window, as offered in the "move to window" dialog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub id: WindowId,
    pub tab_count: usize,
    pub group_count: usize,
}
