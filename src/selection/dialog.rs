use serde::Serialize;

use crate::model::{GroupId, WindowId, WindowSummary};

/// What can be done with a finished selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BatchAction {
    CreateGroup,
    MoveToGroup,
    MoveToWindow,
    MoveToNewWindow,
}

impl BatchAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::CreateGroup => "Create group",
            Self::MoveToGroup => "Move to group",
            Self::MoveToWindow => "Move to window",
            Self::MoveToNewWindow => "Move to new window",
        }
    }
}

/// One entry of the "move to group" radio list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupChoice {
    pub id: GroupId,
    pub title: String,

    /// Index of the group's first tab; the list is ordered by it.
    pub first_index: usize,
}

/// Blocking modal dialogs shown by the host.
///
/// Every method returns once the user closed the dialog; `None` means dismissed.
pub trait DialogHost {
    fn choose_action(&mut self, actions: &[BatchAction]) -> Option<BatchAction>;

    fn prompt_group_name(&mut self) -> Option<String>;

    fn choose_group(&mut self, groups: &[GroupChoice]) -> Option<GroupId>;

    /// `windows` excludes the window being rendered.
    fn choose_window(&mut self, windows: &[WindowSummary]) -> Option<WindowId>;

    fn alert(&mut self, message: &str);
}
