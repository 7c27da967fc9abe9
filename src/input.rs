//! Engine-level input: what the shell hands to [`crate::TabBoard::handle_input`].

use egui::{Key, Modifiers};
use serde::Serialize;

use crate::drag::DragSubject;
use crate::model::{GroupId, TabId};

/// Something on the list that can be focused, clicked or selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
    Tab(TabId),
    GroupHeader(GroupId),
}

impl Target {
    pub fn drag_subject(self) -> DragSubject {
        match self {
            Self::Tab(tab) => DragSubject::Tab(tab),
            Self::GroupHeader(group) => DragSubject::Group(group),
        }
    }
}

/// The per-line controls, also reachable by key on the focused line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LineAction {
    Close,
    Discard,
    Reload,
}

impl LineAction {
    pub const ALL: [Self; 3] = [Self::Close, Self::Discard, Self::Reload];

    pub fn label(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Discard => "discard",
            Self::Reload => "reload",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoardInput {
    Key {
        key: Key,
        modifiers: Modifiers,

        /// Host timestamp of the key event (seconds).
        timestamp: f64,
    },

    /// Primary click on a line or a group header.
    Click { target: Target, modifiers: Modifiers },

    /// Click on one of a line's action buttons.
    LineAction { tab: TabId, action: LineAction },

    /// The selection modifier went down or up.
    ModifierChanged { held: bool },

    /// Native drag started on a tab's handle or a group header. `pointer_y` is viewport-space.
    DragStart { target: Target, pointer_y: f32 },

    DragMove { pointer_y: f32 },

    DragRelease,

    /// The list was scrolled; `offset` is the new vertical scroll offset.
    Scroll { offset: f32 },

    /// The page lost focus.
    FocusLost,
}

/// Keyboard commands, after key mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ToggleDrag,
    ToggleSelection,
    Activate,
    Cancel,
    Up,
    Down,
    Line(LineAction),
    JumpToRecent,
}

pub fn command_for(key: Key, modifiers: Modifiers) -> Option<Command> {
    if modifiers.command || modifiers.alt {
        return None;
    }
    Some(match key {
        Key::Space => Command::ToggleDrag,
        Key::S => Command::ToggleSelection,
        Key::Enter => Command::Activate,
        Key::Escape => Command::Cancel,
        Key::ArrowUp => Command::Up,
        Key::ArrowDown => Command::Down,
        Key::Delete => Command::Line(LineAction::Close),
        Key::D => Command::Line(LineAction::Discard),
        Key::R => Command::Line(LineAction::Reload),
        Key::J => Command::JumpToRecent,
        _ => return None,
    })
}

/// Some platforms deliver the same key event twice with an identical timestamp.
#[derive(Debug, Default)]
pub struct KeyDedup {
    last: Option<(Key, Modifiers, u64)>,
}

impl KeyDedup {
    /// Returns false for a duplicate of the previous event.
    pub fn accept(&mut self, key: Key, modifiers: Modifiers, timestamp: f64) -> bool {
        let entry = (key, modifiers, timestamp.to_bits());
        if self.last == Some(entry) {
            log::debug!("dropping duplicate {key:?} at {timestamp}");
            return false;
        }
        self.last = Some(entry);
        true
    }
}
