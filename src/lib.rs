//! `tabboard`: a live list of one browser window's tabs and tab groups.
//!
//! The list is kept in sync with the browser by reconciling its session events, can be
//! reordered by drag-and-drop (pointer or keyboard), folds groups in step with the browser, and
//! supports batch actions on a multi-selection.
//!
//! The browser, the settings stores and the modal dialogs are collaborators behind traits
//! ([`BrowserSession`], [`KeyValueStore`], [`DialogHost`]); [`TabBoard`] ties everything together
//! and [`shell`] draws it with egui.

#![forbid(unsafe_code)]

pub mod board;
pub mod browser;
pub mod color;
mod context;
pub mod document;
pub mod drag;
pub mod group_state;
pub mod groups;
pub mod input;
pub mod integrity;
pub mod model;
pub mod options;
pub mod ordering;
pub mod selection;
pub mod shell;
pub mod store;
pub mod tab_lines;

#[cfg(test)]
mod test_support;

pub use board::{BoardSnapshot, SnapshotItem, TabBoard};
pub use browser::{BrowserError, BrowserEvent, BrowserSession, GroupTarget, GroupUpdate, MoveTarget};
pub use input::{BoardInput, LineAction, Target};
pub use model::{GroupColor, GroupId, GroupRecord, TabChange, TabId, TabRecord, TabStatus, WindowId};
pub use options::{EngineTuning, Environment, OptionKey, Options, OptionsError};
pub use selection::{BatchAction, DialogHost, GroupChoice};
pub use store::{KeyValueStore, MemoryStore, StorageArea, StorageChange, StorageChanges, StoreError};
