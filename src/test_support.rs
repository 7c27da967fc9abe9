//! Fake host for tests: a browser that records calls and echoes the events a real one would
//! send, scripted dialogs, and helpers to drive a board.

use std::collections::BTreeMap;

use crate::browser::{
    BrowserError, BrowserEvent, BrowserSession, GroupTarget, GroupUpdate, MoveTarget,
};
use crate::model::{
    GroupId, GroupRecord, TabChange, TabId, TabRecord, WindowId, WindowSummary,
};
use crate::options::{EngineTuning, Environment};
use crate::selection::{BatchAction, DialogHost, GroupChoice};
use crate::store::{MemoryStore, StorageArea};
use crate::TabBoard;

pub type TestBoard = TabBoard<FakeBrowser, MemoryStore, ScriptedDialogs>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    MoveTabs(Vec<TabId>, MoveTarget),
    MoveGroup(GroupId, MoveTarget),
    GroupTabs(Vec<TabId>, GroupTarget),
    UngroupTabs(Vec<TabId>),
    UpdateGroup(GroupId, GroupUpdate),
    ActivateTab(TabId),
    CloseTabs(Vec<TabId>),
    DiscardTab(TabId),
    ReloadTab(TabId),
    CreateWindow,
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Self::MoveTabs(..) => "move_tabs",
            Self::MoveGroup(..) => "move_group",
            Self::GroupTabs(..) => "group_tabs",
            Self::UngroupTabs(..) => "ungroup_tabs",
            Self::UpdateGroup(..) => "update_group",
            Self::ActivateTab(..) => "activate_tab",
            Self::CloseTabs(..) => "close_tabs",
            Self::DiscardTab(..) => "discard_tab",
            Self::ReloadTab(..) => "reload_tab",
            Self::CreateWindow => "create_window",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ActivateTab(_))
    }
}

#[derive(Debug)]
pub struct FakeBrowser {
    pub window: WindowId,
    tabs: Vec<TabRecord>,
    groups: Vec<GroupRecord>,
    windows: Vec<WindowId>,
    pub calls: Vec<Call>,
    events: Vec<BrowserEvent>,

    /// Names of calls (see [`Call`]) that fail with `Rejected`.
    pub failing: Vec<&'static str>,

    next_group: u32,
    next_window: u32,
}

impl FakeBrowser {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            tabs: Vec::new(),
            groups: Vec::new(),
            windows: vec![window],
            calls: Vec::new(),
            events: Vec::new(),
            failing: Vec::new(),
            next_group: 100,
            next_window: window.0 + 100,
        }
    }

    /// `count` ungrouped tabs, ids `1..=count` at indices `0..count`.
    pub fn with_tabs(count: u32) -> Self {
        let mut browser = Self::new(WindowId(1));
        for id in 1..=count {
            browser.add_tab(TabRecord::new(
                TabId(id),
                WindowId(1),
                (id - 1) as usize,
                format!("https://site{id}.example/"),
            ));
        }
        browser
    }

    pub fn add_tab(&mut self, mut tab: TabRecord) {
        if tab.title.is_empty() {
            tab.title = format!("Tab {}", tab.id.0);
        }
        if !self.windows.contains(&tab.window_id) {
            self.windows.push(tab.window_id);
        }
        self.tabs.push(tab);
    }

    /// Put existing tabs into a group, without events.
    pub fn add_group(&mut self, record: GroupRecord, tabs: &[TabId]) {
        for tab in &mut self.tabs {
            if tabs.contains(&tab.id) {
                tab.group_id = Some(record.id);
            }
        }
        self.groups.push(record);
    }

    pub fn tab(&self, tab: TabId) -> Option<&TabRecord> {
        self.tabs.iter().find(|t| t.id == tab)
    }

    pub fn group(&self, group: GroupId) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.id == group)
    }

    /// Tab ids of `window`, in index order.
    pub fn order(&self, window: WindowId) -> Vec<TabId> {
        let mut tabs: Vec<&TabRecord> = self.tabs.iter().filter(|t| t.window_id == window).collect();
        tabs.sort_by_key(|t| t.index);
        tabs.into_iter().map(|t| t.id).collect()
    }

    pub fn take_events(&mut self) -> Vec<BrowserEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue an event as if something outside the board happened.
    pub fn push_event(&mut self, event: BrowserEvent) {
        self.events.push(event);
    }

    /// Calls that change browser state.
    pub fn mutations(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| c.is_mutation()).collect()
    }

    fn record(&mut self, call: Call) -> Result<(), BrowserError> {
        let name = call.name();
        self.calls.push(call);
        if self.failing.contains(&name) {
            Err(BrowserError::Rejected(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn tab_mut(&mut self, tab: TabId) -> Result<&mut TabRecord, BrowserError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab)
            .ok_or(BrowserError::TabNotFound(tab))
    }

    /// Write `order` back as indices of `window`. Only tabs in `moved` get a moved event; the
    /// ones they displaced shift silently.
    fn apply_order(&mut self, window: WindowId, order: &[TabId], moved: &[TabId]) {
        for (index, &id) in order.iter().enumerate() {
            let Some(tab) = self.tabs.iter_mut().find(|t| t.id == id) else {
                continue;
            };
            if moved.contains(&id) && tab.window_id == window && tab.index != index {
                self.events.push(BrowserEvent::TabMoved {
                    tab_id: id,
                    window_id: window,
                    from_index: tab.index,
                    to_index: index,
                });
            }
            tab.window_id = window;
            tab.index = index;
        }
    }

    fn move_block(&mut self, ids: &[TabId], target: MoveTarget) -> Result<(), BrowserError> {
        let Some(first) = ids.first() else {
            return Ok(());
        };
        let source = self.tab_mut(*first)?.window_id;
        let destination = target.window.unwrap_or(source);

        if destination == source {
            let mut order = self.order(source);
            order.retain(|t| !ids.contains(t));
            let at = target.index.unwrap_or(order.len()).min(order.len());
            for (offset, &id) in ids.iter().enumerate() {
                order.insert(at + offset, id);
            }
            self.apply_order(source, &order, ids);
            return Ok(());
        }

        let mut remaining = self.order(source);
        remaining.retain(|t| !ids.contains(t));
        let mut order = self.order(destination);
        let at = target.index.unwrap_or(order.len()).min(order.len());
        for (offset, &id) in ids.iter().enumerate() {
            let tab = self.tab_mut(id)?;
            let old_position = tab.index;
            tab.window_id = destination;
            self.events.push(BrowserEvent::TabDetached {
                tab_id: id,
                old_window_id: source,
                old_position,
            });
            self.events.push(BrowserEvent::TabAttached {
                tab_id: id,
                new_window_id: destination,
                new_position: at + offset,
            });
            order.insert(at + offset, id);
        }
        self.apply_order(source, &remaining, &[]);
        self.apply_order(destination, &order, &[]);
        Ok(())
    }

    fn set_group(&mut self, tab: TabId, group: Option<GroupId>) -> Result<(), BrowserError> {
        let record = self.tab_mut(tab)?;
        if record.group_id == group {
            return Ok(());
        }
        record.group_id = group;
        let tab = record.clone();
        self.events.push(BrowserEvent::TabUpdated {
            tab_id: tab.id,
            change: TabChange {
                group_id: Some(group),
                ..Default::default()
            },
            tab,
        });
        Ok(())
    }

    fn drop_empty_groups(&mut self) {
        let tabs = &self.tabs;
        let (kept, removed): (Vec<GroupRecord>, Vec<GroupRecord>) = std::mem::take(&mut self.groups)
            .into_iter()
            .partition(|g| tabs.iter().any(|t| t.group_id == Some(g.id)));
        self.groups = kept;
        self.events
            .extend(removed.into_iter().map(BrowserEvent::GroupRemoved));
    }
}

impl BrowserSession for FakeBrowser {
    fn current_window(&mut self) -> Result<WindowId, BrowserError> {
        Ok(self.window)
    }

    fn query_tabs(&mut self, window: WindowId) -> Result<Vec<TabRecord>, BrowserError> {
        Ok(self
            .tabs
            .iter()
            .filter(|t| t.window_id == window)
            .cloned()
            .collect())
    }

    fn get_group(&mut self, group: GroupId) -> Result<GroupRecord, BrowserError> {
        self.group(group)
            .cloned()
            .ok_or(BrowserError::GroupNotFound(group))
    }

    fn list_windows(&mut self) -> Result<Vec<WindowSummary>, BrowserError> {
        Ok(self
            .windows
            .iter()
            .map(|&id| WindowSummary {
                id,
                tab_count: self.tabs.iter().filter(|t| t.window_id == id).count(),
                group_count: self.groups.iter().filter(|g| g.window_id == id).count(),
            })
            .collect())
    }

    fn move_tabs(&mut self, tabs: &[TabId], target: MoveTarget) -> Result<(), BrowserError> {
        self.record(Call::MoveTabs(tabs.to_vec(), target))?;
        self.move_block(tabs, target)
    }

    fn move_group(&mut self, group: GroupId, target: MoveTarget) -> Result<(), BrowserError> {
        self.record(Call::MoveGroup(group, target))?;
        let window = self.group(group).ok_or(BrowserError::GroupNotFound(group))?.window_id;
        let members: Vec<TabId> = self
            .order(window)
            .into_iter()
            .filter(|&t| self.tab(t).is_some_and(|r| r.group_id == Some(group)))
            .collect();
        self.move_block(&members, target)?;
        if let Some(destination) = target.window {
            if let Some(record) = self.groups.iter_mut().find(|g| g.id == group) {
                record.window_id = destination;
            }
        }
        if let Some(record) = self.group(group).cloned() {
            self.events.push(BrowserEvent::GroupMoved(record));
        }
        Ok(())
    }

    fn group_tabs(&mut self, tabs: &[TabId], target: GroupTarget) -> Result<GroupId, BrowserError> {
        self.record(Call::GroupTabs(tabs.to_vec(), target))?;
        let Some(first) = tabs.first() else {
            return Err(BrowserError::Rejected("no tabs".to_owned()));
        };
        let window = self.tab_mut(*first)?.window_id;
        let group = match target {
            GroupTarget::Existing(group) => {
                self.group(group).ok_or(BrowserError::GroupNotFound(group))?;
                group
            }
            GroupTarget::New => {
                let group = GroupId(self.next_group);
                self.next_group += 1;
                let record = GroupRecord::new(group, window, "");
                self.groups.push(record.clone());
                self.events.push(BrowserEvent::GroupCreated(record));
                group
            }
        };
        for &tab in tabs {
            self.set_group(tab, Some(group))?;
        }
        self.drop_empty_groups();

        // Members end up next to each other, starting at the first one.
        let order = self.order(window);
        let members: Vec<TabId> = order
            .iter()
            .copied()
            .filter(|&t| self.tab(t).is_some_and(|r| r.group_id == Some(group)))
            .collect();
        if let Some(at) = order.iter().position(|t| members.contains(t)) {
            let mut rest: Vec<TabId> = order.into_iter().filter(|t| !members.contains(t)).collect();
            for (offset, &id) in members.iter().enumerate() {
                rest.insert(at + offset, id);
            }
            self.apply_order(window, &rest, &members);
        }
        Ok(group)
    }

    fn ungroup_tabs(&mut self, tabs: &[TabId]) -> Result<(), BrowserError> {
        self.record(Call::UngroupTabs(tabs.to_vec()))?;
        for &tab in tabs {
            self.set_group(tab, None)?;
        }
        self.drop_empty_groups();
        Ok(())
    }

    fn update_group(&mut self, group: GroupId, update: GroupUpdate) -> Result<GroupRecord, BrowserError> {
        self.record(Call::UpdateGroup(group, update.clone()))?;
        let record = self
            .groups
            .iter_mut()
            .find(|g| g.id == group)
            .ok_or(BrowserError::GroupNotFound(group))?;
        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(color) = update.color {
            record.color = color;
        }
        if let Some(collapsed) = update.collapsed {
            record.collapsed = collapsed;
        }
        let record = record.clone();
        self.events.push(BrowserEvent::GroupUpdated(record.clone()));
        Ok(record)
    }

    fn activate_tab(&mut self, tab: TabId) -> Result<(), BrowserError> {
        self.record(Call::ActivateTab(tab))?;
        for record in &mut self.tabs {
            record.active = record.id == tab;
        }
        Ok(())
    }

    fn close_tabs(&mut self, tabs: &[TabId]) -> Result<(), BrowserError> {
        self.record(Call::CloseTabs(tabs.to_vec()))?;
        let mut windows = Vec::new();
        for &tab in tabs {
            let window = self.tab_mut(tab)?.window_id;
            self.tabs.retain(|t| t.id != tab);
            self.events.push(BrowserEvent::TabRemoved {
                tab_id: tab,
                window_id: window,
                window_closing: false,
            });
            if !windows.contains(&window) {
                windows.push(window);
            }
        }
        for window in windows {
            let order = self.order(window);
            for (index, id) in order.into_iter().enumerate() {
                if let Ok(tab) = self.tab_mut(id) {
                    tab.index = index;
                }
            }
        }
        self.drop_empty_groups();
        Ok(())
    }

    fn discard_tab(&mut self, tab: TabId) -> Result<(), BrowserError> {
        self.record(Call::DiscardTab(tab))?;
        self.tab_mut(tab)?.discarded = true;
        Ok(())
    }

    fn reload_tab(&mut self, tab: TabId) -> Result<(), BrowserError> {
        self.record(Call::ReloadTab(tab))
    }

    fn create_window(&mut self) -> Result<WindowId, BrowserError> {
        self.record(Call::CreateWindow)?;
        let window = WindowId(self.next_window);
        self.next_window += 1;
        self.windows.push(window);
        Ok(window)
    }
}

/// Dialogs that answer from a script and remember what they were shown.
#[derive(Debug, Default)]
pub struct ScriptedDialogs {
    pub action: Option<BatchAction>,
    pub group_name: Option<String>,
    pub group: Option<GroupId>,
    pub window: Option<WindowId>,

    pub offered_actions: Vec<Vec<BatchAction>>,
    pub offered_groups: Vec<Vec<GroupChoice>>,
    pub offered_windows: Vec<Vec<WindowSummary>>,
    pub alerts: Vec<String>,
}

impl DialogHost for ScriptedDialogs {
    fn choose_action(&mut self, actions: &[BatchAction]) -> Option<BatchAction> {
        self.offered_actions.push(actions.to_vec());
        self.action
    }

    fn prompt_group_name(&mut self) -> Option<String> {
        self.group_name.clone()
    }

    fn choose_group(&mut self, groups: &[GroupChoice]) -> Option<GroupId> {
        self.offered_groups.push(groups.to_vec());
        self.group
    }

    fn choose_window(&mut self, windows: &[WindowSummary]) -> Option<WindowId> {
        self.offered_windows.push(windows.to_vec());
        self.window
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_owned());
    }
}

pub fn board_with(browser: FakeBrowser, settings: MemoryStore, tuning: EngineTuning) -> TestBoard {
    init_logging();
    let mut board = TabBoard::new(
        browser,
        settings,
        MemoryStore::new(),
        ScriptedDialogs::default(),
        EngineTuning {
            debug_integrity: true,
            debug_integrity_panic: true,
            debug_event_log: true,
            ..tuning
        },
        Environment::default(),
    );
    if let Err(err) = board.bootstrap(1_000.0) {
        panic!("bootstrap failed: {err}");
    }
    board
}

pub fn board(browser: FakeBrowser) -> TestBoard {
    board_with(browser, MemoryStore::new(), EngineTuning::default())
}

/// Deliver every queued browser event and settings-store notification.
pub fn pump(board: &mut TestBoard, now: f64) {
    loop {
        let events = board.browser_mut().take_events();
        let changes = board.settings_store_mut().take_changes();
        if events.is_empty() && changes.is_empty() {
            break;
        }
        for event in events {
            board.handle_event(event, now);
        }
        for change in changes {
            board.handle_storage_change(StorageArea::Sync, &change, now);
        }
    }
}

/// Rendered tab ids and indices in document order.
pub fn rendered(board: &TestBoard) -> Vec<(TabId, usize)> {
    let doc = board.document();
    doc.line_order()
        .into_iter()
        .filter_map(|n| doc.line(n).and_then(|l| Some((l.tab_id?, l.index))))
        .collect()
}

/// Values stored under fold-state keys, by key.
pub fn session_values(board: &TestBoard) -> BTreeMap<String, serde_json::Value> {
    use crate::store::KeyValueStore as _;
    board.session_store().get_all()
}
