//! The board: one rendered window's tab list and everything that keeps it in sync with the
//! browser.
//!
//! [`TabBoard`] owns the document, the renderers and the two gesture engines. Browser events,
//! settings-store notifications, user input and timer ticks all enter through it, one at a time.

use std::collections::VecDeque;

use ahash::HashMap;
use egui::Pos2;
use serde::Serialize;
use serde_json::Value;

use crate::browser::{BrowserError, BrowserSession};
use crate::context::{RenderCtx, metrics_for};
use crate::document::{LayoutMetrics, ListDocument, NodeId, layout};
use crate::drag::{DragEngine, DragSubject};
use crate::group_state::GroupStateStore;
use crate::groups::{GroupManager, update_info};
use crate::input::{KeyDedup, Target};
use crate::model::{GroupId, TabId, TabRecord, WindowId};
use crate::options::{EngineTuning, Environment, OptionKey, Options, OptionsError, OptionsMerge};
use crate::ordering;
use crate::selection::{DialogHost, Selection, SelectionState};
use crate::store::KeyValueStore;
use crate::tab_lines::TabManager;

mod debounce;
mod debug;
mod interaction;
mod reconcile;

#[cfg(test)]
mod reconcile_tests;

use debounce::Debouncer;

/// Borrowed pieces of the board, handed to the renderers and engines for one operation.
struct Parts<'a> {
    ctx: RenderCtx<'a>,
    tab_lines: &'a mut TabManager,
    groups: &'a mut GroupManager,
    drag: &'a mut DragEngine,
    selection: &'a mut Selection,
    dialogs: &'a mut dyn DialogHost,
}

pub struct TabBoard<B, K, D> {
    browser: B,
    settings: K,
    session_store: K,
    dialogs: D,

    doc: ListDocument,
    tab_lines: TabManager,
    groups: GroupManager,
    group_state: GroupStateStore,
    drag: DragEngine,
    selection: Selection,

    /// Authoritative records of the rendered window's tabs.
    records: HashMap<TabId, TabRecord>,

    options: Options,
    tuning: EngineTuning,
    env: Environment,

    window: Option<WindowId>,
    rerender_timer: Debouncer,

    /// Set right before we write the settings store; its echo clears it.
    local_settings_write: bool,

    key_dedup: KeyDedup,
    focus: Option<Target>,
    scroll_offset: f32,

    /// Seconds since the unix epoch, as of the last entry point.
    now: f64,

    debug_log: VecDeque<String>,
    debug_last_integrity_hash: u64,
}

/// Serializable view of what is rendered, for debugging and tests.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub window: Option<WindowId>,
    pub items: Vec<SnapshotItem>,
    pub dragging: Option<DragSubject>,
    pub selection: SelectionState,
    pub rerender_pending: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SnapshotItem {
    Tab {
        id: TabId,
        index: usize,
        hidden: bool,
        selected: bool,
    },
    Group {
        id: GroupId,
        title: String,
        collapsed: bool,
        tab_count: Option<usize>,
        tabs: Vec<(TabId, usize)>,
    },
}

impl<B, K, D> TabBoard<B, K, D>
where
    B: BrowserSession,
    K: KeyValueStore,
    D: DialogHost,
{
    /// `settings` is the synchronized store holding [`Options`]; `session_store` keeps fold state
    /// for the browser session.
    pub fn new(
        browser: B,
        settings: K,
        session_store: K,
        dialogs: D,
        tuning: EngineTuning,
        env: Environment,
    ) -> Self {
        Self {
            browser,
            settings,
            session_store,
            dialogs,
            doc: ListDocument::new(),
            tab_lines: TabManager::new(),
            groups: GroupManager::new(),
            group_state: GroupStateStore::new(),
            drag: DragEngine::new(),
            selection: Selection::new(),
            records: HashMap::default(),
            options: Options::default(),
            rerender_timer: Debouncer::new(tuning.rerender_debounce),
            tuning,
            env,
            window: None,
            local_settings_write: false,
            key_dedup: KeyDedup::default(),
            focus: None,
            scroll_offset: 0.0,
            now: 0.0,
            debug_log: VecDeque::new(),
            debug_last_integrity_hash: 0,
        }
    }

    fn parts(&mut self) -> Parts<'_> {
        Parts {
            ctx: RenderCtx {
                doc: &mut self.doc,
                browser: &mut self.browser,
                session_store: &mut self.session_store,
                group_state: &mut self.group_state,
                options: &self.options,
                env: &self.env,
                tuning: &self.tuning,
                now: self.now,
            },
            tab_lines: &mut self.tab_lines,
            groups: &mut self.groups,
            drag: &mut self.drag,
            selection: &mut self.selection,
            dialogs: &mut self.dialogs,
        }
    }

    /// Load settings and fold state, find our window and render it.
    ///
    /// # Errors
    /// If the browser can't tell us the current window or its tabs.
    pub fn bootstrap(&mut self, now: f64) -> Result<(), BrowserError> {
        self.now = now;
        let window = self.browser.current_window()?;
        self.window = Some(window);
        self.options = Options::load(&self.settings);
        self.group_state = GroupStateStore::load(&self.session_store);
        log::debug!(
            "bootstrapping {window} with {} remembered fold states",
            self.group_state.len()
        );
        self.render_now()
    }

    /// Rebuild the whole list from a fresh browser query.
    fn render_now(&mut self) -> Result<(), BrowserError> {
        let Some(window) = self.window else {
            return Ok(());
        };
        let tabs = self.browser.query_tabs(window)?;
        let tab_count = tabs.len();

        let rendered = {
            let Parts {
                mut ctx,
                tab_lines,
                groups,
                ..
            } = self.parts();
            tab_lines.render_all(&mut ctx, tabs, groups)
        };
        self.records = rendered.into_iter().map(|t| (t.id, t)).collect();

        let records = &self.records;
        let stale: Vec<TabId> = self
            .selection
            .selected_tabs()
            .iter()
            .copied()
            .filter(|t| !records.contains_key(t))
            .collect();
        for tab in stale {
            self.selection.tab_removed(tab);
        }
        self.selection.reapply_markers(&mut self.doc);
        if let Some(Target::Tab(tab)) = self.focus {
            if !self.records.contains_key(&tab) {
                self.focus = None;
            }
        }

        self.debug_log_event(format!("render {window}: {tab_count} tabs"));
        self.after_structural_change("render");
        Ok(())
    }

    /// Full re-render, unless a drag owns the document right now; then it waits for the drag
    /// to end.
    fn rerender(&mut self) {
        if self.drag.is_active() {
            self.rerender_timer.schedule(self.now);
            return;
        }
        self.rerender_timer.cancel();
        if let Err(err) = self.render_now() {
            log::warn!("re-render failed: {err}");
        }
    }

    fn schedule_rerender(&mut self, reason: &str) {
        log::debug!("re-render scheduled: {reason}");
        self.debug_log_event(format!("schedule re-render: {reason}"));
        self.rerender_timer.schedule(self.now);
    }

    /// Every structural change ends here: renumber, refresh the drag, lay out.
    fn after_structural_change(&mut self, reason: &str) {
        for (tab, index) in ordering::reindex(&mut self.doc) {
            if let Some(record) = self.records.get_mut(&tab) {
                record.index = index;
            }
        }
        if self.drag.is_active() {
            let metrics = self.layout_metrics();
            self.drag
                .on_structure_changed(&mut self.doc, |doc| layout(doc, Pos2::ZERO, &metrics));
        }
        self.relayout();
        if self.tuning.debug_integrity {
            self.debug_check_integrity(reason);
        }
    }

    fn layout_metrics(&self) -> LayoutMetrics {
        let mut metrics = metrics_for(&self.tuning);
        if let Some(height) = self.drag.placeholder_height() {
            metrics.placeholder_height = height;
        }
        metrics
    }

    fn relayout(&mut self) {
        let metrics = self.layout_metrics();
        layout(&mut self.doc, Pos2::ZERO, &metrics);
    }

    /// Advance timers: expire move suppression and run a due re-render.
    pub fn update(&mut self, now: f64) {
        self.now = now;
        self.drag.suppression_mut().expire(now);
        if !self.drag.is_active() && self.rerender_timer.poll(now) {
            self.rerender();
        }
    }

    /// When [`Self::update`] next has something to do.
    pub fn next_deadline(&self) -> Option<f64> {
        let deadlines = [self.rerender_timer.deadline(), self.drag.suppression().next_deadline()];
        deadlines.into_iter().flatten().min_by(f64::total_cmp)
    }

    /// Change one option locally and persist it.
    ///
    /// # Errors
    /// For unknown keys and values of the wrong type.
    pub fn set_option(&mut self, key: &str, value: &Value) -> Result<(), OptionsError> {
        let option: OptionKey = key.parse()?;
        let before = self.options.clone();
        self.options.set(key, value)?;
        if self.options == before {
            return Ok(());
        }

        self.local_settings_write = true;
        if let Err(err) = self.options.save(&mut self.settings) {
            log::warn!("saving option {option} failed: {err}");
            self.local_settings_write = false;
        }
        self.apply_options_change(&OptionsMerge {
            changed: vec![option],
        });
        Ok(())
    }

    fn apply_options_change(&mut self, merge: &OptionsMerge) {
        if merge.is_empty() {
            return;
        }
        if merge.is_structural() {
            self.schedule_rerender("structural option change");
            return;
        }

        let lines = self.doc.line_order();
        let containers: Vec<_> = self
            .doc
            .children(None)
            .iter()
            .copied()
            .filter(|&n| self.doc.group(n).is_some())
            .collect();
        {
            let Parts {
                mut ctx,
                tab_lines,
                groups,
                ..
            } = self.parts();
            for line in lines {
                tab_lines.apply_display_options(&mut ctx, line);
            }
            for container in containers {
                let record = ctx
                    .doc
                    .group_of_container(container)
                    .and_then(|g| groups.record(g).cloned());
                match record {
                    Some(record) => update_info(ctx.doc, container, &record, ctx.options),
                    None => groups.refresh_tab_count(ctx.doc, container, ctx.options),
                }
            }
        }
        self.relayout();
    }

    /// Activate the most recently used tab that isn't the board itself.
    pub fn jump_to_most_recent(&mut self) -> bool {
        let Some(tab) = self.tab_lines.most_recent() else {
            return false;
        };
        match self.browser.activate_tab(tab) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("activating {tab} failed: {err}");
                false
            }
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let doc = &self.doc;
        let tab_item = |node: NodeId| {
            let line = doc.line(node)?;
            let flags = doc.node(node)?.flags;
            Some(SnapshotItem::Tab {
                id: line.tab_id?,
                index: line.index,
                hidden: flags.hidden,
                selected: flags.selected,
            })
        };
        let items = doc
            .children(None)
            .iter()
            .filter_map(|&node| match doc.group(node) {
                Some(group) => Some(SnapshotItem::Group {
                    id: group.group_id,
                    title: group.title.clone(),
                    collapsed: group.collapsed,
                    tab_count: group.tab_count,
                    tabs: group
                        .children()
                        .iter()
                        .filter_map(|&c| doc.line(c).and_then(|l| Some((l.tab_id?, l.index))))
                        .collect(),
                }),
                None => tab_item(node),
            })
            .collect();
        BoardSnapshot {
            window: self.window,
            items,
            dragging: self.drag.subject(),
            selection: self.selection.state(),
            rerender_pending: self.rerender_timer.is_pending(),
        }
    }

    pub fn document(&self) -> &ListDocument {
        &self.doc
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tuning(&self) -> &EngineTuning {
        &self.tuning
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn record(&self, tab: TabId) -> Option<&TabRecord> {
        self.records.get(&tab)
    }

    pub fn tab_lines(&self) -> &TabManager {
        &self.tab_lines
    }

    pub fn group_state(&self) -> &GroupStateStore {
        &self.group_state
    }

    pub fn drag(&self) -> &DragEngine {
        &self.drag
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn focus(&self) -> Option<Target> {
        self.focus
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn is_rerender_pending(&self) -> bool {
        self.rerender_timer.is_pending()
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut B {
        &mut self.browser
    }

    pub fn settings_store_mut(&mut self) -> &mut K {
        &mut self.settings
    }

    pub fn session_store(&self) -> &K {
        &self.session_store
    }

    pub fn dialogs_mut(&mut self) -> &mut D {
        &mut self.dialogs
    }
}
