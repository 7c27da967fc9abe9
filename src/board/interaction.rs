//! User input: clicks, keys, pointer drags and focus.

use super::{Parts, TabBoard};
use crate::browser::BrowserSession;
use crate::drag::{DragModality, DragSubject, KeyStep};
use crate::input::{BoardInput, Command, LineAction, Target, command_for};
use crate::model::TabId;
use crate::selection::{DialogHost, SelectionMode, SelectionState};
use crate::store::KeyValueStore;

impl<B, K, D> TabBoard<B, K, D>
where
    B: BrowserSession,
    K: KeyValueStore,
    D: DialogHost,
{
    pub fn handle_input(&mut self, input: BoardInput, now: f64) {
        self.now = now;
        match input {
            BoardInput::Key {
                key,
                modifiers,
                timestamp,
            } => {
                if !self.key_dedup.accept(key, modifiers, timestamp) {
                    return;
                }
                // A dialog is up.
                if self.selection.state() == SelectionState::Finalizing {
                    return;
                }
                if let Some(command) = command_for(key, modifiers) {
                    self.run_command(command);
                }
            }
            BoardInput::Click { target, modifiers } => self.on_click(target, modifiers.shift),
            BoardInput::LineAction { tab, action } => self.line_action(tab, action),
            BoardInput::ModifierChanged { held } => {
                if !held && self.selection.mode() == Some(SelectionMode::Modifier) {
                    self.finish_selection();
                }
            }
            BoardInput::DragStart { target, pointer_y } => {
                if self.selection.is_active() {
                    return;
                }
                if self
                    .drag
                    .start(&mut self.doc, target.drag_subject(), DragModality::Pointer)
                {
                    self.debug_log_event(format!("pointer drag of {target:?}"));
                    self.drag
                        .pointer_moved(&mut self.doc, pointer_y, self.scroll_offset, &self.tuning);
                    self.relayout();
                }
            }
            BoardInput::DragMove { pointer_y } => {
                if self.drag.modality() == Some(DragModality::Pointer)
                    && self.drag.pointer_moved(
                        &mut self.doc,
                        pointer_y,
                        self.scroll_offset,
                        &self.tuning,
                    )
                {
                    self.relayout();
                }
            }
            BoardInput::DragRelease => {
                if self.drag.modality() == Some(DragModality::Pointer) {
                    self.commit_drag();
                }
            }
            BoardInput::Scroll { offset } => self.scroll_offset = offset.max(0.0),
            BoardInput::FocusLost => self.cancel_drag("focus lost"),
        }
    }

    fn run_command(&mut self, command: Command) {
        let keyboard_drag = self.drag.modality() == Some(DragModality::Keyboard);
        match command {
            Command::ToggleDrag => {
                if keyboard_drag {
                    self.commit_drag();
                } else if !self.drag.is_active() && !self.selection.is_active() {
                    if let Some(target) = self.focus {
                        if self.drag.start(
                            &mut self.doc,
                            target.drag_subject(),
                            DragModality::Keyboard,
                        ) {
                            self.debug_log_event(format!("keyboard drag of {target:?}"));
                            self.relayout();
                        }
                    }
                }
            }
            Command::ToggleSelection => match self.selection.state() {
                SelectionState::Inactive => {
                    if !self.drag.is_active() {
                        self.selection.begin(SelectionMode::Keyboard);
                    }
                }
                SelectionState::Selecting(SelectionMode::Keyboard) => self.finish_selection(),
                SelectionState::Selecting(SelectionMode::Modifier) | SelectionState::Finalizing => {}
            },
            Command::Activate => {
                if keyboard_drag {
                    self.commit_drag();
                } else if let Some(target) = self.focus {
                    self.activate(target, false);
                }
            }
            Command::Cancel => {
                if self.drag.is_active() {
                    self.cancel_drag("escape");
                } else if self.selection.is_active() {
                    self.selection.abort(&mut self.doc);
                }
            }
            Command::Up | Command::Down => {
                let step = if command == Command::Up {
                    KeyStep::Up
                } else {
                    KeyStep::Down
                };
                if keyboard_drag {
                    if self.drag.step(&mut self.doc, step) {
                        self.relayout();
                    }
                } else if !self.drag.is_active() {
                    self.move_focus(step);
                }
            }
            Command::Line(action) => {
                if let Some(Target::Tab(tab)) = self.focus {
                    self.line_action(tab, action);
                }
            }
            Command::JumpToRecent => {
                self.jump_to_most_recent();
            }
        }
    }

    /// Close, discard or reload a tab. The outcome arrives later as browser events.
    fn line_action(&mut self, tab: TabId, action: LineAction) {
        if self.drag.is_active() || self.selection.is_active() {
            return;
        }
        if !self.records.contains_key(&tab) {
            log::debug!("{} of unknown {tab} ignored", action.label());
            return;
        }
        let result = match action {
            LineAction::Close => self.browser.close_tabs(&[tab]),
            LineAction::Discard => self.browser.discard_tab(tab),
            LineAction::Reload => self.browser.reload_tab(tab),
        };
        if let Err(err) = result {
            log::warn!("{} of {tab} failed: {err}", action.label());
        }
    }

    fn on_click(&mut self, target: Target, shift: bool) {
        if self.drag.is_active() {
            return;
        }
        if self.selection.mode().is_none() && shift {
            self.selection.begin(SelectionMode::Modifier);
        }
        self.focus = Some(target);
        self.activate(target, shift);
    }

    /// Click or Enter on a target: toggles membership while selecting, otherwise activates the
    /// tab or folds the group.
    fn activate(&mut self, target: Target, shift: bool) {
        if self.selection.mode().is_some() {
            match target {
                Target::Tab(tab) => self.selection.toggle_tab(&mut self.doc, tab),
                Target::GroupHeader(group) => self.selection.toggle_group(&mut self.doc, group),
            };
            return;
        }

        match target {
            Target::Tab(tab) => {
                if let Err(err) = self.browser.activate_tab(tab) {
                    log::warn!("activating {tab} failed: {err}");
                }
            }
            Target::GroupHeader(group) => {
                let selection_active = self.selection.is_active();
                let toggled = {
                    let Parts {
                        mut ctx, groups, ..
                    } = self.parts();
                    groups.on_header_activate(&mut ctx, group, shift, selection_active)
                };
                if toggled {
                    self.debug_log_event(format!("{group} fold toggled"));
                    self.after_structural_change("fold toggled");
                }
            }
        }
    }

    fn finish_selection(&mut self) {
        let Some(window) = self.window else {
            self.selection.abort(&mut self.doc);
            return;
        };
        let report = {
            let Parts {
                mut ctx,
                selection,
                dialogs,
                ..
            } = self.parts();
            selection.finish(&mut ctx, dialogs, window)
        };
        match report {
            Some(report) => {
                log::debug!("batch {report:?}");
                self.debug_log_event(format!(
                    "batch {:?}: {} tabs, {} groups, {} failures",
                    report.action, report.tabs, report.groups, report.failures
                ));
            }
            None => self.debug_log_event("selection ended without an action"),
        }
        self.relayout();
    }

    fn commit_drag(&mut self) {
        let outcome = {
            let Parts { mut ctx, drag, .. } = self.parts();
            drag.commit(&mut ctx)
        };
        let Some(outcome) = outcome else {
            return;
        };

        if let DragSubject::Tab(tab) = outcome.subject {
            if !outcome.failed {
                let group = self
                    .doc
                    .tab_line(tab)
                    .and_then(|line| self.doc.enclosing_group(line));
                if let Some(record) = self.records.get_mut(&tab) {
                    record.group_id = group;
                }
            }
            self.prune_group_containers();
        }
        if outcome.failed {
            self.schedule_rerender("a drop was rejected by the browser");
        }

        self.debug_log_event(format!(
            "drop {:?}: moved={} regrouped={} failed={}",
            outcome.subject, outcome.moved, outcome.regrouped, outcome.failed
        ));
        self.after_structural_change("drop");
    }

    /// Drop empty containers and refresh tab counts after lines moved between groups.
    fn prune_group_containers(&mut self) {
        let containers: Vec<_> = self
            .doc
            .children(None)
            .iter()
            .copied()
            .filter(|&n| self.doc.group(n).is_some())
            .collect();
        for container in containers {
            if self.doc.children(Some(container)).is_empty() {
                self.doc.remove(container);
            } else {
                self.groups
                    .refresh_tab_count(&mut self.doc, container, &self.options);
            }
        }
    }

    fn cancel_drag(&mut self, reason: &str) {
        if !self.drag.is_active() {
            return;
        }
        self.drag.cancel(&mut self.doc);
        self.debug_log_event(format!("drag cancelled: {reason}"));
        self.relayout();
    }

    /// Focusable targets in document order.
    pub fn focus_order(&self) -> Vec<Target> {
        let doc = &self.doc;
        doc.document_order()
            .into_iter()
            .filter_map(|id| {
                let node = doc.node(id)?;
                if node.flags.hidden || !node.flags.focusable {
                    return None;
                }
                if let Some(group) = node.as_group() {
                    Some(Target::GroupHeader(group.group_id))
                } else {
                    node.as_line()?.tab_id.map(Target::Tab)
                }
            })
            .collect()
    }

    fn move_focus(&mut self, step: KeyStep) {
        let order = self.focus_order();
        if order.is_empty() {
            self.focus = None;
            return;
        }
        let current = self
            .focus
            .and_then(|target| order.iter().position(|&t| t == target));
        let next = match (current, step) {
            (None, KeyStep::Down) => 0,
            (None, KeyStep::Up) => order.len() - 1,
            (Some(i), KeyStep::Down) => (i + 1).min(order.len() - 1),
            (Some(i), KeyStep::Up) => i.saturating_sub(1),
        };
        self.focus = Some(order[next]);
    }

    /// Point keyboard focus at `target` (the shell forwards focus changes).
    pub fn set_focus(&mut self, target: Option<Target>) {
        self.focus = target;
    }
}
