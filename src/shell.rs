//! Thin egui presentation shell: paints the laid-out document and turns egui input into
//! [`BoardInput`]s.
//!
//! The scroll area keeps its id across frames, so the scroll position survives full re-renders.

use std::time::Duration;

use egui::{Align2, Color32, FontId, Mesh, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, Vec2, pos2};

use crate::board::TabBoard;
use crate::browser::BrowserSession;
use crate::document::{ListDocument, NodeFlags, NodeKind, Slot, TabLine};
use crate::drag::DragModality;
use crate::model::TabId;
use crate::input::{BoardInput, LineAction, Target};
use crate::options::{Options, ThemeGradient};
use crate::selection::{DialogHost, SelectionMode};
use crate::store::KeyValueStore;
use crate::tab_lines::DEFAULT_FAVICON;

/// Draw the board and feed this frame's input to it. `now` is seconds since the unix epoch.
pub fn show<B, K, D>(ui: &mut Ui, board: &mut TabBoard<B, K, D>, now: f64)
where
    B: BrowserSession,
    K: KeyValueStore,
    D: DialogHost,
{
    board.update(now);

    let dark_mode = ui.visuals().dark_mode;
    paint_background(ui, ui.max_rect(), board.options().gradient(dark_mode));

    let mut inputs: Vec<BoardInput> = Vec::new();
    collect_keyboard(ui, board, &mut inputs);

    let previous_offset = board.scroll_offset();
    egui::ScrollArea::vertical()
        .id_salt("tabboard_list")
        .auto_shrink([false, false])
        .show_viewport(ui, |ui, viewport| {
            let width = board.tuning().list_width.min(ui.available_width());
            let height = board.document().content_height();
            ui.set_height(height);
            ui.set_width(width);

            let origin = ui.min_rect().min;
            if (viewport.min.y - previous_offset).abs() > f32::EPSILON {
                inputs.push(BoardInput::Scroll {
                    offset: viewport.min.y,
                });
            }

            let painter = ListPainter {
                origin,
                options: board.options(),
                focus: board.focus(),
            };
            let visible = viewport.translate(origin.to_vec2());
            painter.paint(ui, board.document(), visible, &mut inputs);

            let pointer_y = |pos: Pos2| pos.y - origin.y - viewport.min.y;
            if board.drag().modality() == Some(DragModality::Pointer) {
                let (pointer, released) =
                    ui.input(|i| (i.pointer.interact_pos(), i.pointer.any_released()));
                if let Some(pos) = pointer {
                    inputs.push(BoardInput::DragMove {
                        pointer_y: pointer_y(pos),
                    });
                }
                if released {
                    inputs.push(BoardInput::DragRelease);
                }
            }
            for input in &mut inputs {
                if let BoardInput::DragStart { pointer_y: y, .. } = input {
                    *y -= origin.y + viewport.min.y;
                }
            }
        });

    for input in inputs {
        board.handle_input(input, now);
    }

    if let Some(deadline) = board.next_deadline() {
        let wait = (deadline - now).max(0.0);
        ui.ctx().request_repaint_after(Duration::from_secs_f64(wait));
    }
}

fn collect_keyboard<B, K, D>(ui: &Ui, board: &TabBoard<B, K, D>, inputs: &mut Vec<BoardInput>)
where
    B: BrowserSession,
    K: KeyValueStore,
    D: DialogHost,
{
    ui.input(|i| {
        for event in &i.events {
            match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => inputs.push(BoardInput::Key {
                    key: *key,
                    modifiers: *modifiers,
                    timestamp: i.time,
                }),
                egui::Event::WindowFocused(false) => inputs.push(BoardInput::FocusLost),
                _ => {}
            }
        }
        if board.selection().mode() == Some(SelectionMode::Modifier) && !i.modifiers.shift {
            inputs.push(BoardInput::ModifierChanged { held: false });
        }
    });
}

/// Linear gradient at a CSS-style angle (0° points up, 90° right).
fn paint_background(ui: &Ui, rect: Rect, gradient: ThemeGradient) {
    let angle = gradient.angle_degrees.to_radians();
    let direction = Vec2::new(angle.sin(), -angle.cos());
    let center = rect.center();
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    let extent = corners
        .iter()
        .map(|c| (*c - center).dot(direction).abs())
        .fold(f32::EPSILON, f32::max);

    let mut mesh = Mesh::default();
    for corner in corners {
        let t = ((corner - center).dot(direction) / extent + 1.0) * 0.5;
        mesh.colored_vertex(corner, mix(gradient.start, gradient.end, t));
    }
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    ui.painter().add(mesh);
}

fn vertical_gradient(rect: Rect, top: Color32, bottom: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    mesh.colored_vertex(rect.left_top(), top);
    mesh.colored_vertex(rect.right_top(), top);
    mesh.colored_vertex(rect.right_bottom(), bottom);
    mesh.colored_vertex(rect.left_bottom(), bottom);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    mesh
}

fn mix(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let channel = |x: u8, y: u8| (f32::from(x) + (f32::from(y) - f32::from(x)) * t).round() as u8;
    Color32::from_rgba_unmultiplied(
        channel(a.r(), b.r()),
        channel(a.g(), b.g()),
        channel(a.b(), b.b()),
        channel(a.a(), b.a()),
    )
}

const BUTTON_SIZE: f32 = 20.0;
const BUTTON_GAP: f32 = 4.0;

/// Action buttons of a line, right-aligned, close outermost.
fn action_button_rects(line: Rect) -> [(LineAction, Rect); 3] {
    let size = BUTTON_SIZE.min(line.height());
    LineAction::ALL.map(|action| {
        let slot = match action {
            LineAction::Close => 0.0,
            LineAction::Reload => 1.0,
            LineAction::Discard => 2.0,
        };
        let right = line.right() - 8.0 - slot * (size + BUTTON_GAP);
        let rect = Rect::from_center_size(
            pos2(right - size * 0.5, line.center().y),
            Vec2::splat(size),
        );
        (action, rect)
    })
}

struct ListPainter<'a> {
    origin: Pos2,
    options: &'a Options,
    focus: Option<Target>,
}

impl ListPainter<'_> {
    fn paint(&self, ui: &Ui, doc: &ListDocument, visible: Rect, inputs: &mut Vec<BoardInput>) {
        for id in doc.document_order() {
            let Some(node) = doc.node(id) else {
                continue;
            };
            let rect = node.rect.translate(self.origin.to_vec2());
            if node.flags.hidden || rect.height() <= 0.0 || !rect.intersects(visible) {
                continue;
            }
            let clip = match doc.slot(id) {
                Slot::Group(container) => doc
                    .node(container)
                    .map_or(rect, |c| c.rect.translate(self.origin.to_vec2())),
                _ => rect,
            };

            match &node.kind {
                NodeKind::Placeholder => self.paint_placeholder(ui, rect),
                NodeKind::Group(group) => {
                    let target = Target::GroupHeader(group.group_id);
                    let header = group.header_rect.translate(self.origin.to_vec2());
                    let paint = group.paint;
                    let painter = ui.painter();
                    if let Some(paint) = paint {
                        painter.rect_filled(header, 6.0, paint.header);
                        let content = Rect::from_min_max(pos2(rect.min.x, header.max.y), rect.max);
                        if content.height() > 0.0 {
                            painter.add(vertical_gradient(
                                content,
                                paint.content_top,
                                paint.content_bottom,
                            ));
                        }
                    }
                    let arrow = if group.collapsed { "▸" } else { "▾" };
                    let title = match group.tab_count {
                        Some(count) => format!("{arrow} {}  ({count})", group.title),
                        None => format!("{arrow} {}", group.title),
                    };
                    painter.text(
                        header.left_center() + Vec2::new(8.0, 0.0),
                        Align2::LEFT_CENTER,
                        title,
                        FontId::proportional(self.options.title_font_size),
                        Color32::WHITE,
                    );
                    self.paint_flags(ui, header, node.flags, target);
                    self.interact(ui, header, target, inputs);
                }
                NodeKind::TabLine(line) => {
                    let Some(tab) = line.tab_id else {
                        continue;
                    };
                    let target = Target::Tab(tab);
                    let visible_rect = rect.intersect(clip);
                    if visible_rect.height() <= 0.0 {
                        continue;
                    }
                    self.paint_line(ui, rect, visible_rect, line, node.flags);
                    self.paint_flags(ui, visible_rect, node.flags, target);
                    if node.flags.focusable {
                        self.interact(ui, visible_rect, target, inputs);
                        if !node.flags.dragging {
                            self.line_buttons(ui, rect, visible_rect, tab, inputs);
                        }
                    }
                }
            }
        }
    }

    fn interact(&self, ui: &Ui, rect: Rect, target: Target, inputs: &mut Vec<BoardInput>) {
        let response = ui.interact(rect, ui.id().with(("tabboard", target)), Sense::click_and_drag());
        if response.clicked() {
            inputs.push(BoardInput::Click {
                target,
                modifiers: ui.input(|i| i.modifiers),
            });
        }
        if response.drag_started() {
            if let Some(pos) = ui.input(|i| i.pointer.interact_pos()) {
                // Made relative to the viewport by the caller.
                inputs.push(BoardInput::DragStart {
                    target,
                    pointer_y: pos.y,
                });
            }
        }
    }

    /// Close, discard and reload buttons. Registered after the line so they win the hit test.
    fn line_buttons(&self, ui: &Ui, rect: Rect, clip: Rect, tab: TabId, inputs: &mut Vec<BoardInput>) {
        let visuals = ui.visuals();
        let painter = ui.painter().with_clip_rect(clip);
        for (action, button) in action_button_rects(rect) {
            let button = button.intersect(clip);
            if button.height() <= 0.0 {
                continue;
            }
            let response = ui.interact(button, ui.id().with(("tabboard", tab, action)), Sense::click());
            if response.hovered() {
                painter.rect_filled(button, 3.0, visuals.widgets.hovered.bg_fill);
            }
            let glyph = match action {
                LineAction::Close => "✕",
                LineAction::Discard => "💤",
                LineAction::Reload => "⟳",
            };
            painter.text(
                button.center(),
                Align2::CENTER_CENTER,
                glyph,
                FontId::proportional(self.options.info_font_size),
                visuals.text_color(),
            );
            if response.clicked() {
                inputs.push(BoardInput::LineAction { tab, action });
            }
        }
    }

    fn paint_line(&self, ui: &Ui, rect: Rect, clip: Rect, line: &TabLine, flags: NodeFlags) {
        let painter = ui.painter().with_clip_rect(clip);
        let visuals = ui.visuals();
        let mut fill = visuals.extreme_bg_color.gamma_multiply(0.85);
        if flags.dragging {
            fill = fill.gamma_multiply(0.4);
        }
        painter.rect_filled(rect.shrink2(Vec2::new(4.0, 2.0)), 4.0, fill);

        let icon_center = rect.left_center() + Vec2::new(20.0, 0.0);
        let mut icon_color = if line.favicon == DEFAULT_FAVICON {
            visuals.weak_text_color()
        } else {
            visuals.strong_text_color()
        };
        if self.options.invert_favicon_colors {
            icon_color = Color32::from_rgb(255 - icon_color.r(), 255 - icon_color.g(), 255 - icon_color.b());
        }
        painter.circle_filled(icon_center, 8.0, icon_color);

        let text_left = rect.left() + 36.0;
        let text_color = if line.discarded {
            visuals.weak_text_color()
        } else {
            visuals.text_color()
        };
        let title_font = FontId::proportional(self.options.title_font_size);
        let info_font = FontId::proportional(self.options.info_font_size);
        let mut badges = String::new();
        for (on, badge) in [
            (line.pinned, "📌"),
            (line.audible && !line.muted, "🔊"),
            (line.muted, "🔇"),
            (flags.loading, "⟳"),
        ] {
            if on {
                badges.push_str(badge);
            }
        }

        if flags.compact {
            painter.text(
                pos2(text_left, rect.center().y),
                Align2::LEFT_CENTER,
                &line.title,
                title_font,
                text_color,
            );
        } else {
            painter.text(
                pos2(text_left, rect.center().y - 2.0),
                Align2::LEFT_BOTTOM,
                &line.title,
                title_font,
                text_color,
            );
            painter.text(
                pos2(text_left, rect.center().y + 2.0),
                Align2::LEFT_TOP,
                &line.url,
                info_font.clone(),
                visuals.weak_text_color(),
            );
        }
        let info_right = action_button_rects(rect)
            .iter()
            .map(|(_, button)| button.left())
            .fold(rect.right(), f32::min);
        painter.text(
            pos2(info_right - 6.0, rect.center().y),
            Align2::RIGHT_CENTER,
            format!("{badges} {}", line.last_accessed),
            info_font,
            visuals.weak_text_color(),
        );
    }

    fn paint_flags(&self, ui: &Ui, rect: Rect, flags: NodeFlags, target: Target) {
        let visuals = ui.visuals();
        if flags.selected {
            ui.painter().rect(
                rect.shrink(1.0),
                4.0,
                visuals.selection.bg_fill.gamma_multiply(0.35),
                visuals.selection.stroke,
                StrokeKind::Inside,
            );
        }
        if self.focus == Some(target) {
            ui.painter().rect_stroke(
                rect.shrink(1.0),
                4.0,
                Stroke::new(2.0, visuals.strong_text_color()),
                StrokeKind::Inside,
            );
        }
    }

    fn paint_placeholder(&self, ui: &Ui, rect: Rect) {
        let visuals = ui.visuals();
        ui.painter().rect(
            rect.shrink2(Vec2::new(4.0, 1.0)),
            3.0,
            visuals.selection.bg_fill.gamma_multiply(0.3),
            visuals.selection.stroke,
            StrokeKind::Inside,
        );
    }
}
