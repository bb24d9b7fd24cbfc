//! Pointer and keyboard dispatch.
//!
//! A gesture runs from pointer-down to pointer-up. While one is in flight
//! the store is mutated directly and nothing is scheduled for history; the
//! whole gesture is committed once on pointer-up.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use kurbo::{Point, Vec2};
use crate::brush::{self, EraserMode};
use crate::engine::StudioEngine;
use crate::objects::{Layer, LayerId, LayerKind, ShapeKind};
use crate::selection::{self, HitTarget};
use crate::types::{HandleType, Modifiers, PointerButton, Tool};

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    Panning { start: Point, initial_pan: Vec2 },
    /// `collapse_to` is set when the press landed on a layer that was
    /// already part of a multi-selection; releasing without moving then
    /// selects only that layer.
    DraggingLayer { last: Point, collapse_to: Option<LayerId>, moved: bool },
    DraggingBackground { start: Point, initial_offset: Vec2 },
    ResizingLayer { id: LayerId, handle: HandleType, start: Point, initial_scale: f64 },
    DrawingStroke { layer: LayerId },
    DrawingLine { id: LayerId, anchor: Point },
    ErasingMask { layer: LayerId },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Panning { .. } => "panning",
            InteractionState::DraggingLayer { .. } => "draggingLayer",
            InteractionState::DraggingBackground { .. } => "draggingBackground",
            InteractionState::ResizingLayer { .. } => "resizingLayer",
            InteractionState::DrawingStroke { .. } => "drawingStroke",
            InteractionState::DrawingLine { .. } => "drawingLine",
            InteractionState::ErasingMask { .. } => "erasingMask",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }
}

/// A pointer event in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerInput {
    pub fn at(x: f64, y: f64) -> Self {
        PointerInput { position: Point::new(x, y), button: PointerButton::Primary, modifiers: Modifiers::NONE }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

/// What the host should do with pointer capture after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerCapture {
    None,
    Capture,
    Release,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyInput {
    /// DOM `KeyboardEvent.key`.
    pub key: String,
    pub modifiers: Modifiers,
    /// True while a text field owns the keyboard.
    pub text_input_focused: bool,
}

impl KeyInput {
    pub fn new(key: &str, modifiers: Modifiers) -> Self {
        KeyInput { key: key.to_string(), modifiers, text_input_focused: false }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyAction {
    Ignored,
    CloseTransient,
    Undo,
    Redo,
    Delete(usize),
    BrushSize(f64),
    ZOrder,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GuideOrientation {
    Vertical,
    Horizontal,
}

/// Alignment indicator shown while dragging; positions are never adjusted.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct SnapGuide {
    pub orientation: GuideOrientation,
    pub position: f64,
}

impl StudioEngine {
    pub fn interaction_state(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn snap_guides(&self) -> &[SnapGuide] {
        &self.snap_guides
    }

    fn enter(&mut self, state: InteractionState) -> PointerCapture {
        log::debug!("interaction: {} -> {}", self.interaction.name(), state.name());
        let capture = if state.is_idle() { PointerCapture::None } else { PointerCapture::Capture };
        self.interaction = state;
        capture
    }

    pub fn pointer_down(&mut self, input: &PointerInput) -> PointerCapture {
        if !self.interaction.is_idle() {
            // A lost pointer-up; close the old gesture first.
            self.pointer_up(input);
        }
        let screen = input.position;

        if self.space_held || input.button == PointerButton::Middle || self.tool == Tool::Pan {
            let initial_pan = self.viewport.pan_offset;
            return self.enter(InteractionState::Panning { start: screen, initial_pan });
        }
        if input.button != PointerButton::Primary {
            return PointerCapture::None;
        }

        let p = self.viewport.to_canvas(screen, &self.artboard);
        match self.tool {
            Tool::Text => {
                let id = self.store.allocate_id();
                let id = self.store.add(Layer::text(id, p, "Your Text"));
                self.selection.select_only(id);
                self.tool = Tool::Select;
                self.mark_changed();
                return PointerCapture::None;
            }
            Tool::Line => return self.begin_line(p),
            Tool::Brush => return self.begin_brush(p),
            Tool::Eraser => return self.begin_eraser(p),
            Tool::Select | Tool::Pan => {}
        }

        let radius = self.config.handle_radius / self.viewport.zoom;
        match selection::hit_test(&self.store, &self.selection, &self.artboard, p, radius) {
            HitTarget::Handle(id, handle) => {
                let initial_scale = self.store.get(id).map(|l| l.scale).unwrap_or(1.0);
                self.enter(InteractionState::ResizingLayer { id, handle, start: screen, initial_scale })
            }
            HitTarget::Layer(id) => {
                let mut collapse_to = None;
                let selected = if input.modifiers.shift {
                    self.selection.toggle(id)
                } else if self.selection.contains(id) && self.selection.len() > 1 {
                    collapse_to = Some(id);
                    true
                } else {
                    self.selection.select_only(id);
                    true
                };
                let unlocked = self.store.get(id).map(|l| !l.locked).unwrap_or(false);
                if selected && unlocked && self.tool == Tool::Select {
                    self.enter(InteractionState::DraggingLayer { last: screen, collapse_to, moved: false })
                } else {
                    PointerCapture::None
                }
            }
            HitTarget::Background => {
                self.selection.clear();
                let background = self.store.background();
                if background.locked {
                    return PointerCapture::None;
                }
                let initial_offset = background.offset;
                self.enter(InteractionState::DraggingBackground { start: screen, initial_offset })
            }
            HitTarget::Empty => {
                self.selection.clear();
                PointerCapture::None
            }
        }
    }

    fn begin_line(&mut self, p: Point) -> PointerCapture {
        let id = self.store.allocate_id();
        let mut line = Layer::shape(id, p, ShapeKind::Line);
        if let Some(shape) = line.shape_data_mut() {
            shape.stroke_color = self.brush.color.clone();
        }
        let id = self.store.add(line);
        self.selection.select_only(id);
        self.enter(InteractionState::DrawingLine { id, anchor: p })
    }

    // Canvas point in the stroke space of a drawing layer.
    fn surface_point(&self, layer: LayerId, p: Point) -> Point {
        self.store.get(layer).map(|l| l.to_surface(p)).unwrap_or(p)
    }

    fn begin_brush(&mut self, p: Point) -> PointerCapture {
        let layer = match brush::brush_target(&self.store, &self.selection) {
            Some(id) => id,
            None => {
                let id = self.store.allocate_id();
                let id = self.store.add(Layer::drawing(id, &self.artboard));
                self.selection.select_only(id);
                id
            }
        };
        let stroke = brush::begin_stroke(&self.brush, self.surface_point(layer, p));
        let _ = self.store.modify(layer, |l| {
            if let LayerKind::Drawing(d) = &mut l.kind {
                d.strokes.push(stroke);
            }
        });
        self.enter(InteractionState::DrawingStroke { layer })
    }

    fn begin_eraser(&mut self, p: Point) -> PointerCapture {
        match brush::eraser_mode(&self.store, &self.selection) {
            Some(EraserMode::Mask(layer)) => {
                let stroke = brush::begin_mask_stroke(&self.brush, p);
                let _ = self.store.modify(layer, |l| {
                    if let Some(mask) = l.mask_strokes_mut() {
                        mask.push(stroke);
                    }
                });
                self.enter(InteractionState::ErasingMask { layer })
            }
            Some(EraserMode::Surface(layer)) => {
                let at = self.surface_point(layer, p);
                let stroke = brush::begin_surface_eraser(&self.brush, &self.config.canvas_background, at);
                let _ = self.store.modify(layer, |l| {
                    if let LayerKind::Drawing(d) = &mut l.kind {
                        d.strokes.push(stroke);
                    }
                });
                self.enter(InteractionState::DrawingStroke { layer })
            }
            None => PointerCapture::None,
        }
    }

    pub fn pointer_move(&mut self, input: &PointerInput) {
        let current = input.position;
        match self.interaction.clone() {
            InteractionState::Idle => {}
            InteractionState::Panning { start, initial_pan } => {
                self.viewport.pan_offset = initial_pan + (current - start);
            }
            InteractionState::DraggingBackground { start, initial_offset } => {
                let offset = initial_offset + self.viewport.delta_to_canvas(current - start);
                self.store.modify_background(|bg| bg.offset = offset);
            }
            InteractionState::ResizingLayer { id, start, initial_scale, .. } => {
                let scale = (initial_scale + (current.x - start.x) * self.config.resize_sensitivity)
                    .max(self.config.min_layer_scale);
                let _ = self.store.modify(id, |l| l.scale = scale);
            }
            InteractionState::DraggingLayer { last, collapse_to, moved } => {
                let delta = self.viewport.delta_to_canvas(current - last);
                let ids: Vec<LayerId> = self.selection.ids().to_vec();
                self.store.modify_each(&ids, |l| {
                    if !l.locked {
                        l.x += delta.x;
                        l.y += delta.y;
                    }
                });
                self.interaction = InteractionState::DraggingLayer { last: current, collapse_to, moved: moved || current != last };
                self.update_snap_guides();
            }
            InteractionState::DrawingStroke { layer } => {
                let p = self.surface_point(layer, self.viewport.to_canvas(current, &self.artboard));
                let _ = self.store.modify(layer, |l| {
                    if let LayerKind::Drawing(d) = &mut l.kind {
                        if let Some(stroke) = d.strokes.last_mut() {
                            stroke.points.push(p);
                        }
                    }
                });
            }
            InteractionState::ErasingMask { layer } => {
                let p = self.viewport.to_canvas(current, &self.artboard);
                let _ = self.store.modify(layer, |l| {
                    if let Some(stroke) = l.mask_strokes_mut().and_then(|m| m.last_mut()) {
                        stroke.points.push(p);
                    }
                });
            }
            InteractionState::DrawingLine { id, anchor } => {
                let p = self.viewport.to_canvas(current, &self.artboard);
                let (center, length, rotation) = brush::line_geometry(anchor, p);
                let _ = self.store.modify(id, |l| {
                    l.x = center.x;
                    l.y = center.y;
                    l.rotation = rotation;
                    if let Some(shape) = l.shape_data_mut() {
                        shape.width = length;
                    }
                });
            }
        }
    }

    pub fn pointer_up(&mut self, _input: &PointerInput) -> PointerCapture {
        if let InteractionState::DraggingLayer { collapse_to: Some(id), moved: false, .. } = self.interaction {
            self.selection.select_only(id);
        }
        if !self.interaction.is_idle() {
            self.enter(InteractionState::Idle);
            self.mark_changed();
        }
        self.snap_guides.clear();
        PointerCapture::Release
    }

    fn update_snap_guides(&mut self) {
        self.snap_guides.clear();
        let [id] = self.selection.ids() else { return };
        let Some(layer) = self.store.get(*id) else { return };
        let threshold = self.config.snap_threshold;
        let (w, h) = (self.artboard.width, self.artboard.height);
        for x in [0.0, w / 2.0, w] {
            if (layer.x - x).abs() <= threshold {
                self.snap_guides.push(SnapGuide { orientation: GuideOrientation::Vertical, position: x });
            }
        }
        for y in [0.0, h / 2.0, h] {
            if (layer.y - y).abs() <= threshold {
                self.snap_guides.push(SnapGuide { orientation: GuideOrientation::Horizontal, position: y });
            }
        }
    }

    pub fn key_down(&mut self, input: &KeyInput) -> KeyAction {
        if input.text_input_focused {
            return KeyAction::Ignored;
        }
        let command = input.modifiers.command();
        match input.key.as_str() {
            " " => {
                self.space_held = true;
                KeyAction::Ignored
            }
            "Escape" => KeyAction::CloseTransient,
            "z" | "Z" if command => {
                if input.modifiers.shift {
                    self.redo();
                    KeyAction::Redo
                } else {
                    self.undo();
                    KeyAction::Undo
                }
            }
            "Delete" | "Backspace" => KeyAction::Delete(self.delete_selection()),
            "+" | "=" if !command => KeyAction::BrushSize(self.step_brush_size(true)),
            "-" | "_" if !command => KeyAction::BrushSize(self.step_brush_size(false)),
            "ArrowUp" if command => {
                self.move_primary(true);
                KeyAction::ZOrder
            }
            "ArrowDown" if command => {
                self.move_primary(false);
                KeyAction::ZOrder
            }
            _ => KeyAction::Ignored,
        }
    }

    pub fn key_up(&mut self, input: &KeyInput) {
        if input.key == " " {
            self.space_held = false;
        }
    }
}

#[wasm_bindgen]
impl StudioEngine {
    /// Returns true when the host should capture the pointer.
    pub fn on_pointer_down(&mut self, x: f64, y: f64, button: i16, shift: bool, ctrl: bool, meta: bool) -> bool {
        let input = PointerInput {
            position: Point::new(x, y),
            button: PointerButton::from_dom(button),
            modifiers: Modifiers { shift, ctrl, meta, alt: false },
        };
        self.pointer_down(&input) == PointerCapture::Capture
    }

    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        self.pointer_move(&PointerInput::at(x, y));
    }

    pub fn on_pointer_up(&mut self, x: f64, y: f64) {
        self.pointer_up(&PointerInput::at(x, y));
    }

    /// Returns the action name, or an empty string if the key was not
    /// handled (the host should then leave the event alone).
    pub fn on_key_down(&mut self, key: &str, shift: bool, ctrl: bool, meta: bool, text_input_focused: bool) -> String {
        let input = KeyInput {
            key: key.to_string(),
            modifiers: Modifiers { shift, ctrl, meta, alt: false },
            text_input_focused,
        };
        match self.key_down(&input) {
            KeyAction::Ignored => String::new(),
            KeyAction::CloseTransient => "close".to_string(),
            KeyAction::Undo => "undo".to_string(),
            KeyAction::Redo => "redo".to_string(),
            KeyAction::Delete(_) => "delete".to_string(),
            KeyAction::BrushSize(_) => "brush_size".to_string(),
            KeyAction::ZOrder => "z_order".to_string(),
        }
    }

    pub fn on_key_up(&mut self, key: &str) {
        self.key_up(&KeyInput::new(key, Modifiers::NONE));
    }

    pub fn get_interaction_state(&self) -> String {
        self.interaction.name().to_string()
    }

    pub fn get_snap_guides(&self) -> String {
        serde_json::to_string(&self.snap_guides).unwrap_or_else(|_| "[]".to_string())
    }
}
