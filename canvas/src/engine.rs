use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use wire::{ClientMessage, ServerMessage, Shape, WireError};

use crate::camera::{Camera, Point};
use crate::consts::ZOOM_STEP;
use crate::doc::{RemoteEvent, ShapeStore};
use crate::history::History;
use crate::hit;
use crate::input::{Button, InputState, Key, Modifiers, TextPrompt, Tool, ToolChoice, UiState, WheelDelta};
use crate::render;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Forward this envelope to the server.
    Send(ClientMessage),
    /// The scene changed; redraw.
    RenderNeeded,
}

/// Prompt that always cancels. Used until the host installs a real one.
struct NoPrompt;

impl TextPrompt for NoPrompt {
    fn prompt_text(&mut self) -> Option<String> {
        None
    }
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub doc: ShapeStore,
    pub camera: Camera,
    pub history: History,
    pub ui: UiState,
    pub input: InputState,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
    room: String,
    prompt: Box<dyn TextPrompt>,
}

impl EngineCore {
    /// Engine for the room with the given slug.
    #[must_use]
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            doc: ShapeStore::new(),
            camera: Camera::default(),
            history: History::new(),
            ui: UiState::default(),
            input: InputState::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
            room: room.into(),
            prompt: Box::new(NoPrompt),
        }
    }

    /// Install the text source used by the text tool.
    pub fn set_text_prompt(&mut self, prompt: Box<dyn TextPrompt>) {
        self.prompt = prompt;
    }

    // --- Session ---

    /// Room slug this engine is bound to.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Envelope announcing this client to the room.
    #[must_use]
    pub fn join_message(&self) -> ClientMessage {
        ClientMessage::JoinRoom { room_id: self.room.clone() }
    }

    /// Best-effort envelope sent when the room view closes.
    #[must_use]
    pub fn leave_message(&self) -> ClientMessage {
        ClientMessage::LeaveRoom { room_id: self.room.clone() }
    }

    // --- Data inputs ---

    /// Replace the document with the persisted shapes fetched on load.
    ///
    /// Must run before any live envelope is applied. Clears history and any
    /// gesture in progress.
    pub fn seed(&mut self, shapes: Vec<Shape>) {
        self.doc.load(shapes);
        self.history.clear();
        self.input = InputState::Idle;
        self.ui.selected_id = None;
    }

    /// Merge one server broadcast into the document.
    ///
    /// Remote changes never enter local history.
    pub fn apply_remote(&mut self, message: ServerMessage) -> Vec<Action> {
        let Some(event) = RemoteEvent::from_message(message) else {
            return Vec::new();
        };
        if let RemoteEvent::Removed(id) = &event {
            if self.ui.selected_id.as_ref() == Some(id) {
                self.ui.selected_id = None;
                self.input = InputState::Idle;
            }
        }
        if self.doc.apply(event) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Decode and merge one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the frame is not a valid server envelope.
    pub fn apply_remote_frame(&mut self, text: &str) -> Result<Vec<Action>, WireError> {
        let message = wire::decode_server(text)?;
        Ok(self.apply_remote(message))
    }

    // --- Tool / history ---

    /// Set the active tool, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
        self.cancel_gesture();
    }

    /// Apply a toolbar selection. One-shot commands run immediately and leave
    /// the pointer tool active.
    pub fn choose(&mut self, choice: ToolChoice) -> Vec<Action> {
        let changed = match choice {
            ToolChoice::Tool(tool) => {
                self.set_tool(tool);
                return Vec::new();
            }
            ToolChoice::Undo => self.undo(),
            ToolChoice::Redo => self.redo(),
            ToolChoice::ZoomIn => self.camera.zoom_by(ZOOM_STEP),
            ToolChoice::ZoomOut => self.camera.zoom_by(1.0 / ZOOM_STEP),
        };
        self.set_tool(Tool::Pointer);
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Restore the state before the last local mutation. Local only.
    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        self.history.undo(&mut self.doc)
    }

    /// Re-apply the last undone state. Local only.
    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        self.history.redo(&mut self.doc)
    }

    // --- Viewport ---

    /// Update viewport dimensions and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button == Button::Middle {
            self.input = InputState::Panning { last_screen: screen_pt };
            return Vec::new();
        }
        if button != Button::Primary {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen_pt);
        match self.ui.tool {
            Tool::Grab => {
                self.input = InputState::Panning { last_screen: screen_pt };
                Vec::new()
            }
            Tool::Pointer => self.begin_drag(world),
            Tool::Pencil | Tool::Rect | Tool::Circle | Tool::Line => {
                let preview = new_preview(self.ui.tool, world);
                self.input = InputState::Drawing { start_world: world, preview };
                vec![Action::RenderNeeded]
            }
            Tool::Text => {
                self.input = InputState::TextEntry { origin: world };
                Vec::new()
            }
            Tool::Eraser => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        if matches!(self.input, InputState::Dragging { .. }) {
            return self.drag_to(world);
        }
        match &mut self.input {
            InputState::Panning { last_screen } => {
                let dx = screen_pt.x - last_screen.x;
                let dy = screen_pt.y - last_screen.y;
                *last_screen = screen_pt;
                self.camera.pan(dx, dy);
                vec![Action::RenderNeeded]
            }
            InputState::Drawing { start_world, preview } => {
                extend_preview(preview, *start_world, world);
                vec![Action::RenderNeeded]
            }
            InputState::Idle | InputState::Dragging { .. } | InputState::TextEntry { .. } => Vec::new(),
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        match std::mem::take(&mut self.input) {
            InputState::Idle => {
                if button == Button::Primary && self.ui.tool == Tool::Eraser {
                    self.erase_at(world)
                } else {
                    Vec::new()
                }
            }
            InputState::Panning { .. } => Vec::new(),
            InputState::Dragging { .. } => {
                self.ui.selected_id = None;
                vec![Action::RenderNeeded]
            }
            InputState::Drawing { start_world, preview } if button != Button::Primary => {
                self.input = InputState::Drawing { start_world, preview };
                Vec::new()
            }
            InputState::Drawing { start_world, mut preview } => {
                extend_preview(&mut preview, start_world, world);
                match finalize(preview) {
                    Some(shape) => self.commit(shape),
                    None => vec![Action::RenderNeeded],
                }
            }
            InputState::TextEntry { origin } => match self.prompt.prompt_text() {
                Some(text) if !text.is_empty() => {
                    let shape = Shape::Text { id: new_shape_id(), x: origin.x, y: origin.y, text };
                    self.commit(shape)
                }
                _ => Vec::new(),
            },
        }
    }

    /// Wheel zooms one step around the cursor.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        let factor = if delta.dy < 0.0 {
            ZOOM_STEP
        } else if delta.dy > 0.0 {
            1.0 / ZOOM_STEP
        } else {
            return Vec::new();
        };
        if self.camera.zoom_at(screen_pt, factor) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        let name = key.0.to_ascii_lowercase();
        let changed = match name.as_str() {
            "escape" => {
                let active = !matches!(self.input, InputState::Idle);
                self.cancel_gesture();
                active
            }
            "z" if modifiers.command() && modifiers.shift => self.redo(),
            "z" if modifiers.command() => self.undo(),
            "y" if modifiers.command() => self.redo(),
            _ => false,
        };
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    pub fn on_key_up(&mut self, _key: Key, _modifiers: Modifiers) -> Vec<Action> {
        Vec::new()
    }

    // --- Queries ---

    /// Shapes in draw order.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        self.doc.shapes()
    }

    /// Look up a shape by id.
    #[must_use]
    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.doc.get(id)
    }

    /// The shape currently grabbed by the pointer tool, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.ui.selected_id.as_deref()
    }

    /// The uncommitted shape being drawn, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&Shape> {
        match &self.input {
            InputState::Drawing { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// The current camera state.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    // --- Internals ---

    fn begin_drag(&mut self, world: Point) -> Vec<Action> {
        let Some(shape) = hit::topmost_hit(&self.doc, world) else {
            return Vec::new();
        };
        let anchor = shape.anchor();
        let id = shape.id().to_owned();
        self.ui.selected_id = Some(id.clone());
        self.input = InputState::Dragging {
            id,
            grab_offset: Point::new(world.x - anchor.x, world.y - anchor.y),
            moved: false,
        };
        vec![Action::RenderNeeded]
    }

    fn drag_to(&mut self, world: Point) -> Vec<Action> {
        let InputState::Dragging { id, grab_offset, moved } = &mut self.input else {
            return Vec::new();
        };
        let Some(current) = self.doc.get(id) else {
            self.input = InputState::Idle;
            self.ui.selected_id = None;
            return Vec::new();
        };

        let anchor = current.anchor();
        let dx = world.x - grab_offset.x - anchor.x;
        let dy = world.y - grab_offset.y - anchor.y;
        if dx == 0.0 && dy == 0.0 {
            return Vec::new();
        }

        let mut shape = current.clone();
        if !*moved {
            *moved = true;
            self.history.record_before_mutation(&self.doc);
        }
        shape.translate(dx, dy);
        self.doc.upsert(shape.clone());
        vec![Action::Send(ClientMessage::MoveShape { room_id: self.room.clone(), shape }), Action::RenderNeeded]
    }

    fn erase_at(&mut self, world: Point) -> Vec<Action> {
        let Some(id) = hit::topmost_hit(&self.doc, world).map(|s| s.id().to_owned()) else {
            return Vec::new();
        };
        self.history.record_before_mutation(&self.doc);
        self.doc.remove(&id);
        vec![
            Action::Send(ClientMessage::DeleteShape { room_id: self.room.clone(), shape_id: id }),
            Action::RenderNeeded,
        ]
    }

    fn commit(&mut self, shape: Shape) -> Vec<Action> {
        self.history.record_before_mutation(&self.doc);
        self.doc.insert(shape.clone());
        vec![Action::Send(ClientMessage::Draw { room_id: self.room.clone(), shape }), Action::RenderNeeded]
    }

    fn cancel_gesture(&mut self) {
        self.input = InputState::Idle;
        self.ui.selected_id = None;
    }
}

fn new_shape_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Zero-extent preview for a drawing tool at `start`.
fn new_preview(tool: Tool, start: Point) -> Shape {
    let id = new_shape_id();
    match tool {
        Tool::Rect => Shape::Rect { id, x: start.x, y: start.y, width: 0.0, height: 0.0 },
        Tool::Circle => Shape::Circle { id, center_x: start.x, center_y: start.y, radius: 0.0 },
        Tool::Line => Shape::Line { id, x1: start.x, y1: start.y, x2: start.x, y2: start.y },
        _ => Shape::Freehand { id, points: vec![start] },
    }
}

/// Grow a preview toward the current pointer position.
fn extend_preview(preview: &mut Shape, start: Point, current: Point) {
    match preview {
        Shape::Rect { width, height, .. } => {
            *width = current.x - start.x;
            *height = current.y - start.y;
        }
        Shape::Circle { radius, .. } => {
            *radius = (current.x - start.x).hypot(current.y - start.y);
        }
        Shape::Line { x2, y2, .. } => {
            *x2 = current.x;
            *y2 = current.y;
        }
        Shape::Freehand { points, .. } => {
            if points.last() != Some(&current) {
                points.push(current);
            }
        }
        Shape::Text { .. } => {}
    }
}

/// Turn a finished preview into the shape to commit, or `None` for a pure click.
fn finalize(preview: Shape) -> Option<Shape> {
    match preview {
        Shape::Rect { id, x, y, width, height } => {
            if width == 0.0 || height == 0.0 {
                return None;
            }
            Some(Shape::Rect {
                id,
                x: x.min(x + width),
                y: y.min(y + height),
                width: width.abs(),
                height: height.abs(),
            })
        }
        Shape::Circle { radius, .. } if radius == 0.0 => None,
        Shape::Line { x1, y1, x2, y2, .. } if x1 == x2 && y1 == y2 => None,
        shape => Some(shape),
    }
}

// =============================================================
// Browser shell
// =============================================================

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn device_pixels(css: f64, dpr: f64) -> u32 {
    (css * dpr).round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Text prompt backed by `window.prompt`.
struct WindowPrompt;

impl TextPrompt for WindowPrompt {
    fn prompt_text(&mut self) -> Option<String> {
        let window = web_sys::window()?;
        match window.prompt_with_message("Enter text") {
            Ok(text) => text,
            Err(err) => {
                web_sys::console::warn_2(&"text prompt unavailable".into(), &err);
                None
            }
        }
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element and room slug.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, room: impl Into<String>) -> Self {
        let mut core = EngineCore::new(room);
        core.set_text_prompt(Box::new(WindowPrompt));
        Self { canvas, core }
    }

    // --- Delegated data inputs ---

    pub fn seed(&mut self, shapes: Vec<Shape>) {
        self.core.seed(shapes);
    }

    pub fn apply_remote(&mut self, message: ServerMessage) -> Vec<Action> {
        self.core.apply_remote(message)
    }

    /// # Errors
    ///
    /// Returns [`WireError`] if the frame is not a valid server envelope.
    pub fn apply_remote_frame(&mut self, text: &str) -> Result<Vec<Action>, WireError> {
        self.core.apply_remote_frame(text)
    }

    pub fn choose(&mut self, choice: ToolChoice) -> Vec<Action> {
        self.core.choose(choice)
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.core.set_tool(tool);
    }

    #[must_use]
    pub fn leave_message(&self) -> ClientMessage {
        self.core.leave_message()
    }

    // --- Viewport ---

    /// Update viewport dimensions and resize the backing store to match.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
        self.canvas.set_width(device_pixels(width_css, self.core.dpr));
        self.canvas.set_height(device_pixels(height_css, self.core.dpr));
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn on_key_up(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_up(key, modifiers)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        render::draw(&ctx, &self.core)
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.core.selection()
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.core.camera()
    }

    #[must_use]
    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.core.shape(id)
    }
}
