//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! This module defines the types consumed by the input engine. `Tool` and
//! `Modifiers` capture the user's intent at the time of a pointer event.
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up, carrying all context needed to compute incremental deltas and
//! emit the final shape mutation on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::str::FromStr;

use wire::{Shape, ShapeId};

use crate::camera::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Select and drag existing shapes (default).
    #[default]
    Pointer,
    /// Freehand stroke.
    Pencil,
    /// Axis-aligned rectangle.
    Rect,
    /// Circle sized by the drag distance from its center.
    Circle,
    /// Straight line segment.
    Line,
    /// Single line of text placed at the click point.
    Text,
    /// Delete the topmost shape under the click.
    Eraser,
    /// Pan the camera.
    Grab,
}

impl Tool {
    /// Whether this tool creates a shape by dragging out a preview.
    #[must_use]
    pub fn is_drawing(self) -> bool {
        matches!(self, Self::Pencil | Self::Rect | Self::Circle | Self::Line)
    }
}

/// A toolbar selection: either a persistent tool or a one-shot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Tool(Tool),
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
}

/// Toolbar string that names no known tool or command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolChoice {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = match s {
            "pointer" | "select" => Self::Tool(Tool::Pointer),
            "pencil" => Self::Tool(Tool::Pencil),
            "rect" => Self::Tool(Tool::Rect),
            "circle" => Self::Tool(Tool::Circle),
            "line" => Self::Tool(Tool::Line),
            "text" => Self::Tool(Tool::Text),
            "eraser" => Self::Tool(Tool::Eraser),
            "grab" => Self::Tool(Tool::Grab),
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "zoom-in" => Self::ZoomIn,
            "zoom-out" => Self::ZoomOut,
            other => return Err(UnknownTool(other.to_owned())),
        };
        Ok(choice)
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"z"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// The shape grabbed by the pointer tool, if any.
    pub selected_id: Option<ShapeId>,
}

/// Synchronous source of text for the text tool.
///
/// Returns `None` when the user cancels.
pub trait TextPrompt {
    fn prompt_text(&mut self) -> Option<String>;
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// emit final actions on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The camera follows the pointer.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// An existing shape follows the pointer.
    Dragging {
        /// Id of the shape being dragged.
        id: ShapeId,
        /// Pointer position minus the shape's anchor, in world space.
        grab_offset: Point,
        /// Whether any move has been applied yet (history is recorded lazily).
        moved: bool,
    },
    /// A new shape is being sized.
    Drawing {
        /// World-space position of the pointer-down.
        start_world: Point,
        /// Live preview of the shape that pointer-up will commit.
        preview: Shape,
    },
    /// The text tool is waiting for pointer-up to ask for content.
    TextEntry {
        /// World-space baseline origin of the new text.
        origin: Point,
    },
}
