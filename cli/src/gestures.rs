//! Synthetic pointer gestures that drive an [`EngineCore`] the way a
//! browser would, so terminal commands produce exactly the envelopes a
//! canvas session produces.
//!
//! The engine's camera is left at identity, so screen and world
//! coordinates coincide.

use canvas::engine::{Action, EngineCore};
use canvas::hit::topmost_hit;
use canvas::input::{Button, Modifiers, Tool};
use wire::{ClientMessage, Point};

#[cfg(test)]
#[path = "gestures_test.rs"]
mod gestures_test;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GestureError {
    #[error("rect needs a non-zero width and height")]
    EmptyRect,
    #[error("no shape with id {0:?} in this room")]
    UnknownShape(String),
    #[error("shape {0:?} is covered by another shape at its anchor")]
    Covered(String),
}

/// Drag out a rectangle with the rect tool. Returns the new shape's id and
/// the envelopes to send.
///
/// # Errors
///
/// [`GestureError::EmptyRect`] if either dimension is zero.
pub fn draw_rect(
    engine: &mut EngineCore,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Result<(String, Vec<ClientMessage>), GestureError> {
    engine.set_tool(Tool::Rect);
    let mut actions = press(engine, Point::new(x, y));
    actions.extend(engine.on_pointer_move(Point::new(x + width, y + height), Modifiers::default()));
    actions.extend(release(engine, Point::new(x + width, y + height)));

    let messages = outbound(actions);
    let id = messages.iter().find_map(|message| match message {
        ClientMessage::Draw { shape, .. } => Some(shape.id().to_owned()),
        _ => None,
    });
    match id {
        Some(id) => Ok((id, messages)),
        None => Err(GestureError::EmptyRect),
    }
}

/// Grab a shape at its anchor with the pointer tool and drag it by
/// `(dx, dy)`.
///
/// # Errors
///
/// [`GestureError::UnknownShape`] or [`GestureError::Covered`] when the
/// shape cannot be picked up at its anchor.
pub fn move_shape(engine: &mut EngineCore, id: &str, dx: f64, dy: f64) -> Result<Vec<ClientMessage>, GestureError> {
    let anchor = reachable_anchor(engine, id)?;
    engine.set_tool(Tool::Pointer);
    let target = Point::new(anchor.x + dx, anchor.y + dy);
    let mut actions = press(engine, anchor);
    actions.extend(engine.on_pointer_move(target, Modifiers::default()));
    actions.extend(release(engine, target));
    Ok(outbound(actions))
}

/// Click a shape's anchor with the eraser.
///
/// # Errors
///
/// Same as [`move_shape`].
pub fn erase_shape(engine: &mut EngineCore, id: &str) -> Result<Vec<ClientMessage>, GestureError> {
    let anchor = reachable_anchor(engine, id)?;
    engine.set_tool(Tool::Eraser);
    let mut actions = press(engine, anchor);
    actions.extend(release(engine, anchor));
    Ok(outbound(actions))
}

fn reachable_anchor(engine: &EngineCore, id: &str) -> Result<Point, GestureError> {
    let shape = engine.shape(id).ok_or_else(|| GestureError::UnknownShape(id.to_owned()))?;
    let anchor = engine.camera().world_to_screen(shape.anchor());
    match topmost_hit(&engine.doc, engine.camera().screen_to_world(anchor)) {
        Some(top) if top.id() == id => Ok(anchor),
        _ => Err(GestureError::Covered(id.to_owned())),
    }
}

fn press(engine: &mut EngineCore, at: Point) -> Vec<Action> {
    engine.on_pointer_down(at, Button::Primary, Modifiers::default())
}

fn release(engine: &mut EngineCore, at: Point) -> Vec<Action> {
    engine.on_pointer_up(at, Button::Primary, Modifiers::default())
}

/// Keep only the envelopes bound for the server.
pub fn outbound(actions: Vec<Action>) -> Vec<ClientMessage> {
    actions
        .into_iter()
        .filter_map(|action| match action {
            Action::Send(message) => Some(message),
            Action::RenderNeeded => None,
        })
        .collect()
}
