//! Rendering: draws the full canvas scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives a read-only view of the engine and produces pixels; it does
//! not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;
use wire::Shape;

use crate::consts::{HIT_SLOP, STROKE_WIDTH, TEXT_FONT, TEXT_HIT_ASCENT, TEXT_HIT_WIDTH};
use crate::engine::EngineCore;

const BACKGROUND: &str = "#000";
const STROKE: &str = "#fff";
const SELECTION: &str = "#1E90FF";

/// Selection dash segment length in screen pixels.
const SELECTION_DASH_PX: f64 = 4.0;

/// Selection outline padding around a shape's bounds, in screen pixels.
const SELECTION_PAD_PX: f64 = 4.0;

/// Draw the full scene: background, shapes, live preview and selection.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, core: &EngineCore) -> Result<(), JsValue> {
    let camera = core.camera();

    // Layer 1: clear to background in device pixels.
    ctx.set_transform(core.dpr, 0.0, 0.0, core.dpr, 0.0, 0.0)?;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, core.viewport_width, core.viewport_height);

    // Layer 2: world transform.
    ctx.translate(camera.pan_x, camera.pan_y)?;
    ctx.scale(camera.zoom, camera.zoom)?;

    ctx.set_stroke_style_str(STROKE);
    ctx.set_fill_style_str(STROKE);
    ctx.set_line_width(STROKE_WIDTH);
    ctx.set_font(TEXT_FONT);

    // Layer 3: shapes in draw order (bottom first), then the uncommitted preview.
    for shape in core.shapes() {
        draw_shape(ctx, shape)?;
    }
    if let Some(preview) = core.preview() {
        draw_shape(ctx, preview)?;
    }

    // Layer 4: selection outline.
    if let Some(shape) = core.selection().and_then(|id| core.shape(id)) {
        draw_selection(ctx, shape, camera.zoom)?;
    }

    Ok(())
}

// =============================================================
// Shape dispatch
// =============================================================

fn draw_shape(ctx: &CanvasRenderingContext2d, shape: &Shape) -> Result<(), JsValue> {
    match shape {
        Shape::Rect { x, y, width, height, .. } => {
            ctx.stroke_rect(*x, *y, *width, *height);
        }
        Shape::Circle { center_x, center_y, radius, .. } => {
            ctx.begin_path();
            ctx.arc(*center_x, *center_y, radius.abs(), 0.0, 2.0 * PI)?;
            ctx.stroke();
        }
        Shape::Line { x1, y1, x2, y2, .. } => {
            ctx.begin_path();
            ctx.move_to(*x1, *y1);
            ctx.line_to(*x2, *y2);
            ctx.stroke();
        }
        Shape::Text { x, y, text, .. } => {
            ctx.fill_text(text, *x, *y)?;
        }
        Shape::Freehand { points, .. } => {
            let Some((first, rest)) = points.split_first() else {
                return Ok(());
            };
            ctx.begin_path();
            ctx.move_to(first.x, first.y);
            for p in rest {
                ctx.line_to(p.x, p.y);
            }
            ctx.stroke();
        }
    }
    Ok(())
}

// =============================================================
// Selection UI
// =============================================================

fn draw_selection(ctx: &CanvasRenderingContext2d, shape: &Shape, zoom: f64) -> Result<(), JsValue> {
    let Some((min_x, min_y, max_x, max_y)) = bounds(shape) else {
        return Ok(());
    };
    let pad = SELECTION_PAD_PX / zoom;
    let dash_world = SELECTION_DASH_PX / zoom;

    ctx.save();
    ctx.set_stroke_style_str(SELECTION);
    ctx.set_line_width(1.0 / zoom);
    let dash_array = js_sys::Array::new();
    dash_array.push(&dash_world.into());
    dash_array.push(&dash_world.into());
    ctx.set_line_dash(&dash_array)?;

    ctx.stroke_rect(min_x - pad, min_y - pad, (max_x - min_x) + pad * 2.0, (max_y - min_y) + pad * 2.0);
    ctx.set_line_dash(&js_sys::Array::new())?;

    ctx.restore();
    Ok(())
}

/// Axis-aligned world bounds as `(min_x, min_y, max_x, max_y)`.
fn bounds(shape: &Shape) -> Option<(f64, f64, f64, f64)> {
    match shape {
        Shape::Rect { x, y, width, height, .. } => {
            Some((x.min(x + width), y.min(y + height), x.max(x + width), y.max(y + height)))
        }
        Shape::Circle { center_x, center_y, radius, .. } => {
            let r = radius.abs();
            Some((center_x - r, center_y - r, center_x + r, center_y + r))
        }
        Shape::Line { x1, y1, x2, y2, .. } => Some((x1.min(*x2), y1.min(*y2), x1.max(*x2), y1.max(*y2))),
        Shape::Text { x, y, .. } => Some((x - HIT_SLOP, y - TEXT_HIT_ASCENT, x + TEXT_HIT_WIDTH, y + HIT_SLOP)),
        Shape::Freehand { points, .. } => {
            let first = points.first()?;
            Some(points.iter().fold((first.x, first.y, first.x, first.y), |(a, b, c, d), p| {
                (a.min(p.x), b.min(p.y), c.max(p.x), d.max(p.y))
            }))
        }
    }
}
