//! Hit-testing: which shape, if any, lies under a world-space point.
//!
//! Tolerances are fixed in world units so an eraser click behaves the same
//! for every participant regardless of their local zoom.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use wire::{Point, Shape};

use crate::consts::{HIT_SLOP, TEXT_HIT_ASCENT, TEXT_HIT_WIDTH};
use crate::doc::ShapeStore;

/// Whether `pt` hits `shape` under the per-kind tolerance rules.
#[must_use]
pub fn hit_shape(shape: &Shape, pt: Point) -> bool {
    match shape {
        Shape::Rect { x, y, width, height, .. } => {
            let (min_x, max_x) = span(*x, *width);
            let (min_y, max_y) = span(*y, *height);
            pt.x >= min_x && pt.x <= max_x && pt.y >= min_y && pt.y <= max_y
        }
        Shape::Circle { center_x, center_y, radius, .. } => {
            (pt.x - center_x).hypot(pt.y - center_y) <= radius.abs()
        }
        Shape::Line { x1, y1, x2, y2, .. } => {
            segment_distance(pt, Point::new(*x1, *y1), Point::new(*x2, *y2)) <= HIT_SLOP
        }
        Shape::Text { x, y, .. } => {
            pt.x >= x - HIT_SLOP
                && pt.x <= x + TEXT_HIT_WIDTH
                && pt.y >= y - TEXT_HIT_ASCENT
                && pt.y <= y + HIT_SLOP
        }
        Shape::Freehand { points, .. } => points
            .iter()
            .any(|p| (pt.x - p.x).abs() <= HIT_SLOP && (pt.y - p.y).abs() <= HIT_SLOP),
    }
}

/// The topmost shape (last in draw order) under `pt`.
#[must_use]
pub fn topmost_hit(store: &ShapeStore, pt: Point) -> Option<&Shape> {
    store.shapes().iter().rev().find(|s| hit_shape(s, pt))
}

/// Normalise an origin/extent pair into `(min, max)`.
fn span(origin: f64, extent: f64) -> (f64, f64) {
    if extent < 0.0 { (origin + extent, origin) } else { (origin, origin + extent) }
}

/// Distance from `p` to the segment `a`-`b`. A zero-length segment degrades
/// to the distance to `a`.
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return (p.x - a.x).hypot(p.y - a.y);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let proj_x = a.x + t * dx;
    let proj_y = a.y + t * dy;
    (p.x - proj_x).hypot(p.y - proj_y)
}
