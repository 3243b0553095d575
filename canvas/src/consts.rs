//! Shared numeric constants for the canvas crate.

// ── Hit-testing ─────────────────────────────────────────────────

/// Tolerance in world units for thin geometry (lines, strokes, text box padding).
pub const HIT_SLOP: f64 = 5.0;

/// Approximate glyph-run width of a text shape, in world units.
pub const TEXT_HIT_WIDTH: f64 = 50.0;

/// Approximate ascent above the text baseline, in world units.
pub const TEXT_HIT_ASCENT: f64 = 16.0;

// ── Camera ──────────────────────────────────────────────────────

/// Multiplicative factor applied by one zoom step.
pub const ZOOM_STEP: f64 = 1.1;

/// Smallest allowed camera scale.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed camera scale.
pub const MAX_ZOOM: f64 = 10.0;

// ── History ─────────────────────────────────────────────────────

/// Maximum number of undo snapshots retained.
pub const HISTORY_LIMIT: usize = 100;

// ── Rendering ───────────────────────────────────────────────────

/// Stroke width for every shape, in world units.
pub const STROKE_WIDTH: f64 = 2.0;

/// CSS font used for text shapes.
pub const TEXT_FONT: &str = "16px Arial";
