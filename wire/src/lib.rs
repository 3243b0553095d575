//! Shared shape model and JSON envelopes for the realtime room socket.
//!
//! This crate owns the wire representation used by `server`, `canvas` and
//! `cli`. Every WebSocket text frame carries exactly one envelope object,
//! discriminated by its `type` key. Inbound envelopes ([`ClientMessage`])
//! address a room by its human-readable slug; outbound envelopes
//! ([`ServerMessage`]) carry the resolved numeric room id and the author's
//! subject id.


use serde::{Deserialize, Serialize};

/// Stable identifier of a shape, assigned by the authoring client.
pub type ShapeId = String;

/// Numeric room identifier resolved by the persistence layer.
pub type RoomId = i64;

/// Error returned by the decode/encode helpers.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The text is not valid JSON or does not match the envelope schema.
    #[error("invalid envelope: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// SHAPES
// =============================================================================

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A drawable primitive. The `type` tag selects the variant on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Shape {
    /// Axis-aligned rectangle anchored at its top-left corner.
    Rect { id: ShapeId, x: f64, y: f64, width: f64, height: f64 },
    /// Circle anchored at its center.
    Circle { id: ShapeId, center_x: f64, center_y: f64, radius: f64 },
    /// Straight segment between two endpoints.
    Line { id: ShapeId, x1: f64, y1: f64, x2: f64, y2: f64 },
    /// Single line of text; `(x, y)` is the baseline origin.
    Text { id: ShapeId, x: f64, y: f64, text: String },
    /// Freehand stroke as an ordered list of sampled points.
    #[serde(rename = "pencil", alias = "freehand")]
    Freehand { id: ShapeId, points: Vec<Point> },
}

impl Shape {
    /// The shape's stable identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Rect { id, .. }
            | Self::Circle { id, .. }
            | Self::Line { id, .. }
            | Self::Text { id, .. }
            | Self::Freehand { id, .. } => id,
        }
    }

    /// Wire tag of this shape's kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rect { .. } => "rect",
            Self::Circle { .. } => "circle",
            Self::Line { .. } => "line",
            Self::Text { .. } => "text",
            Self::Freehand { .. } => "pencil",
        }
    }

    /// Reference point used when grabbing the shape for a drag.
    ///
    /// Top-left for rects, baseline origin for text, center for circles, the
    /// first endpoint for lines and the first sample for strokes.
    #[must_use]
    pub fn anchor(&self) -> Point {
        match self {
            Self::Rect { x, y, .. } | Self::Text { x, y, .. } => Point::new(*x, *y),
            Self::Circle { center_x, center_y, .. } => Point::new(*center_x, *center_y),
            Self::Line { x1, y1, .. } => Point::new(*x1, *y1),
            Self::Freehand { points, .. } => points.first().copied().unwrap_or_default(),
        }
    }

    /// Move every geometry field by `(dx, dy)` world units.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Rect { x, y, .. } | Self::Text { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Self::Circle { center_x, center_y, .. } => {
                *center_x += dx;
                *center_y += dy;
            }
            Self::Line { x1, y1, x2, y2, .. } => {
                *x1 += dx;
                *y1 += dy;
                *x2 += dx;
                *y2 += dy;
            }
            Self::Freehand { points, .. } => {
                for p in points {
                    p.x += dx;
                    p.y += dy;
                }
            }
        }
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Envelope sent by a client. `room_id` is the room slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Start receiving fan-out for a room.
    JoinRoom { room_id: String },
    /// Stop receiving fan-out for a room.
    LeaveRoom { room_id: String },
    /// A newly created shape.
    #[serde(alias = "chat")]
    Draw { room_id: String, shape: Shape },
    /// Latest geometry of an existing shape.
    MoveShape { room_id: String, shape: Shape },
    /// Removal of a shape by id.
    DeleteShape { room_id: String, shape_id: ShapeId },
    /// Any `type` this protocol version does not know about.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Room slug this envelope addresses, if any.
    #[must_use]
    pub fn room_slug(&self) -> Option<&str> {
        match self {
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::Draw { room_id, .. }
            | Self::MoveShape { room_id, .. }
            | Self::DeleteShape { room_id, .. } => Some(room_id),
            Self::Unknown => None,
        }
    }

    /// Envelope type name, for logging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::Draw { .. } => "draw",
            Self::MoveShape { .. } => "move_shape",
            Self::DeleteShape { .. } => "delete_shape",
            Self::Unknown => "unknown",
        }
    }
}

/// Envelope fanned out by the server to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Draw { room_id: RoomId, shape: Shape, user_id: String },
    MoveShape { room_id: RoomId, shape: Shape, user_id: String },
    DeleteShape { room_id: RoomId, shape_id: ShapeId, user_id: String },
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Numeric room this envelope was addressed to.
    #[must_use]
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::Draw { room_id, .. } | Self::MoveShape { room_id, .. } | Self::DeleteShape { room_id, .. } => {
                Some(*room_id)
            }
            Self::Unknown => None,
        }
    }
}

/// Parse one inbound text frame.
///
/// # Errors
///
/// Returns [`WireError::Json`] when the text is not JSON, has no `type`, or a
/// known `type` is missing required fields.
pub fn decode_client(text: &str) -> Result<ClientMessage, WireError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse one outbound text frame (client side).
///
/// # Errors
///
/// Returns [`WireError::Json`] under the same conditions as [`decode_client`].
pub fn decode_server(text: &str) -> Result<ServerMessage, WireError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize any envelope to a text frame.
///
/// # Errors
///
/// Returns [`WireError::Json`] if serialization fails (non-finite floats).
pub fn encode<T: Serialize>(message: &T) -> Result<String, WireError> {
    Ok(serde_json::to_string(message)?)
}

// =============================================================================
// PERSISTED RECORDS
// =============================================================================

#[derive(Serialize, Deserialize)]
struct RecordPayload {
    shape: Shape,
}

/// Encode a shape as the payload string stored in a room record.
///
/// # Errors
///
/// Returns [`WireError::Json`] if serialization fails.
pub fn encode_record_payload(shape: &Shape) -> Result<String, WireError> {
    Ok(serde_json::to_string(&RecordPayload { shape: shape.clone() })?)
}

/// Decode a stored record payload back into its shape.
///
/// # Errors
///
/// Returns [`WireError::Json`] if the payload is not a `{"shape": ...}` object.
pub fn decode_record_payload(payload: &str) -> Result<Shape, WireError> {
    let record: RecordPayload = serde_json::from_str(payload)?;
    Ok(record.shape)
}

#[derive(Deserialize)]
struct StoredShapeId {
    shape: ShapeIdOnly,
}

#[derive(Deserialize)]
struct ShapeIdOnly {
    id: String,
}

/// Shape id embedded in a stored payload, tolerating shapes of unknown kind.
///
/// # Errors
///
/// Returns [`WireError::Json`] if the payload has no string `shape.id`.
pub fn record_shape_id(payload: &str) -> Result<String, WireError> {
    let stored: StoredShapeId = serde_json::from_str(payload)?;
    Ok(stored.shape.id)
}
