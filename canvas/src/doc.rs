//! Document model: the ordered shape list and the remote merge rules.
//!
//! `ShapeStore` keeps shapes in insertion order; the last element is the
//! topmost for rendering and hit-testing. Identity is the shape id: no two
//! entries ever share one. Remote operations arrive as [`RemoteEvent`]s and
//! merge idempotently, so an echo of a shape this client already inserted
//! optimistically is a no-op.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use wire::{ServerMessage, Shape, ShapeId};

/// A mutation received from another participant.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// A shape was created.
    Inserted(Shape),
    /// A shape's geometry changed.
    Updated(Shape),
    /// A shape was deleted.
    Removed(ShapeId),
}

impl RemoteEvent {
    /// Map a server envelope to the event it carries, if any.
    #[must_use]
    pub fn from_message(message: ServerMessage) -> Option<Self> {
        match message {
            ServerMessage::Draw { shape, .. } => Some(Self::Inserted(shape)),
            ServerMessage::MoveShape { shape, .. } => Some(Self::Updated(shape)),
            ServerMessage::DeleteShape { shape_id, .. } => Some(Self::Removed(shape_id)),
            ServerMessage::Unknown => None,
        }
    }
}

/// Ordered, id-keyed collection of the shapes currently on the canvas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
}

impl ShapeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { shapes: Vec::new() }
    }

    /// Append a shape on top. Returns `false` (and changes nothing) if a shape
    /// with the same id is already present.
    pub fn insert(&mut self, shape: Shape) -> bool {
        if self.position(shape.id()).is_some() {
            return false;
        }
        self.shapes.push(shape);
        true
    }

    /// Replace the shape with the same id in place, or append it if absent.
    pub fn upsert(&mut self, shape: Shape) {
        match self.position(shape.id()) {
            Some(index) => self.shapes[index] = shape,
            None => self.shapes.push(shape),
        }
    }

    /// Remove a shape by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Shape> {
        let index = self.position(id)?;
        Some(self.shapes.remove(index))
    }

    /// Merge one remote event. Returns whether the store changed.
    pub fn apply(&mut self, event: RemoteEvent) -> bool {
        match event {
            RemoteEvent::Inserted(shape) => self.insert(shape),
            RemoteEvent::Updated(shape) => {
                if self.get(shape.id()) == Some(&shape) {
                    return false;
                }
                self.upsert(shape);
                true
            }
            RemoteEvent::Removed(id) => self.remove(&id).is_some(),
        }
    }

    /// Return a reference to a shape by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Index of a shape in draw order.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    /// Shapes in draw order (bottom first).
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Deep, independent copy of the current shape list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Shape> {
        self.shapes.clone()
    }

    /// Replace the whole content with a snapshot.
    pub fn restore(&mut self, shapes: Vec<Shape>) {
        self.shapes = shapes;
    }

    /// Replace the whole content with a server listing, collapsing duplicate
    /// ids onto the first occurrence's position (latest geometry wins).
    pub fn load(&mut self, shapes: Vec<Shape>) {
        self.shapes.clear();
        for shape in shapes {
            self.upsert(shape);
        }
    }

    /// Number of shapes in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if the store contains no shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
