//! Snapshot-based undo/redo over the shape store.
//!
//! Each entry is a full copy of the shape list. A snapshot is recorded
//! immediately before every local mutating action; recording a new one
//! invalidates the redo stack. Remote events never touch history.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use wire::Shape;

use crate::consts::HISTORY_LIMIT;
use crate::doc::ShapeStore;

/// Undo and redo stacks of shape-list snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Vec<Shape>>,
    redo: Vec<Vec<Shape>>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `limit` undo snapshots (at least one).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { undo: Vec::new(), redo: Vec::new(), limit: limit.max(1) }
    }

    /// Push the store's current state and drop any redo history.
    pub fn record_before_mutation(&mut self, store: &ShapeStore) {
        self.undo.push(store.snapshot());
        if self.undo.len() > self.limit {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Restore the most recent snapshot. No-op when there is nothing to undo.
    pub fn undo(&mut self, store: &mut ShapeStore) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.redo.push(store.snapshot());
        store.restore(previous);
        true
    }

    /// Re-apply the most recently undone state. No-op when the redo stack is empty.
    pub fn redo(&mut self, store: &mut ShapeStore) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(store.snapshot());
        store.restore(next);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Forget both stacks (e.g. after reseeding from the server).
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
