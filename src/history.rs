use std::collections::VecDeque;

use crate::canvas::{CanvasState, Point};

/// A committed canvas together with the viewport translation that has to be applied when
/// it is restored.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub canvas: CanvasState,
    pub delta: Point,
}

/// Bounded undo/redo over canvas snapshots.
///
/// Snapshots share their cell buffers with the live canvas, so recording one is a reference
/// count bump. The saved marker is a snapshot too and is compared by identity.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    current: CanvasState,
    saved: CanvasState,
    capacity: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new_with_capacity(100)
    }
}

impl HistoryManager {
    pub fn new_with_capacity(capacity: usize) -> Self {
        let current = CanvasState::default();
        Self {
            undo_stack: VecDeque::with_capacity(capacity),
            redo_stack: Vec::new(),
            saved: current.clone(),
            current,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Commit `canvas` if its layout differs from the current state. `viewport_delta` is the
    /// translation the edit applied; undoing it applies the inverse.
    pub fn save_to_history(&mut self, canvas: &CanvasState, viewport_delta: Point) -> bool {
        if self.current.same_layout(canvas) {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, canvas.clone());
        self.undo_stack.push_back(HistoryEntry {
            canvas: previous,
            delta: -viewport_delta,
        });
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        log::info!("history saved, {} undo entries", self.undo_stack.len());
        true
    }

    pub fn undo(&mut self) -> Option<(CanvasState, Point)> {
        let Some(entry) = self.undo_stack.pop_back() else {
            log::warn!("nothing to undo");
            return None;
        };
        let current = std::mem::replace(&mut self.current, entry.canvas.clone());
        self.redo_stack.push(HistoryEntry {
            canvas: current,
            delta: -entry.delta,
        });
        Some((entry.canvas, entry.delta))
    }

    pub fn redo(&mut self) -> Option<(CanvasState, Point)> {
        let Some(entry) = self.redo_stack.pop() else {
            log::warn!("nothing to redo");
            return None;
        };
        let current = std::mem::replace(&mut self.current, entry.canvas.clone());
        self.undo_stack.push_back(HistoryEntry {
            canvas: current,
            delta: -entry.delta,
        });
        Some((entry.canvas, entry.delta))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.can_undo() && !self.can_redo()
    }

    pub fn current_state(&self) -> &CanvasState {
        &self.current
    }

    /// Replace the current state without recording an entry, e.g. after loading a file.
    pub fn imbue(&mut self, canvas: &CanvasState) {
        self.current = canvas.clone();
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn set_saved(&mut self) {
        self.saved = self.current.clone();
    }

    pub fn changed_since_last_save(&self) -> bool {
        !self.saved.shares_storage(&self.current)
    }
}
