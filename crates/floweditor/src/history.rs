//! Bounded undo/redo history of immutable snapshots.
//!
//! Snapshots are plain values; for the graph they are `Arc`-shared so that
//! recording one only copies pointers to entities that did not change.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Snapshot stack with a cursor pointing at the current state
#[derive(Debug, Clone)]
pub struct History<S> {
    snapshots: VecDeque<S>,
    current: usize,
    limit: usize,
}

impl<S: Clone> History<S> {
    /// Start a history whose only entry is `baseline`
    pub fn new(baseline: S, limit: usize) -> Self {
        let mut snapshots = VecDeque::new();
        snapshots.push_back(baseline);
        Self {
            snapshots,
            current: 0,
            limit: limit.max(1),
        }
    }

    /// Record a new current state, discarding the redo branch.
    ///
    /// Oldest entries fall off once the limit is exceeded.
    pub fn record(&mut self, state: S) {
        self.snapshots.truncate(self.current + 1);
        self.snapshots.push_back(state);
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
        self.current = self.snapshots.len() - 1;
    }

    /// Step back; `None` at the oldest retained snapshot
    pub fn undo(&mut self) -> Option<&S> {
        if self.can_undo() {
            self.current -= 1;
            self.snapshots.get(self.current)
        } else {
            None
        }
    }

    /// Step forward; `None` when there is nothing to redo
    pub fn redo(&mut self) -> Option<&S> {
        if self.can_redo() {
            self.current += 1;
            self.snapshots.get(self.current)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    pub fn current(&self) -> Option<&S> {
        self.snapshots.get(self.current)
    }

    /// Drop everything and start over from `baseline`
    pub fn reset(&mut self, baseline: S) {
        self.snapshots.clear();
        self.snapshots.push_back(baseline);
        self.current = 0;
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn position(&self) -> usize {
        self.current
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
