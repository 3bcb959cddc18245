//! Snapshot-based undo/redo.
//!
//! An [`EditHistory`] stores full copies of the edited value. Annotation
//! states are a few dozen numbers, so snapshots are cheap and undo can
//! never drift out of sync with the state it restores.

use crate::error::PoseError;

/// Ordered snapshots with a cursor at the current one.
///
/// Invariants:
/// - there is always at least one entry, and `cursor < len`;
/// - recording after an undo drops everything after the cursor.
#[derive(Clone, Debug)]
pub struct EditHistory<S> {
    entries: Vec<S>,
    cursor: usize,
    limit: Option<usize>,
}

impl<S: Clone + PartialEq> EditHistory<S> {
    /// A history holding only `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: None,
        }
    }

    /// Caps the number of stored snapshots; the oldest are dropped first.
    /// A limit below 1 is treated as 1.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit.map(|l| l.max(1));
        self.enforce_limit();
        self
    }

    /// Records `snapshot` as the new current entry.
    ///
    /// Returns false, leaving the history untouched, if `snapshot` equals
    /// the current entry.
    pub fn record(&mut self, snapshot: S) -> bool {
        if self.entries[self.cursor] == snapshot {
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        self.cursor = self.entries.len() - 1;
        self.enforce_limit();
        true
    }

    /// Steps back one entry and returns it.
    pub fn undo(&mut self) -> Result<&S, PoseError> {
        if self.cursor == 0 {
            return Err(PoseError::NothingToUndo);
        }
        self.cursor -= 1;
        Ok(&self.entries[self.cursor])
    }

    /// Steps forward one entry and returns it.
    pub fn redo(&mut self) -> Result<&S, PoseError> {
        if self.cursor + 1 >= self.entries.len() {
            return Err(PoseError::NothingToRedo);
        }
        self.cursor += 1;
        Ok(&self.entries[self.cursor])
    }

    /// Drops every entry except the current one.
    pub fn clear(&mut self) {
        self.entries.swap(0, self.cursor);
        self.entries.truncate(1);
        self.cursor = 0;
    }

    /// Replaces the whole history with `snapshot`.
    pub fn reset_to(&mut self, snapshot: S) {
        self.entries.clear();
        self.entries.push(snapshot);
        self.cursor = 0;
    }

    pub fn current(&self) -> &S {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a history holds at least its current entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        if self.entries.len() > limit {
            let excess = self.entries.len() - limit;
            // Only entries before the cursor are dropped; the redo tail is
            // kept whole when the cursor sits near the start.
            let excess = excess.min(self.cursor);
            self.entries.drain(..excess);
            self.cursor -= excess;
        }
    }
}
