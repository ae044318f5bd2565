//! Undo and redo stacks over committed [`Operation`]s.
//!
//! The stacks live in memory for the lifetime of a store. Undo and redo are
//! two-phase: the caller [`peek`](History::peek)s the next entry, applies its
//! writes, and only then calls [`complete`](History::complete). A failed
//! apply leaves both stacks untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use uuid::Uuid;

use crate::{
  Error, Result,
  operation::{Operation, Outcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HistoryDirection {
  Undo,
  Redo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
  pub id:           Uuid,
  pub committed_at: DateTime<Utc>,
  pub operation:    Operation,
}

impl HistoryEntry {
  pub fn new(operation: Operation) -> Self {
    Self { id: Uuid::new_v4(), committed_at: Utc::now(), operation }
  }
}

/// Snapshot of the stacks, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
  pub undo_depth:    usize,
  pub redo_depth:    usize,
  /// How many times the stacks were cleared by an untracked write or reset.
  pub invalidations: u64,
  pub next_undo:     Option<String>,
  pub next_redo:     Option<String>,
}

#[derive(Debug, Default)]
pub struct History {
  undo:          Vec<HistoryEntry>,
  redo:          Vec<HistoryEntry>,
  invalidations: u64,
}

impl History {
  pub fn new() -> Self { Self::default() }

  /// Push a freshly committed operation. Any redo entries become unreachable
  /// and are discarded.
  pub fn record(&mut self, operation: Operation) -> &HistoryEntry {
    self.redo.clear();
    self.undo.push(HistoryEntry::new(operation));
    &self.undo[self.undo.len() - 1]
  }

  /// Fold a commit outcome into the stacks.
  pub fn apply_outcome(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::Structured(op) => {
        self.record(op);
      }
      Outcome::Unstructured { invalidates_history: true } => self.invalidate(),
      Outcome::Unstructured { invalidates_history: false } => {}
    }
  }

  /// Clear both stacks.
  pub fn invalidate(&mut self) {
    self.undo.clear();
    self.redo.clear();
    self.invalidations += 1;
  }

  /// The entry the next undo or redo would act on.
  pub fn peek(&self, direction: HistoryDirection) -> Result<&HistoryEntry> {
    self
      .stack(direction)
      .last()
      .ok_or(Error::EmptyHistory(direction))
  }

  /// Move the top entry of `direction`'s stack onto the opposite stack, after
  /// its writes have been applied successfully.
  pub fn complete(&mut self, direction: HistoryDirection) -> Result<&HistoryEntry> {
    let (from, to) = match direction {
      HistoryDirection::Undo => (&mut self.undo, &mut self.redo),
      HistoryDirection::Redo => (&mut self.redo, &mut self.undo),
    };
    let entry = from.pop().ok_or(Error::EmptyHistory(direction))?;
    to.push(entry);
    Ok(&to[to.len() - 1])
  }

  pub fn undo_depth(&self) -> usize { self.undo.len() }

  pub fn redo_depth(&self) -> usize { self.redo.len() }

  pub fn status(&self) -> HistoryStatus {
    HistoryStatus {
      undo_depth:    self.undo.len(),
      redo_depth:    self.redo.len(),
      invalidations: self.invalidations,
      next_undo:     self.undo.last().map(|e| e.operation.summary()),
      next_redo:     self.redo.last().map(|e| e.operation.summary()),
    }
  }

  fn stack(&self, direction: HistoryDirection) -> &[HistoryEntry] {
    match direction {
      HistoryDirection::Undo => &self.undo,
      HistoryDirection::Redo => &self.redo,
    }
  }
}
