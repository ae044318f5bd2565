//! Structured operations: the unit of undo and redo.
//!
//! Every operation captures complete row snapshots, so its inverse can be
//! computed without consulting the database.

use serde::{Deserialize, Serialize};

use crate::{
  cascade::CascadeDelete,
  value::{Row, RowKey},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
  Insert { row: Row },
  Update { before: Row, after: Row },
  Delete { row: Row },
  CascadeDelete(CascadeDelete),
  /// Several operations committed as one history entry.
  Batch { label: String, operations: Vec<Operation> },
}

/// A single-row write, the granularity at which operations are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  Insert(Row),
  Update { before: Row, after: Row },
  Delete(Row),
}

impl Step {
  pub fn inverse(&self) -> Self {
    match self {
      Self::Insert(row) => Self::Delete(row.clone()),
      Self::Delete(row) => Self::Insert(row.clone()),
      Self::Update { before, after } => {
        Self::Update { before: after.clone(), after: before.clone() }
      }
    }
  }

  pub fn table(&self) -> &str {
    match self {
      Self::Insert(row) | Self::Delete(row) => &row.table,
      Self::Update { before, .. } => &before.table,
    }
  }
}

impl Operation {
  /// The single-row writes that perform this operation, in order.
  pub fn forward_steps(&self) -> Vec<Step> {
    let mut steps = Vec::new();
    self.push_forward(&mut steps);
    steps
  }

  fn push_forward(&self, steps: &mut Vec<Step>) {
    match self {
      Self::Insert { row } => steps.push(Step::Insert(row.clone())),
      Self::Update { before, after } => {
        steps.push(Step::Update { before: before.clone(), after: after.clone() })
      }
      Self::Delete { row } => steps.push(Step::Delete(row.clone())),
      Self::CascadeDelete(plan) => {
        steps.extend(plan.deletion_order().cloned().map(Step::Delete))
      }
      Self::Batch { operations, .. } => {
        for op in operations {
          op.push_forward(steps);
        }
      }
    }
  }

  /// The writes that undo this operation: forward steps reversed and
  /// inverted. For a cascade this re-inserts the root before its dependents.
  pub fn inverse_steps(&self) -> Vec<Step> {
    self.forward_steps().iter().rev().map(Step::inverse).collect()
  }

  /// The operation that undoes this one.
  pub fn inverse(&self) -> Self {
    match self {
      Self::Insert { row } => Self::Delete { row: row.clone() },
      Self::Delete { row } => Self::Insert { row: row.clone() },
      Self::Update { before, after } => {
        Self::Update { before: after.clone(), after: before.clone() }
      }
      Self::CascadeDelete(plan) => Self::Batch {
        label:      format!("restore {} {}", plan.root.table, plan.root.key),
        operations: plan
          .deletion_order()
          .rev()
          .map(|row| Self::Insert { row: row.clone() })
          .collect(),
      },
      Self::Batch { label, operations } => Self::Batch {
        label:      format!("undo {label}"),
        operations: operations.iter().rev().map(Self::inverse).collect(),
      },
    }
  }

  /// Every row this operation touches.
  pub fn affected_rows(&self) -> Vec<RowKey> {
    self
      .forward_steps()
      .iter()
      .map(|step| match step {
        Step::Insert(row) | Step::Delete(row) => row.row_key(),
        Step::Update { after, .. } => after.row_key(),
      })
      .collect()
  }

  /// One-line human description, used in history listings and logs.
  pub fn summary(&self) -> String {
    match self {
      Self::Insert { row } => format!("insert {} {}", row.table, row.key),
      Self::Update { after, .. } => format!("update {} {}", after.table, after.key),
      Self::Delete { row } => format!("delete {} {}", row.table, row.key),
      Self::CascadeDelete(plan) => format!(
        "delete {} {} (+{} dependent rows)",
        plan.root.table,
        plan.root.key,
        plan.dependents.len()
      ),
      Self::Batch { label, operations } => {
        format!("{label} ({} operations)", operations.len())
      }
    }
  }
}

/// What the store hands the history after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// A reversible operation to push onto the undo stack.
  Structured(Operation),
  /// A write whose effects were not captured. If it modified data the history
  /// can no longer be trusted.
  Unstructured { invalidates_history: bool },
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::{PrimaryKey, fields};

  fn row(table: &str, key: &str) -> Row {
    Row {
      table:  table.into(),
      key:    PrimaryKey::from(key),
      values: fields([("id", key)]),
    }
  }

  fn cascade() -> Operation {
    Operation::CascadeDelete(CascadeDelete {
      root:       row("patient", "1"),
      dependents: vec![row("medication_record", "m1"), row("surgical_history", "s1")],
    })
  }

  #[test]
  fn cascade_forward_deletes_root_last() {
    let steps = cascade().forward_steps();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[2], Step::Delete(row("patient", "1")));
  }

  #[test]
  fn cascade_inverse_reinserts_root_first() {
    let steps = cascade().inverse_steps();
    assert_eq!(steps[0], Step::Insert(row("patient", "1")));
    assert_eq!(steps[1], Step::Insert(row("surgical_history", "s1")));
    assert_eq!(steps[2], Step::Insert(row("medication_record", "m1")));

    let Operation::Batch { operations, .. } = cascade().inverse() else {
      panic!("cascade inverse should be a batch");
    };
    assert_eq!(operations[0], Operation::Insert { row: row("patient", "1") });
  }

  #[test]
  fn update_inverse_swaps_snapshots() {
    let before = row("patient", "1");
    let mut after = before.clone();
    after.values.insert("name".into(), "Ana".into());
    let op = Operation::Update { before: before.clone(), after: after.clone() };
    assert_eq!(op.inverse(), Operation::Update { before: after, after: before });
    assert_eq!(op.inverse().inverse(), op);
  }

  #[test]
  fn batch_inverse_reverses_members() {
    let op = Operation::Batch {
      label:      "intake".into(),
      operations: vec![
        Operation::Insert { row: row("patient", "1") },
        Operation::Insert { row: row("medical_history", "h1") },
      ],
    };
    let steps = op.inverse_steps();
    assert_eq!(steps[0], Step::Delete(row("medical_history", "h1")));
    assert_eq!(steps[1], Step::Delete(row("patient", "1")));
    assert_eq!(op.affected_rows().len(), 2);
  }

  #[test]
  fn serializes_with_kind_tag() {
    let json = serde_json::to_value(Operation::Delete { row: row("disease", "TB") }).unwrap();
    assert_eq!(json["kind"], "delete");
    assert_eq!(json["row"]["table"], "disease");
  }
}
