//! Cascade Resolver: expands a delete into the full set of rows that must be
//! removed with it.
//!
//! Planning is pure with respect to storage; row access goes through
//! [`RowLookup`] so the same planner serves the SQLite backend and the unit
//! tests below.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  schema::{OnDelete, SchemaRegistry, TableDef},
  value::{PrimaryKey, Row, RowKey, Value},
};

/// Read access to current rows, used while planning.
pub trait RowLookup {
  type Error: From<Error>;

  /// The row of `table` with primary key `key`, if present.
  fn fetch(&self, table: &TableDef, key: &PrimaryKey) -> Result<Option<Row>, Self::Error>;

  /// Every row of `table` whose `column` equals `value`, in storage order.
  fn referencing(
    &self,
    table: &TableDef,
    column: &str,
    value: &Value,
  ) -> Result<Vec<Row>, Self::Error>;
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A delete of `root` together with every row it drags along.
///
/// `dependents` is ordered so that each row appears before the row it
/// references: deleting `dependents` in order and then `root` never leaves a
/// dangling reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeDelete {
  pub root:       Row,
  pub dependents: Vec<Row>,
}

impl CascadeDelete {
  pub fn affected_count(&self) -> usize { self.dependents.len() + 1 }

  /// Dependents, then the root.
  pub fn deletion_order(&self) -> impl DoubleEndedIterator<Item = &Row> {
    self.dependents.iter().chain(std::iter::once(&self.root))
  }

  /// Number of rows removed per table, root included.
  pub fn counts_by_table(&self) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in self.deletion_order() {
      *counts.entry(row.table.clone()).or_insert(0) += 1;
    }
    counts
  }
}

/// Plan the deletion of one row.
pub fn plan_delete<L: RowLookup>(
  registry: &SchemaRegistry,
  lookup: &L,
  table: &str,
  key: &PrimaryKey,
) -> Result<CascadeDelete, L::Error> {
  let mut planner = Planner::new(registry, lookup);
  let plan = planner.plan_root(table, key)?;
  plan.ok_or_else(|| {
    Error::NotFound { table: table.to_owned(), key: key.clone() }.into()
  })
}

/// Plan the deletion of several rows of one table.
///
/// A row reachable from more than one root is scheduled once, under the first
/// root that reaches it. A root already scheduled as another root's dependent
/// yields no plan of its own.
pub fn plan_delete_many<L: RowLookup>(
  registry: &SchemaRegistry,
  lookup: &L,
  table: &str,
  keys: &[PrimaryKey],
) -> Result<Vec<CascadeDelete>, L::Error> {
  let mut planner = Planner::new(registry, lookup);
  let mut plans = Vec::new();
  for key in keys {
    if planner.is_queued(table, key) {
      continue;
    }
    match planner.plan_root(table, key)? {
      Some(plan) => plans.push(plan),
      None => {
        return Err(
          Error::NotFound { table: table.to_owned(), key: key.clone() }.into(),
        );
      }
    }
  }
  Ok(plans)
}

// ─── Planner ─────────────────────────────────────────────────────────────────

struct Planner<'r, L> {
  registry: &'r SchemaRegistry,
  lookup:   &'r L,
  /// Every row already scheduled for deletion.
  queued:   HashSet<RowKey>,
  /// Rows whose dependents are currently being expanded.
  path:     Vec<RowKey>,
}

impl<'r, L: RowLookup> Planner<'r, L> {
  fn new(registry: &'r SchemaRegistry, lookup: &'r L) -> Self {
    Self { registry, lookup, queued: HashSet::new(), path: Vec::new() }
  }

  fn is_queued(&self, table: &str, key: &PrimaryKey) -> bool {
    self
      .queued
      .contains(&RowKey { table: table.to_owned(), key: key.clone() })
  }

  fn plan_root(
    &mut self,
    table: &str,
    key: &PrimaryKey,
  ) -> Result<Option<CascadeDelete>, L::Error> {
    let registry = self.registry;
    let lookup = self.lookup;
    let def = registry.table(table)?;
    def.check_key(key)?;
    let Some(root) = lookup.fetch(def, key)? else {
      return Ok(None);
    };

    let mut dependents = Vec::new();
    self.expand(&root, &mut dependents)?;
    self.queued.insert(root.row_key());
    Ok(Some(CascadeDelete { root, dependents }))
  }

  /// Push every row that must go before `row`, leaves first.
  fn expand(&mut self, row: &Row, out: &mut Vec<Row>) -> Result<(), L::Error> {
    let registry = self.registry;
    let lookup = self.lookup;
    let this = row.row_key();
    self.path.push(this);

    for (child_table, fk) in registry.incoming(&row.table) {
      let Some(target) = row.get(&fk.referenced_column) else { continue };
      if target.is_null() {
        continue;
      }
      let children = lookup.referencing(child_table, &fk.column, target)?;

      for child in children {
        let child_key = child.row_key();
        if self.path.contains(&child_key) {
          return Err(
            Error::CascadeCycle { table: child_key.table, key: child_key.key }.into(),
          );
        }
        if self.queued.contains(&child_key) {
          continue;
        }
        match fk.on_delete {
          OnDelete::Restrict => {
            return Err(
              Error::Constraint(format!(
                "{} {} is still referenced by {} {} ({})",
                row.table, row.key, child.table, child.key, fk.column
              ))
              .into(),
            );
          }
          OnDelete::Cascade => {
            self.expand(&child, out)?;
            self.queued.insert(child_key);
            out.push(child);
          }
        }
      }
    }

    self.path.pop();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;
  use crate::{
    schema::{ColumnDef, ForeignKey},
    value::fields,
  };

  /// Rows held in memory, keyed by table, in insertion order.
  #[derive(Default)]
  pub struct MemoryRows {
    pub rows: HashMap<String, Vec<Row>>,
  }

  impl MemoryRows {
    pub fn insert(&mut self, registry: &SchemaRegistry, table: &str, values: &[(&str, Value)]) {
      let def = registry.table(table).unwrap();
      let row = def
        .row(values.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect())
        .unwrap();
      self.rows.entry(table.to_owned()).or_default().push(row);
    }
  }

  impl RowLookup for MemoryRows {
    type Error = Error;

    fn fetch(&self, table: &TableDef, key: &PrimaryKey) -> Result<Option<Row>> {
      Ok(
        self
          .rows
          .get(&table.name)
          .and_then(|rows| rows.iter().find(|r| &r.key == key))
          .cloned(),
      )
    }

    fn referencing(&self, table: &TableDef, column: &str, value: &Value) -> Result<Vec<Row>> {
      Ok(
        self
          .rows
          .get(&table.name)
          .map(|rows| rows.iter().filter(|r| r.get(column) == Some(value)).cloned().collect())
          .unwrap_or_default(),
      )
    }
  }

  /// owner <- pet (cascade), owner <- vet_visit (cascade),
  /// pet <- vet_visit (cascade), clinic <- vet_visit (restrict).
  fn diamond() -> SchemaRegistry {
    let mut reg = SchemaRegistry::new();
    reg
      .register(
        TableDef::new("clinic")
          .column(ColumnDef::text("code"))
          .primary_key(["code"])
          .masterlist(),
      )
      .unwrap();
    reg
      .register(
        TableDef::new("owner").column(ColumnDef::text("id")).primary_key(["id"]),
      )
      .unwrap();
    reg
      .register(
        TableDef::new("pet")
          .column(ColumnDef::integer("pet_id"))
          .column(ColumnDef::text("owner_id"))
          .primary_key(["pet_id"])
          .foreign_key(ForeignKey::cascade("owner_id", "owner", "id")),
      )
      .unwrap();
    reg
      .register(
        TableDef::new("vet_visit")
          .column(ColumnDef::integer("visit_id"))
          .column(ColumnDef::text("owner_id"))
          .column(ColumnDef::integer("pet_id"))
          .column(ColumnDef::text("clinic"))
          .primary_key(["visit_id"])
          .foreign_key(ForeignKey::cascade("owner_id", "owner", "id"))
          .foreign_key(ForeignKey::cascade("pet_id", "pet", "pet_id"))
          .foreign_key(ForeignKey::restrict("clinic", "clinic", "code")),
      )
      .unwrap();
    reg
  }

  fn populated(reg: &SchemaRegistry) -> MemoryRows {
    let mut rows = MemoryRows::default();
    rows.insert(reg, "clinic", &[("code", "C1".into())]);
    rows.insert(reg, "owner", &[("id", "o1".into())]);
    rows.insert(reg, "owner", &[("id", "o2".into())]);
    rows.insert(reg, "pet", &[("pet_id", 1_i64.into()), ("owner_id", "o1".into())]);
    rows.insert(reg, "vet_visit", &[
      ("visit_id", 10_i64.into()),
      ("owner_id", "o1".into()),
      ("pet_id", 1_i64.into()),
      ("clinic", "C1".into()),
    ]);
    rows
  }

  fn position(plan: &CascadeDelete, table: &str) -> usize {
    plan.deletion_order().position(|r| r.table == table).unwrap()
  }

  #[test]
  fn diamond_reaches_shared_row_once() {
    let reg = diamond();
    let rows = populated(&reg);
    let plan = plan_delete(&reg, &rows, "owner", &"o1".into()).unwrap();

    assert_eq!(plan.affected_count(), 3);
    let counts = plan.counts_by_table();
    assert_eq!(counts.get("vet_visit"), Some(&1));
    assert_eq!(counts.get("pet"), Some(&1));
    assert!(position(&plan, "vet_visit") < position(&plan, "pet"));
    assert_eq!(plan.deletion_order().last().unwrap().table, "owner");
  }

  #[test]
  fn childless_row_plans_only_itself() {
    let reg = diamond();
    let rows = populated(&reg);
    let plan = plan_delete(&reg, &rows, "owner", &"o2".into()).unwrap();
    assert!(plan.dependents.is_empty());
    assert_eq!(plan.root.key, PrimaryKey::from("o2"));
  }

  #[test]
  fn restrict_edge_blocks_delete() {
    let reg = diamond();
    let rows = populated(&reg);
    let err = plan_delete(&reg, &rows, "clinic", &"C1".into()).unwrap_err();
    assert!(matches!(err, Error::Constraint(m) if m.contains("vet_visit")));
  }

  #[test]
  fn missing_row_is_not_found() {
    let reg = diamond();
    let rows = populated(&reg);
    let err = plan_delete(&reg, &rows, "owner", &"nobody".into()).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
  }

  #[test]
  fn bad_key_arity_is_schema_error() {
    let reg = diamond();
    let rows = populated(&reg);
    let key = PrimaryKey(vec!["o1".into(), "extra".into()]);
    assert!(matches!(plan_delete(&reg, &rows, "owner", &key), Err(Error::Schema(_))));
  }

  #[test]
  fn multi_delete_skips_rows_already_planned() {
    let reg = diamond();
    let rows = populated(&reg);
    let plans =
      plan_delete_many(&reg, &rows, "pet", &[PrimaryKey::from(1_i64)]).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].dependents.len(), 1);

    let plans = plan_delete_many(&reg, &rows, "owner", &["o1".into(), "o2".into()])
      .unwrap();
    assert_eq!(plans.iter().map(CascadeDelete::affected_count).sum::<usize>(), 4);
  }

  /// A lookup that reports a row as its own dependent, which no registry can
  /// express; the planner must still terminate.
  struct Looping;

  impl RowLookup for Looping {
    type Error = Error;

    fn fetch(&self, table: &TableDef, key: &PrimaryKey) -> Result<Option<Row>> {
      Ok(Some(Row {
        table:  table.name.clone(),
        key:    key.clone(),
        values: fields([("id", "o1")]),
      }))
    }

    fn referencing(&self, table: &TableDef, _: &str, _: &Value) -> Result<Vec<Row>> {
      let mut values = fields([("pet_id", 1_i64)]);
      values.insert("owner_id".into(), "o1".into());
      if table.name == "pet" {
        return Ok(vec![Row { table: "pet".into(), key: 1_i64.into(), values }]);
      }
      Ok(vec![Row { table: "owner".into(), key: "o1".into(), values }])
    }
  }

  #[test]
  fn revisiting_a_row_on_the_path_is_a_cycle() {
    let reg = diamond();
    let err = plan_delete(&reg, &Looping, "owner", &"o1".into()).unwrap_err();
    assert!(matches!(err, Error::CascadeCycle { .. }));
  }
}
