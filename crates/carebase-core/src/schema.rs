//! Schema Registry: static description of tables, columns, and foreign-key
//! edges, plus the dependency orderings derived from them.
//!
//! Foreign keys must point at the single-column primary key of a table that is
//! already registered, so the edge set is a DAG by construction; registration
//! still runs an explicit cycle check and rejects self references.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  value::{FieldValues, PrimaryKey, Row, Value},
};

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}

// ─── Column types ────────────────────────────────────────────────────────────

/// The semantic type of a column. Dates are stored as ISO `YYYY-MM-DD` text.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
  Text,
  Integer,
  Real,
  Date,
}

impl SemanticType {
  /// SQLite column type used in generated DDL.
  pub fn sql_type(self) -> &'static str {
    match self {
      Self::Text | Self::Date => "TEXT",
      Self::Integer => "INTEGER",
      Self::Real => "REAL",
    }
  }

  /// Coerce a submitted value into this type's canonical representation.
  ///
  /// Form input arrives as text, so numeric columns accept numeric strings and
  /// text columns accept integers. Dates accept `YYYY-MM-DD` or `MM/DD/YYYY`;
  /// an empty string or `N/A` is treated as no date.
  pub fn coerce(self, column: &str, value: Value) -> Result<Value> {
    let mismatch = |v: &Value| {
      Error::Schema(format!("column {column} expects {self}, got {v:?}"))
    };
    match (self, value) {
      (_, Value::Null) => Ok(Value::Null),
      (Self::Text, Value::Text(s)) => Ok(Value::Text(s)),
      (Self::Text, Value::Integer(i)) => Ok(Value::Text(i.to_string())),
      (Self::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
      (Self::Integer, Value::Text(s)) => s
        .trim()
        .parse()
        .map(Value::Integer)
        .map_err(|_| mismatch(&Value::Text(s))),
      (Self::Real, Value::Real(r)) => Ok(Value::Real(r)),
      (Self::Real, Value::Integer(i)) => Ok(Value::Real(i as f64)),
      (Self::Real, Value::Text(s)) => s
        .trim()
        .parse()
        .map(Value::Real)
        .map_err(|_| mismatch(&Value::Text(s))),
      (Self::Date, Value::Text(s)) => normalize_date(column, &s),
      (_, other) => Err(mismatch(&other)),
    }
  }
}

fn normalize_date(column: &str, raw: &str) -> Result<Value> {
  let raw = raw.trim();
  if raw.is_empty() || raw.eq_ignore_ascii_case("n/a") {
    return Ok(Value::Null);
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
    .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
    .map_err(|_| {
      Error::Schema(format!(
        "column {column}: {raw:?} is not a date (expected YYYY-MM-DD or MM/DD/YYYY)"
      ))
    })
}

/// A value-level check applied to text columns before any write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", content = "arg", rename_all = "snake_case")]
pub enum Check {
  /// At most this many characters.
  MaxLen(usize),
  /// Between 1 and this many ASCII digits.
  Digits(usize),
  /// One of a fixed set of codes.
  OneOf(Vec<String>),
}

impl Check {
  pub fn one_of(codes: &[&str]) -> Self {
    Self::OneOf(codes.iter().map(|c| (*c).to_owned()).collect())
  }

  fn verify(&self, column: &str, value: &Value) -> Result<()> {
    let Some(text) = value.as_text() else { return Ok(()) };
    let ok = match self {
      Self::MaxLen(n) => text.chars().count() <= *n,
      Self::Digits(n) => {
        !text.is_empty()
          && text.len() <= *n
          && text.bytes().all(|b| b.is_ascii_digit())
      }
      Self::OneOf(codes) => codes.iter().any(|c| c == text),
    };
    if ok {
      return Ok(());
    }
    Err(Error::Constraint(match self {
      Self::MaxLen(n) => format!("{column} cannot exceed {n} characters"),
      Self::Digits(n) => format!("{column} must be 1 to {n} digits"),
      Self::OneOf(codes) => {
        format!("{column} must be one of {}", codes.join(", "))
      }
    }))
  }
}

// ─── ColumnDef ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDef {
  pub name:     String,
  #[serde(rename = "type")]
  pub ty:       SemanticType,
  pub nullable: bool,
  pub default:  Option<Value>,
  pub checks:   Vec<Check>,
}

impl ColumnDef {
  pub fn new(name: impl Into<String>, ty: SemanticType) -> Self {
    Self {
      name: name.into(),
      ty,
      nullable: true,
      default: None,
      checks: Vec::new(),
    }
  }

  pub fn text(name: impl Into<String>) -> Self { Self::new(name, SemanticType::Text) }

  pub fn integer(name: impl Into<String>) -> Self {
    Self::new(name, SemanticType::Integer)
  }

  pub fn real(name: impl Into<String>) -> Self { Self::new(name, SemanticType::Real) }

  pub fn date(name: impl Into<String>) -> Self { Self::new(name, SemanticType::Date) }

  pub fn not_null(mut self) -> Self {
    self.nullable = false;
    self
  }

  pub fn default_value(mut self, value: impl Into<Value>) -> Self {
    self.default = Some(value.into());
    self
  }

  pub fn check(mut self, check: Check) -> Self {
    self.checks.push(check);
    self
  }

  /// Coerce, null-check, and run every [`Check`] against `value`.
  pub fn validate(&self, table: &str, value: Value) -> Result<Value> {
    let qualified = format!("{table}.{}", self.name);
    let value = self.ty.coerce(&qualified, value)?;
    if value.is_null() {
      if !self.nullable {
        return Err(Error::Constraint(format!("{qualified} is required")));
      }
      return Ok(value);
    }
    for check in &self.checks {
      check.verify(&qualified, &value)?;
    }
    Ok(value)
  }
}

// ─── ForeignKey ──────────────────────────────────────────────────────────────

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
  /// Referencing rows are deleted first, recursively.
  Cascade,
  /// Deletion fails while any referencing row exists.
  Restrict,
}

/// An outgoing edge: `column` in the owning table references
/// `references.referenced_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
  pub column:            String,
  pub references:        String,
  pub referenced_column: String,
  pub on_delete:         OnDelete,
}

impl ForeignKey {
  pub fn cascade(column: &str, references: &str, referenced_column: &str) -> Self {
    Self::new(column, references, referenced_column, OnDelete::Cascade)
  }

  pub fn restrict(column: &str, references: &str, referenced_column: &str) -> Self {
    Self::new(column, references, referenced_column, OnDelete::Restrict)
  }

  fn new(
    column: &str,
    references: &str,
    referenced_column: &str,
    on_delete: OnDelete,
  ) -> Self {
    Self {
      column: column.to_owned(),
      references: references.to_owned(),
      referenced_column: referenced_column.to_owned(),
      on_delete,
    }
  }
}

// ─── TableDef ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TableDef {
  pub name:         String,
  pub columns:      Vec<ColumnDef>,
  pub primary_key:  Vec<String>,
  pub foreign_keys: Vec<ForeignKey>,
  /// Shared reference data (e.g. the disease masterlist) rather than rows
  /// owned by one parent.
  pub masterlist:   bool,
}

impl TableDef {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:         name.into(),
      columns:      Vec::new(),
      primary_key:  Vec::new(),
      foreign_keys: Vec::new(),
      masterlist:   false,
    }
  }

  pub fn column(mut self, column: ColumnDef) -> Self {
    self.columns.push(column);
    self
  }

  pub fn primary_key<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
    self.primary_key = columns.into_iter().map(str::to_owned).collect();
    self
  }

  pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
    self.foreign_keys.push(fk);
    self
  }

  pub fn masterlist(mut self) -> Self {
    self.masterlist = true;
    self
  }

  pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn column_names(&self) -> impl Iterator<Item = &str> {
    self.columns.iter().map(|c| c.name.as_str())
  }

  pub fn is_key_column(&self, name: &str) -> bool {
    self.primary_key.iter().any(|k| k == name)
  }

  /// A single `Integer` primary key is assigned by the store when omitted.
  pub fn auto_key_column(&self) -> Option<&str> {
    match self.primary_key.as_slice() {
      [only] => self
        .column_def(only)
        .filter(|c| c.ty == SemanticType::Integer)
        .map(|c| c.name.as_str()),
      _ => None,
    }
  }

  /// Extract the primary key from a column map; `None` if any part is
  /// missing or null.
  pub fn key_of(&self, values: &FieldValues) -> Option<PrimaryKey> {
    self
      .primary_key
      .iter()
      .map(|k| values.get(k).filter(|v| !v.is_null()).cloned())
      .collect::<Option<Vec<_>>>()
      .map(PrimaryKey)
  }

  /// Build a [`Row`] snapshot from a complete column map.
  pub fn row(&self, values: FieldValues) -> Result<Row> {
    let key = self.key_of(&values).ok_or_else(|| {
      Error::Constraint(format!("{} row is missing its primary key", self.name))
    })?;
    Ok(Row { table: self.name.clone(), key, values })
  }

  /// Reject a key whose arity does not match the table's primary key.
  pub fn check_key(&self, key: &PrimaryKey) -> Result<()> {
    if key.len() == self.primary_key.len() && key.values().iter().all(|v| !v.is_null()) {
      return Ok(());
    }
    Err(Error::Schema(format!(
      "{} key must have {} non-null value(s) ({}), got {key}",
      self.name,
      self.primary_key.len(),
      self.primary_key.join(", ")
    )))
  }

  /// Check that `row` is a complete snapshot of one row of this table: every
  /// column present, every value already in stored form, and `row.key` equal
  /// to the key columns.
  pub fn check_snapshot(&self, row: &Row) -> Result<()> {
    if row.table != self.name {
      return Err(Error::Schema(format!("{} snapshot given for table {}", row.table, self.name)));
    }
    if let Some(unknown) = row.values.keys().find(|k| self.column_def(k).is_none()) {
      return Err(self.unknown_column(unknown));
    }
    for col in &self.columns {
      let Some(value) = row.values.get(&col.name) else {
        return Err(Error::Constraint(format!(
          "{} snapshot is missing column {}",
          self.name, col.name
        )));
      };
      if col.validate(&self.name, value.clone())? != *value {
        return Err(Error::Constraint(format!(
          "{}.{} is not in stored form: {value}",
          self.name, col.name
        )));
      }
    }
    if self.key_of(&row.values).as_ref() != Some(&row.key) {
      return Err(Error::Constraint(format!(
        "{} snapshot key {} does not match its key columns",
        self.name, row.key
      )));
    }
    Ok(())
  }

  fn unknown_column(&self, name: &str) -> Error {
    Error::Schema(format!("unknown column {}.{name}", self.name))
  }

  /// Validate an insert and fill in defaults.
  ///
  /// The returned map contains every column except an omitted auto key.
  pub fn prepare_insert(&self, mut values: FieldValues) -> Result<FieldValues> {
    if let Some(unknown) = values.keys().find(|k| self.column_def(k).is_none()) {
      return Err(self.unknown_column(unknown));
    }

    let auto_key = self.auto_key_column();
    let mut out = FieldValues::new();
    for col in &self.columns {
      let is_auto = auto_key == Some(col.name.as_str());
      match values.remove(&col.name) {
        Some(Value::Null) if is_auto => {}
        Some(v) => {
          out.insert(col.name.clone(), col.validate(&self.name, v)?);
        }
        None if is_auto => {}
        None => {
          let v = col.default.clone().unwrap_or(Value::Null);
          out.insert(col.name.clone(), col.validate(&self.name, v)?);
        }
      }
    }

    if auto_key.is_none() && self.key_of(&out).is_none() {
      return Err(Error::Constraint(format!(
        "{} requires a primary key ({})",
        self.name,
        self.primary_key.join(", ")
      )));
    }
    Ok(out)
  }

  /// Validate an update against the current snapshot and return the new one.
  /// Primary key columns are immutable.
  pub fn prepare_update(&self, before: &Row, changes: FieldValues) -> Result<Row> {
    let mut after = before.clone();
    for (name, value) in changes {
      let col = self.column_def(&name).ok_or_else(|| self.unknown_column(&name))?;
      let value = col.validate(&self.name, value)?;
      if self.is_key_column(&name) && before.get(&name) != Some(&value) {
        return Err(Error::Schema(format!(
          "primary key column {}.{name} cannot be changed",
          self.name
        )));
      }
      after.values.insert(name, value);
    }
    Ok(after)
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// All registered tables, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
  tables: Vec<TableDef>,
}

impl SchemaRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register a table. Fails with [`Error::Schema`] on duplicate names,
  /// unknown columns, foreign keys into unknown tables or columns, or cycles.
  pub fn register(&mut self, table: TableDef) -> Result<()> {
    if self.tables.iter().any(|t| t.name == table.name) {
      return Err(Error::Schema(format!("table {} is already registered", table.name)));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = table.columns.iter().find(|c| !seen.insert(c.name.as_str())) {
      return Err(Error::Schema(format!("duplicate column {}.{}", table.name, dup.name)));
    }

    if table.primary_key.is_empty() {
      return Err(Error::Schema(format!("table {} has no primary key", table.name)));
    }
    if let Some(k) = table.primary_key.iter().find(|k| table.column_def(k).is_none()) {
      return Err(table.unknown_column(k));
    }

    for fk in &table.foreign_keys {
      if table.column_def(&fk.column).is_none() {
        return Err(table.unknown_column(&fk.column));
      }
      let target = if fk.references == table.name {
        &table
      } else {
        self.table(&fk.references)?
      };
      if target.column_def(&fk.referenced_column).is_none() {
        return Err(target.unknown_column(&fk.referenced_column));
      }
      if target.primary_key != [fk.referenced_column.clone()] {
        return Err(Error::Schema(format!(
          "{}.{} must reference the primary key of {}",
          table.name, fk.column, target.name
        )));
      }
    }

    self.tables.push(table);
    if let Some(cycle) = self.find_cycle() {
      self.tables.pop();
      return Err(Error::Schema(format!(
        "foreign keys form a cycle: {}",
        cycle.join(" -> ")
      )));
    }
    Ok(())
  }

  pub fn tables(&self) -> &[TableDef] { &self.tables }

  pub fn table(&self, name: &str) -> Result<&TableDef> {
    self
      .tables
      .iter()
      .find(|t| t.name == name)
      .ok_or_else(|| Error::Schema(format!("unknown table {name}")))
  }

  /// Every `(child table, foreign key)` edge pointing into `table`.
  pub fn incoming(&self, table: &str) -> Vec<(&TableDef, &ForeignKey)> {
    self
      .tables
      .iter()
      .flat_map(|t| t.foreign_keys.iter().map(move |fk| (t, fk)))
      .filter(|(_, fk)| fk.references == table)
      .collect()
  }

  /// Tables with a direct foreign key into `table`.
  pub fn dependents_of(&self, table: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for (child, _) in self.incoming(table) {
      if !out.contains(&child.name.as_str()) {
        out.push(&child.name);
      }
    }
    out
  }

  /// `table` and every table reachable through incoming edges, ordered so that
  /// nothing is listed before a table that depends on it.
  pub fn topological_delete_order(&self, table: &str) -> Result<Vec<&str>> {
    let root = self.table(table)?;
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    self.visit_dependents(&root.name, &mut visited, &mut order);
    Ok(order)
  }

  /// Every registered table, leaves first.
  pub fn delete_order(&self) -> Vec<&str> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    for t in &self.tables {
      self.visit_dependents(&t.name, &mut visited, &mut order);
    }
    order
  }

  fn visit_dependents<'a>(
    &'a self,
    table: &'a str,
    visited: &mut HashSet<&'a str>,
    order: &mut Vec<&'a str>,
  ) {
    if !visited.insert(table) {
      return;
    }
    for dep in self.dependents_of(table) {
      self.visit_dependents(dep, visited, order);
    }
    order.push(table);
  }

  /// Depth-first search over outgoing edges; returns the first cycle found.
  fn find_cycle(&self) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      Active,
      Done,
    }

    fn walk<'a>(
      registry: &'a SchemaRegistry,
      table: &'a TableDef,
      marks: &mut HashMap<&'a str, Mark>,
      path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
      match marks.get(table.name.as_str()) {
        Some(Mark::Done) => return None,
        Some(Mark::Active) => {
          let start = path.iter().position(|t| *t == table.name)?;
          let mut cycle: Vec<String> =
            path[start..].iter().map(|t| (*t).to_owned()).collect();
          cycle.push(table.name.clone());
          return Some(cycle);
        }
        None => {}
      }
      marks.insert(&table.name, Mark::Active);
      path.push(&table.name);
      for fk in &table.foreign_keys {
        let Ok(target) = registry.table(&fk.references) else { continue };
        if let Some(cycle) = walk(registry, target, marks, path) {
          return Some(cycle);
        }
      }
      path.pop();
      marks.insert(&table.name, Mark::Done);
      None
    }

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    self
      .tables
      .iter()
      .find_map(|t| walk(self, t, &mut marks, &mut path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::fields;

  fn parent() -> TableDef {
    TableDef::new("parent")
      .column(ColumnDef::text("id").not_null())
      .column(ColumnDef::text("label").not_null().check(Check::MaxLen(5)))
      .column(ColumnDef::text("status").not_null().default_value("S"))
      .primary_key(["id"])
  }

  fn child() -> TableDef {
    TableDef::new("child")
      .column(ColumnDef::integer("child_id"))
      .column(ColumnDef::text("parent_id").not_null())
      .column(ColumnDef::date("seen_on"))
      .primary_key(["child_id"])
      .foreign_key(ForeignKey::cascade("parent_id", "parent", "id"))
  }

  #[test]
  fn rejects_unknown_referenced_table() {
    let mut reg = SchemaRegistry::new();
    let err = reg.register(child()).unwrap_err();
    assert!(matches!(err, Error::Schema(m) if m.contains("unknown table parent")));
  }

  #[test]
  fn rejects_unknown_referenced_column() {
    let mut reg = SchemaRegistry::new();
    reg.register(parent()).unwrap();
    let bad = TableDef::new("child")
      .column(ColumnDef::integer("child_id"))
      .column(ColumnDef::text("parent_id"))
      .primary_key(["child_id"])
      .foreign_key(ForeignKey::cascade("parent_id", "parent", "nope"));
    assert!(matches!(reg.register(bad), Err(Error::Schema(_))));
  }

  #[test]
  fn rejects_self_reference_as_cycle() {
    let mut reg = SchemaRegistry::new();
    let looped = TableDef::new("node")
      .column(ColumnDef::integer("id"))
      .column(ColumnDef::integer("next"))
      .primary_key(["id"])
      .foreign_key(ForeignKey::cascade("next", "node", "id"));
    let err = reg.register(looped).unwrap_err();
    assert!(matches!(err, Error::Schema(m) if m.contains("cycle")));
    assert!(reg.tables().is_empty());
  }

  #[test]
  fn delete_order_puts_dependents_first() {
    let mut reg = SchemaRegistry::new();
    reg.register(parent()).unwrap();
    reg.register(child()).unwrap();
    reg
      .register(
        TableDef::new("grandchild")
          .column(ColumnDef::integer("id"))
          .column(ColumnDef::integer("child_id"))
          .primary_key(["id"])
          .foreign_key(ForeignKey::cascade("child_id", "child", "child_id")),
      )
      .unwrap();

    assert_eq!(reg.dependents_of("parent"), vec!["child"]);
    assert_eq!(
      reg.topological_delete_order("parent").unwrap(),
      vec!["grandchild", "child", "parent"]
    );
    assert_eq!(reg.topological_delete_order("child").unwrap(), vec!["grandchild", "child"]);
    assert_eq!(reg.delete_order(), vec!["grandchild", "child", "parent"]);
  }

  #[test]
  fn prepare_insert_fills_defaults_and_checks() {
    let table = parent();
    let out = table
      .prepare_insert(fields([("id", "p1"), ("label", "ok")]))
      .unwrap();
    assert_eq!(out.get("status"), Some(&Value::from("S")));

    let err = table
      .prepare_insert(fields([("id", "p1"), ("label", "too long")]))
      .unwrap_err();
    assert!(matches!(err, Error::Constraint(_)));

    let err = table.prepare_insert(fields([("id", "p1")])).unwrap_err();
    assert!(matches!(err, Error::Constraint(m) if m.contains("parent.label is required")));

    let err = table
      .prepare_insert(fields([("id", "p1"), ("label", "ok"), ("bogus", "x")]))
      .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
  }

  #[test]
  fn prepare_insert_normalizes_dates_and_skips_auto_key() {
    let out = child()
      .prepare_insert(fields([("parent_id", "p1"), ("seen_on", "08/16/2004")]))
      .unwrap();
    assert!(!out.contains_key("child_id"));
    assert_eq!(out.get("seen_on"), Some(&Value::from("2004-08-16")));

    let err = child()
      .prepare_insert(fields([("parent_id", "p1"), ("seen_on", "yesterday")]))
      .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
  }

  #[test]
  fn prepare_update_keeps_key_immutable() {
    let table = parent();
    let before = table
      .row(
        table
          .prepare_insert(fields([("id", "p1"), ("label", "old")]))
          .unwrap(),
      )
      .unwrap();

    let after = table
      .prepare_update(&before, fields([("label", "new")]))
      .unwrap();
    assert_eq!(after.get("label"), Some(&Value::from("new")));
    assert_eq!(before.get("label"), Some(&Value::from("old")));

    let err = table
      .prepare_update(&before, fields([("id", "p2")]))
      .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
  }

  #[test]
  fn check_snapshot_requires_stored_form_and_matching_key() {
    let table = parent();
    let row = table
      .row(
        table
          .prepare_insert(fields([("id", "p1"), ("label", "ok")]))
          .unwrap(),
      )
      .unwrap();
    table.check_snapshot(&row).unwrap();

    let mut rekeyed = row.clone();
    rekeyed.key = PrimaryKey::from("p2");
    let err = table.check_snapshot(&rekeyed).unwrap_err();
    assert!(matches!(err, Error::Constraint(m) if m.contains("does not match")));

    let mut partial = row.clone();
    partial.values.remove("status");
    let err = table.check_snapshot(&partial).unwrap_err();
    assert!(matches!(err, Error::Constraint(m) if m.contains("missing column status")));

    let mut too_long = row.clone();
    too_long.values.insert("label".into(), "too long".into());
    assert!(matches!(table.check_snapshot(&too_long), Err(Error::Constraint(_))));

    let mut extra = row;
    extra.values.insert("bogus".into(), "x".into());
    assert!(matches!(table.check_snapshot(&extra), Err(Error::Schema(_))));

    let dated = child()
      .row(fields([
        ("child_id", Value::Integer(1)),
        ("parent_id", "p1".into()),
        ("seen_on", "08/16/2004".into()),
      ]))
      .unwrap();
    let err = child().check_snapshot(&dated).unwrap_err();
    assert!(matches!(err, Error::Constraint(m) if m.contains("stored form")));
  }

  #[test]
  fn digits_check() {
    let col = ColumnDef::text("n").check(Check::Digits(5));
    assert!(col.validate("t", "12345".into()).is_ok());
    assert!(col.validate("t", Value::Integer(42)).is_ok());
    assert!(col.validate("t", "123456".into()).is_err());
    assert!(col.validate("t", "12a".into()).is_err());
  }
}
