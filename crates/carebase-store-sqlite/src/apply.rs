//! Applying operations: every [`Step`] must touch exactly one row, and a whole
//! operation runs inside one transaction.

use carebase_core::{
  cascade::RowLookup as _,
  operation::Step,
  schema::{SchemaRegistry, TableDef, quote_ident},
  value::{FieldValues, PrimaryKey, Row, Value},
};
use rusqlite::{Connection, Transaction, params_from_iter};

use crate::{
  Result,
  encode::{encode_value, key_predicate},
  lookup::ConnLookup,
};

/// Run `f` inside a transaction; commit on success, roll back on any error.
pub fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction()?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

pub fn apply_steps(conn: &Connection, registry: &SchemaRegistry, steps: &[Step]) -> Result<()> {
  for step in steps {
    let table = registry.table(step.table())?;
    match step {
      Step::Insert(row) => insert_values(conn, table, &row.values)?,
      Step::Update { before, after } => update_row(conn, table, before, after)?,
      Step::Delete(row) => delete_row(conn, table, row)?,
    }
  }
  Ok(())
}

/// Apply `steps` whose snapshots come from outside the store. Each step is
/// checked against the table definition and against the row it replaces
/// before it runs, so a stale or hand-built snapshot can neither touch an
/// unrelated row nor be recorded as its own inverse.
pub fn apply_checked(conn: &Connection, registry: &SchemaRegistry, steps: &[Step]) -> Result<()> {
  for step in steps {
    let table = registry.table(step.table())?;
    match step {
      Step::Insert(row) => table.check_snapshot(row)?,
      Step::Update { before, after } => {
        table.check_snapshot(before)?;
        table.check_snapshot(after)?;
        if before.key != after.key {
          return Err(
            carebase_core::Error::Constraint(format!(
              "update of {} changes key {} to {}",
              table.name, before.key, after.key
            ))
            .into(),
          );
        }
        check_current(conn, table, before)?;
      }
      Step::Delete(row) => {
        table.check_snapshot(row)?;
        check_current(conn, table, row)?;
      }
    }
    apply_steps(conn, registry, std::slice::from_ref(step))?;
  }
  Ok(())
}

/// The stored row must still equal `expected`.
fn check_current(conn: &Connection, table: &TableDef, expected: &Row) -> Result<()> {
  match ConnLookup::new(conn).fetch(table, &expected.key)? {
    None => Err(not_found(table, &expected.key).into()),
    Some(current) if current.values != expected.values => Err(
      carebase_core::Error::Constraint(format!(
        "{} row {} has changed since it was read",
        table.name, expected.key
      ))
      .into(),
    ),
    Some(_) => Ok(()),
  }
}

fn not_found(table: &TableDef, key: &PrimaryKey) -> carebase_core::Error {
  carebase_core::Error::NotFound { table: table.name.clone(), key: key.clone() }
}

fn insert_values(conn: &Connection, table: &TableDef, values: &FieldValues) -> Result<()> {
  let columns: Vec<String> = values.keys().map(|c| quote_ident(c)).collect();
  let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
  let sql = format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quote_ident(&table.name),
    columns.join(", "),
    placeholders.join(", ")
  );
  let changed = conn
    .prepare_cached(&sql)?
    .execute(params_from_iter(values.values().map(encode_value)))?;
  if changed != 1 {
    return Err(
      carebase_core::Error::Constraint(format!("insert into {} changed {changed} rows", table.name))
        .into(),
    );
  }
  Ok(())
}

/// Insert validated values and read the stored row back, so the snapshot
/// carries any key assigned by SQLite.
pub fn insert_new(conn: &Connection, table: &TableDef, values: FieldValues) -> Result<Row> {
  insert_values(conn, table, &values)?;
  let key = match table.key_of(&values) {
    Some(key) => key,
    None => PrimaryKey::single(Value::Integer(conn.last_insert_rowid())),
  };
  ConnLookup::new(conn)
    .fetch(table, &key)?
    .ok_or_else(|| not_found(table, &key).into())
}

fn update_row(conn: &Connection, table: &TableDef, before: &Row, after: &Row) -> Result<()> {
  let changes: Vec<(&String, &Value)> = after
    .values
    .iter()
    .filter(|(name, _)| !table.is_key_column(name))
    .collect();
  if changes.is_empty() {
    return Ok(());
  }

  let assignments: Vec<String> = changes
    .iter()
    .enumerate()
    .map(|(i, (name, _))| format!("{} = ?{}", quote_ident(name), i + 1))
    .collect();
  let sql = format!(
    "UPDATE {} SET {} WHERE {}",
    quote_ident(&table.name),
    assignments.join(", "),
    key_predicate(table, changes.len() + 1)
  );
  let params = changes
    .iter()
    .map(|(_, v)| encode_value(v))
    .chain(before.key.values().iter().map(encode_value));
  let changed = conn.prepare_cached(&sql)?.execute(params_from_iter(params))?;
  if changed != 1 {
    return Err(not_found(table, &before.key).into());
  }
  Ok(())
}

fn delete_row(conn: &Connection, table: &TableDef, row: &Row) -> Result<()> {
  let sql = format!(
    "DELETE FROM {} WHERE {}",
    quote_ident(&table.name),
    key_predicate(table, 1)
  );
  let changed = conn
    .prepare_cached(&sql)?
    .execute(params_from_iter(row.key.values().iter().map(encode_value)))?;
  if changed != 1 {
    return Err(not_found(table, &row.key).into());
  }
  Ok(())
}
