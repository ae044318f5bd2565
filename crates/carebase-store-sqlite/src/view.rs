//! Materializing admin views against the live database.

use std::collections::HashMap;

use carebase_core::{
  schema::{SchemaRegistry, TableDef, quote_ident},
  value::ResultSet,
  view::ViewDefinition,
};
use rusqlite::Connection;

use crate::{
  Result,
  encode::{column_list, decode_value},
};

fn view_error(msg: String) -> crate::Error { carebase_core::Error::View(msg).into() }

/// Column names SQLite currently reports for `table`; empty if it is gone.
fn live_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
  let mut stmt = conn.prepare_cached("SELECT name FROM pragma_table_info(?1)")?;
  let names = stmt
    .query_map([table], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(names)
}

/// Check the view against the live schema, then run it.
pub fn materialize(
  conn: &Connection,
  registry: &SchemaRegistry,
  view: &ViewDefinition,
) -> Result<ResultSet> {
  let mut live: HashMap<String, Vec<String>> = HashMap::new();
  for column in view.referenced_columns(registry)? {
    if !live.contains_key(&column.table) {
      live.insert(column.table.clone(), live_columns(conn, &column.table)?);
    }
    let columns = &live[&column.table];
    if columns.is_empty() {
      return Err(view_error(format!(
        "view {}: table {} no longer exists",
        view.name, column.table
      )));
    }
    if !columns.contains(&column.column) {
      return Err(view_error(format!(
        "view {}: column {column} no longer exists",
        view.name
      )));
    }
  }

  let sql = view.to_sql(registry)?;
  query(conn, &sql, view.projections.len())
}

/// Every row of a normalized table, ordered by primary key.
pub fn list_rows(conn: &Connection, table: &TableDef) -> Result<ResultSet> {
  let keys: Vec<String> = table.primary_key.iter().map(|k| quote_ident(k)).collect();
  let sql = format!(
    "SELECT {} FROM {} ORDER BY {}",
    column_list(table),
    quote_ident(&table.name),
    keys.join(", ")
  );
  let mut rs = query(conn, &sql, table.columns.len())?;
  rs.columns = table.column_names().map(str::to_owned).collect();
  Ok(rs)
}

fn query(conn: &Connection, sql: &str, width: usize) -> Result<ResultSet> {
  let mut stmt = conn.prepare(sql)?;
  let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
  let mut rows = stmt.query([])?;
  let mut out = Vec::new();
  while let Some(row) = rows.next()? {
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
      values.push(decode_value(row.get_ref(i)?));
    }
    out.push(values);
  }
  Ok(ResultSet { columns, rows: out })
}
