//! Raw SQL execution.
//!
//! One statement per call. SQLite's read-only flag decides what a statement
//! is: read-only statements return rows and leave the history alone; anything
//! else runs in its own transaction and clears the history once committed.

use carebase_core::{
  store::SqlResult,
  value::ResultSet,
};
use rusqlite::{Batch, Connection};

use crate::{Result, encode::decode_value};

pub const INVALIDATION_WARNING: &str =
  "raw SQL modified the database; the undo/redo history has been cleared";

fn sql_error(e: impl std::fmt::Display) -> crate::Error {
  carebase_core::Error::Sql(e.to_string()).into()
}

/// Strip surrounding whitespace and trailing semicolons.
fn normalize(sql: &str) -> &str {
  sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Execute `sql`. Every failure is reported as [`carebase_core::Error::Sql`]
/// and leaves the database unchanged.
pub fn execute(conn: &mut Connection, sql: &str) -> Result<SqlResult> {
  let sql = normalize(sql);
  if sql.is_empty() {
    return Err(sql_error("empty statement"));
  }

  let (readonly, columns) = {
    let mut batch = Batch::new(conn, sql);
    let stmt = batch
      .next()
      .map_err(sql_error)?
      .ok_or_else(|| sql_error("empty statement"))?;
    if batch.next().map_err(sql_error)?.is_some() {
      return Err(sql_error("only one statement can be run at a time"));
    }
    (stmt.readonly(), stmt.column_count())
  };

  if readonly {
    // Transaction control is read-only by SQLite's definition but would leave
    // the connection in a state the store does not manage.
    if columns == 0 {
      return Err(sql_error("statement returns no rows and changes nothing"));
    }
    return query(conn, sql).map(SqlResult::Rows);
  }

  let tx = conn.transaction().map_err(sql_error)?;
  {
    let mut stmt = tx.prepare(sql).map_err(sql_error)?;
    let mut rows = stmt.raw_query();
    while rows.next().map_err(sql_error)?.is_some() {}
  }
  let affected = tx.changes() as usize;
  tx.commit().map_err(sql_error)?;
  Ok(SqlResult::Affected(affected))
}

fn query(conn: &Connection, sql: &str) -> Result<ResultSet> {
  let mut stmt = conn.prepare(sql).map_err(sql_error)?;
  let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
  let width = columns.len();
  let mut rows = stmt.query([]).map_err(sql_error)?;
  let mut out = Vec::new();
  while let Some(row) = rows.next().map_err(sql_error)? {
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
      values.push(decode_value(row.get_ref(i).map_err(sql_error)?));
    }
    out.push(values);
  }
  Ok(ResultSet { columns, rows: out })
}
