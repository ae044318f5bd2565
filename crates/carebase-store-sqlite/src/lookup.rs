//! [`RowLookup`] over a live connection, used by the cascade planner and by
//! the write path to capture snapshots.

use carebase_core::{
  cascade::RowLookup,
  schema::{TableDef, quote_ident},
  value::{PrimaryKey, Row, Value},
};
use rusqlite::{Connection, params_from_iter};

use crate::{
  Error, Result,
  encode::{column_list, decode_row, encode_value, key_predicate},
};

pub struct ConnLookup<'c> {
  conn: &'c Connection,
}

impl<'c> ConnLookup<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn select(
    &self,
    table: &TableDef,
    predicate: &str,
    params: impl IntoIterator<Item = rusqlite::types::Value>,
  ) -> Result<Vec<Row>> {
    let sql = format!(
      "SELECT {} FROM {} WHERE {predicate} ORDER BY rowid",
      column_list(table),
      quote_ident(&table.name)
    );
    let mut stmt = self.conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
      out.push(decode_row(table, row)?);
    }
    Ok(out)
  }
}

impl RowLookup for ConnLookup<'_> {
  type Error = Error;

  fn fetch(&self, table: &TableDef, key: &PrimaryKey) -> Result<Option<Row>> {
    table.check_key(key)?;
    let rows = self.select(
      table,
      &key_predicate(table, 1),
      key.values().iter().map(encode_value),
    )?;
    Ok(rows.into_iter().next())
  }

  fn referencing(&self, table: &TableDef, column: &str, value: &Value) -> Result<Vec<Row>> {
    self.select(
      table,
      &format!("{} = ?1", quote_ident(column)),
      [encode_value(value)],
    )
  }
}
