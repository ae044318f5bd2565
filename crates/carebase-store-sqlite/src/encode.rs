//! Conversions between [`carebase_core::value::Value`] and SQLite values, and
//! row decoding against a [`TableDef`].

use carebase_core::{
  schema::{TableDef, quote_ident},
  value::{FieldValues, Row, Value},
};
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::Result;

pub fn encode_value(v: &Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Real(r) => SqlValue::Real(*r),
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Blob(b) => SqlValue::Blob(b.clone()),
  }
}

pub fn decode_value(v: ValueRef<'_>) -> Value {
  match v {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::Integer(i),
    ValueRef::Real(r) => Value::Real(r),
    ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => Value::Blob(b.to_vec()),
  }
}

/// `"a", "b", "c"` for every column of `table`.
pub fn column_list(table: &TableDef) -> String {
  table.column_names().map(quote_ident).collect::<Vec<_>>().join(", ")
}

/// `"k1" = ?1 AND "k2" = ?2` over the primary key, numbering from `first`.
pub fn key_predicate(table: &TableDef, first: usize) -> String {
  table
    .primary_key
    .iter()
    .enumerate()
    .map(|(i, k)| format!("{} = ?{}", quote_ident(k), first + i))
    .collect::<Vec<_>>()
    .join(" AND ")
}

/// Decode a row selected with [`column_list`].
pub fn decode_row(table: &TableDef, row: &rusqlite::Row<'_>) -> Result<Row> {
  let mut values = FieldValues::new();
  for (i, name) in table.column_names().enumerate() {
    values.insert(name.to_owned(), decode_value(row.get_ref(i)?));
  }
  Ok(table.row(values)?)
}
