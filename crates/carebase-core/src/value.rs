//! Scalar values, primary keys, and row snapshots.
//!
//! A [`Row`] is a value: once captured into an operation it is never edited in
//! place. Every mutation produces a new snapshot.

use std::{
  collections::BTreeMap,
  fmt,
  hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

// ─── Value ───────────────────────────────────────────────────────────────────

/// One column value. Mirrors SQLite's storage classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Self::Integer(i) => Some(*i),
      _ => None,
    }
  }
}

// Reals compare by bit pattern so values can key hash maps.
impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::Null, Self::Null) => true,
      (Self::Integer(a), Self::Integer(b)) => a == b,
      (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
      (Self::Text(a), Self::Text(b)) => a == b,
      (Self::Blob(a), Self::Blob(b)) => a == b,
      _ => false,
    }
  }
}

impl Eq for Value {}

impl Hash for Value {
  fn hash<H: Hasher>(&self, state: &mut H) {
    std::mem::discriminant(self).hash(state);
    match self {
      Self::Null => {}
      Self::Integer(i) => i.hash(state),
      Self::Real(r) => r.to_bits().hash(state),
      Self::Text(s) => s.hash(state),
      Self::Blob(b) => b.hash(state),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Null => f.write_str("NULL"),
      Self::Integer(i) => write!(f, "{i}"),
      Self::Real(r) => write!(f, "{r}"),
      Self::Text(s) => f.write_str(s),
      Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
    }
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<f64> for Value {
  fn from(r: f64) -> Self { Self::Real(r) }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// Column name → value, as submitted by a collaborator or read from a row.
pub type FieldValues = BTreeMap<String, Value>;

/// Build a [`FieldValues`] map from `(column, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> FieldValues
where
  I: IntoIterator<Item = (K, V)>,
  K: Into<String>,
  V: Into<Value>,
{
  pairs
    .into_iter()
    .map(|(k, v)| (k.into(), v.into()))
    .collect()
}

// ─── PrimaryKey ──────────────────────────────────────────────────────────────

/// The values of a table's primary-key columns, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKey(pub Vec<Value>);

impl PrimaryKey {
  pub fn single(value: impl Into<Value>) -> Self { Self(vec![value.into()]) }

  pub fn values(&self) -> &[Value] { &self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for PrimaryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0.as_slice() {
      [single] => write!(f, "{single}"),
      parts => {
        f.write_str("(")?;
        for (i, part) in parts.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{part}")?;
        }
        f.write_str(")")
      }
    }
  }
}

impl From<&str> for PrimaryKey {
  fn from(s: &str) -> Self { Self::single(s) }
}

impl From<i64> for PrimaryKey {
  fn from(i: i64) -> Self { Self::single(i) }
}

impl From<Vec<Value>> for PrimaryKey {
  fn from(v: Vec<Value>) -> Self { Self(v) }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// Identity of a row across the whole schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
  pub table: String,
  pub key:   PrimaryKey,
}

impl fmt::Display for RowKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.table, self.key)
  }
}

/// An immutable snapshot of one row, tagged with its table and primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
  pub table:  String,
  pub key:    PrimaryKey,
  pub values: FieldValues,
}

impl Row {
  pub fn get(&self, column: &str) -> Option<&Value> { self.values.get(column) }

  pub fn row_key(&self) -> RowKey {
    RowKey { table: self.table.clone(), key: self.key.clone() }
  }
}

// ─── ResultSet ───────────────────────────────────────────────────────────────

/// Tabular output of a view, a table listing, or a raw SELECT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Value>>,
}

impl ResultSet {
  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  /// The value of `column` in row `index`, if both exist.
  pub fn get(&self, index: usize, column: &str) -> Option<&Value> {
    let col = self.column_index(column)?;
    self.rows.get(index)?.get(col)
  }
}
