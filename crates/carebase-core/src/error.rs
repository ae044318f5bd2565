//! Error types for `carebase-core`.
//!
//! [`Error`] carries the failure taxonomy shared by every layer. Backends wrap
//! it in their own error type and report the same [`ErrorKind`] through
//! [`Classify`], which is what the API layer maps to status codes.

use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::{history::HistoryDirection, value::PrimaryKey};

#[derive(Debug, Error)]
pub enum Error {
  /// Bad table, column, or foreign-key reference; also type mismatches.
  #[error("schema error: {0}")]
  Schema(String),

  /// A write would violate a constraint. The transaction is aborted.
  #[error("constraint violation: {0}")]
  Constraint(String),

  /// Cascade planning reached a row that is still being expanded.
  #[error("cascade cycle: {table} {key} reached again while it was being planned")]
  CascadeCycle { table: String, key: PrimaryKey },

  #[error("{table} row {key} not found")]
  NotFound { table: String, key: PrimaryKey },

  #[error("nothing to {0}")]
  EmptyHistory(HistoryDirection),

  #[error("view error: {0}")]
  View(String),

  #[error("sql error: {0}")]
  Sql(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The coarse category of a failure, independent of the backend that raised
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Schema,
  Constraint,
  CascadeCycle,
  NotFound,
  EmptyHistory,
  View,
  Sql,
  /// Underlying storage failure; fatal to the current call only.
  Store,
}

/// Implemented by every error type a [`crate::store::RecordStore`] can return.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Schema(_) => ErrorKind::Schema,
      Self::Constraint(_) => ErrorKind::Constraint,
      Self::CascadeCycle { .. } => ErrorKind::CascadeCycle,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::EmptyHistory(_) => ErrorKind::EmptyHistory,
      Self::View(_) => ErrorKind::View,
      Self::Sql(_) => ErrorKind::Sql,
    }
  }
}
