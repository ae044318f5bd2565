//! The `RecordStore` trait and the types it returns.
//!
//! Implemented by storage backends (e.g. `carebase-store-sqlite`). The API
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::{
  cascade::CascadeDelete,
  error::Classify,
  history::HistoryStatus,
  intake::IntakeForm,
  operation::Operation,
  schema::SchemaRegistry,
  value::{FieldValues, PrimaryKey, ResultSet, Row},
};

// ─── Raw SQL results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SqlResult {
  /// A read-only statement's rows.
  Rows(ResultSet),
  /// Rows changed by a mutating statement.
  Affected(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlReport {
  pub result:              SqlResult,
  /// The statement modified data, so the undo/redo history was cleared.
  pub history_invalidated: bool,
  pub warning:             Option<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a CareBase record store.
///
/// Structured writes (`submit_*`, `commit`) are recorded as operations and can
/// be undone. `run_sql` and `reset_all` bypass the operation log and clear the
/// history.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  fn registry(&self) -> &SchemaRegistry;

  /// Names of the admin views this store can materialize.
  fn view_names(&self) -> Vec<String>;

  // ── Structured writes ─────────────────────────────────────────────────

  /// Insert one row and return its primary key (assigned by the store for
  /// auto-key tables).
  fn submit_insert<'a>(
    &'a self,
    table: &'a str,
    values: FieldValues,
  ) -> impl Future<Output = Result<PrimaryKey, Self::Error>> + Send + 'a;

  /// Change non-key columns of one row.
  fn submit_update<'a>(
    &'a self,
    table: &'a str,
    key: PrimaryKey,
    values: FieldValues,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete one row and everything that cascades from it. Returns the number
  /// of rows removed.
  fn submit_delete<'a>(
    &'a self,
    table: &'a str,
    key: PrimaryKey,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Delete several rows of one table as a single undoable unit.
  fn submit_delete_many<'a>(
    &'a self,
    table: &'a str,
    keys: Vec<PrimaryKey>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Plan a delete without applying it.
  fn preview_delete<'a>(
    &'a self,
    table: &'a str,
    key: PrimaryKey,
  ) -> impl Future<Output = Result<CascadeDelete, Self::Error>> + Send + 'a;

  /// Commit a patient intake form as one undoable unit. Returns the patient
  /// key.
  fn submit_intake(
    &self,
    form: IntakeForm,
  ) -> impl Future<Output = Result<PrimaryKey, Self::Error>> + Send + '_;

  /// Rewrite an existing patient from an intake form: the profile is
  /// updated, the patient's medical, surgical and medication rows are
  /// replaced by the form's, and missing diseases are added. One undoable
  /// unit.
  fn submit_intake_update(
    &self,
    form: IntakeForm,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Apply a pre-built operation and record it.
  fn commit(
    &self,
    operation: Operation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  fn undo(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn redo(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn history_status(
    &self,
  ) -> impl Future<Output = Result<HistoryStatus, Self::Error>> + Send + '_;

  // ── Untracked writes ──────────────────────────────────────────────────

  /// Execute one free-form SQL statement.
  fn run_sql<'a>(
    &'a self,
    sql: &'a str,
  ) -> impl Future<Output = Result<SqlReport, Self::Error>> + Send + 'a;

  /// Delete every row, reseed masterlists, and clear the history.
  fn reset_all(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_admin_view<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<ResultSet, Self::Error>> + Send + 'a;

  /// Every row of a table, ordered by primary key.
  fn list_rows<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<ResultSet, Self::Error>> + Send + 'a;

  fn get_row<'a>(
    &'a self,
    table: &'a str,
    key: PrimaryKey,
  ) -> impl Future<Output = Result<Option<Row>, Self::Error>> + Send + 'a;
}
