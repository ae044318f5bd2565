//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::{
  path::Path,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use carebase_core::{
  cascade::{self, CascadeDelete, RowLookup as _},
  catalog::Catalog,
  history::{History, HistoryDirection, HistoryStatus},
  hospice::{self, PATIENT},
  intake::IntakeForm,
  operation::{Operation, Outcome},
  schema::SchemaRegistry,
  store::{RecordStore, SqlReport, SqlResult},
  value::{FieldValues, PrimaryKey, ResultSet, Row},
};
use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::{
  Result,
  apply::{apply_checked, apply_steps, in_transaction, insert_new},
  intake::{apply_intake, apply_intake_update},
  lookup::ConnLookup,
  reset, sandbox,
  schema::{PRAGMAS, create_tables},
  view,
};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
  /// Load the demo patients into a store that has none.
  pub seed_demo_data:  bool,
  /// Load masterlist seed rows into empty masterlist tables on open and after
  /// every reset.
  pub seed_masterlist: bool,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { seed_demo_data: false, seed_masterlist: true } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the history.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  catalog: Arc<Catalog>,
  /// Only touched on the connection thread, in the same call that commits
  /// the matching transaction.
  history: Arc<Mutex<History>>,
  options: StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a hospice store at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, hospice::catalog()?, StoreOptions::default()).await
  }

  /// Open an in-memory hospice store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(hospice::catalog()?, StoreOptions::default()).await
  }

  pub async fn open_with(
    path: impl AsRef<Path>,
    catalog: Catalog,
    options: StoreOptions,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, catalog, options).await
  }

  pub async fn open_in_memory_with(catalog: Catalog, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, catalog, options).await
  }

  async fn init(
    conn: tokio_rusqlite::Connection,
    catalog: Catalog,
    options: StoreOptions,
  ) -> Result<Self> {
    let store = Self {
      conn,
      catalog: Arc::new(catalog),
      history: Arc::new(Mutex::new(History::new())),
      options,
    };
    store.init_schema().await?;
    store.seed().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let ddl = create_tables(&self.catalog.registry);
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Seed empty masterlists and, if enabled, demo patients. Seeded rows are
  /// not part of the history.
  async fn seed(&self) -> Result<()> {
    let catalog = self.catalog.clone();
    let options = self.options;
    let (masterlist, patients) = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut masterlist = 0;
          let masterlists_empty = catalog
            .registry
            .tables()
            .iter()
            .filter(|t| t.masterlist)
            .map(|t| reset::row_count(tx, &t.name))
            .collect::<Result<Vec<_>>>()?
            .iter()
            .all(|n| *n == 0);
          if options.seed_masterlist && masterlists_empty {
            masterlist = reset::seed_masterlists(tx, &catalog)?;
          }

          let mut patients = 0;
          if options.seed_demo_data && reset::row_count(tx, PATIENT)? == 0 {
            for form in &catalog.demo_intakes {
              apply_intake(tx, &catalog.registry, form.plan()?)?;
              patients += 1;
            }
          }
          Ok((masterlist, patients))
        }))
      })
      .await??;

    if masterlist + patients > 0 {
      info!(masterlist, patients, "seeded store");
    }
    Ok(())
  }

  pub fn catalog(&self) -> &Catalog { &self.catalog }

  /// Run `work` in one transaction and record the operation it returns.
  ///
  /// The history is updated inside the same connection call as the commit,
  /// so dropping the returned future can never leave a committed write
  /// unrecorded.
  async fn write<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>, &SchemaRegistry) -> Result<(T, Operation)> + Send + 'static,
  {
    let catalog = self.catalog.clone();
    let history = self.history.clone();
    let value = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| work(tx, &catalog.registry)).map(|(value, operation)| {
          info!(
            operation = %operation.summary(),
            rows = operation.affected_rows().len(),
            "committed"
          );
          lock(&history).apply_outcome(Outcome::Structured(operation));
          value
        }))
      })
      .await??;
    Ok(value)
  }

  /// Apply the top entry of one stack, then move it to the other.
  async fn replay(&self, direction: HistoryDirection) -> Result<()> {
    let catalog = self.catalog.clone();
    let history = self.history.clone();
    self
      .conn
      .call(move |conn| Ok(replay_on(conn, &catalog.registry, &history, direction)))
      .await??;
    Ok(())
  }

  /// Run a read-only closure on the connection thread.
  async fn read<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection, &Catalog) -> Result<T> + Send + 'static,
  {
    let catalog = self.catalog.clone();
    let value = self
      .conn
      .call(move |conn| Ok(work(conn, &catalog)))
      .await??;
    Ok(value)
  }
}

fn lock(history: &Mutex<History>) -> MutexGuard<'_, History> {
  history.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs on the connection thread. The stacks stay locked across the
/// transaction, and the entry only moves once the transaction has committed.
fn replay_on(
  conn: &mut Connection,
  registry: &SchemaRegistry,
  history: &Mutex<History>,
  direction: HistoryDirection,
) -> Result<()> {
  let mut history = lock(history);
  let (steps, summary) = {
    let operation = &history.peek(direction)?.operation;
    let steps = match direction {
      HistoryDirection::Undo => operation.inverse_steps(),
      HistoryDirection::Redo => operation.forward_steps(),
    };
    (steps, operation.summary())
  };
  in_transaction(conn, |tx| apply_steps(tx, registry, &steps))?;
  history.complete(direction)?;
  info!(
    %direction,
    operation = %summary,
    undo = history.undo_depth(),
    redo = history.redo_depth(),
    "replayed"
  );
  Ok(())
}

fn delete_operation(mut plans: Vec<CascadeDelete>, table: &str) -> Option<Operation> {
  match plans.len() {
    0 => None,
    1 => plans.pop().map(Operation::CascadeDelete),
    n => Some(Operation::Batch {
      label:      format!("delete {n} {table} rows"),
      operations: plans.into_iter().map(Operation::CascadeDelete).collect(),
    }),
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  fn registry(&self) -> &SchemaRegistry { &self.catalog.registry }

  fn view_names(&self) -> Vec<String> {
    self.catalog.view_names().into_iter().map(str::to_owned).collect()
  }

  // ── Structured writes ─────────────────────────────────────────────────────

  async fn submit_insert(&self, table: &str, values: FieldValues) -> Result<PrimaryKey> {
    let table = table.to_owned();
    self
      .write(move |tx, registry| {
        let def = registry.table(&table)?;
        let row = insert_new(tx, def, def.prepare_insert(values)?)?;
        Ok((row.key.clone(), Operation::Insert { row }))
      })
      .await
  }

  async fn submit_update(
    &self,
    table: &str,
    key: PrimaryKey,
    values: FieldValues,
  ) -> Result<()> {
    let table = table.to_owned();
    self
      .write(move |tx, registry| {
        let def = registry.table(&table)?;
        let before = ConnLookup::new(tx).fetch(def, &key)?.ok_or_else(|| {
          carebase_core::Error::NotFound { table: table.clone(), key: key.clone() }
        })?;
        let after = def.prepare_update(&before, values)?;
        let operation = Operation::Update { before, after };
        apply_steps(tx, registry, &operation.forward_steps())?;
        Ok(((), operation))
      })
      .await
  }

  async fn submit_delete(&self, table: &str, key: PrimaryKey) -> Result<usize> {
    let table = table.to_owned();
    self
      .write(move |tx, registry| {
        let plan = cascade::plan_delete(registry, &ConnLookup::new(tx), &table, &key)?;
        let count = plan.affected_count();
        let operation = Operation::CascadeDelete(plan);
        apply_steps(tx, registry, &operation.forward_steps())?;
        Ok((count, operation))
      })
      .await
  }

  async fn submit_delete_many(&self, table: &str, keys: Vec<PrimaryKey>) -> Result<usize> {
    if keys.is_empty() {
      return Ok(0);
    }
    let table = table.to_owned();
    self
      .write(move |tx, registry| {
        let plans =
          cascade::plan_delete_many(registry, &ConnLookup::new(tx), &table, &keys)?;
        let count: usize = plans.iter().map(CascadeDelete::affected_count).sum();
        let operation = delete_operation(plans, &table).ok_or_else(|| {
          carebase_core::Error::Constraint(format!("nothing to delete from {table}"))
        })?;
        apply_steps(tx, registry, &operation.forward_steps())?;
        Ok((count, operation))
      })
      .await
  }

  async fn preview_delete(&self, table: &str, key: PrimaryKey) -> Result<CascadeDelete> {
    let table = table.to_owned();
    self
      .read(move |conn, catalog| {
        cascade::plan_delete(&catalog.registry, &ConnLookup::new(conn), &table, &key)
      })
      .await
  }

  async fn submit_intake(&self, form: IntakeForm) -> Result<PrimaryKey> {
    let plan = form.plan()?;
    self
      .write(move |tx, registry| apply_intake(tx, registry, plan))
      .await
  }

  async fn submit_intake_update(&self, form: IntakeForm) -> Result<()> {
    let plan = form.plan()?;
    self
      .write(move |tx, registry| Ok(((), apply_intake_update(tx, registry, plan)?)))
      .await
  }

  async fn commit(&self, operation: Operation) -> Result<()> {
    self
      .write(move |tx, registry| {
        apply_checked(tx, registry, &operation.forward_steps())?;
        Ok(((), operation))
      })
      .await
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn undo(&self) -> Result<()> { self.replay(HistoryDirection::Undo).await }

  async fn redo(&self) -> Result<()> { self.replay(HistoryDirection::Redo).await }

  async fn history_status(&self) -> Result<HistoryStatus> {
    let history = self.history.clone();
    let status = self.conn.call(move |_| Ok(lock(&history).status())).await?;
    Ok(status)
  }

  // ── Untracked writes ──────────────────────────────────────────────────────

  async fn run_sql(&self, sql: &str) -> Result<SqlReport> {
    let history = self.history.clone();
    let text = sql.to_owned();
    debug!(sql = %text, "running raw sql");
    let report = self
      .conn
      .call(move |conn| {
        Ok(sandbox::execute(conn, &text).map(|result| {
          let history_invalidated = matches!(result, SqlResult::Affected(_));
          lock(&history)
            .apply_outcome(Outcome::Unstructured { invalidates_history: history_invalidated });
          let warning = history_invalidated.then(|| {
            warn!("{}", sandbox::INVALIDATION_WARNING);
            sandbox::INVALIDATION_WARNING.to_owned()
          });
          SqlReport { result, history_invalidated, warning }
        }))
      })
      .await??;
    Ok(report)
  }

  async fn reset_all(&self) -> Result<()> {
    let catalog = self.catalog.clone();
    let history = self.history.clone();
    let reseed = self.options.seed_masterlist;
    self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| reset::reset_all(tx, &catalog, reseed)).map(|removed| {
          lock(&history).invalidate();
          warn!(removed, reseed, "store reset; undo/redo history cleared");
        }))
      })
      .await??;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_admin_view(&self, name: &str) -> Result<ResultSet> {
    let name = name.to_owned();
    self
      .read(move |conn, catalog| {
        view::materialize(conn, &catalog.registry, catalog.view(&name)?)
      })
      .await
  }

  async fn list_rows(&self, table: &str) -> Result<ResultSet> {
    let table = table.to_owned();
    self
      .read(move |conn, catalog| view::list_rows(conn, catalog.registry.table(&table)?))
      .await
  }

  async fn get_row(&self, table: &str, key: PrimaryKey) -> Result<Option<Row>> {
    let table = table.to_owned();
    self
      .read(move |conn, catalog| {
        ConnLookup::new(conn).fetch(catalog.registry.table(&table)?, &key)
      })
      .await
  }
}
