//! Reset and seeding. Neither goes through the operation log.

use carebase_core::{catalog::Catalog, schema::quote_ident};
use rusqlite::{Connection, OptionalExtension as _};

use crate::{Result, apply::insert_new, schema::create_tables};

/// Delete every row in dependency order, clear the `AUTOINCREMENT` sequences,
/// and optionally reseed masterlists. Tables dropped through raw SQL are
/// recreated first.
pub fn reset_all(conn: &Connection, catalog: &Catalog, reseed_masterlist: bool) -> Result<usize> {
  conn.execute_batch(&create_tables(&catalog.registry))?;

  let mut removed = 0;
  for table in catalog.registry.delete_order() {
    removed += conn.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;
  }

  let has_sequences = conn
    .query_row(
      "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
      [],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if has_sequences {
    conn.execute("DELETE FROM sqlite_sequence", [])?;
  }

  if reseed_masterlist {
    seed_masterlists(conn, catalog)?;
  }
  Ok(removed)
}

/// Insert the catalog's masterlist seed rows.
pub fn seed_masterlists(conn: &Connection, catalog: &Catalog) -> Result<usize> {
  for (table, values) in &catalog.masterlist_seed {
    let def = catalog.registry.table(table)?;
    insert_new(conn, def, def.prepare_insert(values.clone())?)?;
  }
  Ok(catalog.masterlist_seed.len())
}

pub fn row_count(conn: &Connection, table: &str) -> Result<i64> {
  Ok(conn.query_row(&format!("SELECT count(*) FROM {}", quote_ident(table)), [], |r| {
    r.get(0)
  })?)
}
