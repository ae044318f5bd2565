//! DDL rendered from the schema registry.
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS`, so running the DDL
//! again (on open, or on reset after a raw `DROP`) only recreates what is
//! missing. Foreign keys carry no `ON DELETE` action: cascades are planned and
//! applied row by row so that every removed row is captured for undo, and
//! SQLite only enforces that nothing is left dangling.

use carebase_core::{
  schema::{Check, ColumnDef, SchemaRegistry, TableDef, quote_ident},
  value::Value,
};

/// Connection settings, applied once per connection outside any transaction.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

pub const SCHEMA_VERSION: i64 = 1;

/// `CREATE TABLE IF NOT EXISTS` for every registered table, parents first.
pub fn create_tables(registry: &SchemaRegistry) -> String {
  let mut ddl = String::new();
  for table in registry.tables() {
    ddl.push_str(&create_table(table));
    ddl.push('\n');
  }
  ddl.push_str(&format!("PRAGMA user_version = {SCHEMA_VERSION};\n"));
  ddl
}

fn create_table(table: &TableDef) -> String {
  let auto_key = table.auto_key_column();
  let mut lines: Vec<String> = table
    .columns
    .iter()
    .map(|c| column_ddl(c, auto_key == Some(c.name.as_str())))
    .collect();

  if auto_key.is_none() {
    let keys: Vec<String> = table.primary_key.iter().map(|k| quote_ident(k)).collect();
    lines.push(format!("PRIMARY KEY ({})", keys.join(", ")));
  }
  for fk in &table.foreign_keys {
    lines.push(format!(
      "FOREIGN KEY ({}) REFERENCES {} ({})",
      quote_ident(&fk.column),
      quote_ident(&fk.references),
      quote_ident(&fk.referenced_column)
    ));
  }

  format!(
    "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
    quote_ident(&table.name),
    lines.join(",\n    ")
  )
}

fn column_ddl(col: &ColumnDef, auto_key: bool) -> String {
  let name = quote_ident(&col.name);
  if auto_key {
    return format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT");
  }

  let mut ddl = format!("{name} {}", col.ty.sql_type());
  if !col.nullable {
    ddl.push_str(" NOT NULL");
  }
  if let Some(default) = &col.default {
    ddl.push_str(&format!(" DEFAULT {}", literal(default)));
  }
  for check in &col.checks {
    match check {
      Check::MaxLen(n) => ddl.push_str(&format!(" CHECK (length({name}) <= {n})")),
      Check::OneOf(codes) => {
        let codes: Vec<String> = codes.iter().map(|c| literal(&Value::from(c.as_str()))).collect();
        ddl.push_str(&format!(" CHECK ({name} IN ({}))", codes.join(", ")));
      }
      // Enforced on structured writes only.
      Check::Digits(_) => {}
    }
  }
  ddl
}

fn literal(value: &Value) -> String {
  match value {
    Value::Null => "NULL".into(),
    Value::Integer(i) => i.to_string(),
    Value::Real(r) => r.to_string(),
    Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
    Value::Blob(b) => {
      let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
      format!("X'{hex}'")
    }
  }
}
