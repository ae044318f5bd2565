//! Denormalized view definitions.
//!
//! A [`ViewDefinition`] is a read-only join over registered foreign-key edges.
//! It is validated against the registry once, rendered to a single `SELECT`,
//! and recomputed on every read; nothing is ever written back through a view.

use std::fmt;

use serde::Serialize;
use strum::Display;

use crate::{
  Error, Result,
  schema::{SchemaRegistry, quote_ident},
};

/// Placeholder emitted for a missing value inside a collected list, so that
/// parallel lists stay aligned.
const COLLECT_MISSING: &str = "N/A";
const COLLECT_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum JoinKind {
  #[strum(serialize = "JOIN")]
  Inner,
  #[strum(serialize = "LEFT JOIN")]
  Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
  pub table:  String,
  pub column: String,
}

impl ColumnRef {
  fn sql(&self) -> String {
    format!("{}.{}", quote_ident(&self.table), quote_ident(&self.column))
  }
}

impl From<(&str, &str)> for ColumnRef {
  fn from((table, column): (&str, &str)) -> Self {
    Self { table: table.to_owned(), column: column.to_owned() }
  }
}

impl fmt::Display for ColumnRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.table, self.column)
  }
}

/// Join `table` into the view along the edge `child -> parent`. One side of
/// the edge belongs to `table`, the other to a table already in scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Join {
  pub kind:   JoinKind,
  pub table:  String,
  pub child:  ColumnRef,
  pub parent: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
  Column { source: ColumnRef, alias: String },
  /// Every value of `source` among the driving row's direct dependents,
  /// joined with `", "` in storage order.
  Collect { source: ColumnRef, alias: String },
}

impl Projection {
  pub fn alias(&self) -> &str {
    match self {
      Self::Column { alias, .. } | Self::Collect { alias, .. } => alias,
    }
  }
}

// ─── ViewDefinition ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDefinition {
  pub name:        String,
  pub driving:     String,
  pub joins:       Vec<Join>,
  pub projections: Vec<Projection>,
  pub order_by:    Vec<ColumnRef>,
}

impl ViewDefinition {
  pub fn new(name: impl Into<String>, driving: impl Into<String>) -> Self {
    Self {
      name:        name.into(),
      driving:     driving.into(),
      joins:       Vec::new(),
      projections: Vec::new(),
      order_by:    Vec::new(),
    }
  }

  pub fn join(
    mut self,
    kind: JoinKind,
    table: &str,
    child: impl Into<ColumnRef>,
    parent: impl Into<ColumnRef>,
  ) -> Self {
    self.joins.push(Join {
      kind,
      table: table.to_owned(),
      child: child.into(),
      parent: parent.into(),
    });
    self
  }

  pub fn column(mut self, source: impl Into<ColumnRef>, alias: &str) -> Self {
    self
      .projections
      .push(Projection::Column { source: source.into(), alias: alias.to_owned() });
    self
  }

  pub fn collect(mut self, source: impl Into<ColumnRef>, alias: &str) -> Self {
    self
      .projections
      .push(Projection::Collect { source: source.into(), alias: alias.to_owned() });
    self
  }

  pub fn order_by(mut self, column: impl Into<ColumnRef>) -> Self {
    self.order_by.push(column.into());
    self
  }

  fn error(&self, msg: impl fmt::Display) -> Error {
    Error::View(format!("view {}: {msg}", self.name))
  }

  /// Check every table, column, and join edge against `registry`.
  pub fn validate(&self, registry: &SchemaRegistry) -> Result<()> {
    let known = |c: &ColumnRef| -> Result<()> {
      let table = registry.table(&c.table).map_err(|e| self.error(e))?;
      if table.column_def(&c.column).is_none() {
        return Err(self.error(format!("unknown column {c}")));
      }
      Ok(())
    };

    registry.table(&self.driving).map_err(|e| self.error(e))?;
    let mut scope = vec![self.driving.as_str()];

    for join in &self.joins {
      known(&join.child)?;
      known(&join.parent)?;
      if scope.contains(&join.table.as_str()) {
        return Err(self.error(format!("table {} joined twice", join.table)));
      }
      let other = if join.child.table == join.table {
        &join.parent.table
      } else if join.parent.table == join.table {
        &join.child.table
      } else {
        return Err(self.error(format!(
          "join on {} -> {} does not involve {}",
          join.child, join.parent, join.table
        )));
      };
      if !scope.contains(&other.as_str()) {
        return Err(self.error(format!("table {other} is not in scope")));
      }
      let edge = registry.table(&join.child.table)?.foreign_keys.iter().any(|fk| {
        fk.column == join.child.column
          && fk.references == join.parent.table
          && fk.referenced_column == join.parent.column
      });
      if !edge {
        return Err(self.error(format!(
          "no foreign key {} -> {}",
          join.child, join.parent
        )));
      }
      scope.push(&join.table);
    }

    if self.projections.is_empty() {
      return Err(self.error("no columns projected"));
    }
    for projection in &self.projections {
      match projection {
        Projection::Column { source, .. } => {
          known(source)?;
          if !scope.contains(&source.table.as_str()) {
            return Err(self.error(format!("table {} is not in scope", source.table)));
          }
        }
        Projection::Collect { source, .. } => {
          known(source)?;
          self.collect_edge(registry, source)?;
        }
      }
    }
    for column in &self.order_by {
      known(column)?;
      if !scope.contains(&column.table.as_str()) {
        return Err(self.error(format!("table {} is not in scope", column.table)));
      }
    }
    Ok(())
  }

  /// The `(foreign key column, driving key column)` linking a collected
  /// table to the driving table.
  fn collect_edge(
    &self,
    registry: &SchemaRegistry,
    source: &ColumnRef,
  ) -> Result<(String, String)> {
    registry
      .table(&source.table)?
      .foreign_keys
      .iter()
      .find(|fk| fk.references == self.driving)
      .map(|fk| (fk.column.clone(), fk.referenced_column.clone()))
      .ok_or_else(|| {
        self.error(format!("{} does not reference {}", source.table, self.driving))
      })
  }

  /// Every column the rendered SQL touches, for checking against the live
  /// database before running it.
  pub fn referenced_columns(&self, registry: &SchemaRegistry) -> Result<Vec<ColumnRef>> {
    let mut out = Vec::new();
    for join in &self.joins {
      out.push(join.child.clone());
      out.push(join.parent.clone());
    }
    for projection in &self.projections {
      match projection {
        Projection::Column { source, .. } => out.push(source.clone()),
        Projection::Collect { source, .. } => {
          let (fk, pk) = self.collect_edge(registry, source)?;
          out.push(source.clone());
          out.push(ColumnRef { table: source.table.clone(), column: fk });
          out.push(ColumnRef { table: self.driving.clone(), column: pk });
        }
      }
    }
    out.extend(self.order_by.iter().cloned());

    let mut unique: Vec<ColumnRef> = Vec::with_capacity(out.len());
    for column in out {
      if !unique.contains(&column) {
        unique.push(column);
      }
    }
    Ok(unique)
  }

  /// Render the view as one `SELECT` statement.
  pub fn to_sql(&self, registry: &SchemaRegistry) -> Result<String> {
    self.validate(registry)?;

    let mut select = Vec::with_capacity(self.projections.len());
    for projection in &self.projections {
      let expr = match projection {
        Projection::Column { source, .. } => source.sql(),
        Projection::Collect { source, .. } => {
          let (fk, pk) = self.collect_edge(registry, source)?;
          format!(
            "(SELECT group_concat(v, '{COLLECT_SEPARATOR}') FROM (SELECT \
             coalesce(\"sub\".{col}, '{COLLECT_MISSING}') AS v FROM {table} AS \"sub\" \
             WHERE \"sub\".{fk} = {driving}.{pk} ORDER BY \"sub\".rowid))",
            col = quote_ident(&source.column),
            table = quote_ident(&source.table),
            fk = quote_ident(&fk),
            driving = quote_ident(&self.driving),
            pk = quote_ident(&pk),
          )
        }
      };
      select.push(format!("{expr} AS {}", quote_ident(projection.alias())));
    }

    let mut sql = format!(
      "SELECT {} FROM {}",
      select.join(", "),
      quote_ident(&self.driving)
    );
    for join in &self.joins {
      sql.push_str(&format!(
        " {} {} ON {} = {}",
        join.kind,
        quote_ident(&join.table),
        join.child.sql(),
        join.parent.sql()
      ));
    }
    if !self.order_by.is_empty() {
      let order: Vec<String> = self.order_by.iter().map(ColumnRef::sql).collect();
      sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
    }
    Ok(sql)
  }
}
