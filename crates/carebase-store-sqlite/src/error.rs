//! Error type for `carebase-store-sqlite`.

use carebase_core::{Classify, ErrorKind};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] carebase_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Constraint failures raised by SQLite itself (primary key, foreign key,
/// CHECK, NOT NULL) surface as [`carebase_core::Error::Constraint`].
impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    match e {
      rusqlite::Error::SqliteFailure(ref failure, ref msg)
        if failure.code == ErrorCode::ConstraintViolation =>
      {
        let msg = msg.clone().unwrap_or_else(|| failure.to_string());
        Self::Core(carebase_core::Error::Constraint(msg))
      }
      other => Self::Sqlite(other),
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Database(_) | Self::Sqlite(_) => ErrorKind::Store,
    }
  }
}
