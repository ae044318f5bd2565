//! Handlers that bypass the operation log: `POST /sql` and `POST /reset`.
//! Both can clear the undo/redo history.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use carebase_core::store::{RecordStore, SqlReport};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SqlBody {
  pub sql: String,
}

/// `POST /sql`: body: `{"sql": "SELECT ..."}`
pub async fn run<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<SqlBody>,
) -> Result<Json<SqlReport>, ApiError>
where
  S: RecordStore,
{
  let report = store.run_sql(&body.sql).await.map_err(ApiError::store)?;
  Ok(Json(report))
}

/// `POST /reset`: irreversible
pub async fn reset<S>(State(store): State<Arc<S>>) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
{
  store.reset_all().await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
