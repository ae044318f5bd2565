//! Handlers for `/history` endpoints. Undo and redo return the new status so
//! a front-end can refresh its buttons in one round trip.

use std::sync::Arc;

use axum::{Json, extract::State};
use carebase_core::{history::HistoryStatus, store::RecordStore};

use crate::error::ApiError;

/// `GET /history`
pub async fn status<S>(State(store): State<Arc<S>>) -> Result<Json<HistoryStatus>, ApiError>
where
  S: RecordStore,
{
  let status = store.history_status().await.map_err(ApiError::store)?;
  Ok(Json(status))
}

/// `POST /history/undo`: 409 when there is nothing to undo
pub async fn undo<S>(State(store): State<Arc<S>>) -> Result<Json<HistoryStatus>, ApiError>
where
  S: RecordStore,
{
  store.undo().await.map_err(ApiError::store)?;
  status(State(store)).await
}

/// `POST /history/redo`: 409 when there is nothing to redo
pub async fn redo<S>(State(store): State<Arc<S>>) -> Result<Json<HistoryStatus>, ApiError>
where
  S: RecordStore,
{
  store.redo().await.map_err(ApiError::store)?;
  status(State(store)).await
}
