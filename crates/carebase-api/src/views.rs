//! Handlers for `/views`. Views are recomputed on every request.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use carebase_core::{store::RecordStore, value::ResultSet};

use crate::error::ApiError;

/// `GET /views`
pub async fn names<S>(State(store): State<Arc<S>>) -> Json<Vec<String>>
where
  S: RecordStore,
{
  Json(store.view_names())
}

/// `GET /views/{name}`: 422 for an unknown view or one the live schema no
/// longer supports
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
) -> Result<Json<ResultSet>, ApiError>
where
  S: RecordStore,
{
  let rows = store.get_admin_view(&name).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}
