//! Handlers for `/intake`: one patient form, committed as a single undoable
//! unit.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use carebase_core::{intake::IntakeForm, store::RecordStore};
use serde_json::json;

use crate::error::ApiError;

/// `POST /intake`: body: [`IntakeForm`]; returns 201 + patient key
pub async fn submit<S>(
  State(store): State<Arc<S>>,
  Json(form): Json<IntakeForm>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
{
  let key = store.submit_intake(form).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(json!({ "key": key }))))
}

/// `PUT /intake`: rewrite an existing patient from a form; returns 204
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Json(form): Json<IntakeForm>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
{
  store.submit_intake_update(form).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
