//! Handlers for `/tables` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tables` | Registered tables, columns and foreign keys |
//! | `GET`  | `/tables/{table}/rows` | All rows, ordered by primary key |
//! | `POST` | `/tables/{table}/rows` | Body: column map; returns 201 + key |
//! | `PUT`  | `/tables/{table}/rows` | Body: `{"key": [...], "values": {...}}` |
//! | `POST` | `/tables/{table}/delete` | Body: `{"keys": [[...], ...]}`; cascades |
//! | `POST` | `/tables/{table}/delete/preview` | Body: `{"key": [...]}`; applies nothing |

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use carebase_core::{
  cascade::CascadeDelete,
  schema::TableDef,
  store::RecordStore,
  value::{FieldValues, PrimaryKey, ResultSet},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;

/// `GET /tables`
pub async fn describe<S>(State(store): State<Arc<S>>) -> Json<Vec<TableDef>>
where
  S: RecordStore,
{
  Json(store.registry().tables().to_vec())
}

/// `GET /tables/{table}/rows`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
) -> Result<Json<ResultSet>, ApiError>
where
  S: RecordStore,
{
  let rows = store.list_rows(&table).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Insert / update ─────────────────────────────────────────────────────────

/// `POST /tables/{table}/rows`: body: `{"column": value, ...}`
pub async fn insert<S>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(values): Json<FieldValues>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
{
  let key = store
    .submit_insert(&table, values)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(json!({ "key": key }))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub key:    PrimaryKey,
  pub values: FieldValues,
}

/// `PUT /tables/{table}/rows`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(body): Json<UpdateBody>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
{
  if body.values.is_empty() {
    return Err(ApiError::BadRequest("no values to update".into()));
  }
  store
    .submit_update(&table, body.key, body.values)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
  pub keys: Vec<PrimaryKey>,
}

/// `POST /tables/{table}/delete`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(body): Json<DeleteBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RecordStore,
{
  if body.keys.is_empty() {
    return Err(ApiError::BadRequest("no keys given".into()));
  }
  let removed = store
    .submit_delete_many(&table, body.keys)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "removed": removed })))
}

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
  pub key: PrimaryKey,
}

/// What a delete would remove, for a confirmation prompt.
#[derive(Debug, Serialize)]
pub struct DeletePreview {
  pub affected: usize,
  pub by_table: BTreeMap<String, usize>,
  pub plan:     CascadeDelete,
}

/// `POST /tables/{table}/delete/preview`
pub async fn preview<S>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(body): Json<PreviewBody>,
) -> Result<Json<DeletePreview>, ApiError>
where
  S: RecordStore,
{
  let plan = store
    .preview_delete(&table, body.key)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(DeletePreview {
    affected: plan.affected_count(),
    by_table: plan.counts_by_table(),
    plan,
  }))
}
