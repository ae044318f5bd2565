//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Store failures keep their [`ErrorKind`], which picks the status code and is
//! echoed in the body as `{"error": "...", "kind": "..."}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use carebase_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { kind: e.kind(), source: Box::new(e) }
  }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Schema | ErrorKind::Sql => StatusCode::BAD_REQUEST,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Constraint | ErrorKind::EmptyHistory => StatusCode::CONFLICT,
    ErrorKind::View => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::CascadeCycle | ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request".to_owned(), m.clone()),
      ApiError::Store { kind, source } => (status_for(*kind), kind.to_string(), source.to_string()),
    };
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}
