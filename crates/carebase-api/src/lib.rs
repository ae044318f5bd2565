//! JSON REST API for CareBase.
//!
//! Exposes an axum [`Router`] backed by any [`carebase_core::store::RecordStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! Primary keys travel as JSON arrays in column order, e.g. `["1"]` or
//! `["1", "TB"]`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", carebase_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod history;
pub mod intake;
pub mod sql;
pub mod tables;
pub mod views;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use carebase_core::store::RecordStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    // Tables
    .route("/tables", get(tables::describe::<S>))
    .route(
      "/tables/{table}/rows",
      get(tables::list::<S>).post(tables::insert::<S>).put(tables::update::<S>),
    )
    .route("/tables/{table}/delete", post(tables::delete::<S>))
    .route("/tables/{table}/delete/preview", post(tables::preview::<S>))
    // Intake
    .route("/intake", post(intake::submit::<S>).put(intake::update::<S>))
    // History
    .route("/history", get(history::status::<S>))
    .route("/history/undo", post(history::undo::<S>))
    .route("/history/redo", post(history::redo::<S>))
    // Untracked writes
    .route("/sql", post(sql::run::<S>))
    .route("/reset", post(sql::reset::<S>))
    // Views
    .route("/views", get(views::names::<S>))
    .route("/views/{name}", get(views::get_one::<S>))
    .with_state(store)
}
