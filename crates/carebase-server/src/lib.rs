//! HTTP server wiring for CareBase.
//!
//! Mounts the JSON API from [`carebase_api`] under `/api` and wraps it in a
//! request trace layer. The binary in `main.rs` only loads configuration and
//! opens the store.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use carebase_core::store::RecordStore;
use carebase_store_sqlite::StoreOptions;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `carebase.toml` and
/// `CAREBASE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                       String,
  pub port:                       u16,
  /// SQLite database file. `:memory:` keeps everything in RAM.
  pub store_path:                 PathBuf,
  /// Load the demo patients when the patient table is empty.
  pub seed_demo_data:             bool,
  /// Reload the disease masterlist on open and after every reset.
  pub reseed_masterlist_on_reset: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                       "127.0.0.1".to_string(),
      port:                       8420,
      store_path:                 PathBuf::from("~/.local/share/carebase/carebase.db"),
      seed_demo_data:             false,
      reseed_masterlist_on_reset: true,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      seed_demo_data:  self.seed_demo_data,
      seed_masterlist: self.reseed_masterlist_on_reset,
    }
  }

  pub fn is_in_memory(&self) -> bool { self.store_path == Path::new(":memory:") }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `store`.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: RecordStore + 'static,
{
  Router::new()
    .nest("/api", carebase_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
