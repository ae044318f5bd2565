//! CareBase server binary.
//!
//! Reads `carebase.toml` (or the path given with `--config`) plus `CAREBASE_*`
//! environment variables, opens the SQLite store, and serves the JSON API.
//!
//! ```
//! cargo run -p carebase-server -- --config carebase.toml
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use carebase_server::{ServerConfig, expand_tilde};
use carebase_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "CareBase hospice record server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "carebase.toml")]
  config: PathBuf,

  /// Load the demo patients into an empty store.
  #[arg(long)]
  demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CAREBASE"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.seed_demo_data |= cli.demo;

  let catalog = carebase_core::hospice::catalog().context("invalid hospice catalog")?;
  let options = server_cfg.store_options();

  let store = if server_cfg.is_in_memory() {
    SqliteStore::open_in_memory_with(catalog, options)
      .await
      .context("failed to open in-memory store")?
  } else {
    let store_path = expand_tilde(&server_cfg.store_path);
    if let Some(parent) = store_path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {parent:?}"))?;
    }
    SqliteStore::open_with(&store_path, catalog, options)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?
  };

  let app = carebase_server::router(Arc::new(store));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
