//! SQLite backend for the CareBase record engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write is one SQLite transaction,
//! and the undo/redo history is held next to the connection.

mod apply;
mod encode;
mod intake;
mod lookup;
mod reset;
mod sandbox;
mod schema;
mod store;
mod view;

pub mod error;

pub use error::{Error, Result};
pub use sandbox::INVALIDATION_WARNING;
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;
