//! Core types and trait definitions for the CareBase record engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cascade;
pub mod catalog;
pub mod error;
pub mod history;
pub mod hospice;
pub mod intake;
pub mod operation;
pub mod schema;
pub mod store;
pub mod value;
pub mod view;

pub use error::{Classify, Error, ErrorKind, Result};
