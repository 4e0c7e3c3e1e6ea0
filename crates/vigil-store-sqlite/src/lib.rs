//! SQLite backend for the Vigil situation store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Every lifecycle mutation is one
//! read-modify-write transaction inside a single connection call, which is
//! what makes per-id mutations atomic under concurrency.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
