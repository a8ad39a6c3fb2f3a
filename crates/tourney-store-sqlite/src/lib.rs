//! SQLite backend for the tournament match store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each match import runs inside one
//! transaction through [`SqliteWriter`], the [`MatchWriter`] implementation.
//!
//! [`MatchWriter`]: tourney_core::store::MatchWriter

mod encode;
mod schema;
mod store;

pub mod error;

pub use encode::StoredMatch;
pub use error::{Error, Result};
pub use store::{RowCounts, SqliteStore, SqliteWriter, StoredSample};
