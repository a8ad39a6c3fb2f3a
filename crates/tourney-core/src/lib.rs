//! Core types and algorithms for the tournament match ingestion engine.
//!
//! This crate is deliberately free of file, XML, and database dependencies.
//! The save codec (`tourney-save`), the storage backend
//! (`tourney-store-sqlite`), and the ingestion pipeline (`tourney-ingest`)
//! all depend on it.

pub mod error;
pub mod identity;
pub mod metric;
pub mod model;
pub mod reconstruct;
pub mod store;
pub mod winner;

pub use error::{Error, Result};
