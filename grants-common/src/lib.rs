//! # Grants AI Common Library
//!
//! Shared code for the Grants AI enrichment service:
//! - Durable key-value cache (trait + SQLite and in-memory stores)
//! - Configuration loading and root folder resolution
//! - Error types
//! - Timestamp helpers

pub mod cache;
pub mod config;
pub mod error;
pub mod time;

pub use cache::{KvCache, MemoryCache, SqliteCache};
pub use error::{Error, Result};
