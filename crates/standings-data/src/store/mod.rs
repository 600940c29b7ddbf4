//! Persistent storage for the ranking engine.

pub mod sqlite;

pub use sqlite::{MergeCounts, SqliteStore, StoreStats};
