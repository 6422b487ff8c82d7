//! Data storage layer
//!
//! Each server process owns exactly one SQLite database file, named after
//! its own network address so several servers can run against one data
//! directory. The store is never shared across processes; replication is
//! handled entirely above this layer.

pub mod error;
pub mod sqlite;

pub use error::DataError;
pub use sqlite::SqliteService;
