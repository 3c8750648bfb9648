//! Ragline DB - SQLite storages for documents, chunk vectors, status and the knowledge graph.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::{Database, DATABASE_FILE};
pub use error::{DbError, DbResult};
pub use operations::stats::StorageStats;
pub use operations::vectors::SimilarityResult;
