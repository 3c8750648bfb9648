//! Storage statistics.

use crate::database::Database;
use crate::error::DbResult;

/// Row counts across the engine storages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub documents: i64,
    pub chunks: i64,
    pub vectors: i64,
    pub entities: i64,
    pub relations: i64,
}

impl Database {
    /// Count the rows of every storage.
    pub fn get_stats(&self) -> DbResult<StorageStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> DbResult<i64> {
            let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
            Ok(n)
        };

        Ok(StorageStats {
            documents: count("full_docs")?,
            chunks: count("text_chunks")?,
            vectors: count("chunk_vectors")?,
            entities: count("entities")?,
            relations: count("relations")?,
        })
    }
}
