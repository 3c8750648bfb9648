//! Full document storage.

use crate::database::Database;
use crate::error::DbResult;
use chrono::{DateTime, Utc};
use ragline_core::Document;
use rusqlite::params;

impl Database {
    /// Insert a document, or refresh its file path if the content is already stored.
    pub fn upsert_document(&self, doc: &Document) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO full_docs (id, content, file_path, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET file_path = excluded.file_path
            "#,
            params![doc.id, doc.content, doc.file_path, doc.created_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Parse an RFC 3339 timestamp written by this crate, falling back to now.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
