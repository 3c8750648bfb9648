//! Document status and pipeline status storage.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::operations::documents::parse_timestamp;
use ragline_core::{DocStatus, DocStatusRecord, PipelineStatus};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::BTreeMap;
use tracing::warn;

const STATUS_COLUMNS: &str = "doc_id, status, file_path, content_summary, content_length, \
                              chunks_count, error, created_at, updated_at";

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<(DocStatusRecord, String)> {
    let status_str: String = row.get(1)?;
    let content_length: i64 = row.get(4)?;
    let chunks_count: Option<i64> = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    let record = DocStatusRecord {
        doc_id: row.get(0)?,
        status: DocStatus::Pending,
        file_path: row.get(2)?,
        content_summary: row.get(3)?,
        content_length: content_length as usize,
        chunks_count: chunks_count.map(|c| c as usize),
        error: row.get(6)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    };
    Ok((record, status_str))
}

fn with_parsed_status((mut record, status): (DocStatusRecord, String)) -> DbResult<DocStatusRecord> {
    record.status = status
        .parse()
        .map_err(|e: ragline_core::Error| DbError::Corrupt(e.to_string()))?;
    Ok(record)
}

impl Database {
    /// Insert or replace the status record of a document.
    pub fn upsert_doc_status(&self, record: &DocStatusRecord) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO doc_status
                (doc_id, status, file_path, content_summary, content_length,
                 chunks_count, error, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.doc_id,
                record.status.as_str(),
                record.file_path,
                record.content_summary,
                record.content_length as i64,
                record.chunks_count.map(|c| c as i64),
                record.error,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get the status record of a document, if any.
    pub fn get_doc_status(&self, doc_id: &str) -> DbResult<Option<DocStatusRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM doc_status WHERE doc_id = ?1", STATUS_COLUMNS),
                params![doc_id],
                status_from_row,
            )
            .optional()?;

        row.map(with_parsed_status).transpose()
    }

    /// All status records in the given state, oldest first.
    pub fn docs_by_status(&self, status: DocStatus) -> DbResult<Vec<DocStatusRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM doc_status WHERE status = ?1 ORDER BY created_at",
            STATUS_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![status.as_str()], status_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(with_parsed_status).collect()
    }

    /// Number of documents per status. Every status is present, possibly with zero.
    pub fn doc_status_counts(&self) -> DbResult<BTreeMap<String, i64>> {
        let conn = self.conn()?;
        let mut counts: BTreeMap<String, i64> = DocStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();

        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM doc_status GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;
        for row in rows {
            let (status, count) = row?;
            counts.insert(status, count);
        }

        Ok(counts)
    }

    /// Read the persisted pipeline status, if it has been initialized.
    pub fn load_pipeline_status(&self) -> DbResult<Option<PipelineStatus>> {
        let conn = self.conn()?;
        let data: Option<String> = conn
            .query_row("SELECT data FROM pipeline_status WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist the pipeline status.
    pub fn save_pipeline_status(&self, status: &PipelineStatus) -> DbResult<()> {
        let conn = self.conn()?;
        let data = serde_json::to_string(status)?;
        conn.execute(
            "INSERT OR REPLACE INTO pipeline_status (id, data) VALUES (1, ?1)",
            params![data],
        )?;
        Ok(())
    }

    /// Create the pipeline status record if missing.
    ///
    /// A `busy` flag found at this point was left by a process that died
    /// mid-run; it is cleared so new inserts are not blocked forever.
    pub fn ensure_pipeline_status(&self) -> DbResult<PipelineStatus> {
        let status = match self.load_pipeline_status()? {
            Some(mut status) => {
                if status.busy {
                    warn!("Clearing stale busy flag from job '{}'", status.job_name);
                    status.finish_job();
                    status.push_message("Pipeline reset after an interrupted run");
                }
                status
            }
            None => PipelineStatus::default(),
        };

        self.save_pipeline_status(&status)?;
        Ok(status)
    }
}
