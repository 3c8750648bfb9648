//! Database migrations and schema management.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
///
/// Storages written by a newer schema are refused rather than reinterpreted.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Other(format!(
            "storage schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }
    if current_version < SCHEMA_VERSION {
        info!("Creating storage schema...");
        create_initial_schema(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- Full documents as inserted
        CREATE TABLE IF NOT EXISTS full_docs (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            file_path TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Chunked text
        CREATE TABLE IF NOT EXISTS text_chunks (
            id TEXT PRIMARY KEY,
            doc_id TEXT NOT NULL REFERENCES full_docs(id) ON DELETE CASCADE,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            tokens INTEGER NOT NULL,
            file_path TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_doc ON text_chunks(doc_id);

        -- Chunk vectors (little-endian f32 BLOB)
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            chunk_id TEXT PRIMARY KEY REFERENCES text_chunks(id) ON DELETE CASCADE,
            vector BLOB NOT NULL,
            model TEXT NOT NULL,
            dimensions INTEGER NOT NULL
        );

        -- Per-document processing status
        CREATE TABLE IF NOT EXISTS doc_status (
            doc_id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            file_path TEXT NOT NULL,
            content_summary TEXT NOT NULL,
            content_length INTEGER NOT NULL,
            chunks_count INTEGER,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_doc_status_status ON doc_status(status);

        -- Single-row pipeline status
        CREATE TABLE IF NOT EXISTS pipeline_status (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL
        );

        -- Knowledge graph nodes
        CREATE TABLE IF NOT EXISTS entities (
            name TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL,
            description TEXT NOT NULL,
            source_ids TEXT NOT NULL DEFAULT '[]',
            file_paths TEXT NOT NULL DEFAULT '[]'
        );

        -- Knowledge graph edges (source <= target)
        CREATE TABLE IF NOT EXISTS relations (
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            keywords TEXT NOT NULL,
            description TEXT NOT NULL,
            weight REAL NOT NULL DEFAULT 1.0,
            source_ids TEXT NOT NULL DEFAULT '[]',
            file_paths TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (source, target)
        );

        CREATE INDEX IF NOT EXISTS idx_relations_target ON relations(target);

        -- Which chunks mention which entity
        CREATE TABLE IF NOT EXISTS entity_chunks (
            entity_name TEXT NOT NULL REFERENCES entities(name) ON DELETE CASCADE,
            chunk_id TEXT NOT NULL,
            PRIMARY KEY (entity_name, chunk_id)
        );

        CREATE INDEX IF NOT EXISTS idx_entity_chunks_chunk ON entity_chunks(chunk_id);
        "#,
    )?;

    Ok(())
}

/// Drop all tables (for testing).
#[cfg(test)]
pub fn drop_all_tables(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS entity_chunks;
        DROP TABLE IF EXISTS relations;
        DROP TABLE IF EXISTS entities;
        DROP TABLE IF EXISTS pipeline_status;
        DROP TABLE IF EXISTS doc_status;
        DROP TABLE IF EXISTS chunk_vectors;
        DROP TABLE IF EXISTS text_chunks;
        DROP TABLE IF EXISTS full_docs;
        "#,
    )?;
    set_schema_version(conn, 0)?;
    Ok(())
}
