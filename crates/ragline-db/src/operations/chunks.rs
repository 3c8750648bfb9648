//! Chunk and chunk-vector storage.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use ragline_core::Chunk;
use rusqlite::{params, Row};

/// Map the leading `id, doc_id, chunk_index, content, tokens, file_path` columns.
pub(crate) fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let tokens: i64 = row.get(4)?;
    Ok(Chunk {
        id: row.get(0)?,
        doc_id: row.get(1)?,
        chunk_index: row.get(2)?,
        content: row.get(3)?,
        tokens: tokens as usize,
        file_path: row.get(5)?,
    })
}

/// Serialize a vector to little-endian bytes.
pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a little-endian vector, reading at most `dimensions` values.
pub(crate) fn decode_vector(bytes: &[u8], dimensions: usize) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .take(dimensions)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl Database {
    /// Store chunks together with their vectors in one transaction.
    ///
    /// `vectors[i]` belongs to `chunks[i]`.
    pub fn store_chunks_with_vectors(
        &self,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        model: &str,
    ) -> DbResult<()> {
        if chunks.len() != vectors.len() {
            return Err(DbError::Other(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut chunk_stmt = tx.prepare(
                r#"
                INSERT INTO text_chunks (id, doc_id, chunk_index, content, tokens, file_path)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    doc_id = excluded.doc_id,
                    chunk_index = excluded.chunk_index,
                    file_path = excluded.file_path
                "#,
            )?;
            let mut vector_stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO chunk_vectors (chunk_id, vector, model, dimensions)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;

            for (chunk, vector) in chunks.iter().zip(vectors) {
                chunk_stmt.execute(params![
                    chunk.id,
                    chunk.doc_id,
                    chunk.chunk_index,
                    chunk.content,
                    chunk.tokens as i64,
                    chunk.file_path,
                ])?;
                vector_stmt.execute(params![
                    chunk.id,
                    encode_vector(vector),
                    model,
                    vector.len() as i64,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Distinct vector dimensionalities currently stored.
    pub fn stored_vector_dimensions(&self) -> DbResult<Vec<usize>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT dimensions FROM chunk_vectors")?;
        let dims = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dims.into_iter().map(|d| d as usize).collect())
    }
}
