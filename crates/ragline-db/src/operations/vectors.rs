//! Vector search over chunk embeddings.

use crate::database::Database;
use crate::error::DbResult;
use crate::operations::chunks::{chunk_from_row, decode_vector};
use ragline_core::Chunk;

/// Result of a similarity search.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    /// The matching chunk.
    pub chunk: Chunk,
    /// Cosine similarity score.
    pub similarity: f32,
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

impl Database {
    /// Find the chunks closest to `query_vector`.
    ///
    /// Brute-force scan over every stored vector, which is fine for a local
    /// working directory of up to roughly 100K chunks.
    pub fn vector_search(
        &self,
        query_vector: &[f32],
        limit: usize,
        min_similarity: Option<f32>,
    ) -> DbResult<Vec<SimilarityResult>> {
        let conn = self.conn()?;
        let min_sim = min_similarity.unwrap_or(f32::MIN);

        let mut stmt = conn.prepare(
            r#"
            SELECT
                c.id, c.doc_id, c.chunk_index, c.content, c.tokens, c.file_path,
                v.vector, v.dimensions
            FROM chunk_vectors v
            JOIN text_chunks c ON c.id = v.chunk_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let chunk = chunk_from_row(row)?;
            let vector_bytes: Vec<u8> = row.get(6)?;
            let dimensions: i64 = row.get(7)?;
            Ok((chunk, vector_bytes, dimensions))
        })?;

        let mut results: Vec<SimilarityResult> = Vec::new();
        for row_result in rows {
            let (chunk, vector_bytes, dimensions) = row_result?;
            let vector = decode_vector(&vector_bytes, dimensions as usize);
            let similarity = cosine_similarity(query_vector, &vector);

            if similarity >= min_sim {
                results.push(SimilarityResult { chunk, similarity });
            }
        }

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::Document;

    #[test]
    fn test_cosine_similarity() {
        // Identical vectors
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);

        // Orthogonal vectors
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);

        // Opposite vectors
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) - (-1.0)).abs() < 0.0001);

        // Empty and mismatched vectors
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_vector_search_orders_by_similarity() {
        let db = Database::open_in_memory().unwrap();
        let doc = Document::new("Rust and Python", "langs.md").unwrap();
        db.upsert_document(&doc).unwrap();

        let chunks = vec![
            Chunk::new(doc.id.clone(), 0, "First chunk about Rust programming", "langs.md"),
            Chunk::new(doc.id.clone(), 1, "Second chunk about Python", "langs.md"),
        ];
        let vectors = vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];
        db.store_chunks_with_vectors(&chunks, &vectors, "test-model").unwrap();

        let results = db.vector_search(&[0.9, 0.1, 0.0, 0.0], 10, None).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, chunks[0].id);

        let results = db.vector_search(&[0.9, 0.1, 0.0, 0.0], 10, Some(0.5)).unwrap();
        assert_eq!(results.len(), 1);

        let results = db.vector_search(&[0.0, 1.0, 0.0, 0.0], 1, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.file_path, "langs.md");
        assert_eq!(results[0].chunk.id, chunks[1].id);
    }
}
