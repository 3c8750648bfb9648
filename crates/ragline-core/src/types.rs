//! Core domain types for ragline.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier of a full document (`doc-<sha256 of content>`).
pub type DocumentId = String;

/// Identifier of a chunk (`chunk-<sha256 of content>`).
pub type ChunkId = String;

/// Number of characters assumed per token when no tokenizer is available.
pub const CHARS_PER_TOKEN: usize = 4;

/// Maximum number of messages kept in the pipeline status history.
pub const PIPELINE_HISTORY_LIMIT: usize = 100;

/// Build a content-addressed id with the given prefix.
pub fn compute_id(prefix: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", prefix, hex)
}

/// Rough token count for a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// A full document handed to the engine for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document, rejecting content that is empty after trimming.
    pub fn new(content: impl Into<String>, file_path: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("document content is empty".to_string()));
        }

        Ok(Self {
            id: compute_id("doc-", trimmed),
            content: trimmed.to_string(),
            file_path: file_path.into(),
            created_at: Utc::now(),
        })
    }
}

/// A chunk of a document, the unit that gets embedded and extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: DocumentId,
    pub chunk_index: i32,
    pub content: String,
    pub tokens: usize,
    pub file_path: String,
}

impl Chunk {
    pub fn new(
        doc_id: impl Into<DocumentId>,
        chunk_index: i32,
        content: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: compute_id("chunk-", &content),
            doc_id: doc_id.into(),
            chunk_index,
            tokens: estimate_tokens(&content),
            content,
            file_path: file_path.into(),
        }
    }
}

/// Processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    #[default]
    Pending,
    Processing,
    Processed,
    Failed,
}

impl DocStatus {
    pub const ALL: [DocStatus; 4] = [
        DocStatus::Pending,
        DocStatus::Processing,
        DocStatus::Processed,
        DocStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Pending => "pending",
            DocStatus::Processing => "processing",
            DocStatus::Processed => "processed",
            DocStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for DocStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DocStatus::Pending),
            "processing" => Ok(DocStatus::Processing),
            "processed" => Ok(DocStatus::Processed),
            "failed" => Ok(DocStatus::Failed),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for DocStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bookkeeping record for one document's trip through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocStatusRecord {
    pub doc_id: DocumentId,
    pub status: DocStatus,
    pub file_path: String,
    pub content_summary: String,
    pub content_length: usize,
    pub chunks_count: Option<usize>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocStatusRecord {
    /// Fresh `pending` record for a document.
    pub fn pending(doc: &Document) -> Self {
        let now = Utc::now();
        Self {
            doc_id: doc.id.clone(),
            status: DocStatus::Pending,
            file_path: doc.file_path.clone(),
            content_summary: summarize_content(&doc.content, 100),
            content_length: doc.content.len(),
            chunks_count: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: DocStatus) -> Self {
        self.status = status;
        self.updated_at = Utc::now();
        self
    }
}

/// First `max_chars` characters of the content, with an ellipsis when cut.
fn summarize_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let head: String = content.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Engine-wide ingestion progress, persisted so other processes can read it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PipelineStatus {
    pub busy: bool,
    pub job_name: String,
    pub job_start: Option<DateTime<Utc>>,
    pub docs: usize,
    pub batchs: usize,
    pub cur_batch: usize,
    pub latest_message: String,
    pub history_messages: Vec<String>,
}

impl PipelineStatus {
    /// Record a message as the latest one and append it to the bounded history.
    pub fn push_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.latest_message = message.clone();
        self.history_messages.push(message);
        if self.history_messages.len() > PIPELINE_HISTORY_LIMIT {
            let excess = self.history_messages.len() - PIPELINE_HISTORY_LIMIT;
            self.history_messages.drain(..excess);
        }
    }

    /// Mark the pipeline as running a job over `docs` documents.
    pub fn start_job(&mut self, job_name: impl Into<String>, docs: usize) {
        self.busy = true;
        self.job_name = job_name.into();
        self.job_start = Some(Utc::now());
        self.docs = docs;
        self.batchs = docs;
        self.cur_batch = 0;
    }

    /// Clear the busy flag after a job ends.
    pub fn finish_job(&mut self) {
        self.busy = false;
    }
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    pub description: String,
    pub source_ids: Vec<ChunkId>,
    pub file_paths: Vec<String>,
}

impl Entity {
    /// Canonical form of an entity name used as the graph key.
    pub fn normalize_name(name: &str) -> String {
        name.trim().trim_matches('"').trim().to_uppercase()
    }
}

/// An undirected edge in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub keywords: String,
    pub description: String,
    pub weight: f64,
    pub source_ids: Vec<ChunkId>,
    pub file_paths: Vec<String>,
}

impl Relation {
    /// Endpoints in a stable order so `(a, b)` and `(b, a)` share a key.
    pub fn ordered_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

/// Add `values` to `target`, skipping ones already present.
pub fn merge_unique(target: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_document_id_is_content_addressed() {
        let a = Document::new("hello world", "a.txt").unwrap();
        let b = Document::new("  hello world\n", "b.txt").unwrap();

        assert!(a.id.starts_with("doc-"));
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), "doc-".len() + 64);
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(Document::new("   \n", "empty.txt").is_err());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("日本語の"), 1);
    }

    #[test]
    fn test_doc_status_parse() {
        assert_eq!(DocStatus::from_str("PROCESSED").unwrap(), DocStatus::Processed);
        assert!(DocStatus::from_str("archived").is_err());
        assert_eq!(DocStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_pipeline_history_is_bounded() {
        let mut status = PipelineStatus::default();
        for i in 0..(PIPELINE_HISTORY_LIMIT + 5) {
            status.push_message(format!("message {}", i));
        }

        assert_eq!(status.history_messages.len(), PIPELINE_HISTORY_LIMIT);
        assert_eq!(status.history_messages[0], "message 5");
        assert_eq!(status.latest_message, format!("message {}", PIPELINE_HISTORY_LIMIT + 4));
    }

    #[test]
    fn test_relation_key_is_order_independent() {
        assert_eq!(Relation::ordered_key("B", "A"), Relation::ordered_key("A", "B"));
    }

    #[test]
    fn test_merge_unique() {
        let mut paths = vec!["a.txt".to_string()];
        merge_unique(&mut paths, &["a.txt".to_string(), "b.txt".to_string()]);
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }
}
