//! Query parameters and prompt assembly for retrieval-augmented answers.

use serde::{Deserialize, Serialize};

/// Parameters of a query against the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParam {
    /// Maximum number of chunks retrieved by vector search.
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to be used.
    pub min_similarity: f32,
    /// Return the assembled context without calling the language model.
    pub only_need_context: bool,
    /// Temperature for generation.
    pub temperature: f32,
}

impl Default for QueryParam {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_similarity: 0.2,
            only_need_context: false,
            temperature: 0.7,
        }
    }
}

/// A retrieved chunk.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub chunk_id: String,
    pub content: String,
    pub file_path: String,
    pub similarity: f32,
}

/// A graph entity attached to the retrieved chunks.
#[derive(Debug, Clone)]
pub struct ContextEntity {
    pub name: String,
    pub entity_type: String,
    pub description: String,
}

/// A graph relation between attached entities.
#[derive(Debug, Clone)]
pub struct ContextRelation {
    pub source: String,
    pub target: String,
    pub description: String,
}

/// Everything retrieved for one question.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub chunks: Vec<ContextChunk>,
    pub entities: Vec<ContextEntity>,
    pub relations: Vec<ContextRelation>,
}

impl QueryContext {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Render the context block used inside the prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.entities.is_empty() {
            out.push_str("Entities:\n");
            for entity in &self.entities {
                out.push_str(&format!(
                    "- {} ({}): {}\n",
                    entity.name, entity.entity_type, entity.description
                ));
            }
            out.push('\n');
        }

        if !self.relations.is_empty() {
            out.push_str("Relationships:\n");
            for relation in &self.relations {
                out.push_str(&format!(
                    "- {} <-> {}: {}\n",
                    relation.source, relation.target, relation.description
                ));
            }
            out.push('\n');
        }

        out.push_str("Documents:\n");
        for (i, chunk) in self.chunks.iter().enumerate() {
            out.push_str(&format!("\n[{}] From: {}\n", i + 1, chunk.file_path));
            out.push_str(&chunk.content);
            out.push('\n');
        }

        out
    }

    /// Source references for the retrieved chunks.
    pub fn sources(&self) -> Vec<SourceReference> {
        self.chunks
            .iter()
            .map(|c| SourceReference {
                chunk_id: c.chunk_id.clone(),
                file_path: c.file_path.clone(),
                excerpt: truncate_content(&c.content, 200),
                similarity: c.similarity,
            })
            .collect()
    }
}

/// A reference to a source used in the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub chunk_id: String,
    pub file_path: String,
    pub excerpt: String,
    pub similarity: f32,
}

/// Result of a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer; `None` when only the context was requested.
    pub answer: Option<String>,
    /// The rendered context the answer is grounded on.
    pub context: String,
    pub sources: Vec<SourceReference>,
}

/// Build the user prompt for a question over the given context.
pub fn build_query_prompt(question: &str, context: &QueryContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("Use the following context to answer the question. If the context doesn't contain relevant information, say so.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str("─────────────────────────────────────\n");
    prompt.push_str(&context.render());
    prompt.push_str("\n─────────────────────────────────────\n\n");
    prompt.push_str(&format!("Question: {}\n\n", question));
    prompt.push_str("Answer:");

    prompt
}

/// Build the system prompt for answering questions.
pub fn build_system_prompt() -> String {
    r#"You are a helpful assistant that answers questions using documents indexed in a knowledge base.

Guidelines:
- Base your answers on the context provided
- If the context doesn't contain enough information, acknowledge that
- Be concise but thorough
- When relevant, name the source file(s) your answer is based on
- Do not make up information not present in the context"#
        .to_string()
}

/// Truncate content to a maximum length, adding ellipsis if needed.
fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
