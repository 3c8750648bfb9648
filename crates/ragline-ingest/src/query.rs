//! Answering questions over the indexed documents.

use crate::engine::LightRag;
use crate::error::{IngestError, IngestResult};
use ragline_ollama::rag::{
    build_query_prompt, build_system_prompt, ContextChunk, ContextEntity, ContextRelation,
    QueryContext,
};
use ragline_ollama::{CompletionRequest, OllamaError, QueryParam, QueryResponse};
use tracing::{debug, info};

impl LightRag {
    /// Retrieve context for `question` and, unless only the context is
    /// wanted, generate an answer from it.
    pub async fn query(&self, question: &str, param: &QueryParam) -> IngestResult<QueryResponse> {
        let db = self.storage()?;

        let query_vector = self
            .embedding
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Processing("no embedding returned for the query".into()))?;

        let hits = db.vector_search(&query_vector, param.top_k, Some(param.min_similarity))?;
        if hits.is_empty() {
            return Err(OllamaError::NoContext.into());
        }
        debug!("Retrieved {} chunks", hits.len());

        let chunk_ids: Vec<String> = hits.iter().map(|h| h.chunk.id.clone()).collect();
        let entities = db.entities_for_chunks(&chunk_ids)?;
        let names: Vec<String> = entities.iter().map(|e| e.name.clone()).collect();
        let relations = db.relations_between(&names)?;

        let context = QueryContext {
            chunks: hits
                .into_iter()
                .map(|h| ContextChunk {
                    chunk_id: h.chunk.id,
                    content: h.chunk.content,
                    file_path: h.chunk.file_path,
                    similarity: h.similarity,
                })
                .collect(),
            entities: entities
                .into_iter()
                .map(|e| ContextEntity {
                    name: e.name,
                    entity_type: e.entity_type,
                    description: e.description,
                })
                .collect(),
            relations: relations
                .into_iter()
                .map(|r| ContextRelation {
                    source: r.source,
                    target: r.target,
                    description: r.description,
                })
                .collect(),
        };

        let rendered = context.render();
        let sources = context.sources();

        if param.only_need_context {
            return Ok(QueryResponse {
                answer: None,
                context: rendered,
                sources,
            });
        }

        info!("Generating answer with {}", self.llm.model());
        let request = CompletionRequest::new(build_query_prompt(question, &context))
            .with_system(build_system_prompt())
            .with_temperature(param.temperature);
        let answer = self.llm.complete(request).await?;

        Ok(QueryResponse {
            answer: Some(answer.trim().to_string()),
            context: rendered,
            sources,
        })
    }
}
