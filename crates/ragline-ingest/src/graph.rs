//! Merging extracted records into the stored knowledge graph.

use crate::error::IngestResult;
use crate::extract::{build_summary_request, join_descriptions, join_keywords, UNKNOWN_ENTITY_TYPE};
use ragline_core::{estimate_tokens, merge_unique, Entity, Relation};
use ragline_db::Database;
use ragline_ollama::LanguageModel;
use tracing::debug;

pub(crate) struct GraphMerger<'a> {
    db: &'a Database,
    llm: &'a dyn LanguageModel,
    summary_max_tokens: usize,
}

impl<'a> GraphMerger<'a> {
    pub(crate) fn new(db: &'a Database, llm: &'a dyn LanguageModel, summary_max_tokens: usize) -> Self {
        Self {
            db,
            llm,
            summary_max_tokens,
        }
    }

    pub(crate) async fn merge_entity(&self, incoming: Entity) -> IngestResult<()> {
        let mut merged = match self.db.get_entity(&incoming.name)? {
            Some(existing) if already_merged(&existing.source_ids, &incoming.source_ids) => {
                debug!("Entity {} already holds these chunks", existing.name);
                return Ok(());
            }
            Some(mut existing) => {
                existing.description = join_descriptions(&existing.description, &incoming.description);
                if existing.entity_type == UNKNOWN_ENTITY_TYPE {
                    existing.entity_type = incoming.entity_type;
                }
                merge_unique(&mut existing.source_ids, &incoming.source_ids);
                merge_unique(&mut existing.file_paths, &incoming.file_paths);
                existing
            }
            None => incoming,
        };

        merged.description = self.condense(&merged.name, merged.description).await?;
        self.db.put_entity(&merged)?;
        Ok(())
    }

    pub(crate) async fn merge_relation(&self, incoming: Relation) -> IngestResult<()> {
        for endpoint in [&incoming.source, &incoming.target] {
            if self.db.get_entity(endpoint)?.is_none() {
                debug!("Adding placeholder entity {} for a relation endpoint", endpoint);
                self.db.put_entity(&Entity {
                    name: endpoint.clone(),
                    entity_type: UNKNOWN_ENTITY_TYPE.to_string(),
                    description: String::new(),
                    source_ids: incoming.source_ids.clone(),
                    file_paths: incoming.file_paths.clone(),
                })?;
            }
        }

        let mut merged = match self.db.get_relation(&incoming.source, &incoming.target)? {
            Some(existing) if already_merged(&existing.source_ids, &incoming.source_ids) => {
                debug!(
                    "Relation {} - {} already holds these chunks",
                    existing.source, existing.target
                );
                return Ok(());
            }
            Some(mut existing) => {
                existing.description = join_descriptions(&existing.description, &incoming.description);
                existing.keywords = join_keywords(&existing.keywords, &incoming.keywords);
                existing.weight += incoming.weight;
                merge_unique(&mut existing.source_ids, &incoming.source_ids);
                merge_unique(&mut existing.file_paths, &incoming.file_paths);
                existing
            }
            None => incoming,
        };

        let subject = format!("the relationship between {} and {}", merged.source, merged.target);
        merged.description = self.condense(&subject, merged.description).await?;
        self.db.put_relation(&merged)?;
        Ok(())
    }

    /// Re-summarize a description that grew past the token limit.
    async fn condense(&self, subject: &str, description: String) -> IngestResult<String> {
        let tokens = estimate_tokens(&description);
        if tokens <= self.summary_max_tokens {
            return Ok(description);
        }

        debug!("Summarizing description of {} ({} tokens)", subject, tokens);
        let request = build_summary_request(subject, &description, self.summary_max_tokens);
        let summary = self.llm.complete(request).await?;
        let summary = summary.trim();

        if summary.is_empty() {
            Ok(description)
        } else {
            Ok(summary.to_string())
        }
    }
}

/// A record whose chunks are all among the stored sources was merged by an
/// earlier, possibly failed, run of the same document.
fn already_merged(stored: &[String], incoming: &[String]) -> bool {
    !incoming.is_empty() && incoming.iter().all(|id| stored.contains(id))
}
