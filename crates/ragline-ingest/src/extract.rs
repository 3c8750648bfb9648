//! Entity and relation extraction from chunks.

use ragline_core::{Chunk, Entity, Relation};
use ragline_ollama::CompletionRequest;
use serde::Deserialize;

/// Entity types suggested to the model.
pub const DEFAULT_ENTITY_TYPES: [&str; 5] =
    ["organization", "person", "geo", "event", "category"];

/// Type given to entities that only appear as relation endpoints.
pub const UNKNOWN_ENTITY_TYPE: &str = "UNKNOWN";

/// The JSON document the model is asked to produce.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default, alias = "relations")]
    pub relationships: Vec<ExtractedRelation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedEntity {
    #[serde(alias = "entity_name")]
    pub name: String,
    #[serde(default, alias = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    #[serde(default, deserialize_with = "keywords_from_any")]
    pub keywords: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Models return keywords either as a string or as a list of strings.
fn keywords_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Keywords::deserialize(deserializer)? {
        Keywords::One(s) => s,
        Keywords::Many(v) => v.join(", "),
    })
}

/// Build the extraction prompt for one chunk.
pub fn build_extraction_request(chunk: &Chunk) -> CompletionRequest {
    let prompt = format!(
        r#"Identify the entities and the relationships between them in the text below.

Entity types: {types}

Respond with a single JSON object of this shape:
{{
  "entities": [
    {{"name": "...", "type": "...", "description": "..."}}
  ],
  "relationships": [
    {{"source": "...", "target": "...", "keywords": "...", "description": "...", "weight": 1.0}}
  ]
}}

Use entity names exactly as they appear in "entities" for relationship endpoints.
Descriptions should be one or two sentences grounded in the text.

Text:
{text}"#,
        types = DEFAULT_ENTITY_TYPES.join(", "),
        text = chunk.content,
    );

    CompletionRequest::new(prompt)
        .with_system("You extract knowledge graphs from documents. Reply with JSON only.")
        .json()
        .with_temperature(0.0)
}

/// Build the prompt that condenses an overlong description.
pub fn build_summary_request(subject: &str, description: &str, max_tokens: usize) -> CompletionRequest {
    let prompt = format!(
        r#"The following descriptions all refer to {subject}.
Combine them into one coherent description in the third person.
Resolve contradictions and keep every distinct fact.

Descriptions:
{description}

Combined description:"#
    );

    CompletionRequest::new(prompt)
        .with_max_tokens(u32::try_from(max_tokens).unwrap_or(u32::MAX))
        .with_temperature(0.0)
}

/// Parse model output, tolerating a surrounding markdown code fence.
pub fn parse_extraction(raw: &str) -> serde_json::Result<Extraction> {
    serde_json::from_str(strip_code_fence(raw))
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

impl Extraction {
    /// Normalize into graph records attributed to `chunk`.
    ///
    /// Entities with blank names and relations that point at themselves are
    /// dropped. Repeated entities and relations within the chunk are folded
    /// together.
    pub fn into_graph(self, chunk: &Chunk) -> (Vec<Entity>, Vec<Relation>) {
        let source_ids = vec![chunk.id.clone()];
        let file_paths = vec![chunk.file_path.clone()];

        let mut entities: Vec<Entity> = Vec::new();
        for extracted in self.entities {
            let name = Entity::normalize_name(&extracted.name);
            if name.is_empty() {
                continue;
            }
            let description = extracted.description.trim().to_string();

            if let Some(existing) = entities.iter_mut().find(|e| e.name == name) {
                existing.description = join_descriptions(&existing.description, &description);
                continue;
            }

            let entity_type = extracted.entity_type.trim().to_uppercase();
            entities.push(Entity {
                name,
                entity_type: if entity_type.is_empty() {
                    UNKNOWN_ENTITY_TYPE.to_string()
                } else {
                    entity_type
                },
                description,
                source_ids: source_ids.clone(),
                file_paths: file_paths.clone(),
            });
        }

        let mut relations: Vec<Relation> = Vec::new();
        for extracted in self.relationships {
            let source = Entity::normalize_name(&extracted.source);
            let target = Entity::normalize_name(&extracted.target);
            if source.is_empty() || target.is_empty() || source == target {
                continue;
            }
            let (source, target) = Relation::ordered_key(&source, &target);
            let keywords = extracted.keywords.trim().to_string();
            let description = extracted.description.trim().to_string();
            let weight = if extracted.weight.is_finite() && extracted.weight > 0.0 {
                extracted.weight
            } else {
                default_weight()
            };

            if let Some(existing) = relations
                .iter_mut()
                .find(|r| r.source == source && r.target == target)
            {
                existing.description = join_descriptions(&existing.description, &description);
                existing.keywords = join_keywords(&existing.keywords, &keywords);
                existing.weight += weight;
                continue;
            }

            relations.push(Relation {
                source,
                target,
                keywords,
                description,
                weight,
                source_ids: source_ids.clone(),
                file_paths: file_paths.clone(),
            });
        }

        (entities, relations)
    }
}

/// Append `addition` to `existing` unless it is blank or already present.
pub fn join_descriptions(existing: &str, addition: &str) -> String {
    let addition = addition.trim();
    if addition.is_empty() || existing.lines().any(|line| line.trim() == addition) {
        return existing.to_string();
    }
    if existing.trim().is_empty() {
        return addition.to_string();
    }
    format!("{}\n{}", existing, addition)
}

/// Union of comma-separated keyword lists, keeping first-seen order.
pub fn join_keywords(existing: &str, addition: &str) -> String {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in existing.split(',').chain(addition.split(',')) {
        let keyword = keyword.trim();
        if !keyword.is_empty() && !keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            keywords.push(keyword.to_string());
        }
    }
    keywords.join(", ")
}
