//! `context` tool — everything known about a topic.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::context::{self, NamedRelationship, RelatedEntityContext};
use crate::memory::types::Observation;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContextParams {
    /// Topic to resolve: an entity name, part of one, or a free-text phrase.
    #[schemars(description = "Topic to look up (entity name, fragment, or free text; 1-200 characters)")]
    pub topic: String,

    /// Neighborhood expansion depth, 0-3. Defaults to 1.
    #[schemars(description = "How many relationship hops to expand, 0-3 (default 1)")]
    pub depth: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ContextEntity {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Serialize)]
pub struct ContextResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<ContextEntity>,
    pub relationships: Vec<NamedRelationship>,
    pub related_entities: Vec<RelatedEntityContext>,
    pub message: String,
}

impl ContextResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            entity: None,
            relationships: Vec::new(),
            related_entities: Vec::new(),
            message,
        }
    }
}

impl HippocampusTools {
    pub async fn context(&self, params: ContextParams) -> Result<ContextResult> {
        let depth = params.depth.unwrap_or(1).min(3);
        let tools = self.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let topic = match context::validate_topic(&params.topic) {
                Ok(topic) => topic,
                Err(error) => return Ok(Err(error)),
            };

            let db = tools.db();
            let conn = HippocampusTools::lock_db(&db)?;

            // Only reach for the embedder when the lexical rungs fail.
            let mut resolved = context::resolve_topic_lexical(&conn, &topic)?;
            if resolved.is_none() {
                let provider = tools.embedder()?;
                resolved = match context::resolve_topic_semantic(&conn, provider.as_ref(), &topic)
                {
                    Ok(resolved) => resolved,
                    Err(error) => return Ok(Err(error)),
                };
            }

            let Some(entity) = resolved else {
                return Ok::<_, anyhow::Error>(Err(crate::error::MemoryError::NotFound(
                    format!("No entity found for topic \"{topic}\"."),
                )));
            };

            Ok(context::assemble(&conn, &entity, depth))
        })
        .await??;

        match outcome {
            Ok(assembled) => {
                tracing::info!(
                    observations = assembled.observations.len(),
                    related = assembled.related_entities.len(),
                    depth,
                    "context assembled"
                );
                Ok(ContextResult {
                    success: true,
                    entity: Some(ContextEntity {
                        name: assembled.entity.name,
                        entity_type: assembled.entity.entity_type,
                        created_at: assembled.entity.created_at,
                        updated_at: assembled.entity.updated_at,
                        observations: assembled.observations,
                    }),
                    relationships: assembled.relationships,
                    related_entities: assembled.related_entities,
                    message: "Context assembled.".to_string(),
                })
            }
            Err(error) if error.is_business() => Ok(ContextResult::failure(error.to_string())),
            Err(error) => Err(error.into()),
        }
    }
}
