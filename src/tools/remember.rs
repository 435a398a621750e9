//! `remember` tool — store a fact, deduplicating against the target entity.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::remember;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RememberParams {
    /// The fact to store, 1-2000 characters.
    #[schemars(description = "The fact to remember (1-2000 characters)")]
    pub content: String,

    /// Entity to attach the fact to. Defaults to "general".
    #[schemars(description = "Entity name to attach the fact to (defaults to 'general')")]
    pub entity: Option<String>,

    /// Free-form entity category such as "person" or "project".
    #[schemars(description = "Optional entity category, e.g. 'person', 'project', 'preference'")]
    pub r#type: Option<String>,

    /// Provenance tag for the observation.
    #[schemars(description = "Optional source tag recording where this fact came from")]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RememberResult {
    pub success: bool,
    #[serde(rename = "entityId", skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(rename = "entityName", skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(rename = "observationId", skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    pub relationships_created: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplicated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_observation: Option<String>,
}

impl RememberResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            entity_id: None,
            entity_name: None,
            observation_id: None,
            relationships_created: Vec::new(),
            message,
            deduplicated: None,
            replaced_observation: None,
        }
    }
}

impl HippocampusTools {
    pub async fn remember(&self, params: RememberParams) -> Result<RememberResult> {
        let tools = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let provider = tools.embedder()?;
            let db = tools.db();
            let mut conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(remember::remember(
                &mut conn,
                provider.as_ref(),
                &params.content,
                params.entity.as_deref(),
                params.r#type.as_deref(),
                params.source.as_deref(),
            ))
        })
        .await??;

        match outcome {
            Ok(outcome) => {
                let message = if outcome.deduplicated {
                    "Already known; kept the existing observation.".to_string()
                } else if outcome.replaced_observation.is_some() {
                    "Replaced a shorter near-duplicate observation.".to_string()
                } else {
                    "Remembered.".to_string()
                };
                tracing::info!(
                    deduplicated = outcome.deduplicated,
                    linked = outcome.relationships_created.len(),
                    "remember completed"
                );
                Ok(RememberResult {
                    success: true,
                    entity_id: Some(outcome.entity.id),
                    entity_name: Some(outcome.entity.name),
                    observation_id: Some(outcome.observation_id),
                    relationships_created: outcome.relationships_created,
                    message,
                    deduplicated: outcome.deduplicated.then_some(true),
                    replaced_observation: outcome.replaced_observation,
                })
            }
            Err(error) if error.is_business() => Ok(RememberResult::failure(error.to_string())),
            Err(error) => Err(error.into()),
        }
    }
}
