//! `forget` tool — delete one observation or an entire entity.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::error::MemoryError;
use crate::memory::mutate::{self, DeletedCounts};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ForgetParams {
    /// Forget this entity and everything attached to it.
    #[schemars(description = "Entity name to forget entirely (mutually exclusive with observation_id)")]
    pub entity: Option<String>,

    /// Forget one observation by id.
    #[schemars(description = "Single observation id to forget (mutually exclusive with entity)")]
    pub observation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ForgetResult {
    pub success: bool,
    pub message: String,
    pub deleted: DeletedCounts,
}

impl HippocampusTools {
    pub async fn forget(&self, params: ForgetParams) -> Result<ForgetResult> {
        let tools = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let db = tools.db();
            let mut conn = HippocampusTools::lock_db(&db)?;
            let result = match (params.entity.as_deref(), params.observation_id.as_deref()) {
                (Some(entity), None) => mutate::forget_entity(&mut conn, entity),
                (None, Some(observation_id)) => {
                    mutate::forget_observation(&mut conn, observation_id)
                }
                _ => Err(MemoryError::InvalidInput(
                    "provide exactly one of entity or observation_id".into(),
                )),
            };
            Ok::<_, anyhow::Error>(result)
        })
        .await??;

        match outcome {
            Ok(deleted) => {
                tracing::info!(
                    observations = deleted.observations,
                    embeddings = deleted.embeddings,
                    relationships = deleted.relationships,
                    "forget completed"
                );
                Ok(ForgetResult {
                    success: true,
                    message: format!(
                        "Forgot {} observation(s), {} embedding(s), {} relationship(s).",
                        deleted.observations, deleted.embeddings, deleted.relationships
                    ),
                    deleted,
                })
            }
            Err(error) if error.is_business() => Ok(ForgetResult {
                success: false,
                message: error.to_string(),
                deleted: DeletedCounts::default(),
            }),
            Err(error) => Err(error.into()),
        }
    }
}
