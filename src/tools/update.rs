//! `update` tool — replace one observation's content, matched exactly.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::mutate;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateParams {
    /// Entity the observation belongs to.
    #[schemars(description = "Name of the entity the observation belongs to")]
    pub entity: String,

    /// Current content; must match an observation exactly.
    #[schemars(description = "Existing observation content (must match exactly)")]
    pub old_content: String,

    /// Replacement content.
    #[schemars(description = "New content to store in its place")]
    pub new_content: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResult {
    pub success: bool,
    pub message: String,
    #[serde(rename = "observationId", skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
}

impl HippocampusTools {
    pub async fn update(&self, params: UpdateParams) -> Result<UpdateResult> {
        let tools = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let provider = tools.embedder()?;
            let db = tools.db();
            let mut conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(mutate::update(
                &mut conn,
                provider.as_ref(),
                &params.entity,
                &params.old_content,
                &params.new_content,
            ))
        })
        .await??;

        match outcome {
            Ok(updated) => {
                tracing::info!("update completed");
                Ok(UpdateResult {
                    success: true,
                    message: format!("Updated one observation under \"{}\".", updated.entity_name),
                    observation_id: Some(updated.observation_id),
                })
            }
            Err(error) if error.is_business() => Ok(UpdateResult {
                success: false,
                message: error.to_string(),
                observation_id: None,
            }),
            Err(error) => Err(error.into()),
        }
    }
}
