//! `merge` tool — replace several observations of one entity with one.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::mutate;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MergeParams {
    /// Observations to merge; all must belong to one entity.
    #[schemars(description = "Ids of the observations to merge (all must belong to one entity)")]
    pub observation_ids: Vec<String>,

    /// Content of the merged observation.
    #[schemars(description = "Unified content replacing the originals")]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MergeResult {
    pub success: bool,
    pub new_observation_id: String,
    pub merged_count: usize,
    pub entity_name: String,
    pub message: String,
}

impl HippocampusTools {
    /// Unlike the other curation tools, validation failures here raise:
    /// callers merging specific ids expect to see the failure, and the store
    /// is untouched when it happens.
    pub async fn merge(&self, params: MergeParams) -> Result<MergeResult> {
        let tools = self.clone();
        let merged = tokio::task::spawn_blocking(move || {
            let provider = tools.embedder()?;
            let db = tools.db();
            let mut conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(mutate::merge(
                &mut conn,
                provider.as_ref(),
                &params.observation_ids,
                &params.content,
            )?)
        })
        .await??;

        tracing::info!(merged = merged.merged_count, "merge completed");
        Ok(MergeResult {
            success: true,
            message: format!(
                "Merged {} observations into one under \"{}\".",
                merged.merged_count, merged.entity_name
            ),
            new_observation_id: merged.new_observation_id,
            merged_count: merged.merged_count,
            entity_name: merged.entity_name,
        })
    }
}
