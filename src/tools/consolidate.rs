//! `consolidate` tool — find merge candidates. Read-only.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::consolidate::{self, Cluster};
use crate::memory::CONSOLIDATE_DEFAULT_THRESHOLD;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConsolidateParams {
    /// Restrict clustering to one entity's observations.
    #[schemars(description = "Entity name to scope the scan to (all entities when omitted)")]
    pub entity: Option<String>,

    /// Similarity threshold for clustering, 0.5-1.0. Defaults to 0.8.
    #[schemars(description = "Similarity threshold for clustering, 0.5-1.0 (default 0.8)")]
    pub threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ConsolidateResult {
    pub success: bool,
    pub total_observations: usize,
    pub clusters: Vec<Cluster>,
    pub message: String,
}

impl HippocampusTools {
    pub async fn consolidate(&self, params: ConsolidateParams) -> Result<ConsolidateResult> {
        let tools = self.clone();
        let threshold = params.threshold.unwrap_or(CONSOLIDATE_DEFAULT_THRESHOLD);

        let outcome = tokio::task::spawn_blocking(move || {
            let db = tools.db();
            let conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(consolidate::consolidate(
                &conn,
                params.entity.as_deref(),
                threshold,
            ))
        })
        .await??;

        match outcome {
            Ok(scan) => {
                tracing::info!(
                    total = scan.total_observations,
                    clusters = scan.clusters.len(),
                    "consolidate completed"
                );
                let message = if scan.clusters.is_empty() {
                    "No merge candidates found.".to_string()
                } else {
                    format!(
                        "Found {} cluster(s) of similar observations; use merge to combine them.",
                        scan.clusters.len()
                    )
                };
                Ok(ConsolidateResult {
                    success: true,
                    total_observations: scan.total_observations,
                    clusters: scan.clusters,
                    message,
                })
            }
            Err(error) if error.is_business() => Ok(ConsolidateResult {
                success: false,
                total_observations: 0,
                clusters: Vec::new(),
                message: error.to_string(),
            }),
            Err(error) => Err(error.into()),
        }
    }
}
