//! `recall` tool — fused semantic + lexical retrieval.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::recall::{self, MemoryHit, RecallQuery};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecallParams {
    /// Natural-language query, 1-500 characters.
    #[schemars(description = "What to search for (1-500 characters)")]
    pub query: String,

    /// Result cap, clamped into [1, 50]. Defaults to 10.
    #[schemars(description = "Maximum results to return, 1-50 (default 10)")]
    pub limit: Option<usize>,

    /// Restrict hits to entities of this type.
    #[schemars(description = "Only return memories for entities of this type")]
    pub r#type: Option<String>,

    /// Only memories created at or after this ISO-8601 timestamp.
    #[schemars(description = "Only return memories created at or after this ISO-8601 time")]
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecallResult {
    pub success: bool,
    pub count: usize,
    pub memories: Vec<MemoryHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HippocampusTools {
    pub async fn recall(&self, params: RecallParams) -> Result<RecallResult> {
        let tools = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let query = match RecallQuery::new(
                &params.query,
                params.limit,
                params.r#type,
                params.since,
            ) {
                Ok(query) => query,
                Err(error) => return Ok(Err(error)),
            };

            // A missing model must not break recall: degrade to lexical-only.
            let provider = match tools.embedder() {
                Ok(provider) => Some(provider),
                Err(error) => {
                    tracing::warn!(%error, "recall running without semantic search");
                    None
                }
            };

            let db = tools.db();
            let conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(recall::recall(
                &conn,
                provider.as_deref(),
                &query,
            ))
        })
        .await??;

        match outcome {
            Ok(memories) => {
                tracing::info!(count = memories.len(), "recall completed");
                Ok(RecallResult {
                    success: true,
                    count: memories.len(),
                    memories,
                    message: None,
                })
            }
            Err(error) if error.is_business() => Ok(RecallResult {
                success: false,
                count: 0,
                memories: Vec::new(),
                message: Some(error.to_string()),
            }),
            Err(error) => Err(error.into()),
        }
    }
}
