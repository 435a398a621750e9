//! `export` tool — render the knowledge graph in one of three formats.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::HippocampusTools;
use crate::memory::export::{self, ExportFormat};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportParams {
    /// One of "json", "claude-md", or "markdown".
    #[schemars(description = "Export format: 'json', 'claude-md', or 'markdown'")]
    pub format: String,

    /// Export only this entity.
    #[schemars(description = "Restrict the export to one entity by name")]
    pub entity: Option<String>,

    /// Export only entities of this type.
    #[schemars(description = "Restrict the export to entities of this type")]
    pub r#type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub success: bool,
    pub format: String,
    pub entity_count: usize,
    pub observation_count: usize,
    pub data: serde_json::Value,
    pub message: String,
}

impl HippocampusTools {
    pub async fn export(&self, params: ExportParams) -> Result<ExportResult> {
        let tools = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let format: ExportFormat = match params.format.parse() {
                Ok(format) => format,
                Err(error) => return Ok(Err(error)),
            };
            let db = tools.db();
            let conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(
                export::export(&conn, format, params.entity.as_deref(), params.r#type.as_deref())
                    .map(|output| (format, output)),
            )
        })
        .await??;

        match outcome {
            Ok((format, output)) => Ok(ExportResult {
                success: true,
                format: format.as_str().to_string(),
                entity_count: output.entity_count,
                observation_count: output.observation_count,
                data: output.data,
                message: format!(
                    "Exported {} entities and {} observations.",
                    output.entity_count, output.observation_count
                ),
            }),
            Err(error) if error.is_business() => Ok(ExportResult {
                success: false,
                format: String::new(),
                entity_count: 0,
                observation_count: 0,
                data: serde_json::Value::Null,
                message: error.to_string(),
            }),
            Err(error) => Err(error.into()),
        }
    }
}
