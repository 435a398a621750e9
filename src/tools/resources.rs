//! Read-only resource surface.
//!
//! `context://` renders the full knowledge graph in claude-md form;
//! `entity://{name}` renders one entity's context (observations, direct
//! relationships, and depth-1 neighbors) as Markdown. Entity names in URIs
//! are percent-encoded.

use anyhow::Result;
use percent_encoding::percent_decode_str;

use super::HippocampusTools;
use crate::error::MemoryError;
use crate::memory::context;
use crate::memory::entities;
use crate::memory::export::{self, ExportFormat};

/// URIs this surface serves.
pub const CONTEXT_URI: &str = "context://";
pub const ENTITY_URI_PREFIX: &str = "entity://";

impl HippocampusTools {
    /// Resolve a resource URI to its rendered text.
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        if uri == CONTEXT_URI {
            return self.render_full_graph().await;
        }
        if let Some(encoded) = uri.strip_prefix(ENTITY_URI_PREFIX) {
            let name = percent_decode_str(encoded)
                .decode_utf8()
                .map_err(|e| anyhow::anyhow!("invalid entity name encoding: {e}"))?
                .into_owned();
            return self.render_entity(&name).await;
        }
        anyhow::bail!("unknown resource: {uri}")
    }

    async fn render_full_graph(&self) -> Result<String> {
        let tools = self.clone();
        let output = tokio::task::spawn_blocking(move || {
            let db = tools.db();
            let conn = HippocampusTools::lock_db(&db)?;
            Ok::<_, anyhow::Error>(export::export(&conn, ExportFormat::ClaudeMd, None, None)?)
        })
        .await??;

        Ok(output
            .data
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn render_entity(&self, name: &str) -> Result<String> {
        let tools = self.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let db = tools.db();
            let conn = HippocampusTools::lock_db(&db)?;

            let entity = entities::find_by_name(&conn, &name)?
                .ok_or_else(|| MemoryError::NotFound(format!("no entity named \"{name}\"")))?;
            let assembled = context::assemble(&conn, &entity, 1)?;

            let mut out = match &assembled.entity.entity_type {
                Some(t) => format!("# {} ({t})\n\n", assembled.entity.name),
                None => format!("# {}\n\n", assembled.entity.name),
            };

            for observation in &assembled.observations {
                out.push_str(&format!("- {}\n", observation.content));
            }

            if !assembled.relationships.is_empty() {
                out.push_str("\n## Relationships\n\n");
                for relationship in &assembled.relationships {
                    out.push_str(&format!(
                        "- {} {} {}\n",
                        relationship.from, relationship.relation_type, relationship.to
                    ));
                }
            }

            if !assembled.related_entities.is_empty() {
                out.push_str("\n## Related\n\n");
                for related in &assembled.related_entities {
                    match &related.entity_type {
                        Some(t) => out.push_str(&format!("- {} ({t})\n", related.name)),
                        None => out.push_str(&format!("- {}\n", related.name)),
                    }
                }
            }

            Ok::<_, anyhow::Error>(out)
        })
        .await?
    }
}
