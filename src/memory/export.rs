//! Knowledge-graph export in three formats.
//!
//! `json` is the round-trippable structural dump; `claude-md` is the compact
//! form for model context (grouped by type, no metadata); `markdown` is the
//! human-readable form with timestamps, sources, and relationships.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{MemoryError, Result};
use crate::memory::types::{Entity, Observation};
use crate::memory::{entities, now_utc, observations, relationships};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    ClaudeMd,
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "claude-md" => Ok(Self::ClaudeMd),
            "markdown" => Ok(Self::Markdown),
            other => Err(MemoryError::InvalidInput(format!(
                "unknown export format \"{other}\" (expected json, claude-md, or markdown)"
            ))),
        }
    }
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::ClaudeMd => "claude-md",
            Self::Markdown => "markdown",
        }
    }
}

/// Result of an export: counts plus the rendered payload (a JSON object for
/// `json`, a string for the markdown formats).
#[derive(Debug)]
pub struct ExportOutput {
    pub entity_count: usize,
    pub observation_count: usize,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct JsonExport {
    exported_at: String,
    entities: Vec<JsonEntity>,
    relationships: Vec<JsonRelationship>,
}

#[derive(Debug, Serialize)]
struct JsonEntity {
    name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    entity_type: Option<String>,
    created_at: String,
    updated_at: String,
    observations: Vec<JsonObservation>,
}

#[derive(Debug, Serialize)]
struct JsonObservation {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct JsonRelationship {
    from: String,
    to: String,
    relation_type: String,
    created_at: String,
}

/// Export the graph, optionally scoped to one entity by name and/or an entity
/// type.
pub fn export(
    conn: &Connection,
    format: ExportFormat,
    entity_name: Option<&str>,
    entity_type: Option<&str>,
) -> Result<ExportOutput> {
    let selected = select_entities(conn, entity_name, entity_type)?;

    let mut with_observations = Vec::with_capacity(selected.len());
    let mut observation_count = 0;
    for entity in selected {
        let entity_observations = observations::list_by_entity(conn, &entity.id)?;
        observation_count += entity_observations.len();
        with_observations.push((entity, entity_observations));
    }

    let entity_count = with_observations.len();
    let data = match format {
        ExportFormat::Json => render_json(conn, &with_observations)?,
        ExportFormat::ClaudeMd => {
            serde_json::Value::String(render_claude_md(&with_observations))
        }
        ExportFormat::Markdown => {
            serde_json::Value::String(render_markdown(conn, &with_observations)?)
        }
    };

    tracing::info!(
        format = format.as_str(),
        entity_count,
        observation_count,
        "export rendered"
    );
    Ok(ExportOutput {
        entity_count,
        observation_count,
        data,
    })
}

fn select_entities(
    conn: &Connection,
    entity_name: Option<&str>,
    entity_type: Option<&str>,
) -> Result<Vec<Entity>> {
    match entity_name {
        Some(name) => {
            let entity = entities::find_by_name(conn, name)?.ok_or_else(|| {
                MemoryError::NotFound(format!("no entity named \"{name}\""))
            })?;
            match entity_type {
                Some(t) if entity.entity_type.as_deref() != Some(t) => Ok(Vec::new()),
                _ => Ok(vec![entity]),
            }
        }
        None => entities::list(conn, entity_type, i64::MAX as usize),
    }
}

fn render_json(
    conn: &Connection,
    entries: &[(Entity, Vec<Observation>)],
) -> Result<serde_json::Value> {
    let mut seen_relationships = HashSet::new();
    let mut exported_relationships = Vec::new();

    for (entity, _) in entries {
        for relationship in relationships::list_by_entity(conn, &entity.id)? {
            // The same edge is reachable from both endpoints; keep it once.
            if !seen_relationships.insert(relationship.id.clone()) {
                continue;
            }
            exported_relationships.push(JsonRelationship {
                from: entity_name_or_id(conn, &relationship.from_entity)?,
                to: entity_name_or_id(conn, &relationship.to_entity)?,
                relation_type: relationship.relation_type,
                created_at: relationship.created_at,
            });
        }
    }

    let export = JsonExport {
        exported_at: now_utc(),
        entities: entries
            .iter()
            .map(|(entity, entity_observations)| JsonEntity {
                name: entity.name.clone(),
                entity_type: entity.entity_type.clone(),
                created_at: entity.created_at.clone(),
                updated_at: entity.updated_at.clone(),
                observations: entity_observations
                    .iter()
                    .map(|o| JsonObservation {
                        content: o.content.clone(),
                        source: o.source.clone(),
                        created_at: o.created_at.clone(),
                    })
                    .collect(),
            })
            .collect(),
        relationships: exported_relationships,
    };

    Ok(serde_json::to_value(export).expect("export serialization is infallible"))
}

/// Compact context form: `## <Capitalized Type>` sections, `### <name>`
/// subheadings, observations as bullets, no metadata.
fn render_claude_md(entries: &[(Entity, Vec<Observation>)]) -> String {
    let mut sections: Vec<(String, Vec<&(Entity, Vec<Observation>)>)> = Vec::new();

    for entry in entries {
        let section = capitalize(entry.0.entity_type.as_deref().unwrap_or("general"));
        match sections.iter_mut().find(|(name, _)| *name == section) {
            Some((_, members)) => members.push(entry),
            None => sections.push((section, vec![entry])),
        }
    }
    sections.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::from("# Memory Export\n");
    for (section, members) in sections {
        out.push_str(&format!("\n## {section}\n"));
        for (entity, entity_observations) in members {
            out.push_str(&format!("\n### {}\n", entity.name));
            for observation in entity_observations {
                out.push_str(&format!("- {}\n", observation.content));
            }
        }
    }
    out
}

/// Human-readable form with dates, sources, and relationship subsections.
fn render_markdown(
    conn: &Connection,
    entries: &[(Entity, Vec<Observation>)],
) -> Result<String> {
    let mut out = String::from("# Hippocampus Memory Export\n\n");
    out.push_str(&format!("Generated: {}\n", now_utc()));

    for (i, (entity, entity_observations)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str("\n---\n");
        }
        match &entity.entity_type {
            Some(t) => out.push_str(&format!("\n## {} ({t})\n\n", entity.name)),
            None => out.push_str(&format!("\n## {}\n\n", entity.name)),
        }

        for observation in entity_observations {
            let date = observation
                .created_at
                .split('T')
                .next()
                .unwrap_or(&observation.created_at);
            match &observation.source {
                Some(source) => {
                    out.push_str(&format!("- {} [{date}, source: {source}]\n", observation.content))
                }
                None => out.push_str(&format!("- {} [{date}]\n", observation.content)),
            }
        }

        let entity_relationships = relationships::list_by_entity(conn, &entity.id)?;
        if !entity_relationships.is_empty() {
            out.push_str("\n### Relationships\n\n");
            for relationship in entity_relationships {
                let from = entity_name_or_id(conn, &relationship.from_entity)?;
                let to = entity_name_or_id(conn, &relationship.to_entity)?;
                out.push_str(&format!("- {from} {} {to}\n", relationship.relation_type));
            }
        }
    }

    Ok(out)
}

fn entity_name_or_id(conn: &Connection, entity_id: &str) -> Result<String> {
    Ok(entities::find_by_id(conn, entity_id)?
        .map(|e| e.name)
        .unwrap_or_else(|| entity_id.to_string()))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    fn seed_graph(conn: &Connection) {
        let karolina = entities::find_or_create(conn, "karolina", Some("person")).unwrap();
        let hippo = entities::find_or_create(conn, "hippocampus", Some("project")).unwrap();
        let notes = entities::find_or_create(conn, "notes", None).unwrap();
        observations::create(conn, &karolina.id, "builds memory systems", Some("chat")).unwrap();
        observations::create(conn, &hippo.id, "uses SQLCipher", None).unwrap();
        observations::create(conn, &notes.id, "misc fact", None).unwrap();
        relationships::create(conn, &karolina.id, &hippo.id, "relates_to").unwrap();
    }

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(
            "claude-md".parse::<ExportFormat>().unwrap(),
            ExportFormat::ClaudeMd
        );
        assert!("yaml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn json_export_counts_and_dedups_relationships() {
        let conn = test_db();
        seed_graph(&conn);

        let output = export(&conn, ExportFormat::Json, None, None).unwrap();
        assert_eq!(output.entity_count, 3);
        assert_eq!(output.observation_count, 3);

        let data = output.data;
        assert!(data["exported_at"].is_string());
        assert_eq!(data["entities"].as_array().unwrap().len(), 3);
        // The karolina→hippocampus edge is reachable from both entities but
        // must be exported once.
        assert_eq!(data["relationships"].as_array().unwrap().len(), 1);
        assert_eq!(data["relationships"][0]["from"], "karolina");
        assert_eq!(data["relationships"][0]["to"], "hippocampus");
    }

    #[test]
    fn claude_md_groups_by_capitalized_type() {
        let conn = test_db();
        seed_graph(&conn);

        let output = export(&conn, ExportFormat::ClaudeMd, None, None).unwrap();
        let text = output.data.as_str().unwrap();

        assert!(text.starts_with("# Memory Export\n"));
        assert!(text.contains("\n## Person\n"));
        assert!(text.contains("\n## Project\n"));
        assert!(text.contains("\n## General\n"));
        assert!(text.contains("\n### karolina\n"));
        assert!(text.contains("- builds memory systems\n"));
        // No metadata in this format.
        assert!(!text.contains("source:"));
    }

    #[test]
    fn markdown_export_includes_sources_and_relationships() {
        let conn = test_db();
        seed_graph(&conn);

        let output = export(&conn, ExportFormat::Markdown, None, None).unwrap();
        let text = output.data.as_str().unwrap();

        assert!(text.starts_with("# Hippocampus Memory Export\n"));
        assert!(text.contains("Generated: "));
        assert!(text.contains("## karolina (person)"));
        assert!(text.contains("source: chat]"));
        assert!(text.contains("### Relationships"));
        assert!(text.contains("- karolina relates_to hippocampus"));
        assert!(text.contains("\n---\n"));
    }

    #[test]
    fn entity_filter_scopes_export() {
        let conn = test_db();
        seed_graph(&conn);

        let output = export(&conn, ExportFormat::Json, Some("karolina"), None).unwrap();
        assert_eq!(output.entity_count, 1);
        assert_eq!(output.observation_count, 1);
    }

    #[test]
    fn type_filter_scopes_export() {
        let conn = test_db();
        seed_graph(&conn);

        let output = export(&conn, ExportFormat::Json, None, Some("person")).unwrap();
        assert_eq!(output.entity_count, 1);
        assert_eq!(output.data["entities"][0]["name"], "karolina");
    }

    #[test]
    fn unknown_entity_is_not_found() {
        let conn = test_db();
        let result = export(&conn, ExportFormat::Json, Some("ghost"), None);
        assert!(matches!(result, Err(MemoryError::NotFound(_))));
    }
}
