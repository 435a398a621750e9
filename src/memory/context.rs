//! Topic resolution and context assembly.
//!
//! Resolution ladder, first match wins: exact name, case-insensitive
//! substring, then semantic fallback through the owning entity of the best
//! matching observation (accepted at similarity ≥ 0.2).

use rusqlite::Connection;
use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::types::{Entity, Observation};
use crate::memory::{
    entities, index, observations, relationships, strip_control_chars,
    CONTEXT_FALLBACK_THRESHOLD, MAX_TOPIC_LEN,
};

/// How many semantic hits the fallback considers.
const FALLBACK_CANDIDATES: usize = 5;

/// A relationship with both endpoints resolved to names.
#[derive(Debug, Clone, Serialize)]
pub struct NamedRelationship {
    pub from: String,
    pub to: String,
    pub relation_type: String,
}

/// A BFS neighbor with its own observations attached.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedEntityContext {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub depth: u32,
    pub observations: Vec<Observation>,
}

/// Assembled context for a resolved topic.
#[derive(Debug, Serialize)]
pub struct EntityContext {
    pub entity: Entity,
    pub observations: Vec<Observation>,
    pub relationships: Vec<NamedRelationship>,
    pub related_entities: Vec<RelatedEntityContext>,
}

/// Validate a topic string.
pub fn validate_topic(topic: &str) -> Result<String> {
    let topic = strip_control_chars(topic);
    let len = topic.chars().count();
    if len == 0 || len > MAX_TOPIC_LEN {
        return Err(MemoryError::InvalidInput(format!(
            "topic must be 1-{MAX_TOPIC_LEN} characters"
        )));
    }
    Ok(topic)
}

/// Lexical rungs of the resolution ladder: exact name, then case-insensitive
/// substring (first hit wins).
pub fn resolve_topic_lexical(conn: &Connection, topic: &str) -> Result<Option<Entity>> {
    if let Some(entity) = entities::find_by_name(conn, topic)? {
        return Ok(Some(entity));
    }
    let substring_hits = entities::search_by_name_substring(conn, topic)?;
    Ok(substring_hits.into_iter().next())
}

/// Semantic fallback: resolve through the owning entity of the best matching
/// observation, accepted at similarity ≥ 0.2.
pub fn resolve_topic_semantic(
    conn: &Connection,
    provider: &dyn EmbeddingProvider,
    topic: &str,
) -> Result<Option<Entity>> {
    let vector = provider.embed(topic).map_err(MemoryError::Embedding)?;
    let hits = index::search(conn, &vector, FALLBACK_CANDIDATES, None, None)?;
    if let Some(top) = hits.first() {
        if top.similarity >= CONTEXT_FALLBACK_THRESHOLD {
            return entities::find_by_id(conn, &top.entity_id);
        }
    }
    Ok(None)
}

/// Full resolution ladder, first match wins.
pub fn resolve_topic(
    conn: &Connection,
    provider: &dyn EmbeddingProvider,
    topic: &str,
) -> Result<Option<Entity>> {
    if let Some(entity) = resolve_topic_lexical(conn, topic)? {
        return Ok(Some(entity));
    }
    resolve_topic_semantic(conn, provider, topic)
}

/// Gather everything known about an entity: its observations (newest first),
/// direct relationships with named endpoints, and BFS neighbors up to `depth`
/// hops, each with their own observations.
pub fn assemble(conn: &Connection, entity: &Entity, depth: u32) -> Result<EntityContext> {
    let entity_observations = observations::list_by_entity(conn, &entity.id)?;

    let mut named_relationships = Vec::new();
    for relationship in relationships::list_by_entity(conn, &entity.id)? {
        let from = entity_name_or_id(conn, &relationship.from_entity)?;
        let to = entity_name_or_id(conn, &relationship.to_entity)?;
        named_relationships.push(NamedRelationship {
            from,
            to,
            relation_type: relationship.relation_type,
        });
    }

    let mut related = Vec::new();
    for (neighbor_id, neighbor) in relationships::related_entities(conn, &entity.id, depth)? {
        related.push(RelatedEntityContext {
            name: neighbor.name,
            entity_type: neighbor.entity_type,
            depth: neighbor.depth,
            observations: observations::list_by_entity(conn, &neighbor_id)?,
        });
    }
    // Nearest first, then by name for a stable order.
    related.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.name.cmp(&b.name)));

    Ok(EntityContext {
        entity: entity.clone(),
        observations: entity_observations,
        relationships: named_relationships,
        related_entities: related,
    })
}

fn entity_name_or_id(conn: &Connection, entity_id: &str) -> Result<String> {
    Ok(entities::find_by_id(conn, entity_id)?
        .map(|e| e.name)
        .unwrap_or_else(|| entity_id.to_string()))
}
