//! Curation operations: `update`, `merge`, and `forget`.
//!
//! All three are replace-or-delete flows over the observation + embedding
//! pair. Validation happens before any write, and the writes run inside a
//! transaction, so a failed call leaves the store untouched.

use rusqlite::Connection;
use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::remember::{sanitize_content, validate_source};
use crate::memory::{entities, index, observations, relationships};

/// Result of an `update` call.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub entity_name: String,
    pub observation_id: String,
}

/// Result of a `merge` call.
#[derive(Debug)]
pub struct MergeOutcome {
    pub new_observation_id: String,
    pub merged_count: usize,
    pub entity_name: String,
}

/// Per-table deletion counts reported by `forget`.
#[derive(Debug, Default, Serialize)]
pub struct DeletedCounts {
    pub observations: usize,
    pub embeddings: usize,
    pub relationships: usize,
    pub entity: usize,
}

/// Replace the observation whose content exactly equals `old_content`.
///
/// The match is deliberately strict: near-matches fail. The replacement keeps
/// the original `source` and gets a fresh id and embedding.
pub fn update(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    entity_name: &str,
    old_content: &str,
    new_content: &str,
) -> Result<UpdateOutcome> {
    let new_content = sanitize_content(new_content)?;

    let entity = entities::find_by_name(conn, entity_name)?
        .ok_or_else(|| MemoryError::NotFound(format!("no entity named \"{entity_name}\"")))?;

    let existing = observations::list_by_entity(conn, &entity.id)?;
    let target = existing
        .into_iter()
        .find(|observation| observation.content == old_content)
        .ok_or_else(|| {
            MemoryError::NotFound(format!(
                "no observation with exactly that content under \"{entity_name}\""
            ))
        })?;

    let vector = provider.embed(&new_content).map_err(MemoryError::Embedding)?;

    let tx = conn.transaction()?;
    let replacement =
        observations::create(&tx, &entity.id, &new_content, target.source.as_deref())?;
    index::store(&tx, &entity.id, &replacement.id, &vector, &new_content)?;
    index::delete_by_observation(&tx, &target.id)?;
    observations::delete(&tx, &target.id)?;
    entities::touch(&tx, &entity.id)?;
    tx.commit()?;

    tracing::debug!("observation updated");
    Ok(UpdateOutcome {
        entity_name: entity.name,
        observation_id: replacement.id,
    })
}

/// Replace N observations of one entity with a single new one.
///
/// Fails (raising, not returning an envelope) when any id is missing or the
/// set spans more than one entity; nothing is written in that case. The first
/// non-null `source` among the originals is preserved.
pub fn merge(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    observation_ids: &[String],
    content: &str,
) -> Result<MergeOutcome> {
    if observation_ids.is_empty() {
        return Err(MemoryError::Precondition(
            "merge requires at least one observation id".into(),
        ));
    }
    let content = sanitize_content(content)?;

    let originals = observations::fetch_by_ids(conn, observation_ids)?;
    if originals.len() != observation_ids.len() {
        return Err(MemoryError::Precondition(format!(
            "merge references {} observations but only {} exist",
            observation_ids.len(),
            originals.len()
        )));
    }

    let entity_id = originals[0].entity_id.clone();
    if originals.iter().any(|o| o.entity_id != entity_id) {
        return Err(MemoryError::Precondition(
            "merge observations must all belong to one entity".into(),
        ));
    }
    let entity = entities::find_by_id(conn, &entity_id)?
        .ok_or_else(|| MemoryError::NotFound("owning entity no longer exists".into()))?;

    let source = originals.iter().find_map(|o| o.source.clone());
    validate_source(source.as_deref())?;

    let vector = provider.embed(&content).map_err(MemoryError::Embedding)?;

    let tx = conn.transaction()?;
    let merged = observations::create(&tx, &entity.id, &content, source.as_deref())?;
    index::store(&tx, &entity.id, &merged.id, &vector, &content)?;
    for original in &originals {
        index::delete_by_observation(&tx, &original.id)?;
        observations::delete(&tx, &original.id)?;
    }
    tx.commit()?;

    tracing::debug!(merged = originals.len(), "observations merged");
    Ok(MergeOutcome {
        new_observation_id: merged.id,
        merged_count: originals.len(),
        entity_name: entity.name,
    })
}

/// Delete a single observation and its embedding.
pub fn forget_observation(conn: &mut Connection, observation_id: &str) -> Result<DeletedCounts> {
    let tx = conn.transaction()?;
    // Embedding first, then the observation row it references.
    let embeddings = index::delete_by_observation(&tx, observation_id)?;
    let removed = observations::delete(&tx, observation_id)?;
    if !removed {
        return Err(MemoryError::NotFound(format!(
            "no observation with id {observation_id}"
        )));
    }
    tx.commit()?;

    Ok(DeletedCounts {
        observations: 1,
        embeddings,
        ..Default::default()
    })
}

/// Delete an entity and everything attached to it.
///
/// The cascade would subsume most of this; the explicit order (embeddings,
/// observations, relationships, entity) is what lets the counts be reported.
pub fn forget_entity(conn: &mut Connection, entity_name: &str) -> Result<DeletedCounts> {
    let entity = entities::find_by_name(conn, entity_name)?
        .ok_or_else(|| MemoryError::NotFound(format!("no entity named \"{entity_name}\"")))?;

    let tx = conn.transaction()?;
    let embeddings = index::delete_by_entity(&tx, &entity.id)?;
    let observations = observations::delete_by_entity(&tx, &entity.id)?;
    let relationships = relationships::delete_by_entity(&tx, &entity.id)?;
    let entity_removed = entities::delete(&tx, &entity.id)?;
    tx.commit()?;

    Ok(DeletedCounts {
        observations,
        embeddings,
        relationships,
        entity: usize::from(entity_removed),
    })
}
