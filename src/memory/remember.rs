//! Write path: embed, deduplicate against the owning entity, store, and
//! auto-link entities mentioned in the text.
//!
//! The dedup decision is made against a snapshot read before the write; a
//! concurrent identical write can produce two near-duplicates, which
//! consolidation later catches.

use regex::Regex;
use rusqlite::Connection;

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::types::Entity;
use crate::memory::{
    dot, entities, index, observations, relationships, strip_control_chars, DEDUP_THRESHOLD,
    DEFAULT_ENTITY, MAX_CONTENT_LEN, MAX_SOURCE_LEN,
};

/// How many recently-updated entities are scanned for name mentions.
const LINK_CANDIDATE_LIMIT: usize = 500;

/// Candidate names shorter than this are never auto-linked.
const MIN_LINK_NAME_LEN: usize = 3;

/// Result of a `remember` call.
#[derive(Debug)]
pub struct RememberOutcome {
    pub entity: Entity,
    pub observation_id: String,
    /// `true` when an existing observation already covered this content and
    /// nothing was written.
    pub deduplicated: bool,
    /// Content of the shorter observation this one replaced, if any.
    pub replaced_observation: Option<String>,
    /// Names of entities newly linked by mention detection.
    pub relationships_created: Vec<String>,
}

/// Validate and normalize remember inputs. Returns the sanitized content.
pub fn sanitize_content(content: &str) -> Result<String> {
    let content = strip_control_chars(content);
    let len = content.chars().count();
    if len == 0 || len > MAX_CONTENT_LEN {
        return Err(MemoryError::InvalidInput(format!(
            "content must be 1-{MAX_CONTENT_LEN} characters after control-character stripping"
        )));
    }
    Ok(content)
}

pub fn validate_source(source: Option<&str>) -> Result<()> {
    if let Some(s) = source {
        if s.chars().count() > MAX_SOURCE_LEN {
            return Err(MemoryError::InvalidInput(format!(
                "source must be at most {MAX_SOURCE_LEN} characters"
            )));
        }
    }
    Ok(())
}

/// Store a fact under an entity, deduplicating against that entity's existing
/// observations at [`DEDUP_THRESHOLD`].
///
/// A near-duplicate that is at least as informative (longer or equal content)
/// wins and the call becomes a no-op; a shorter one is replaced by the new
/// content. New and replacing observations run relationship auto-detection.
pub fn remember(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    content: &str,
    entity_name: Option<&str>,
    entity_type: Option<&str>,
    source: Option<&str>,
) -> Result<RememberOutcome> {
    let content = sanitize_content(content)?;
    validate_source(source)?;
    let entity_name = entity_name.unwrap_or(DEFAULT_ENTITY);

    let entity = entities::find_or_create(conn, entity_name, entity_type)?;
    let vector = provider.embed(&content).map_err(MemoryError::Embedding)?;

    // Nearest stored neighbor under the same entity, from a pre-write snapshot.
    let stored = index::list_by_entity(conn, Some(&entity.id))?;
    let best_match = stored
        .iter()
        .map(|embedding| (embedding, dot(&vector, &embedding.vector)))
        .filter(|(_, similarity)| *similarity >= DEDUP_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    if let Some((matched, similarity)) = best_match {
        if matched.text_content.chars().count() >= content.chars().count() {
            tracing::debug!(similarity, "duplicate content skipped");
            return Ok(RememberOutcome {
                observation_id: matched.observation_id.clone(),
                entity,
                deduplicated: true,
                replaced_observation: None,
                relationships_created: Vec::new(),
            });
        }

        // The new content subsumes a shorter near-duplicate: replace it.
        let replaced_id = matched.observation_id.clone();
        let replaced_content = matched.text_content.clone();
        tracing::debug!(similarity, "replacing shorter near-duplicate");

        let tx = conn.transaction()?;
        index::delete_by_observation(&tx, &replaced_id)?;
        observations::delete(&tx, &replaced_id)?;
        let observation = observations::create(&tx, &entity.id, &content, source)?;
        index::store(&tx, &entity.id, &observation.id, &vector, &content)?;
        let relationships_created = detect_relationships(&tx, &entity, &content)?;
        tx.commit()?;

        return Ok(RememberOutcome {
            observation_id: observation.id,
            entity,
            deduplicated: false,
            replaced_observation: Some(replaced_content),
            relationships_created,
        });
    }

    let tx = conn.transaction()?;
    let observation = observations::create(&tx, &entity.id, &content, source)?;
    index::store(&tx, &entity.id, &observation.id, &vector, &content)?;
    let relationships_created = detect_relationships(&tx, &entity, &content)?;
    tx.commit()?;

    Ok(RememberOutcome {
        observation_id: observation.id,
        entity,
        deduplicated: false,
        replaced_observation: None,
        relationships_created,
    })
}

/// Link the source entity to every other known entity whose name appears in
/// the content. Returns the names newly linked.
fn detect_relationships(
    conn: &Connection,
    source_entity: &Entity,
    content: &str,
) -> Result<Vec<String>> {
    let candidates = entities::list(conn, None, LINK_CANDIDATE_LIMIT)?;
    let mut linked = Vec::new();

    for candidate in candidates {
        if candidate.id == source_entity.id
            || candidate.name == DEFAULT_ENTITY
            || candidate.name.chars().count() < MIN_LINK_NAME_LEN
        {
            continue;
        }
        let Some(pattern) = name_mention_regex(&candidate.name) else {
            continue;
        };
        if !pattern.is_match(content) {
            continue;
        }
        if relationships::exists_between(conn, &source_entity.id, &candidate.id)? {
            continue;
        }
        relationships::create(conn, &source_entity.id, &candidate.id, "relates_to")?;
        linked.push(candidate.name);
    }

    Ok(linked)
}

/// Compile a case-insensitive word-boundary matcher for an entity name,
/// treating runs of `-`, `_`, and whitespace as interchangeable.
fn name_mention_regex(name: &str) -> Option<Regex> {
    let parts: Vec<String> = name
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(regex::escape)
        .collect();
    if parts.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)\b{}\b", parts.join(r"[-_\s]+"));
    Regex::new(&pattern).ok()
}
