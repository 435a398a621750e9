//! Retrieval fusion: semantic search merged with lexical substring search.
//!
//! Semantic hits above the floor come first in descending-similarity order,
//! then lexical hits not already present, newest first. Ranking deliberately
//! does not merge scores across the two result sets.

use rusqlite::Connection;
use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::{
    index, observations, strip_control_chars, DEFAULT_RECALL_LIMIT, MAX_QUERY_LEN,
    MAX_RECALL_LIMIT, RECALL_FLOOR,
};
use std::collections::HashSet;

/// One recalled memory, in tool-surface shape.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryHit {
    pub observation_id: String,
    pub entity: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub remembered_at: String,
    /// Present only for semantic hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Validated recall parameters.
#[derive(Debug)]
pub struct RecallQuery {
    pub query: String,
    pub limit: usize,
    pub entity_type: Option<String>,
    pub since: Option<String>,
}

impl RecallQuery {
    /// Validate the query text and clamp the limit into [1, 50].
    pub fn new(
        query: &str,
        limit: Option<usize>,
        entity_type: Option<String>,
        since: Option<String>,
    ) -> Result<Self> {
        let query = strip_control_chars(query);
        let len = query.chars().count();
        if len == 0 || len > MAX_QUERY_LEN {
            return Err(MemoryError::InvalidInput(format!(
                "query must be 1-{MAX_QUERY_LEN} characters"
            )));
        }
        let limit = limit
            .unwrap_or(DEFAULT_RECALL_LIMIT)
            .clamp(1, MAX_RECALL_LIMIT);
        Ok(Self {
            query,
            limit,
            entity_type,
            since,
        })
    }
}

/// Run semantic and lexical search for the query and merge the results.
///
/// Embedder failure (or absence) degrades to lexical-only: the semantic set
/// becomes empty and the call still succeeds.
pub fn recall(
    conn: &Connection,
    provider: Option<&dyn EmbeddingProvider>,
    query: &RecallQuery,
) -> Result<Vec<MemoryHit>> {
    let semantic = match provider.map(|p| p.embed(&query.query)) {
        Some(Ok(vector)) => index::search(
            conn,
            &vector,
            query.limit,
            query.entity_type.as_deref(),
            query.since.as_deref(),
        )?,
        Some(Err(error)) => {
            tracing::warn!(%error, "semantic search unavailable, falling back to lexical only");
            Vec::new()
        }
        None => Vec::new(),
    };

    let lexical = observations::lexical_search(
        conn,
        &query.query,
        query.limit,
        query.entity_type.as_deref(),
        query.since.as_deref(),
    )?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<MemoryHit> = Vec::new();

    for hit in semantic {
        if hit.similarity < RECALL_FLOOR || !seen.insert(hit.observation_id.clone()) {
            continue;
        }
        merged.push(MemoryHit {
            observation_id: hit.observation_id,
            entity: hit.entity_name,
            entity_type: hit.entity_type,
            content: hit.content,
            source: hit.source,
            remembered_at: hit.created_at,
            similarity: Some(hit.similarity),
        });
    }

    for hit in lexical {
        if !seen.insert(hit.observation.id.clone()) {
            continue;
        }
        merged.push(MemoryHit {
            observation_id: hit.observation.id,
            entity: hit.entity_name,
            entity_type: hit.entity_type,
            content: hit.observation.content,
            source: hit.observation.source,
            remembered_at: hit.observation.created_at,
            similarity: None,
        });
    }

    merged.truncate(query.limit);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(RecallQuery::new("q", None, None, None).unwrap().limit, 10);
        assert_eq!(RecallQuery::new("q", Some(0), None, None).unwrap().limit, 1);
        assert_eq!(RecallQuery::new("q", Some(51), None, None).unwrap().limit, 50);
        assert_eq!(RecallQuery::new("q", Some(1), None, None).unwrap().limit, 1);
    }

    #[test]
    fn query_length_is_validated() {
        assert!(RecallQuery::new("", None, None, None).is_err());
        assert!(RecallQuery::new(&"q".repeat(500), None, None, None).is_ok());
        assert!(RecallQuery::new(&"q".repeat(501), None, None, None).is_err());
    }
}
