//! Semantic index over stored observation vectors.
//!
//! The scan is intentionally exhaustive: the expected corpus is at most a few
//! thousand observations (~15 MiB of vectors), so a full dot-product pass is
//! sub-millisecond and needs no ANN structure. Vectors are unit-length, so the
//! dot product is cosine similarity.

use rusqlite::{params, Connection};

use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use crate::error::{MemoryError, Result};
use crate::memory::types::StoredEmbedding;
use crate::memory::{bytes_to_vector, dot, now_utc, vector_to_bytes, NORM_TOLERANCE};

/// A semantic search hit, joined with its observation and entity rows.
#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub observation_id: String,
    pub entity_id: String,
    pub entity_name: String,
    pub entity_type: Option<String>,
    pub content: String,
    pub source: Option<String>,
    pub created_at: String,
    pub similarity: f32,
}

/// Store one embedding row for an observation.
///
/// Enforces the dimension and unit-norm invariants; `text` is retained as a
/// redundant copy of the observation content at embed time.
pub fn store(
    conn: &Connection,
    entity_id: &str,
    observation_id: &str,
    vector: &[f32],
    text: &str,
) -> Result<()> {
    if vector.len() != EMBEDDING_DIM {
        return Err(MemoryError::InvalidInput(format!(
            "embedding must have {EMBEDDING_DIM} dimensions, got {}",
            vector.len()
        )));
    }
    let norm = dot(vector, vector).sqrt();
    if (norm - 1.0).abs() > NORM_TOLERANCE {
        return Err(MemoryError::InvalidInput(format!(
            "embedding vector is not unit length (norm {norm})"
        )));
    }

    conn.execute(
        "INSERT INTO embeddings (id, entity_id, observation_id, vector, text_content, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::now_v7().to_string(),
            entity_id,
            observation_id,
            vector_to_bytes(vector),
            text,
            now_utc(),
        ],
    )?;
    Ok(())
}

/// Remove the embedding row for one observation. Returns rows removed (0 or 1).
pub fn delete_by_observation(conn: &Connection, observation_id: &str) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM embeddings WHERE observation_id = ?1",
        params![observation_id],
    )?;
    Ok(rows)
}

/// Remove all embedding rows for an entity. Returns the number removed.
pub fn delete_by_entity(conn: &Connection, entity_id: &str) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM embeddings WHERE entity_id = ?1",
        params![entity_id],
    )?;
    Ok(rows)
}

/// Full vector tuples, scoped to one entity or the whole store.
/// Used by the write-path dedup and by consolidation.
pub fn list_by_entity(
    conn: &Connection,
    entity_id: Option<&str>,
) -> Result<Vec<StoredEmbedding>> {
    let sql_all = "SELECT id, entity_id, observation_id, vector, text_content, created_at \
                   FROM embeddings ORDER BY created_at";
    let sql_one = "SELECT id, entity_id, observation_id, vector, text_content, created_at \
                   FROM embeddings WHERE entity_id = ?1 ORDER BY created_at";

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(StoredEmbedding, Vec<u8>)> {
        Ok((
            StoredEmbedding {
                id: row.get(0)?,
                entity_id: row.get(1)?,
                observation_id: row.get(2)?,
                vector: Vec::new(),
                text_content: row.get(4)?,
                created_at: row.get(5)?,
            },
            row.get(3)?,
        ))
    };

    let raw: Vec<(StoredEmbedding, Vec<u8>)> = match entity_id {
        Some(id) => {
            let mut stmt = conn.prepare(sql_one)?;
            let rows = stmt.query_map(params![id], map_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(sql_all)?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let mut embeddings = Vec::with_capacity(raw.len());
    for (mut embedding, blob) in raw {
        embedding.vector = bytes_to_vector(&blob)?;
        embeddings.push(embedding);
    }
    Ok(embeddings)
}

/// Score every stored vector against the query and return the top `limit`
/// hits, optionally prefiltered by entity type and creation time.
pub fn search(
    conn: &Connection,
    query_vector: &[f32],
    limit: usize,
    entity_type: Option<&str>,
    since: Option<&str>,
) -> Result<Vec<SemanticHit>> {
    let mut sql = String::from(
        "SELECT em.observation_id, em.entity_id, e.name, e.entity_type, \
                o.content, o.source, o.created_at, em.vector \
         FROM embeddings em \
         JOIN entities e ON em.entity_id = e.id \
         JOIN observations o ON em.observation_id = o.id \
         WHERE 1=1",
    );
    let mut args: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

    if let Some(t) = entity_type.as_ref() {
        sql.push_str(&format!(" AND e.entity_type = ?{}", args.len() + 1));
        args.push(t);
    }
    if let Some(s) = since.as_ref() {
        sql.push_str(&format!(" AND o.created_at >= ?{}", args.len() + 1));
        args.push(s);
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(args.as_slice(), |row| {
        Ok((
            SemanticHit {
                observation_id: row.get(0)?,
                entity_id: row.get(1)?,
                entity_name: row.get(2)?,
                entity_type: row.get(3)?,
                content: row.get(4)?,
                source: row.get(5)?,
                created_at: row.get(6)?,
                similarity: 0.0,
            },
            row.get::<_, Vec<u8>>(7)?,
        ))
    })?;

    let mut hits = Vec::new();
    for row in rows {
        let (mut hit, blob) = row?;
        let vector = bytes_to_vector(&blob)?;
        hit.similarity = dot(query_vector, &vector);
        hits.push(hit);
    }

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(limit);
    Ok(hits)
}

/// Observations that have no embedding row (the invariant is one each).
pub fn missing_embeddings(conn: &Connection) -> Result<Vec<(String, String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT o.id, o.entity_id, o.content FROM observations o \
         LEFT JOIN embeddings em ON em.observation_id = o.id \
         WHERE em.id IS NULL",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    let mut missing = Vec::new();
    for row in rows {
        missing.push(row?);
    }
    Ok(missing)
}

/// Repair the one-embedding-per-observation invariant, embedding in batches.
///
/// A failing batch is logged and skipped so one bad input cannot block the
/// rest of the repair. Returns the number of rows repaired.
pub fn backfill(conn: &Connection, provider: &dyn EmbeddingProvider) -> Result<usize> {
    const BATCH_SIZE: usize = 32;

    let missing = missing_embeddings(conn)?;
    if missing.is_empty() {
        return Ok(0);
    }
    tracing::info!(count = missing.len(), "backfilling missing embeddings");

    let mut repaired = 0;
    for chunk in missing.chunks(BATCH_SIZE) {
        let texts: Vec<&str> = chunk.iter().map(|(_, _, content)| content.as_str()).collect();
        let vectors = match provider.embed_batch(&texts) {
            Ok(vectors) => vectors,
            Err(error) => {
                tracing::warn!(batch = chunk.len(), %error, "embedding batch failed, skipping");
                continue;
            }
        };

        for ((observation_id, entity_id, content), vector) in chunk.iter().zip(vectors.iter()) {
            store(conn, entity_id, observation_id, vector, content)?;
            repaired += 1;
        }
    }

    tracing::info!(repaired, "embedding backfill complete");
    Ok(repaired)
}
