//! Observation repository.
//!
//! Observations are append-only from the caller's perspective: mutation goes
//! through `update`/`merge`, which delete and re-insert under a new id.

use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::error::Result;
use crate::memory::types::Observation;
use crate::memory::{entities, escape_like, now_utc};

/// Upper bound on lexical search results.
pub const MAX_LEXICAL_LIMIT: usize = 50;

/// A lexical search hit with its owning entity's name and type attached.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub observation: Observation,
    pub entity_name: String,
    pub entity_type: Option<String>,
}

fn row_to_observation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Observation> {
    Ok(Observation {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        content: row.get(2)?,
        source: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const OBSERVATION_COLUMNS: &str = "id, entity_id, content, source, created_at";

/// Insert an observation and advance the owning entity's `updated_at`.
pub fn create(
    conn: &Connection,
    entity_id: &str,
    content: &str,
    source: Option<&str>,
) -> Result<Observation> {
    let observation = Observation {
        id: uuid::Uuid::now_v7().to_string(),
        entity_id: entity_id.to_string(),
        content: content.to_string(),
        source: source.map(str::to_string),
        created_at: now_utc(),
    };

    conn.execute(
        "INSERT INTO observations (id, entity_id, content, source, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            observation.id,
            observation.entity_id,
            observation.content,
            observation.source,
            observation.created_at,
        ],
    )?;
    entities::touch(conn, entity_id)?;

    Ok(observation)
}

/// All observations of one entity, newest first.
pub fn list_by_entity(conn: &Connection, entity_id: &str) -> Result<Vec<Observation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OBSERVATION_COLUMNS} FROM observations WHERE entity_id = ?1 \
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![entity_id], row_to_observation)?;
    let mut observations = Vec::new();
    for row in rows {
        observations.push(row?);
    }
    Ok(observations)
}

/// Case-insensitive substring search over observation content OR entity name,
/// newest first, with optional entity-type and since filters.
pub fn lexical_search(
    conn: &Connection,
    query: &str,
    limit: usize,
    entity_type: Option<&str>,
    since: Option<&str>,
) -> Result<Vec<LexicalHit>> {
    let limit = limit.min(MAX_LEXICAL_LIMIT);
    let pattern = format!("%{}%", escape_like(query));

    let mut sql = String::from(
        "SELECT o.id, o.entity_id, o.content, o.source, o.created_at, e.name, e.entity_type \
         FROM observations o JOIN entities e ON o.entity_id = e.id \
         WHERE (o.content LIKE ?1 ESCAPE '\\' OR e.name LIKE ?1 ESCAPE '\\')",
    );
    let mut args: Vec<&dyn rusqlite::types::ToSql> = vec![&pattern];

    if let Some(t) = entity_type.as_ref() {
        sql.push_str(&format!(" AND e.entity_type = ?{}", args.len() + 1));
        args.push(t);
    }
    if let Some(s) = since.as_ref() {
        sql.push_str(&format!(" AND o.created_at >= ?{}", args.len() + 1));
        args.push(s);
    }

    let limit_i64 = limit as i64;
    sql.push_str(&format!(
        " ORDER BY o.created_at DESC, o.id DESC LIMIT ?{}",
        args.len() + 1
    ));
    args.push(&limit_i64);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(args.as_slice(), |row| {
        Ok(LexicalHit {
            observation: row_to_observation(row)?,
            entity_name: row.get(5)?,
            entity_type: row.get(6)?,
        })
    })?;

    let mut hits = Vec::new();
    for row in rows {
        hits.push(row?);
    }
    Ok(hits)
}

/// Fetch observations by id, preserving input order. Missing ids are simply
/// absent from the result.
pub fn fetch_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Observation>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {OBSERVATION_COLUMNS} FROM observations WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let args: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let mut by_id: HashMap<String, Observation> = HashMap::new();
    let rows = stmt.query_map(args.as_slice(), row_to_observation)?;
    for row in rows {
        let observation = row?;
        by_id.insert(observation.id.clone(), observation);
    }

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Observation>> {
    let mut fetched = fetch_by_ids(conn, &[id.to_string()])?;
    Ok(fetched.pop())
}

/// Delete one observation. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM observations WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Delete all observations of an entity. Returns the number removed.
pub fn delete_by_entity(conn: &Connection, entity_id: &str) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM observations WHERE entity_id = ?1",
        params![entity_id],
    )?;
    Ok(rows)
}
