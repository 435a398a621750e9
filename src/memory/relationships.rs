//! Relationship repository and neighborhood traversal.
//!
//! Edges are stored directed but traversed undirected; pair existence checks
//! ignore direction.

use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::error::Result;
use crate::memory::types::Relationship;
use crate::memory::{entities, now_utc};

/// Maximum BFS depth accepted by [`related_entities`].
pub const MAX_DEPTH: u32 = 3;

/// A neighbor reached by BFS, at its shortest-path distance from the seed.
#[derive(Debug, Clone)]
pub struct RelatedEntity {
    pub name: String,
    pub entity_type: Option<String>,
    pub depth: u32,
}

fn row_to_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        from_entity: row.get(1)?,
        to_entity: row.get(2)?,
        relation_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const RELATIONSHIP_COLUMNS: &str = "id, from_entity, to_entity, relation_type, created_at";

pub fn create(
    conn: &Connection,
    from_entity: &str,
    to_entity: &str,
    relation_type: &str,
) -> Result<Relationship> {
    let relationship = Relationship {
        id: uuid::Uuid::now_v7().to_string(),
        from_entity: from_entity.to_string(),
        to_entity: to_entity.to_string(),
        relation_type: relation_type.to_string(),
        created_at: now_utc(),
    };

    conn.execute(
        "INSERT INTO relationships (id, from_entity, to_entity, relation_type, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            relationship.id,
            relationship.from_entity,
            relationship.to_entity,
            relationship.relation_type,
            relationship.created_at,
        ],
    )?;

    Ok(relationship)
}

/// All relationships touching an entity, at either endpoint.
pub fn list_by_entity(conn: &Connection, entity_id: &str) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
         WHERE from_entity = ?1 OR to_entity = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![entity_id], row_to_relationship)?;
    let mut relationships = Vec::new();
    for row in rows {
        relationships.push(row?);
    }
    Ok(relationships)
}

/// True when any relationship exists with endpoints {a, b}, in either direction.
pub fn exists_between(conn: &Connection, a: &str, b: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM relationships \
         WHERE (from_entity = ?1 AND to_entity = ?2) \
            OR (from_entity = ?2 AND to_entity = ?1)",
        params![a, b],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM relationships WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Delete all relationships touching an entity. Returns the number removed.
pub fn delete_by_entity(conn: &Connection, entity_id: &str) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM relationships WHERE from_entity = ?1 OR to_entity = ?1",
        params![entity_id],
    )?;
    Ok(rows)
}

/// Breadth-first neighborhood expansion from a seed entity.
///
/// Relationships are treated as undirected; each neighbor appears once, at its
/// shortest-path depth. The seed itself is excluded, and `max_depth = 0`
/// returns an empty map. Depth is clamped to [`MAX_DEPTH`].
pub fn related_entities(
    conn: &Connection,
    seed: &str,
    max_depth: u32,
) -> Result<HashMap<String, RelatedEntity>> {
    let max_depth = max_depth.min(MAX_DEPTH);
    let mut related: HashMap<String, RelatedEntity> = HashMap::new();
    if max_depth == 0 {
        return Ok(related);
    }

    let mut frontier = vec![seed.to_string()];
    for depth in 1..=max_depth {
        let mut next_frontier = Vec::new();
        for node in &frontier {
            for neighbor in neighbor_ids(conn, node)? {
                if neighbor == seed || related.contains_key(&neighbor) {
                    continue;
                }
                let Some(entity) = entities::find_by_id(conn, &neighbor)? else {
                    continue;
                };
                related.insert(
                    neighbor.clone(),
                    RelatedEntity {
                        name: entity.name,
                        entity_type: entity.entity_type,
                        depth,
                    },
                );
                next_frontier.push(neighbor);
            }
        }
        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    Ok(related)
}

/// Ids adjacent to a node, ignoring edge direction.
fn neighbor_ids(conn: &Connection, entity_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT from_entity, to_entity FROM relationships \
         WHERE from_entity = ?1 OR to_entity = ?1",
    )?;
    let rows = stmt.query_map(params![entity_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut neighbors = Vec::new();
    for row in rows {
        let (from, to) = row?;
        neighbors.push(if from == entity_id { to } else { from });
    }
    Ok(neighbors)
}
