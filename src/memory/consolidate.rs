//! Merge-candidate discovery via union-find clustering.
//!
//! Read-only: clusters identify observations similar enough to merge, and the
//! caller decides whether to act on them. Cluster membership is the union-find
//! closure over pairs at or above the threshold, while `avg_similarity`
//! averages *all* member pairs, including transitively-joined ones that may
//! fall below it.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{MemoryError, Result};
use crate::memory::{
    bytes_to_vector, dot, entities, CONSOLIDATE_MIN_THRESHOLD,
};

/// One observation inside a cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMember {
    pub observation_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: String,
}

/// A group of near-duplicate observations.
#[derive(Debug, Serialize)]
pub struct Cluster {
    pub observations: Vec<ClusterMember>,
    pub count: usize,
    /// Average pairwise cosine similarity, rounded to three decimals.
    pub avg_similarity: f64,
}

/// Outcome of a consolidation scan.
#[derive(Debug)]
pub struct ConsolidateOutcome {
    pub total_observations: usize,
    pub clusters: Vec<Cluster>,
}

/// Validate a clustering threshold into [0.5, 1.0].
pub fn validate_threshold(threshold: f32) -> Result<f32> {
    if !(CONSOLIDATE_MIN_THRESHOLD..=1.0).contains(&threshold) {
        return Err(MemoryError::InvalidInput(format!(
            "threshold must be between {CONSOLIDATE_MIN_THRESHOLD} and 1.0"
        )));
    }
    Ok(threshold)
}

struct VectorRow {
    member: ClusterMember,
    vector: Vec<f32>,
}

/// Cluster observations whose pairwise similarity meets `threshold`, scoped
/// to one entity by name or to the whole store.
pub fn consolidate(
    conn: &Connection,
    entity_name: Option<&str>,
    threshold: f32,
) -> Result<ConsolidateOutcome> {
    let threshold = validate_threshold(threshold)?;

    let entity_id = match entity_name {
        Some(name) => {
            let entity = entities::find_by_name(conn, name)?.ok_or_else(|| {
                MemoryError::NotFound(format!("no entity named \"{name}\""))
            })?;
            Some(entity.id)
        }
        None => None,
    };

    let rows = load_vectors(conn, entity_id.as_deref())?;
    let total = rows.len();
    if total < 2 {
        return Ok(ConsolidateOutcome {
            total_observations: total,
            clusters: Vec::new(),
        });
    }

    // Union-find over all above-threshold pairs, memoizing their similarities.
    let mut parent: Vec<usize> = (0..total).collect();
    let mut memoized: HashMap<(usize, usize), f32> = HashMap::new();

    for i in 0..total {
        for j in (i + 1)..total {
            let similarity = dot(&rows[i].vector, &rows[j].vector);
            if similarity >= threshold {
                memoized.insert((i, j), similarity);
                union(&mut parent, i, j);
            }
        }
    }

    // Group members by root and drop singletons.
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..total {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }

    let mut clusters = Vec::new();
    for indices in groups.into_values() {
        if indices.len() < 2 {
            continue;
        }

        // Average over every pair in the cluster; pairs joined only
        // transitively were never memoized and are computed here.
        let mut sum = 0.0f64;
        let mut pairs = 0usize;
        for (a, &i) in indices.iter().enumerate() {
            for &j in &indices[(a + 1)..] {
                let key = if i < j { (i, j) } else { (j, i) };
                let similarity = match memoized.get(&key) {
                    Some(&s) => s,
                    None => dot(&rows[i].vector, &rows[j].vector),
                };
                sum += similarity as f64;
                pairs += 1;
            }
        }
        let avg = if pairs > 0 { sum / pairs as f64 } else { 0.0 };

        clusters.push(Cluster {
            count: indices.len(),
            observations: indices.iter().map(|&i| rows[i].member.clone()).collect(),
            avg_similarity: (avg * 1000.0).round() / 1000.0,
        });
    }

    clusters.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(ConsolidateOutcome {
        total_observations: total,
        clusters,
    })
}

fn find(parent: &mut [usize], x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    // Path compression
    let mut current = x;
    while parent[current] != root {
        let next = parent[current];
        parent[current] = root;
        current = next;
    }
    root
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        parent[root_a] = root_b;
    }
}

/// Vectors joined with their observation rows, scoped to one entity or all.
fn load_vectors(conn: &Connection, entity_id: Option<&str>) -> Result<Vec<VectorRow>> {
    let base = "SELECT em.observation_id, o.content, o.source, o.created_at, em.vector \
                FROM embeddings em JOIN observations o ON em.observation_id = o.id";

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(ClusterMember, Vec<u8>)> {
        Ok((
            ClusterMember {
                observation_id: row.get(0)?,
                content: row.get(1)?,
                source: row.get(2)?,
                created_at: row.get(3)?,
            },
            row.get(4)?,
        ))
    };

    let raw: Vec<(ClusterMember, Vec<u8>)> = match entity_id {
        Some(id) => {
            let mut stmt =
                conn.prepare(&format!("{base} WHERE em.entity_id = ?1 ORDER BY em.created_at"))?;
            let rows = stmt.query_map(params![id], map_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!("{base} ORDER BY em.created_at"))?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let mut vectors = Vec::with_capacity(raw.len());
    for (member, blob) in raw {
        vectors.push(VectorRow {
            member,
            vector: bytes_to_vector(&blob)?,
        });
    }
    Ok(vectors)
}
