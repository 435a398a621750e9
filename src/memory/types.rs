//! Core record types, matching the table schemas.

use serde::{Deserialize, Serialize};

/// A named node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// UUID v7 (time-sortable) primary key. Stable, never reused.
    pub id: String,
    /// Globally unique, case-sensitive human handle (1–200 chars).
    pub name: String,
    /// Free-form category such as "person", "project", "preference".
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// Advances on every observation create, update, and merge.
    pub updated_at: String,
}

/// A free-text fact attached to one entity; the unit of storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// UUID v7 primary key.
    pub id: String,
    /// Owning entity id; deleting the entity cascades here.
    pub entity_id: String,
    /// 1–2000 characters after control-character stripping.
    pub content: String,
    /// Optional provenance tag (≤100 chars).
    pub source: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// UUID v7 primary key.
    pub id: String,
    pub from_entity: String,
    pub to_entity: String,
    /// Free-form label; auto-detected links use `relates_to`.
    pub relation_type: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A stored embedding row: one per observation.
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub id: String,
    pub entity_id: String,
    pub observation_id: String,
    /// 384-dim, L2-normalized.
    pub vector: Vec<f32>,
    /// Copy of the observation content at embed time.
    pub text_content: String,
    pub created_at: String,
}
