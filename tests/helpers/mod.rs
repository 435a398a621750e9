#![allow(dead_code)]

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use hippocampus::config::HippocampusConfig;
use hippocampus::db;
use hippocampus::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use hippocampus::tools::HippocampusTools;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

/// Build a tool surface over a test database and a stub embedder.
pub fn tools_with(db: &Arc<Mutex<Connection>>, provider: StubProvider) -> HippocampusTools {
    HippocampusTools::with_provider(
        Arc::clone(db),
        Arc::new(HippocampusConfig::default()),
        Arc::new(provider),
    )
}

/// Generate a deterministic unit vector with a spike at position `seed`.
/// Distinct seeds give orthogonal vectors.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 1.0;
    v
}

/// Generate a vector with high cosine similarity (~0.997) to `base`.
pub fn similar_embedding(base: &[f32]) -> Vec<f32> {
    let mut v = base.to_vec();
    for i in 0..5 {
        v[(i * 37) % EMBEDDING_DIM] += 0.05;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

/// Deterministic stub embedder for tests.
///
/// Texts registered with [`StubProvider::with`] get their fixed vector; any
/// other text gets a unit spike at a position derived from its hash, so equal
/// texts always embed identically and different texts are (almost always)
/// orthogonal.
pub struct StubProvider {
    fixed: HashMap<String, Vec<f32>>,
    fail: bool,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            fixed: HashMap::new(),
            fail: false,
        }
    }

    /// A provider whose every call fails, for lexical-degrade tests.
    pub fn failing() -> Self {
        Self {
            fixed: HashMap::new(),
            fail: true,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.to_string(), vector);
        self
    }
}

impl EmbeddingProvider for StubProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if self.fail {
            anyhow::bail!("stub embedder configured to fail");
        }
        if let Some(vector) = self.fixed.get(text) {
            return Ok(vector.clone());
        }
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        Ok(test_embedding(hasher.finish() as usize))
    }
}

/// Direct row-count helper for asserting invariants.
pub fn count_rows(db: &Arc<Mutex<Connection>>, table: &str) -> i64 {
    let conn = db.lock().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
