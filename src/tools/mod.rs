//! The tool surface consumed by the external transport layer.
//!
//! Each tool has a `schemars`-described parameter struct, a serializable
//! result envelope, and an async handler on [`HippocampusTools`]. Handlers
//! wrap embedder inference and store access in `spawn_blocking`; business
//! failures (bad input, missing items) come back as `{success: false}`
//! envelopes while precondition and infrastructure failures propagate as
//! errors. [`HippocampusTools::dispatch`] is the uniform name → handler table.

pub mod consolidate;
pub mod context;
pub mod export;
pub mod forget;
pub mod merge;
pub mod recall;
pub mod remember;
pub mod resources;
pub mod update;

use anyhow::Result;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::config::HippocampusConfig;
use crate::config::Passphrase;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::memory::index;

/// Every tool name this surface dispatches.
pub const TOOL_NAMES: &[&str] = &[
    "remember",
    "recall",
    "context",
    "update",
    "forget",
    "merge",
    "consolidate",
    "export",
];

/// Shared state behind every tool handler: the process-wide store handle and
/// a lazily created embedder. Cheap to clone; clones share both.
#[derive(Clone)]
pub struct HippocampusTools {
    db: Arc<Mutex<Connection>>,
    config: Arc<HippocampusConfig>,
    embedder: Arc<Mutex<Option<Arc<dyn EmbeddingProvider>>>>,
}

impl HippocampusTools {
    /// Open the shared encrypted store and repair the embedding index if any
    /// observation is missing its vector. The embedding model itself is only
    /// loaded when a repair is needed; otherwise the first embedding call
    /// loads it.
    pub fn initialize(config: HippocampusConfig, passphrase: &Passphrase) -> Result<Self> {
        let db = db::shared_database(&config, passphrase)?;
        let tools = Self::new(db, Arc::new(config));
        tools.warn_on_model_mismatch();
        tools.repair_index();
        Ok(tools)
    }

    /// Assemble the tool surface from already-opened components. Used by
    /// tests and by adapters that manage their own store handle.
    pub fn new(db: Arc<Mutex<Connection>>, config: Arc<HippocampusConfig>) -> Self {
        Self {
            db,
            config,
            embedder: Arc::new(Mutex::new(None)),
        }
    }

    /// Pre-seed the embedder, bypassing lazy creation. Used by tests.
    pub fn with_provider(
        db: Arc<Mutex<Connection>>,
        config: Arc<HippocampusConfig>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            db,
            config,
            embedder: Arc::new(Mutex::new(Some(provider))),
        }
    }

    /// Uniform dispatch: tool name + JSON arguments → JSON result.
    pub async fn dispatch(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let started = std::time::Instant::now();
        let result = match tool {
            "remember" => to_json(self.remember(from_json(arguments)?).await?)?,
            "recall" => to_json(self.recall(from_json(arguments)?).await?)?,
            "context" => to_json(self.context(from_json(arguments)?).await?)?,
            "update" => to_json(self.update(from_json(arguments)?).await?)?,
            "forget" => to_json(self.forget(from_json(arguments)?).await?)?,
            "merge" => to_json(self.merge(from_json(arguments)?).await?)?,
            "consolidate" => to_json(self.consolidate(from_json(arguments)?).await?)?,
            "export" => to_json(self.export(from_json(arguments)?).await?)?,
            other => anyhow::bail!("unknown tool: {other}"),
        };
        tracing::info!(tool, elapsed_ms = started.elapsed().as_millis() as u64, "tool dispatched");
        Ok(result)
    }

    pub(crate) fn db(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    /// The process-wide embedder, created on first use.
    pub(crate) fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let mut guard = self.embedder.lock().expect("embedder holder poisoned");
        if let Some(provider) = guard.as_ref() {
            return Ok(Arc::clone(provider));
        }
        let provider = embedding::shared_provider(&self.config.embedding)?;
        *guard = Some(Arc::clone(&provider));
        Ok(provider)
    }

    /// Lock the store handle for a blocking operation.
    pub(crate) fn lock_db(
        db: &Arc<Mutex<Connection>>,
    ) -> Result<std::sync::MutexGuard<'_, Connection>> {
        db.lock()
            .map_err(|e| anyhow::anyhow!("store lock poisoned: {e}"))
    }

    fn warn_on_model_mismatch(&self) {
        let Ok(conn) = self.db.lock() else { return };
        if let Ok(Some(stored)) = db::migrations::get_embedding_model(&conn) {
            if stored != self.config.embedding.model {
                tracing::warn!(
                    stored = %stored,
                    configured = %self.config.embedding.model,
                    "embedding model changed — run `hippocampus backfill` after re-embedding"
                );
            }
        }
    }

    /// Startup invariant repair: every observation gets exactly one embedding
    /// row. Embedder trouble here is logged, not fatal — the store stays
    /// usable for lexical operations.
    fn repair_index(&self) {
        let missing = {
            let Ok(conn) = self.db.lock() else { return };
            index::missing_embeddings(&conn).map(|m| m.len()).unwrap_or(0)
        };
        if missing == 0 {
            return;
        }

        let provider = match self.embedder() {
            Ok(provider) => provider,
            Err(error) => {
                tracing::warn!(missing, %error, "cannot backfill embeddings without a model");
                return;
            }
        };
        let Ok(conn) = self.db.lock() else { return };
        if let Err(error) = index::backfill(&conn, provider.as_ref()) {
            tracing::warn!(%error, "embedding backfill failed");
        }
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| anyhow::anyhow!("invalid tool arguments: {e}"))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
