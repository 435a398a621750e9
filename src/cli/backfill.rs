//! CLI `backfill` command — repair missing embedding rows.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{HippocampusConfig, Passphrase};
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::memory::index;

pub fn backfill(config: &HippocampusConfig) -> Result<()> {
    let passphrase = Passphrase::from_env()?;
    let conn = db::open_database(config.resolved_db_path(), &passphrase)?;

    let missing = index::missing_embeddings(&conn)?;
    if missing.is_empty() {
        println!("All observations already have embeddings.");
        return Ok(());
    }

    println!("Embedding {} observation(s)...", missing.len());
    let provider: Arc<dyn EmbeddingProvider> =
        embedding::shared_provider(&config.embedding).context("failed to load embedder")?;

    let repaired = index::backfill(&conn, provider.as_ref())?;
    db::migrations::set_embedding_model(&conn, &config.embedding.model)?;

    println!("Backfilled {repaired} embedding(s).");
    Ok(())
}
