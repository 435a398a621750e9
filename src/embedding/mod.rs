pub mod local;

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::config::EmbeddingConfig;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly [`EMBEDDING_DIM`]
/// dimensions, and the same input always produces the same vector. All methods
/// are synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a unit-length vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create a fresh embedding provider from config.
///
/// Returns an error if model files are not found — run
/// `hippocampus model download` first.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let provider = local::LocalEmbeddingProvider::new(config)?;
    Ok(Box::new(provider))
}

static SHARED: Mutex<Option<Arc<dyn EmbeddingProvider>>> = Mutex::new(None);

/// Process-wide embedder pipeline, created lazily on first use.
///
/// Model load is the expensive step; holding the provider in a singleton keeps
/// it resident for the lifetime of the process. Creation failure is returned
/// to the caller (and retried on the next call rather than cached).
pub fn shared_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let mut guard = SHARED.lock().expect("shared embedder holder poisoned");
    if let Some(existing) = guard.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(config)?);
    *guard = Some(Arc::clone(&provider));
    Ok(provider)
}
