//! Engine error kinds.
//!
//! Business-level failures ([`MemoryError::InvalidInput`], [`MemoryError::NotFound`])
//! are turned into `{success: false, message}` envelopes by the tool layer.
//! [`MemoryError::Precondition`] and the infrastructure variants propagate to the
//! caller and fail the request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Caller input violates a documented limit (length caps, bad ranges,
    /// both-or-neither argument pairs).
    #[error("{0}")]
    InvalidInput(String),

    /// The named entity or observation does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A multi-item operation's validation failed (e.g. merge across entities).
    /// The store is untouched when this is returned.
    #[error("{0}")]
    Precondition(String),

    /// Embedder inference failed. `recall` degrades to lexical-only on this;
    /// other operations surface it.
    #[error("embedding failed: {0}")]
    Embedding(anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

impl MemoryError {
    /// Whether this error should become a `{success: false}` result rather
    /// than a raised failure.
    pub fn is_business(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}
