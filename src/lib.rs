//! Hippocampus — an encrypted, single-user memory engine for AI assistants.
//!
//! The store is a knowledge graph of entities, free-text observations, and
//! typed relationships, with semantic search over every observation. The
//! whole database is one SQLCipher file: nothing on disk is readable without
//! the passphrase.
//!
//! # Architecture
//!
//! - **Storage**: SQLCipher (PBKDF2-derived key, WAL, secure-delete pages)
//!   holding entities, observations, relationships, and embedding vectors
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384
//!   dimensions, L2-normalized, so cosine similarity is a dot product)
//! - **Retrieval**: exhaustive-scan semantic search fused with lexical
//!   substring search
//! - **Curation**: write-path deduplication, union-find consolidation,
//!   merge/update/forget
//!
//! The request transport and authorization are external; [`tools`] exposes
//! the typed tool surface an adapter mounts.
//!
//! # Modules
//!
//! - [`cli`] — maintenance commands (model download, export, backfill)
//! - [`config`] — TOML + environment configuration, env-only passphrase
//! - [`db`] — encrypted store open path, schema, migrations
//! - [`embedding`] — text-to-vector pipeline
//! - [`memory`] — repositories, semantic index, and the engine operations
//! - [`tools`] — tool surface and resource rendering for the transport layer

pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod tools;
