//! Encrypted SQLite (SQLCipher) store initialization.
//!
//! The whole database file is ciphertext: the key is derived from the
//! passphrase with PBKDF2 (256,000 iterations) over 4 KiB pages, so the file
//! is indistinguishable from random without the passphrase. Freed pages are
//! zeroed (`secure_delete`), writes go through WAL, and foreign keys cascade.

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::{HippocampusConfig, Passphrase};

/// PBKDF2 iteration count for the passphrase-derived key.
const KDF_ITERATIONS: u32 = 256_000;

/// Cipher page size in bytes.
const CIPHER_PAGE_SIZE: u32 = 4096;

static SHARED: Mutex<Option<Arc<Mutex<Connection>>>> = Mutex::new(None);

/// Open (or create) the encrypted database at the given path with schema and
/// migrations applied.
///
/// A wrong passphrase or a corrupted file is fatal here — there is no retry
/// path. The error carries no key material.
pub fn open_database(path: impl AsRef<Path>, passphrase: &Passphrase) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    apply_cipher_pragmas(&conn, passphrase)?;

    // First real read through the cipher. Fails with "file is not a database"
    // when the passphrase is wrong or the file is not ours.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|_| {
        anyhow::anyhow!(
            "cannot unlock database at {}: wrong passphrase or corrupted file",
            path.display()
        )
    })?;

    // WAL for concurrent readers, cascading FKs, zeroed freed pages.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "secure_delete", "ON")?;
    conn.pragma_update(None, "busy_timeout", "5000")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    let integrity: String = conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
    anyhow::ensure!(
        integrity == "ok",
        "database integrity check failed: {integrity}"
    );

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Key the connection. `PRAGMA key` must be the first statement on the
/// connection; the KDF and page-size pragmas must follow before any read.
fn apply_cipher_pragmas(conn: &Connection, passphrase: &Passphrase) -> Result<()> {
    conn.pragma_update(None, "key", passphrase.reveal())?;
    conn.pragma_update(None, "cipher_page_size", CIPHER_PAGE_SIZE)?;
    conn.pragma_update(None, "kdf_iter", KDF_ITERATIONS)?;
    Ok(())
}

/// Process-wide store handle. The first call opens the database; subsequent
/// calls return the same `Arc<Mutex<Connection>>` regardless of arguments.
pub fn shared_database(
    config: &HippocampusConfig,
    passphrase: &Passphrase,
) -> Result<Arc<Mutex<Connection>>> {
    let mut guard = SHARED.lock().expect("shared database holder poisoned");
    if let Some(existing) = guard.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let conn = open_database(config.resolved_db_path(), passphrase)?;
    let handle = Arc::new(Mutex::new(conn));
    *guard = Some(Arc::clone(&handle));
    Ok(handle)
}

/// Result of a database health check.
pub struct HealthReport {
    pub schema_version: u32,
    pub embedding_model: Option<String>,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub entity_count: i64,
    pub observation_count: i64,
    pub relationship_count: i64,
    pub embedding_count: i64,
}

/// Run a health check on an already-unlocked connection.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version =
        migrations::get_schema_version(conn).context("failed to read schema version")?;
    let embedding_model =
        migrations::get_embedding_model(conn).context("failed to read embedding model")?;

    let integrity_details: String = conn
        .pragma_query_value(None, "integrity_check", |row| row.get(0))
        .context("failed to run integrity check")?;
    let integrity_ok = integrity_details == "ok";

    let count = |table: &str| -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap_or(0)
    };

    Ok(HealthReport {
        schema_version,
        embedding_model,
        integrity_ok,
        integrity_details,
        entity_count: count("entities"),
        observation_count: count("observations"),
        relationship_count: count("relationships"),
        embedding_count: count("embeddings"),
    })
}
